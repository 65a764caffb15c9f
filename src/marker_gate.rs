//! Marker detection gate.
//!
//! Samples camera frames on a fixed cadence, asks an external decoder for a
//! payload, and debounces the result into a stable "marker present" signal.
//! Transient decode failures (motion blur, occlusion) are smoothed by a
//! trailing grace period; a single success flips the gate back on
//! immediately.
//!
//! Frames are decoded at full camera resolution to maximize detection range
//! for small or distant markers; the per-sample CPU cost is an accepted
//! tradeoff.

use crate::capture::Frame;
use crate::decode_worker::{DecodeWorker, SubmitOutcome};
use crate::utils::image_ops::flip_horizontal_rgba;
use glam::Vec2;
use log::{debug, warn};
use std::time::{Duration, Instant};

/// Quadrilateral outline of a decoded marker, in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub top_left: Vec2,
    pub top_right: Vec2,
    pub bottom_right: Vec2,
    pub bottom_left: Vec2,
}

impl Quad {
    /// Mirror the quad into display coordinates for a selfie view.
    ///
    /// Mirroring swaps the left/right corner roles as well as reflecting x,
    /// so the outline still winds the same way on screen.
    #[must_use]
    pub fn mirrored(&self, width: f32) -> Self {
        Self {
            top_left: Vec2::new(width - self.top_right.x, self.top_right.y),
            top_right: Vec2::new(width - self.top_left.x, self.top_left.y),
            bottom_right: Vec2::new(width - self.bottom_left.x, self.bottom_left.y),
            bottom_left: Vec2::new(width - self.bottom_right.x, self.bottom_right.y),
        }
    }
}

/// A successful decode: the payload string and where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDetection {
    /// Decoded payload
    pub payload: String,
    /// Marker outline in source-image pixels
    pub quad: Quad,
}

/// External marker decoder contract.
///
/// Returns `None` when no marker is found in the buffer. The gate handles
/// orientation: it tries the buffer as-is and horizontally mirrored before
/// reporting absence.
pub trait MarkerDecoder: Send {
    /// Attempt to decode a marker from a tightly packed RGBA buffer
    fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Option<MarkerDetection>;
}

/// Try a decoder against the raw buffer, then a horizontally flipped copy.
///
/// Returns the detection and whether the flipped orientation was the one
/// that succeeded.
#[must_use]
pub fn decode_with_flip_retry(
    decoder: &dyn MarkerDecoder,
    pixels: &[u8],
    width: u32,
    height: u32,
) -> Option<(MarkerDetection, bool)> {
    if let Some(detection) = decoder.decode(pixels, width, height) {
        return Some((detection, false));
    }
    let mut flipped = pixels.to_vec();
    flip_horizontal_rgba(&mut flipped, width, height);
    decoder
        .decode(&flipped, width, height)
        .map(|detection| (detection, true))
}

/// Debounced marker state snapshot.
#[derive(Debug, Clone)]
pub struct MarkerState {
    /// Debounced presence flag
    pub present: bool,
    /// Payload from the most recent successful decode sample
    pub payload: Option<String>,
    /// When the gate last changed presence state
    pub since: Instant,
}

/// Gate configuration
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Sampling interval while visible
    pub interval: Duration,
    /// Sampling interval while hidden
    pub hidden_interval: Duration,
    /// Trailing grace period before PRESENT falls back to ABSENT
    pub grace: Duration,
    /// When set, only this payload counts as presence
    pub expected_payload: Option<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(crate::constants::MARKER_INTERVAL_MS),
            hidden_interval: Duration::from_millis(crate::constants::MARKER_INTERVAL_HIDDEN_MS),
            grace: Duration::from_millis(crate::constants::MARKER_GRACE_MS),
            expected_payload: None,
        }
    }
}

/// Two-state debounce machine (ABSENT / PRESENT) over marker decode results.
///
/// Sampling runs on its own cadence, independent of the render tick. When a
/// decode worker is attached, frames are handed off and results applied
/// asynchronously; otherwise decoding happens in-thread with the flip retry.
pub struct MarkerGate {
    config: GateConfig,
    decoder: Box<dyn MarkerDecoder>,
    worker: Option<DecodeWorker>,
    hidden: bool,

    present: bool,
    since: Instant,
    grace_deadline: Option<Instant>,
    last_sample: Option<Instant>,
    payload: Option<String>,
    quad: Option<Quad>,
    image_size: Option<(u32, u32)>,
}

impl MarkerGate {
    /// Create a gate with a synchronous decoder and an optional worker
    #[must_use]
    pub fn new(
        decoder: Box<dyn MarkerDecoder>,
        worker: Option<DecodeWorker>,
        config: GateConfig,
        now: Instant,
    ) -> Self {
        Self {
            config,
            decoder,
            worker,
            hidden: false,
            present: false,
            since: now,
            grace_deadline: None,
            last_sample: None,
            payload: None,
            quad: None,
            image_size: None,
        }
    }

    /// Debounced presence flag
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Snapshot of the debounced state
    #[must_use]
    pub fn state(&self) -> MarkerState {
        MarkerState {
            present: self.present,
            payload: self.payload.clone(),
            since: self.since,
        }
    }

    /// Outline of the last decoded marker, in display coordinates
    #[must_use]
    pub fn quad(&self) -> Option<Quad> {
        self.quad
    }

    /// Source image dimensions of the last decoded marker
    #[must_use]
    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.image_size
    }

    /// Whether a worker is attached and alive
    #[must_use]
    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    /// Throttle sampling while the page is hidden
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    /// Replace the expected payload filter at runtime
    pub fn set_expected_payload(&mut self, expected: Option<String>) {
        self.config.expected_payload = expected;
    }

    /// Advance time-driven state: expire the grace deadline and apply any
    /// completed worker decode. Call once per tick even when not sampling.
    pub fn poll(&mut self, now: Instant) {
        // Drain the worker first so a success that raced the deadline wins.
        let mut reply = None;
        let mut worker_dead = false;
        if let Some(worker) = &mut self.worker {
            reply = worker.try_recv();
            worker_dead = worker.is_dead();
        }
        if let Some(reply) = reply {
            let outcome = reply
                .detection
                .map(|detection| (detection, reply.used_flipped));
            self.apply_sample(outcome, reply.width, reply.height, now);
        }
        if worker_dead {
            warn!("decode worker died, falling back to synchronous decode");
            self.worker = None;
        }

        if self.present {
            if let Some(deadline) = self.grace_deadline {
                if now >= deadline {
                    self.present = false;
                    self.since = now;
                    self.grace_deadline = None;
                    debug!("marker lost after grace period");
                }
            }
        }
    }

    /// Whether the sampling interval has elapsed
    #[must_use]
    pub fn should_sample(&self, now: Instant) -> bool {
        let interval = if self.hidden {
            self.config.hidden_interval
        } else {
            self.config.interval
        };
        match self.last_sample {
            Some(last) => now.duration_since(last) >= interval,
            None => true,
        }
    }

    /// Offer a frame to the gate. Decodes (or hands off to the worker) only
    /// when the sampling interval has elapsed.
    pub fn sample(&mut self, frame: &Frame, now: Instant) {
        self.poll(now);
        if !self.should_sample(now) {
            return;
        }
        self.last_sample = Some(now);

        if let Some(worker) = &mut self.worker {
            // Ownership of the pixel copy moves into the job; while a decode
            // is pending new samples are dropped, not queued.
            match worker.submit(frame.pixels.clone(), frame.width, frame.height) {
                SubmitOutcome::Accepted | SubmitOutcome::Busy => return,
                SubmitOutcome::Disconnected => {}
            }
            warn!("decode worker unavailable, falling back to synchronous decode");
            self.worker = None;
        }

        let outcome = decode_with_flip_retry(&*self.decoder, &frame.pixels, frame.width, frame.height);
        self.apply_sample(outcome, frame.width, frame.height, now);
    }

    /// Apply one decode outcome to the state machine.
    fn apply_sample(
        &mut self,
        outcome: Option<(MarkerDetection, bool)>,
        width: u32,
        height: u32,
        now: Instant,
    ) {
        match outcome {
            Some((detection, used_flipped)) => {
                let matches = self
                    .config
                    .expected_payload
                    .as_ref()
                    .map_or(true, |expected| *expected == detection.payload);

                // A flipped decode is already in display orientation; a raw
                // decode must be mirrored for the selfie view.
                let quad = if used_flipped {
                    detection.quad
                } else {
                    detection.quad.mirrored(width as f32)
                };
                self.payload = Some(detection.payload);
                self.quad = Some(quad);
                self.image_size = Some((width, height));
                debug!(
                    "marker decode {}x{} ok{}",
                    width,
                    height,
                    if used_flipped { " (flipped)" } else { "" }
                );

                if matches {
                    if !self.present {
                        self.present = true;
                        self.since = now;
                    }
                    self.grace_deadline = None;
                } else {
                    self.note_failure(now);
                }
            }
            None => {
                self.payload = None;
                self.quad = None;
                debug!("marker decode {width}x{height} none");
                self.note_failure(now);
            }
        }
    }

    /// Shut down the decode worker, if one is attached. Part of session
    /// teardown; the gate keeps working in synchronous mode afterwards.
    pub fn terminate_worker(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.terminate();
        }
    }

    fn note_failure(&mut self, now: Instant) {
        if self.present && self.grace_deadline.is_none() {
            self.grace_deadline = Some(now + self.config.grace);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decoder scripted to succeed or fail per call
    struct ScriptedDecoder {
        results: std::cell::RefCell<Vec<Option<MarkerDetection>>>,
    }

    impl ScriptedDecoder {
        fn new(results: Vec<Option<MarkerDetection>>) -> Self {
            Self {
                results: std::cell::RefCell::new(results),
            }
        }
    }

    impl MarkerDecoder for ScriptedDecoder {
        fn decode(&self, _pixels: &[u8], _width: u32, _height: u32) -> Option<MarkerDetection> {
            let mut results = self.results.borrow_mut();
            if results.is_empty() {
                None
            } else {
                results.remove(0)
            }
        }
    }

    fn detection(payload: &str) -> MarkerDetection {
        MarkerDetection {
            payload: payload.to_string(),
            quad: Quad {
                top_left: Vec2::new(10.0, 10.0),
                top_right: Vec2::new(20.0, 10.0),
                bottom_right: Vec2::new(20.0, 20.0),
                bottom_left: Vec2::new(10.0, 20.0),
            },
        }
    }

    fn frame() -> Frame {
        Frame::new(vec![0; 8 * 8 * 4], 8, 8).unwrap()
    }

    fn gate_with(results: Vec<Option<MarkerDetection>>, now: Instant) -> MarkerGate {
        MarkerGate::new(
            Box::new(ScriptedDecoder::new(results)),
            None,
            GateConfig::default(),
            now,
        )
    }

    #[test]
    fn test_success_transitions_immediately() {
        let t0 = Instant::now();
        let mut gate = gate_with(vec![Some(detection("hello"))], t0);
        assert!(!gate.is_present());

        gate.sample(&frame(), t0);
        assert!(gate.is_present());
        assert_eq!(gate.state().payload.as_deref(), Some("hello"));
        assert_eq!(gate.image_size(), Some((8, 8)));
    }

    #[test]
    fn test_failures_hold_through_grace_period() {
        let t0 = Instant::now();
        // One success, then nothing but failures
        let mut gate = gate_with(vec![Some(detection("x"))], t0);
        gate.sample(&frame(), t0);
        assert!(gate.is_present());

        // Failure samples every 100ms up to 3.9s; still present (grace armed
        // at the first failure, 100ms in)
        for i in 1..=39 {
            gate.sample(&frame(), t0 + Duration::from_millis(i * 100));
            assert!(gate.is_present(), "dropped too early at {}ms", i * 100);
        }

        // Past first-failure + grace (100ms + 4000ms): absent
        gate.poll(t0 + Duration::from_millis(4150));
        assert!(!gate.is_present());
    }

    #[test]
    fn test_success_during_grace_cancels_fallback() {
        let t0 = Instant::now();
        let mut gate = gate_with(
            vec![
                Some(detection("x")), // t=0 success
                None,                 // t=100 failure, arms grace
                Some(detection("x")), // t=200 success, cancels grace
            ],
            t0,
        );
        gate.sample(&frame(), t0);
        gate.sample(&frame(), t0 + Duration::from_millis(100));
        gate.sample(&frame(), t0 + Duration::from_millis(200));

        // Way past the original deadline: still present because the grace
        // timer was cancelled
        gate.poll(t0 + Duration::from_secs(10));
        assert!(gate.is_present());
    }

    #[test]
    fn test_expected_payload_mismatch_counts_as_failure() {
        let t0 = Instant::now();
        let mut gate = MarkerGate::new(
            Box::new(ScriptedDecoder::new(vec![Some(detection("wrong"))])),
            None,
            GateConfig {
                expected_payload: Some("right".to_string()),
                ..GateConfig::default()
            },
            t0,
        );
        gate.sample(&frame(), t0);
        assert!(!gate.is_present());
        // The raw payload is still exposed for feedback
        assert_eq!(gate.state().payload.as_deref(), Some("wrong"));
    }

    #[test]
    fn test_sampling_respects_interval() {
        let t0 = Instant::now();
        let mut gate = gate_with(vec![Some(detection("x"))], t0);

        gate.sample(&frame(), t0);
        assert!(gate.is_present());

        // 10ms later is inside the 66ms interval: the (failing) decoder is
        // not consulted, so the state is untouched
        gate.sample(&frame(), t0 + Duration::from_millis(10));
        assert!(gate.state().payload.is_some());
    }

    #[test]
    fn test_hidden_throttles_sampling() {
        let t0 = Instant::now();
        let mut gate = gate_with(vec![], t0);
        gate.sample(&frame(), t0);
        gate.set_hidden(true);

        assert!(!gate.should_sample(t0 + Duration::from_millis(500)));
        assert!(gate.should_sample(t0 + Duration::from_millis(2100)));

        gate.set_hidden(false);
        assert!(gate.should_sample(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_quad_mirroring() {
        let quad = Quad {
            top_left: Vec2::new(10.0, 10.0),
            top_right: Vec2::new(30.0, 12.0),
            bottom_right: Vec2::new(32.0, 40.0),
            bottom_left: Vec2::new(8.0, 38.0),
        };
        let mirrored = quad.mirrored(100.0);
        assert_eq!(mirrored.top_left, Vec2::new(70.0, 12.0));
        assert_eq!(mirrored.top_right, Vec2::new(90.0, 10.0));
        assert_eq!(mirrored.bottom_right, Vec2::new(92.0, 38.0));
        assert_eq!(mirrored.bottom_left, Vec2::new(68.0, 40.0));
    }

    #[test]
    fn test_flip_retry_reports_orientation() {
        // Decoder that fails the first call and succeeds the second,
        // emulating a mirrored camera
        let decoder = ScriptedDecoder::new(vec![None, Some(detection("flipped"))]);
        let pixels = vec![0u8; 8 * 8 * 4];
        let result = decode_with_flip_retry(&decoder, &pixels, 8, 8);
        let (det, used_flipped) = result.unwrap();
        assert_eq!(det.payload, "flipped");
        assert!(used_flipped);
    }
}
