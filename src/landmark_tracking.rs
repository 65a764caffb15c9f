//! Face-landmark tracking with one-in-flight back-pressure.
//!
//! The external detector (a face-mesh model producing normalized 3D
//! landmarks) is modeled as an asynchronous submit/poll pair so slow
//! inference never blocks the render tick. [`LandmarkTracker`] enforces the
//! at-most-one-in-flight contract: while a frame is being processed, new
//! frames are skipped, not queued.

use crate::capture::Frame;
use crate::constants::{FOREHEAD_INDEX, HEAD_TOP_INDEX, NOSE_TIP_INDEX};
use crate::Result;
use log::warn;

/// A single normalized facial landmark.
///
/// `x`, `y` are in `[0, 1]` relative to the source image; `z` is relative
/// depth, smaller meaning nearer the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    /// Construct a landmark
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// The landmark list for one detected face.
///
/// Immutable snapshot; there is no cross-frame identity.
#[derive(Debug, Clone)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    /// Wrap a detector's landmark list
    #[must_use]
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// All landmarks in mesh order
    #[must_use]
    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// Nose tip, the primary reference point
    #[must_use]
    pub fn nose_tip(&self) -> Option<Landmark> {
        self.points.get(NOSE_TIP_INDEX).copied()
    }

    /// Forehead reference point, used for tilt detection
    #[must_use]
    pub fn forehead(&self) -> Option<Landmark> {
        self.points.get(FOREHEAD_INDEX).copied()
    }

    /// Head-top reference point, used to refine spawn height
    #[must_use]
    pub fn head_top(&self) -> Option<Landmark> {
        self.points.get(HEAD_TOP_INDEX).copied()
    }
}

/// Asynchronous landmark detector contract.
///
/// `submit` begins inference on a frame; `poll` returns `Some(result)` once
/// inference completes (`Some(None)` means no face was found) and `None`
/// while the previous call is still running. Implementations backed by a
/// synchronous model may complete inside `submit` and deliver on the next
/// `poll`.
pub trait LandmarkDetector: Send {
    /// Begin inference on a frame
    fn submit(&mut self, frame: &Frame) -> Result<()>;

    /// Poll for a completed result
    fn poll(&mut self) -> Option<Option<LandmarkSet>>;
}

/// Drives a [`LandmarkDetector`] from the render tick.
///
/// Publishes the most recently completed result; consumers read an
/// eventually-consistent snapshot and never wait on inference.
pub struct LandmarkTracker {
    detector: Box<dyn LandmarkDetector>,
    in_flight: bool,
    latest: Option<LandmarkSet>,
    face_detected: bool,
}

impl LandmarkTracker {
    /// Create a tracker around a detector
    #[must_use]
    pub fn new(detector: Box<dyn LandmarkDetector>) -> Self {
        Self {
            detector,
            in_flight: false,
            latest: None,
            face_detected: false,
        }
    }

    /// Advance the tracker with the current frame, if any.
    ///
    /// Submits the frame unless a previous submission is still in flight
    /// (back-pressure: skipped, not queued), then polls for a completed
    /// result. A detector error is recovered locally as "no landmarks this
    /// frame" and never propagates.
    pub fn update(&mut self, frame: Option<&Frame>) {
        if !self.in_flight {
            if let Some(frame) = frame {
                match self.detector.submit(frame) {
                    Ok(()) => self.in_flight = true,
                    Err(e) => {
                        warn!("landmark inference failed, treating frame as faceless: {e}");
                        self.latest = None;
                        self.face_detected = false;
                    }
                }
            }
        }

        if self.in_flight {
            if let Some(result) = self.detector.poll() {
                self.in_flight = false;
                self.face_detected = result.is_some();
                self.latest = result;
            }
        }
    }

    /// Whether an inference call is currently in flight
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Whether the latest completed inference found a face
    #[must_use]
    pub fn face_detected(&self) -> bool {
        self.face_detected
    }

    /// The most recently completed landmark set, if a face was found
    #[must_use]
    pub fn latest(&self) -> Option<&LandmarkSet> {
        self.latest.as_ref()
    }

    /// Drop any published state and abandon the in-flight call
    pub fn reset(&mut self) {
        self.in_flight = false;
        self.latest = None;
        self.face_detected = false;
    }
}
