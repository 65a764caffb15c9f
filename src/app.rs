//! Pipeline session.
//!
//! [`OverlaySession`] owns every pipeline component behind explicit
//! constructor-style initialization and an explicit teardown, instead of
//! ambient module-level state. One `tick` reads the latest producer
//! snapshots, advances the simulation, and hands a composed frame to the
//! renderer; it never blocks on camera or detector I/O.

use crate::capture::{CaptureProfile, Frame, FrameSource};
use crate::config::Config;
use crate::decode_worker::DecodeWorker;
use crate::emission::{EmissionCalculator, EmissionParams};
use crate::landmark_tracking::{LandmarkDetector, LandmarkTracker};
use crate::marker_gate::{GateConfig, MarkerDecoder, MarkerGate, MarkerState};
use crate::particle_system::{
    DisablePolicy, ParticleSimulator, SimulatorParams, VariantCatalog,
};
use crate::scene_composer::{SceneComposer, SceneRenderer};
use crate::smoothing::{create_smoother, PointFilter};
use crate::utils::cover_fit;
use crate::{Error, Result};
use glam::Vec3;
use log::{error, info, warn};
use std::time::{Duration, Instant};

/// Lifecycle state of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Pipeline is live
    Running,
    /// Capture acquisition failed; terminal until `retry_capture` succeeds
    CaptureFailed(String),
    /// Torn down; the session cannot be restarted
    ShutDown,
}

/// External components injected into the session.
pub struct SessionComponents {
    /// Camera (or substitute) frame source
    pub frame_source: Box<dyn FrameSource>,
    /// Face-landmark detector
    pub detector: Box<dyn LandmarkDetector>,
    /// Marker decoder used for in-thread decoding
    pub decoder: Box<dyn MarkerDecoder>,
    /// Second decoder instance for the background worker, when offloading
    pub worker_decoder: Option<Box<dyn MarkerDecoder>>,
    /// Scene renderer
    pub renderer: Box<dyn SceneRenderer>,
}

/// The AR overlay pipeline session.
pub struct OverlaySession {
    state: SessionState,
    profile: CaptureProfile,
    frame_source: Box<dyn FrameSource>,
    tracker: LandmarkTracker,
    gate: MarkerGate,
    simulator: ParticleSimulator,
    emission: EmissionCalculator,
    smoother: Box<dyn PointFilter>,
    composer: SceneComposer,
    renderer: Box<dyn SceneRenderer>,

    particles_enabled: bool,
    marker_required: bool,
    visible: bool,

    last_frame: Option<Frame>,
    last_tick: Option<Instant>,
    ticks: u64,
}

impl OverlaySession {
    /// Build the session and acquire the capture stream.
    ///
    /// Configuration problems fail construction; a capture acquisition
    /// failure does not. In that case the session comes up in the terminal
    /// `CaptureFailed` state, with [`Self::retry_capture`] as the re-entry
    /// point.
    pub fn new(config: &Config, components: SessionComponents, now: Instant) -> Result<Self> {
        config.validate()?;
        info!("Initializing AR overlay session");

        let SessionComponents {
            mut frame_source,
            detector,
            decoder,
            worker_decoder,
            renderer,
        } = components;

        let profile = if config.capture.full_resolution {
            CaptureProfile::FullResolution
        } else {
            CaptureProfile::Energy
        };
        let state = match frame_source.start(profile) {
            Ok(()) => SessionState::Running,
            Err(e) => {
                error!("capture acquisition failed: {e}");
                SessionState::CaptureFailed(e.to_string())
            }
        };

        let worker = match worker_decoder {
            Some(worker_decoder) if config.marker.use_worker => {
                match DecodeWorker::spawn(worker_decoder) {
                    Ok(worker) => {
                        info!("decode worker started");
                        Some(worker)
                    }
                    Err(e) => {
                        warn!("decode worker unavailable, using synchronous decode: {e}");
                        None
                    }
                }
            }
            _ => None,
        };

        let gate = MarkerGate::new(
            decoder,
            worker,
            GateConfig {
                interval: Duration::from_millis(config.marker.interval_ms),
                hidden_interval: Duration::from_millis(config.marker.hidden_interval_ms),
                grace: Duration::from_millis(config.marker.grace_ms),
                expected_payload: config.marker.expected_payload.clone(),
            },
            now,
        );

        let catalog = if config.particles.variant_radii.is_empty() {
            VariantCatalog::single()
        } else {
            VariantCatalog::new(config.particles.variant_radii.clone())
        };
        let simulator = ParticleSimulator::new(
            config.particles.effective_capacity(),
            catalog,
            SimulatorParams {
                emit_rate: config.particles.emit_rate,
                gravity: config.particles.gravity,
                recycle_y: config.particles.recycle_y,
                emit_spread: config.particles.emit_spread,
                vx_spread: config.particles.vx_spread,
                vy_spread: config.particles.vy_spread,
                angular_spread: crate::constants::INIT_ANGULAR_SPREAD,
                disable_policy: config.particles.disable_policy,
            },
            rand::random(),
        );

        let emission = EmissionCalculator::new(EmissionParams {
            depth: config.emission.depth,
            z_scale: config.emission.z_scale,
            rise: config.emission.rise,
        });
        let smoother = create_smoother(&config.emission.smoothing)?;

        Ok(Self {
            state,
            profile,
            frame_source,
            tracker: LandmarkTracker::new(detector),
            gate,
            simulator,
            emission,
            smoother,
            composer: SceneComposer::new(config.scene.fov_degrees, config.scene.show_mesh),
            renderer,
            particles_enabled: config.particles.enabled,
            marker_required: config.marker.required,
            visible: true,
            last_frame: None,
            last_tick: None,
            ticks: 0,
        })
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Re-attempt capture acquisition after a `CaptureFailed` state.
    pub fn retry_capture(&mut self) -> Result<()> {
        if self.state == SessionState::ShutDown {
            return Err(Error::InvalidInput("session is shut down".to_string()));
        }
        match self.frame_source.start(self.profile) {
            Ok(()) => {
                info!("capture acquired after retry");
                self.state = SessionState::Running;
                Ok(())
            }
            Err(e) => {
                error!("capture retry failed: {e}");
                self.state = SessionState::CaptureFailed(e.to_string());
                Err(e)
            }
        }
    }

    /// Drive one render tick.
    ///
    /// Reads the most recently published landmark and marker snapshots (no
    /// ordering guarantee between them), steps the simulation once, and
    /// renders. While hidden, only the (throttled) marker sampler runs.
    pub fn tick(&mut self, now: Instant) {
        if self.state != SessionState::Running {
            return;
        }
        self.ticks += 1;

        let dt = self
            .last_tick
            .map_or(0.0, |last| now.duration_since(last).as_secs_f32());
        self.last_tick = Some(now);

        match self.frame_source.grab() {
            Ok(Some(frame)) => self.last_frame = Some(frame),
            Ok(None) => {}
            Err(e) => warn!("frame grab failed, reusing previous frame: {e}"),
        }

        // Marker sampling runs on its own cadence even while hidden.
        match &self.last_frame {
            Some(frame) => self.gate.sample(frame, now),
            None => self.gate.poll(now),
        }

        if !self.visible {
            return;
        }

        self.tracker.update(self.last_frame.as_ref());

        let aspect = self.composer.viewport().aspect();
        let raw_point = self.emission.emission_point(self.tracker.latest(), aspect);
        let point = match raw_point {
            Some(p) => Some(self.smoother.apply(p)),
            None => {
                self.smoother.reset();
                None
            }
        };

        let emitting =
            self.particles_enabled && (!self.marker_required || self.gate.is_present());
        self.simulator.set_enabled(emitting);
        self.simulator.step(dt, point);

        if !self.composer.should_render() {
            return;
        }
        if self.composer.viewport_mut().take_resized() {
            let (w, h) = self.composer.viewport().pixel_size();
            self.renderer.resize(w, h);
        }

        let anchor = self.anchor_point(aspect);
        let scene = self.composer.compose(
            self.last_frame.as_ref(),
            self.tracker.latest(),
            anchor,
            self.gate.quad(),
            self.simulator.instances().collect(),
        );
        if let Err(e) = self.renderer.render(&scene) {
            warn!("render failed, continuing: {e}");
        }
    }

    /// World-space nose-tip anchor for the current frame
    fn anchor_point(&self, aspect: f32) -> Option<Vec3> {
        let nose_tip = self.tracker.latest()?.nose_tip()?;
        Some(crate::emission::landmark_to_world(
            nose_tip,
            aspect,
            self.emission.params().depth,
            self.emission.params().z_scale,
        ))
    }

    /// Observed container layout changed
    pub fn set_container_size(&mut self, width: u32, height: u32, device_pixel_ratio: f32) {
        self.composer
            .viewport_mut()
            .set_container_size(width, height, device_pixel_ratio);
    }

    /// Page visibility changed; hiding pauses rendering and throttles the
    /// marker sampler
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.composer.set_visible(visible);
        self.gate.set_hidden(!visible);
    }

    /// Toggle particle emission
    pub fn set_particles_enabled(&mut self, enabled: bool) {
        self.particles_enabled = enabled;
    }

    /// Toggle the marker requirement for particle emission
    pub fn set_marker_required(&mut self, required: bool) {
        self.marker_required = required;
    }

    /// Toggle the debug mesh overlay
    pub fn set_show_mesh(&mut self, show: bool) {
        self.composer.set_show_mesh(show);
    }

    /// Adjust the camera field of view
    pub fn set_fov(&mut self, fov_degrees: f32) {
        self.composer.set_fov(fov_degrees);
    }

    /// Adjust the spawn anchor depth
    pub fn set_spawn_depth(&mut self, depth: f32) {
        self.emission.set_depth(depth);
    }

    /// Debounced marker state snapshot
    #[must_use]
    pub fn marker_state(&self) -> MarkerState {
        self.gate.state()
    }

    /// Whether the latest inference found a face
    #[must_use]
    pub fn face_detected(&self) -> bool {
        self.tracker.face_detected()
    }

    /// Number of currently active particles
    #[must_use]
    pub fn active_particles(&self) -> usize {
        self.simulator.active_count()
    }

    /// Ticks driven so far
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Apply the disable policy configured for the simulator
    #[must_use]
    pub fn disable_policy(&self) -> DisablePolicy {
        self.simulator.params().disable_policy
    }

    /// Compose the current camera frame into a PNG photo sized to the
    /// container, using cover-fit scaling (centered, cropping the overflow).
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let frame = self
            .last_frame
            .as_ref()
            .ok_or_else(|| Error::InvalidInput("no frame captured yet".to_string()))?;
        let (dst_w, dst_h) = self.composer.viewport().pixel_size();
        if dst_w == 0 || dst_h == 0 {
            return Err(Error::InvalidInput(
                "container has no layout to size the photo".to_string(),
            ));
        }

        let src = image::RgbaImage::from_raw(frame.width, frame.height, frame.pixels.clone())
            .ok_or_else(|| Error::InvalidInput("frame buffer mismatch".to_string()))?;
        let (x, y, dw, dh) = cover_fit(frame.width, frame.height, dst_w, dst_h);
        let scaled = image::imageops::resize(
            &src,
            dw.round().max(1.0) as u32,
            dh.round().max(1.0) as u32,
            image::imageops::FilterType::Triangle,
        );
        let mut dst = image::RgbaImage::new(dst_w, dst_h);
        image::imageops::overlay(&mut dst, &scaled, x.round() as i64, y.round() as i64);

        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(dst).write_to(&mut png, image::ImageFormat::Png)?;
        Ok(png.into_inner())
    }

    /// Tear the pipeline down: stop capture, drop tracking state, terminate
    /// the decode worker. Idempotent; also invoked on drop.
    pub fn shutdown(&mut self) {
        if self.state == SessionState::ShutDown {
            return;
        }
        info!("shutting down session after {} ticks", self.ticks);
        self.frame_source.stop();
        self.tracker.reset();
        self.gate.terminate_worker();
        self.state = SessionState::ShutDown;
    }
}

impl Drop for OverlaySession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
