//! Helper implementations of the external-seam traits for tests

use ar_overlay_pipeline::capture::{CaptureProfile, Frame, FrameSource};
use ar_overlay_pipeline::landmark_tracking::{Landmark, LandmarkDetector, LandmarkSet};
use ar_overlay_pipeline::marker_gate::{MarkerDecoder, MarkerDetection, Quad};
use ar_overlay_pipeline::scene_composer::{ComposedScene, SceneRenderer};
use ar_overlay_pipeline::Result;
use glam::Vec2;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Create a uniformly gray RGBA test frame
pub fn test_frame(width: u32, height: u32) -> Frame {
    let mut pixels = vec![128u8; (width * height * 4) as usize];
    for px in pixels.chunks_exact_mut(4) {
        px[3] = 255;
    }
    Frame::new(pixels, width, height).expect("valid test frame")
}

/// Build a landmark set with the given nose tip and head references placed
/// a fixed distance above it
pub fn face_at(nose_x: f32, nose_y: f32) -> LandmarkSet {
    let nose = Landmark::new(nose_x, nose_y, -0.02);
    let mut points = vec![nose; 468];
    points[ar_overlay_pipeline::constants::FOREHEAD_INDEX] =
        Landmark::new(nose_x, nose_y - 0.18, nose.z);
    points[ar_overlay_pipeline::constants::HEAD_TOP_INDEX] =
        Landmark::new(nose_x, nose_y - 0.26, nose.z);
    LandmarkSet::new(points)
}

/// A marker detection with a small square quad
pub fn test_detection(payload: &str) -> MarkerDetection {
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

/// Frame source producing gray frames; records stop calls and can be made
/// to fail acquisition
pub struct MockCamera {
    pub fail_start: bool,
    started: bool,
    stopped: Arc<AtomicBool>,
}

impl MockCamera {
    pub fn new() -> (Self, Arc<AtomicBool>) {
        let stopped = Arc::new(AtomicBool::new(false));
        (
            Self {
                fail_start: false,
                started: false,
                stopped: stopped.clone(),
            },
            stopped,
        )
    }

    pub fn failing() -> (Self, Arc<AtomicBool>) {
        let (mut camera, stopped) = Self::new();
        camera.fail_start = true;
        (camera, stopped)
    }
}

impl FrameSource for MockCamera {
    fn start(&mut self, _profile: CaptureProfile) -> Result<()> {
        if self.fail_start {
            return Err(ar_overlay_pipeline::Error::Capture(
                "permission denied".to_string(),
            ));
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn grab(&mut self) -> Result<Option<Frame>> {
        if !self.started {
            return Ok(None);
        }
        Ok(Some(test_frame(64, 48)))
    }
}

/// Detector that always finds a centered face, completing immediately
pub struct SteadyFaceDetector {
    result: Option<Option<LandmarkSet>>,
}

impl SteadyFaceDetector {
    pub fn new() -> Self {
        Self { result: None }
    }
}

impl LandmarkDetector for SteadyFaceDetector {
    fn submit(&mut self, _frame: &Frame) -> Result<()> {
        self.result = Some(Some(face_at(0.5, 0.45)));
        Ok(())
    }

    fn poll(&mut self) -> Option<Option<LandmarkSet>> {
        self.result.take()
    }
}

/// Detector that never finds a face
pub struct NoFaceDetector {
    result: Option<Option<LandmarkSet>>,
}

impl NoFaceDetector {
    pub fn new() -> Self {
        Self { result: None }
    }
}

impl LandmarkDetector for NoFaceDetector {
    fn submit(&mut self, _frame: &Frame) -> Result<()> {
        self.result = Some(None);
        Ok(())
    }

    fn poll(&mut self) -> Option<Option<LandmarkSet>> {
        self.result.take()
    }
}

/// Decoder that always finds the same marker
pub struct AlwaysDecoder {
    pub payload: String,
}

impl MarkerDecoder for AlwaysDecoder {
    fn decode(&self, _pixels: &[u8], _width: u32, _height: u32) -> Option<MarkerDetection> {
        Some(test_detection(&self.payload))
    }
}

/// Decoder that never finds a marker
pub struct NeverDecoder;

impl MarkerDecoder for NeverDecoder {
    fn decode(&self, _pixels: &[u8], _width: u32, _height: u32) -> Option<MarkerDetection> {
        None
    }
}

/// Renderer that records frame and resize counts
pub struct CountingRenderer {
    pub frames: Arc<AtomicUsize>,
    pub resizes: Arc<AtomicUsize>,
}

impl CountingRenderer {
    pub fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let frames = Arc::new(AtomicUsize::new(0));
        let resizes = Arc::new(AtomicUsize::new(0));
        (
            Self {
                frames: frames.clone(),
                resizes: resizes.clone(),
            },
            frames,
            resizes,
        )
    }
}

impl SceneRenderer for CountingRenderer {
    fn resize(&mut self, _width: u32, _height: u32) {
        self.resizes.fetch_add(1, Ordering::SeqCst);
    }

    fn render(&mut self, _scene: &ComposedScene<'_>) -> Result<()> {
        self.frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
