//! Camera capture seam.
//!
//! The pipeline never talks to camera hardware directly; a [`FrameSource`]
//! implementation (platform capture, video file, synthetic generator) is
//! injected into the session. Acquisition failure is fatal to the pipeline
//! and surfaces as [`crate::Error::Capture`]; everything downstream treats
//! missing frames as a recoverable per-tick condition.

use crate::Result;

/// One captured RGBA frame.
///
/// Pixels are tightly packed RGBA8, row-major, `width * height * 4` bytes.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw RGBA pixel data
    pub pixels: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl Frame {
    /// Create a frame, validating that the buffer matches the dimensions
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(crate::Error::InvalidInput(format!(
                "frame buffer is {} bytes, expected {expected} for {width}x{height}",
                pixels.len()
            )));
        }
        Ok(Self { pixels, width, height })
    }

    /// Aspect ratio of the frame, or `None` for a degenerate size
    #[must_use]
    pub fn aspect(&self) -> Option<f32> {
        if self.height == 0 {
            return None;
        }
        Some(self.width as f32 / self.height as f32)
    }
}

/// Capture resolution profile.
///
/// `FullResolution` requests the largest frames the device supports so small
/// or distant markers stay decodable; `Energy` caps resolution and frame
/// rate for lower power draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureProfile {
    /// Maximum supported resolution (ideal 1920x1080, up to 4096x2160)
    FullResolution,
    /// 720p with a 24-30 fps cap
    Energy,
}

impl CaptureProfile {
    /// Ideal capture size for this profile
    #[must_use]
    pub fn ideal_size(self) -> (u32, u32) {
        match self {
            Self::FullResolution => (1920, 1080),
            Self::Energy => (1280, 720),
        }
    }

    /// Hard upper bound on capture size, when the profile has one
    #[must_use]
    pub fn max_size(self) -> Option<(u32, u32)> {
        match self {
            Self::FullResolution => Some((4096, 2160)),
            Self::Energy => None,
        }
    }

    /// Frame-rate cap, when the profile has one
    #[must_use]
    pub fn fps_cap(self) -> Option<u32> {
        match self {
            Self::FullResolution => None,
            Self::Energy => Some(30),
        }
    }
}

/// Source of camera frames.
///
/// Implementations own the capture stream. `stop` must synchronously release
/// the underlying hardware; the session calls it on every teardown path.
pub trait FrameSource: Send {
    /// Acquire the capture stream. Fatal on failure.
    fn start(&mut self, profile: CaptureProfile) -> Result<()>;

    /// Synchronously release the capture stream and its hardware handles.
    fn stop(&mut self);

    /// Grab the most recent frame, or `None` when no new frame is ready.
    /// Must never block the caller on device I/O.
    fn grab(&mut self) -> Result<Option<Frame>>;
}
