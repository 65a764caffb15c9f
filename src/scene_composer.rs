//! Scene composition and render-loop wiring.
//!
//! Assembles the camera background, optional debug mesh overlay, and the
//! particle simulation into one composed frame sized to the observed
//! container. The actual rasterization is a black box behind
//! [`SceneRenderer`]; this module owns sizing, projection parameters and
//! visibility gating.

use crate::capture::Frame;
use crate::constants::{CAMERA_FAR, CAMERA_NEAR, DEFAULT_ASPECT};
use crate::landmark_tracking::LandmarkSet;
use crate::marker_gate::Quad;
use crate::particle_system::ParticleInstance;
use crate::Result;
use glam::{Mat4, Vec3};

/// Observed container size and device pixel ratio.
///
/// Tracks resizes so the renderer and projection can be kept in sync with
/// the page layout.
#[derive(Debug, Clone)]
pub struct Viewport {
    width: u32,
    height: u32,
    device_pixel_ratio: f32,
    resized: bool,
}

impl Viewport {
    /// A viewport with no layout information yet
    #[must_use]
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            device_pixel_ratio: 1.0,
            resized: false,
        }
    }

    /// Update from a container layout; flags a resize when anything changed
    pub fn set_container_size(&mut self, width: u32, height: u32, device_pixel_ratio: f32) {
        if width != self.width
            || height != self.height
            || (device_pixel_ratio - self.device_pixel_ratio).abs() > f32::EPSILON
        {
            self.width = width;
            self.height = height;
            self.device_pixel_ratio = device_pixel_ratio;
            self.resized = true;
        }
    }

    /// Physical pixel dimensions (container size times DPR)
    #[must_use]
    pub fn pixel_size(&self) -> (u32, u32) {
        let w = (self.width as f32 * self.device_pixel_ratio).round() as u32;
        let h = (self.height as f32 * self.device_pixel_ratio).round() as u32;
        (w, h)
    }

    /// Aspect ratio; a default before the first layout
    #[must_use]
    pub fn aspect(&self) -> f32 {
        if self.width == 0 || self.height == 0 {
            DEFAULT_ASPECT
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Whether the container has been laid out at all
    #[must_use]
    pub fn has_layout(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Consume the pending resize flag
    pub fn take_resized(&mut self) -> bool {
        std::mem::take(&mut self.resized)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

/// Perspective camera for the overlay scene.
///
/// Positioned at the origin looking down -Z; only FOV and aspect vary at
/// runtime and are re-synced whenever their external configuration changes.
#[derive(Debug, Clone)]
pub struct OverlayCamera {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Aspect ratio of the observed container
    pub aspect: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl OverlayCamera {
    /// Create a camera with the default clip planes
    #[must_use]
    pub fn new(fov_degrees: f32, aspect: f32) -> Self {
        Self {
            fov_degrees,
            aspect,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
        }
    }

    /// Clip-space projection matrix
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }
}

/// Everything the renderer needs for one frame.
pub struct ComposedScene<'a> {
    /// Camera background frame, when one has been captured
    pub background: Option<&'a Frame>,
    /// Landmarks for the debug mesh overlay, when enabled and tracked
    pub mesh_overlay: Option<&'a LandmarkSet>,
    /// Anchor marker at the nose tip, when tracked
    pub anchor: Option<Vec3>,
    /// Outline of the detected marker, for visual feedback
    pub marker_quad: Option<Quad>,
    /// Per-slot particle instances (scale zero when inactive)
    pub particles: Vec<ParticleInstance>,
    /// Camera parameters for this frame
    pub camera: OverlayCamera,
}

/// Black-box renderer consuming composed scenes.
pub trait SceneRenderer: Send {
    /// The observed container changed size (physical pixels)
    fn resize(&mut self, width: u32, height: u32);

    /// Rasterize one composed frame
    fn render(&mut self, scene: &ComposedScene<'_>) -> Result<()>;
}

/// Owns the viewport, camera and visibility state, and assembles frames.
pub struct SceneComposer {
    viewport: Viewport,
    fov_degrees: f32,
    show_mesh: bool,
    visible: bool,
}

impl SceneComposer {
    /// Create a composer
    #[must_use]
    pub fn new(fov_degrees: f32, show_mesh: bool) -> Self {
        Self {
            viewport: Viewport::new(),
            fov_degrees,
            show_mesh,
            visible: true,
        }
    }

    /// Mutable access to the tracked viewport
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// The tracked viewport
    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Re-sync the field of view from external configuration
    pub fn set_fov(&mut self, fov_degrees: f32) {
        self.fov_degrees = fov_degrees;
    }

    /// Current field of view in degrees
    #[must_use]
    pub fn fov(&self) -> f32 {
        self.fov_degrees
    }

    /// Toggle the debug mesh overlay
    pub fn set_show_mesh(&mut self, show: bool) {
        self.show_mesh = show;
    }

    /// Pause or resume rendering with page visibility
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Whether the render loop should run at all
    #[must_use]
    pub fn should_render(&self) -> bool {
        self.visible && self.viewport.has_layout()
    }

    /// Assemble one frame.
    ///
    /// The camera picks up the latest FOV and the viewport's current aspect,
    /// so external configuration changes land in the very next frame.
    #[must_use]
    pub fn compose<'a>(
        &self,
        background: Option<&'a Frame>,
        landmarks: Option<&'a LandmarkSet>,
        anchor: Option<Vec3>,
        marker_quad: Option<Quad>,
        particles: Vec<ParticleInstance>,
    ) -> ComposedScene<'a> {
        ComposedScene {
            background,
            mesh_overlay: if self.show_mesh { landmarks } else { None },
            anchor,
            marker_quad,
            particles,
            camera: OverlayCamera::new(self.fov_degrees, self.viewport.aspect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark_tracking::Landmark;

    #[test]
    fn test_viewport_resize_flag() {
        let mut vp = Viewport::new();
        assert!(!vp.take_resized());

        vp.set_container_size(800, 600, 2.0);
        assert!(vp.take_resized());
        assert!(!vp.take_resized());

        // Same size again: no resize
        vp.set_container_size(800, 600, 2.0);
        assert!(!vp.take_resized());

        // DPR change alone counts
        vp.set_container_size(800, 600, 1.0);
        assert!(vp.take_resized());
    }

    #[test]
    fn test_viewport_pixel_size_applies_dpr() {
        let mut vp = Viewport::new();
        vp.set_container_size(800, 600, 2.0);
        assert_eq!(vp.pixel_size(), (1600, 1200));
    }

    #[test]
    fn test_viewport_default_aspect_before_layout() {
        let vp = Viewport::new();
        assert!((vp.aspect() - DEFAULT_ASPECT).abs() < 1e-6);
        assert!(!vp.has_layout());
    }

    #[test]
    fn test_camera_projection_is_finite() {
        let camera = OverlayCamera::new(90.0, 16.0 / 9.0);
        let m = camera.projection_matrix();
        assert!(m.to_cols_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_should_render_requires_visibility_and_layout() {
        let mut composer = SceneComposer::new(90.0, true);
        assert!(!composer.should_render()); // no layout yet

        composer.viewport_mut().set_container_size(640, 480, 1.0);
        assert!(composer.should_render());

        composer.set_visible(false);
        assert!(!composer.should_render());
    }

    #[test]
    fn test_mesh_overlay_respects_toggle() {
        let mut composer = SceneComposer::new(90.0, true);
        composer.viewport_mut().set_container_size(640, 480, 1.0);
        let landmarks = LandmarkSet::new(vec![Landmark::new(0.5, 0.5, 0.0); 4]);

        let scene = composer.compose(None, Some(&landmarks), None, None, Vec::new());
        assert!(scene.mesh_overlay.is_some());

        composer.set_show_mesh(false);
        let scene = composer.compose(None, Some(&landmarks), None, None, Vec::new());
        assert!(scene.mesh_overlay.is_none());
    }

    #[test]
    fn test_fov_resync_lands_in_next_frame() {
        let mut composer = SceneComposer::new(65.0, false);
        composer.viewport_mut().set_container_size(100, 100, 1.0);
        composer.set_fov(120.0);
        let scene = composer.compose(None, None, None, None, Vec::new());
        assert!((scene.camera.fov_degrees - 120.0).abs() < 1e-6);
        assert!((scene.camera.aspect - 1.0).abs() < 1e-6);
    }
}
