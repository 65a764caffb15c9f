//! Emission point calculation.
//!
//! Maps normalized face landmarks into camera-centered world space and
//! derives the spawn anchor for the particle stream. The camera sits at the
//! origin looking down -Z; x is flipped so positions match the mirrored
//! selfie view.

use crate::constants::{
    EMIT_DEPTH_OFFSET, HEAD_OFFSET_Y, LANDMARK_WORLD_SCALE, SPAWN_CEILING_BASE,
    SPAWN_CEILING_DROP, TILT_RANGE,
};
use crate::landmark_tracking::{Landmark, LandmarkSet};
use glam::Vec3;

/// Map a normalized landmark to a world-space position.
///
/// `depth` is the distance in front of the camera (positive = further away,
/// so `z = -depth`); `z_scale` multiplies the landmark's relative depth.
#[must_use]
pub fn landmark_to_world(landmark: Landmark, aspect: f32, depth: f32, z_scale: f32) -> Vec3 {
    Vec3::new(
        (0.5 - landmark.x) * 2.0 * LANDMARK_WORLD_SCALE * aspect,
        (0.5 - landmark.y) * 2.0 * LANDMARK_WORLD_SCALE,
        -depth + landmark.z * z_scale,
    )
}

/// Tilt-up factor in `[0, 1]` derived from the vertical displacement between
/// the nose tip and the forehead.
///
/// Zero while the forehead sits at or above the nose tip in the image
/// (head level or tilted down); approaches one as the head tilts back and
/// the forehead drops toward, then past, the nose line.
#[must_use]
pub fn tilt_up_factor(nose_tip: Landmark, forehead: Landmark) -> f32 {
    ((forehead.y - nose_tip.y) / TILT_RANGE).clamp(0.0, 1.0)
}

/// Emission point calculator parameters
#[derive(Debug, Clone)]
pub struct EmissionParams {
    /// Distance of the spawn anchor in front of the camera
    pub depth: f32,
    /// Multiplier for the landmark's relative depth
    pub z_scale: f32,
    /// World-space upward offset applied to the spawn anchor
    pub rise: f32,
}

impl Default for EmissionParams {
    fn default() -> Self {
        Self {
            depth: crate::constants::DEFAULT_SPAWN_DEPTH,
            z_scale: crate::constants::DEFAULT_Z_SCALE,
            rise: 0.0,
        }
    }
}

/// Derives the particle spawn anchor from the latest landmarks.
pub struct EmissionCalculator {
    params: EmissionParams,
}

impl EmissionCalculator {
    /// Create a calculator with the given parameters
    #[must_use]
    pub fn new(params: EmissionParams) -> Self {
        Self { params }
    }

    /// Current parameters
    #[must_use]
    pub fn params(&self) -> &EmissionParams {
        &self.params
    }

    /// Replace the runtime-adjustable parameters
    pub fn set_params(&mut self, params: EmissionParams) {
        self.params = params;
    }

    /// Adjust only the spawn depth
    pub fn set_depth(&mut self, depth: f32) {
        self.params.depth = depth;
    }

    /// Compute the emission point for this frame, or `None` when no
    /// landmarks are available (emission is then suppressed while in-flight
    /// particles keep simulating).
    #[must_use]
    pub fn emission_point(&self, landmarks: Option<&LandmarkSet>, aspect: f32) -> Option<Vec3> {
        let set = landmarks?;
        let nose_tip = set.nose_tip()?;

        // Spawn anchor: average the two head-top references when both are
        // tracked, otherwise fall back to the nose tip raised by a fixed
        // fraction (landmark y is smaller above).
        let anchor = match (set.forehead(), set.head_top()) {
            (Some(a), Some(b)) => Landmark::new(
                (a.x + b.x) / 2.0,
                (a.y + b.y) / 2.0,
                (a.z + b.z) / 2.0,
            ),
            _ => Landmark::new(nose_tip.x, nose_tip.y - HEAD_OFFSET_Y, nose_tip.z),
        };

        let depth = self.params.depth + EMIT_DEPTH_OFFSET;
        let mut point = landmark_to_world(anchor, aspect, depth, self.params.z_scale);
        point.y += self.params.rise;

        // Lower the ceiling as the head tilts back so the spawn point can't
        // drift off-screen.
        if let Some(forehead) = set.forehead() {
            let tilt = tilt_up_factor(nose_tip, forehead);
            let ceiling = SPAWN_CEILING_BASE - tilt * SPAWN_CEILING_DROP;
            point.y = point.y.min(ceiling);
        }

        Some(point)
    }
}
