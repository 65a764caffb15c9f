//! Smoothing filters for the emission anchor.
//!
//! Landmark inference jitters from frame to frame; an optional filter damps
//! the emission point so the particle stream doesn't wander with the noise.

use crate::Result;
use glam::Vec3;

/// Trait for emission-point filters
pub trait PointFilter: Send {
    /// Apply the filter to an input point
    fn apply(&mut self, point: Vec3) -> Vec3;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// No-op filter that passes points through unchanged
pub struct NoSmoothing;

impl PointFilter for NoSmoothing {
    fn apply(&mut self, point: Vec3) -> Vec3 {
        point
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "NoSmoothing"
    }
}

/// Exponential smoothing filter applied per axis
pub struct ExponentialSmoother {
    alpha: f32,
    last: Option<Vec3>,
}

impl ExponentialSmoother {
    /// Create a smoother; `alpha` must be in `(0, 1]`
    pub fn new(alpha: f32) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(crate::Error::Config(format!(
                "smoothing alpha must be in (0, 1], got {alpha}"
            )));
        }
        Ok(Self { alpha, last: None })
    }
}

impl PointFilter for ExponentialSmoother {
    fn apply(&mut self, point: Vec3) -> Vec3 {
        let filtered = match self.last {
            Some(last) => point * self.alpha + last * (1.0 - self.alpha),
            None => point,
        };
        self.last = Some(filtered);
        filtered
    }

    fn reset(&mut self) {
        self.last = None;
    }

    fn name(&self) -> &str {
        "ExponentialSmoother"
    }
}

/// Create a point filter by type name
pub fn create_smoother(filter_type: &str) -> Result<Box<dyn PointFilter>> {
    match filter_type.to_lowercase().as_str() {
        "none" | "nosmoothing" => Ok(Box::new(NoSmoothing)),
        "exponential" => Ok(Box::new(ExponentialSmoother::new(0.5)?)),
        other => {
            if let Some(arg) = other.strip_prefix("exponential:") {
                let alpha: f32 = arg.parse().map_err(|_| {
                    crate::Error::Config(format!("invalid smoothing alpha: {arg}"))
                })?;
                Ok(Box::new(ExponentialSmoother::new(alpha)?))
            } else {
                Err(crate::Error::Config(format!(
                    "unknown smoother type: {filter_type}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_smoothing_passthrough() {
        let mut filter = NoSmoothing;
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(filter.apply(p), p);
    }

    #[test]
    fn test_exponential_first_value_passes_through() {
        let mut filter = ExponentialSmoother::new(0.5).unwrap();
        let p = Vec3::new(10.0, 20.0, 30.0);
        assert_eq!(filter.apply(p), p);

        // Second value is smoothed halfway
        let q = filter.apply(Vec3::new(20.0, 30.0, 40.0));
        assert_eq!(q, Vec3::new(15.0, 25.0, 35.0));
    }

    #[test]
    fn test_exponential_reset() {
        let mut filter = ExponentialSmoother::new(0.5).unwrap();
        filter.apply(Vec3::ZERO);
        filter.reset();
        let p = Vec3::new(8.0, 8.0, 8.0);
        assert_eq!(filter.apply(p), p);
    }

    #[test]
    fn test_create_smoother() {
        assert!(create_smoother("none").is_ok());
        assert!(create_smoother("exponential").is_ok());
        assert!(create_smoother("exponential:0.2").is_ok());
        assert!(create_smoother("exponential:2.0").is_err());
        assert!(create_smoother("kalman").is_err());
    }
}
