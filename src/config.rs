//! Configuration management for the AR overlay pipeline

use crate::particle_system::DisablePolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera capture configuration
    pub capture: CaptureConfig,

    /// Marker gate configuration
    pub marker: MarkerConfig,

    /// Emission point configuration
    pub emission: EmissionConfig,

    /// Particle simulator configuration
    pub particles: ParticlesConfig,

    /// Scene composition configuration
    pub scene: SceneConfig,
}

/// Camera capture parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Use the full-resolution profile (maximizes marker detection range)
    pub full_resolution: bool,
}

/// Marker gate parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Require a visible marker to enable particle emission
    pub required: bool,

    /// Sampling interval in milliseconds while visible
    pub interval_ms: u64,

    /// Sampling interval in milliseconds while hidden
    pub hidden_interval_ms: u64,

    /// Grace period in milliseconds before a lost marker reads as absent
    pub grace_ms: u64,

    /// Only this payload counts as presence, when set
    pub expected_payload: Option<String>,

    /// Offload decoding to a background worker
    pub use_worker: bool,
}

/// Emission point parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmissionConfig {
    /// Distance of the spawn anchor in front of the camera
    pub depth: f32,

    /// Multiplier for a landmark's relative depth
    pub z_scale: f32,

    /// World-space upward offset applied to the spawn anchor
    pub rise: f32,

    /// Anchor smoothing filter ("none", "exponential", "exponential:<alpha>")
    pub smoothing: String,
}

/// Device tier for the particle pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTier {
    /// Full pool capacity
    Standard,
    /// Reduced pool capacity for constrained devices
    Constrained,
}

impl DeviceTier {
    /// Default pool capacity for this tier
    #[must_use]
    pub fn default_capacity(self) -> usize {
        match self {
            Self::Standard => crate::constants::DEFAULT_PARTICLE_COUNT,
            Self::Constrained => crate::constants::CONSTRAINED_PARTICLE_COUNT,
        }
    }
}

/// Particle simulator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticlesConfig {
    /// Show particles at all
    pub enabled: bool,

    /// Device tier selecting the default pool capacity
    pub device_tier: DeviceTier,

    /// Explicit pool capacity override; zero means "use the tier default"
    pub capacity: usize,

    /// Particles emitted per second
    pub emit_rate: f32,

    /// Constant downward acceleration
    pub gravity: f32,

    /// World-space Y below which particles recycle
    pub recycle_y: f32,

    /// Positional jitter around the emission point
    pub emit_spread: f32,

    /// Horizontal velocity jitter range
    pub vx_spread: f32,

    /// Upward velocity scale
    pub vy_spread: f32,

    /// What happens to in-flight particles when emission is disabled
    pub disable_policy: DisablePolicy,

    /// Bounding radii of the model variants; empty means plain spheres
    pub variant_radii: Vec<f32>,
}

/// Scene composition parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Camera field of view in degrees
    pub fov_degrees: f32,

    /// Show the debug face-mesh overlay
    pub show_mesh: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            marker: MarkerConfig::default(),
            emission: EmissionConfig::default(),
            particles: ParticlesConfig::default(),
            scene: SceneConfig::default(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { full_resolution: true }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            required: true,
            interval_ms: crate::constants::MARKER_INTERVAL_MS,
            hidden_interval_ms: crate::constants::MARKER_INTERVAL_HIDDEN_MS,
            grace_ms: crate::constants::MARKER_GRACE_MS,
            expected_payload: None,
            use_worker: true,
        }
    }
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            depth: crate::constants::DEFAULT_SPAWN_DEPTH,
            z_scale: crate::constants::DEFAULT_Z_SCALE,
            rise: 0.0,
            smoothing: "none".to_string(),
        }
    }
}

impl Default for ParticlesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device_tier: DeviceTier::Standard,
            capacity: 0,
            emit_rate: crate::constants::DEFAULT_EMIT_RATE,
            gravity: crate::constants::GRAVITY,
            recycle_y: crate::constants::RECYCLE_Y,
            emit_spread: crate::constants::EMIT_SPREAD,
            vx_spread: crate::constants::INIT_VX_SPREAD,
            vy_spread: crate::constants::INIT_VY_SPREAD,
            disable_policy: DisablePolicy::Clear,
            variant_radii: Vec::new(),
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            fov_degrees: crate::constants::DEFAULT_FOV_DEGREES,
            show_mesh: true,
        }
    }
}

impl ParticlesConfig {
    /// Effective pool capacity: explicit override or the tier default
    #[must_use]
    pub fn effective_capacity(&self) -> usize {
        if self.capacity > 0 {
            self.capacity
        } else {
            self.device_tier.default_capacity()
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.marker.interval_ms == 0 {
            return Err(Error::Config(
                "Marker sampling interval must be greater than 0".to_string(),
            ));
        }
        if self.marker.hidden_interval_ms < self.marker.interval_ms {
            return Err(Error::Config(
                "Hidden sampling interval must not be shorter than the visible one".to_string(),
            ));
        }
        if self.particles.emit_rate <= 0.0 {
            return Err(Error::Config("Emit rate must be greater than 0".to_string()));
        }
        if self.particles.effective_capacity() == 0 {
            return Err(Error::Config(
                "Particle pool capacity must be greater than 0".to_string(),
            ));
        }
        if self.particles.gravity >= 0.0 {
            return Err(Error::Config("Gravity must be negative".to_string()));
        }
        if !(crate::constants::FOV_MIN..=crate::constants::FOV_MAX)
            .contains(&self.scene.fov_degrees)
        {
            return Err(Error::Config(format!(
                "Field of view must be between {} and {} degrees",
                crate::constants::FOV_MIN,
                crate::constants::FOV_MAX
            )));
        }
        if !(crate::constants::DEPTH_MIN..=crate::constants::DEPTH_MAX)
            .contains(&self.emission.depth)
        {
            return Err(Error::Config(format!(
                "Spawn depth must be between {} and {}",
                crate::constants::DEPTH_MIN,
                crate::constants::DEPTH_MAX
            )));
        }
        if self.emission.z_scale < 0.0 {
            return Err(Error::Config("Z scale must not be negative".to_string()));
        }
        for &radius in &self.particles.variant_radii {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(Error::Config(format!(
                    "Variant bounding radius must be positive and finite, got {radius}"
                )));
            }
        }
        // Smoothing names are validated by the factory
        crate::smoothing::create_smoother(&self.emission.smoothing)?;
        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# AR Overlay Pipeline Configuration

# Camera capture
capture:
  full_resolution: true

# Marker gate
marker:
  required: true
  interval_ms: 66
  hidden_interval_ms: 2000
  grace_ms: 4000
  expected_payload: null
  use_worker: true

# Emission point
emission:
  depth: 0.95
  z_scale: 0.3
  rise: 0.0
  smoothing: "none"

# Particle simulator
particles:
  enabled: true
  device_tier: standard
  capacity: 0
  emit_rate: 30.0
  gravity: -1.8
  recycle_y: -3.0
  emit_spread: 0.08
  vx_spread: 1.0
  vy_spread: 1.0
  disable_policy: clear
  variant_radii: []

# Scene composition
scene:
  fov_degrees: 90.0
  show_mesh: true
"#;
