//! Constants used throughout the pipeline

/// Fixed scale applied when mapping normalized landmarks into world space
pub const LANDMARK_WORLD_SCALE: f32 = 1.2;

/// Default particle pool capacity (standard device tier)
pub const DEFAULT_PARTICLE_COUNT: usize = 80;

/// Particle pool capacity on constrained devices
pub const CONSTRAINED_PARTICLE_COUNT: usize = 40;

/// Base render scale of a particle before variant normalization
pub const PARTICLE_RADIUS: f32 = 0.05;

/// Constant downward acceleration applied to active particles
pub const GRAVITY: f32 = -1.8;

/// World-space Y below which a particle is recycled
pub const RECYCLE_Y: f32 = -3.0;

/// Positional jitter applied around the emission point
pub const EMIT_SPREAD: f32 = 0.08;

/// Horizontal velocity jitter range for newly emitted particles
pub const INIT_VX_SPREAD: f32 = 1.0;

/// Upward velocity scale for newly emitted particles
pub const INIT_VY_SPREAD: f32 = 1.0;

/// Angular velocity range (radians per second, per axis) for tumbling
pub const INIT_ANGULAR_SPREAD: f32 = 3.0;

/// Default emission rate in particles per second
pub const DEFAULT_EMIT_RATE: f32 = 30.0;

/// Maximum simulation step; longer frame gaps are clamped to this
pub const MAX_STEP_SECS: f32 = 0.1;

/// Z position used to park inactive particles far behind the camera
pub const PARK_Z: f32 = -100.0;

/// Normalized upward offset from the nose tip when head-top landmarks are
/// unavailable (landmark y is smaller above)
pub const HEAD_OFFSET_Y: f32 = 0.38;

/// Added to the configured depth so emission happens deeper into the scene
pub const EMIT_DEPTH_OFFSET: f32 = 0.25;

/// Normalized vertical displacement that maps to a full tilt-up factor
pub const TILT_RANGE: f32 = 0.15;

/// Spawn ceiling in world space with the head level
pub const SPAWN_CEILING_BASE: f32 = 2.2;

/// How far the ceiling drops at full tilt-up
pub const SPAWN_CEILING_DROP: f32 = 1.0;

/// Marker sampling interval while visible (>= 15 Hz)
pub const MARKER_INTERVAL_MS: u64 = 66;

/// Marker sampling interval while the page is hidden
pub const MARKER_INTERVAL_HIDDEN_MS: u64 = 2000;

/// Grace period before a lost marker is reported as absent
pub const MARKER_GRACE_MS: u64 = 4000;

/// Default camera field of view in degrees
pub const DEFAULT_FOV_DEGREES: f32 = 90.0;

/// Field of view bounds (degrees)
pub const FOV_MIN: f32 = 40.0;
pub const FOV_MAX: f32 = 180.0;

/// Default spawn anchor depth in front of the camera
pub const DEFAULT_SPAWN_DEPTH: f32 = 0.95;

/// Spawn depth bounds
pub const DEPTH_MIN: f32 = 0.3;
pub const DEPTH_MAX: f32 = 2.5;

/// Multiplier applied to a landmark's relative depth
pub const DEFAULT_Z_SCALE: f32 = 0.3;

/// Near and far clip planes of the overlay camera
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 10.0;

/// Aspect ratio assumed before the first container layout
pub const DEFAULT_ASPECT: f32 = 16.0 / 9.0;

/// Face-mesh landmark indices used by the emission calculator
pub const NOSE_TIP_INDEX: usize = 1;
pub const FOREHEAD_INDEX: usize = 10;
pub const HEAD_TOP_INDEX: usize = 151;
