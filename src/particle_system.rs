//! Fixed-pool particle simulation.
//!
//! Particles are allocated once into a fixed-capacity pool and recycled
//! forever by round-robin slot reuse; "destroyed" only means deactivated and
//! parked off-screen. The pool is owned and mutated exclusively by the
//! simulator; the composer reads per-slot instances.

use crate::constants::{
    EMIT_SPREAD, GRAVITY, INIT_ANGULAR_SPREAD, INIT_VX_SPREAD, INIT_VY_SPREAD, MAX_STEP_SECS,
    PARK_Z, PARTICLE_RADIUS, RECYCLE_Y,
};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One pooled particle slot.
#[derive(Debug, Clone)]
pub struct Particle {
    /// World-space position
    pub position: Vec3,
    /// World-space velocity
    pub velocity: Vec3,
    /// Angular velocity, radians per second per axis
    pub angular_velocity: Vec3,
    /// Accumulated rotation, radians per axis
    pub rotation: Vec3,
    /// Whether this slot is simulating
    pub active: bool,
    /// Index into the variant catalog for this slot
    pub variant: usize,
}

impl Particle {
    /// An inactive particle parked far off-screen, below the recycle line
    fn parked(variant: usize, recycle_y: f32) -> Self {
        Self {
            position: Vec3::new(0.0, recycle_y - 1.0, PARK_Z),
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            rotation: Vec3::ZERO,
            active: false,
            variant,
        }
    }

    fn park(&mut self, recycle_y: f32) {
        self.active = false;
        self.position = Vec3::new(0.0, recycle_y - 1.0, PARK_Z);
        self.velocity = Vec3::ZERO;
    }
}

/// Per-slot render instance handed to the scene composer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleInstance {
    /// World-space position
    pub position: Vec3,
    /// Rotation, radians per axis
    pub rotation: Vec3,
    /// Uniform scale; zero when the slot is inactive
    pub scale: f32,
    /// Index into the variant catalog
    pub variant: usize,
}

/// Model variants particles can be rendered as.
///
/// Each variant carries a precomputed bounding radius so differently sized
/// source models render at a consistent visual size: the instance scale is
/// the base particle radius divided by the variant's radius.
#[derive(Debug, Clone)]
pub struct VariantCatalog {
    radii: Vec<f32>,
    norms: Vec<f32>,
}

impl VariantCatalog {
    /// Build a catalog from per-variant bounding radii.
    ///
    /// Degenerate (non-positive or non-finite) radii normalize to 1.0 so
    /// broken assets render at base scale.
    #[must_use]
    pub fn new(radii: Vec<f32>) -> Self {
        let norms = radii
            .iter()
            .map(|&r| if r.is_finite() && r > 0.0 { 1.0 / r } else { 1.0 })
            .collect();
        Self { radii, norms }
    }

    /// A single-variant catalog (plain spheres)
    #[must_use]
    pub fn single() -> Self {
        Self::new(vec![1.0])
    }

    /// Number of variants
    #[must_use]
    pub fn len(&self) -> usize {
        self.radii.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.radii.is_empty()
    }

    /// Normalization scale for a variant
    #[must_use]
    pub fn normalize_scale(&self, variant: usize) -> f32 {
        self.norms.get(variant).copied().unwrap_or(1.0)
    }
}

/// Policy for in-flight particles when emission is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisablePolicy {
    /// Deactivate everything immediately
    #[default]
    Clear,
    /// Stop spawning; let active particles fall out and recycle
    Drain,
}

/// Simulator tuning parameters.
#[derive(Debug, Clone)]
pub struct SimulatorParams {
    /// Particles emitted per second while enabled
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
    /// Angular velocity range per axis
    pub angular_spread: f32,
    /// What happens to in-flight particles when emission is disabled
    pub disable_policy: DisablePolicy,
}

impl Default for SimulatorParams {
    fn default() -> Self {
        Self {
            emit_rate: crate::constants::DEFAULT_EMIT_RATE,
            gravity: GRAVITY,
            recycle_y: RECYCLE_Y,
            emit_spread: EMIT_SPREAD,
            vx_spread: INIT_VX_SPREAD,
            vy_spread: INIT_VY_SPREAD,
            angular_spread: INIT_ANGULAR_SPREAD,
            disable_policy: DisablePolicy::Clear,
        }
    }
}

/// Fixed-capacity particle simulator.
pub struct ParticleSimulator {
    pool: Vec<Particle>,
    catalog: VariantCatalog,
    params: SimulatorParams,
    rng: StdRng,
    emit_accum: f32,
    next_slot: usize,
    enabled: bool,
}

impl ParticleSimulator {
    /// Create a simulator with a fixed pool.
    ///
    /// The pool size never changes afterwards. Each slot is assigned a
    /// random variant up front so recycling keeps a stable mix of models.
    #[must_use]
    pub fn new(capacity: usize, catalog: VariantCatalog, params: SimulatorParams, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let variants = catalog.len().max(1);
        let pool = (0..capacity)
            .map(|_| Particle::parked(rng.gen_range(0..variants), params.recycle_y))
            .collect();
        Self {
            pool,
            catalog,
            params,
            rng,
            emit_accum: 0.0,
            next_slot: 0,
            enabled: true,
        }
    }

    /// Pool capacity, fixed for the simulator's lifetime
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.pool.len()
    }

    /// Number of currently active particles
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.pool.iter().filter(|p| p.active).count()
    }

    /// Whether emission is enabled
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current tuning parameters
    #[must_use]
    pub fn params(&self) -> &SimulatorParams {
        &self.params
    }

    /// Replace tuning parameters at runtime
    pub fn set_params(&mut self, params: SimulatorParams) {
        self.params = params;
    }

    /// Enable or disable emission.
    ///
    /// Disabling applies the configured policy: `Clear` deactivates all
    /// in-flight particles immediately; `Drain` lets them fall out and
    /// recycle naturally.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled && !enabled && self.params.disable_policy == DisablePolicy::Clear {
            let recycle_y = self.params.recycle_y;
            for particle in &mut self.pool {
                particle.park(recycle_y);
            }
            self.emit_accum = 0.0;
        }
        self.enabled = enabled;
    }

    /// Advance the simulation by one render tick.
    ///
    /// `dt` is clamped to 100 ms so a long frame gap (tab backgrounded)
    /// cannot destabilize the integration. Emission only happens while
    /// enabled and an emission point exists; a `None` point suppresses new
    /// spawns but in-flight particles keep simulating.
    pub fn step(&mut self, dt: f32, emission_point: Option<Vec3>) {
        let dt = dt.clamp(0.0, MAX_STEP_SECS);

        if self.enabled {
            self.emit(dt, emission_point);
        }

        let recycle_y = self.params.recycle_y;
        for particle in &mut self.pool {
            if !particle.active {
                continue;
            }
            particle.velocity.y += self.params.gravity * dt;
            particle.position += particle.velocity * dt;
            particle.rotation += particle.angular_velocity * dt;
            if particle.position.y < recycle_y {
                particle.park(recycle_y);
            }
        }
    }

    fn emit(&mut self, dt: f32, emission_point: Option<Vec3>) {
        if self.params.emit_rate <= 0.0 {
            return;
        }
        self.emit_accum += dt;
        let interval = 1.0 / self.params.emit_rate;
        while self.emit_accum >= interval {
            self.emit_accum -= interval;
            let Some(point) = emission_point else {
                // The interval is consumed either way so a face reappearing
                // doesn't release a burst of banked particles.
                continue;
            };
            let slot = self.next_slot;
            self.next_slot = (self.next_slot + 1) % self.pool.len().max(1);
            self.activate(slot, point);
        }
    }

    fn activate(&mut self, slot: usize, point: Vec3) {
        let spread = self.params.emit_spread;
        let jitter = Vec3::new(
            (self.rng.gen::<f32>() - 0.5) * spread,
            self.rng.gen::<f32>() * spread * 0.5,
            (self.rng.gen::<f32>() - 0.5) * spread,
        );
        let velocity = Vec3::new(
            (self.rng.gen::<f32>() - 0.5) * self.params.vx_spread,
            (1.0 + self.rng.gen::<f32>()) * self.params.vy_spread,
            0.0,
        );
        let angular = Vec3::new(
            (self.rng.gen::<f32>() - 0.5) * self.params.angular_spread,
            (self.rng.gen::<f32>() - 0.5) * self.params.angular_spread,
            (self.rng.gen::<f32>() - 0.5) * self.params.angular_spread,
        );

        let Some(particle) = self.pool.get_mut(slot) else {
            return;
        };
        particle.position = point + jitter;
        particle.velocity = velocity;
        particle.angular_velocity = angular;
        particle.rotation = Vec3::ZERO;
        particle.active = true;
    }

    /// Per-slot render instances.
    ///
    /// Scale is zero for inactive slots and variant-normalized for active
    /// ones, so differently sized models stay visually comparable.
    pub fn instances(&self) -> impl Iterator<Item = ParticleInstance> + '_ {
        self.pool.iter().map(|p| ParticleInstance {
            position: p.position,
            rotation: p.rotation,
            scale: if p.active {
                PARTICLE_RADIUS * self.catalog.normalize_scale(p.variant)
            } else {
                0.0
            },
            variant: p.variant,
        })
    }

    /// Read-only view of the pool (tests and debug overlays)
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.pool
    }
}
