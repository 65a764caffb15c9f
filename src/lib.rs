//! AR overlay pipeline coordination library.
//!
//! This crate implements the coordination layer of a real-time AR camera
//! pipeline:
//!
//! 1. Camera frames arrive from a [`capture::FrameSource`]
//! 2. A face-landmark detector publishes normalized 3D landmarks, driven
//!    with one-in-flight back-pressure
//! 3. A marker (QR) gate samples frames on a fixed cadence and debounces
//!    presence with a trailing grace period
//! 4. A fixed-pool particle simulator spawns from the landmark-derived
//!    emission point and integrates simple gravity physics
//! 5. A scene composer assembles the camera background, optional debug
//!    mesh, and particle instances into one frame per render tick
//!
//! The expensive external work (landmark inference, marker decoding, 3D
//! rasterization, real camera capture) is delegated to trait
//! implementations supplied by the caller.
//!
//! # Examples
//!
//! ```no_run
//! use ar_overlay_pipeline::app::{OverlaySession, SessionComponents};
//! use ar_overlay_pipeline::config::Config;
//! use std::time::Instant;
//!
//! # fn components() -> SessionComponents { unimplemented!() }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let mut session = OverlaySession::new(&config, components(), Instant::now())?;
//!
//! // Container layout from the host UI
//! session.set_container_size(1280, 720, 2.0);
//!
//! // Drive one tick per animation frame
//! loop {
//!     session.tick(Instant::now());
//!     if session.ticks() > 600 {
//!         break;
//!     }
//! }
//!
//! session.shutdown();
//! # Ok(())
//! # }
//! ```

/// Camera capture seam: frames, capture profiles, the frame-source trait
pub mod capture;

/// Face-landmark tracking with one-in-flight back-pressure
pub mod landmark_tracking;

/// Emission point calculation from landmarks
pub mod emission;

/// Emission-anchor smoothing filters
pub mod smoothing;

/// Marker detection gate with grace-period debounce
pub mod marker_gate;

/// Background decode worker
pub mod decode_worker;

/// Fixed-pool particle simulation
pub mod particle_system;

/// Scene composition and render-loop wiring
pub mod scene_composer;

/// Pipeline session: initialization, tick loop, teardown
pub mod app;

/// Utility functions for pixel buffers and layout math
pub mod utils;

/// Error types and result handling
pub mod error;

/// Constants used throughout the pipeline
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
