//! Demo binary for the AR overlay pipeline.
//!
//! Runs the full session against synthetic stand-ins for the external
//! components: a generated camera feed with a periodic marker block, a
//! scripted face orbit for landmarks, a brightness-threshold "decoder", and
//! a logging renderer. Useful for exercising the coordination logic without
//! camera hardware.

use anyhow::Result;
use ar_overlay_pipeline::app::{OverlaySession, SessionComponents, SessionState};
use ar_overlay_pipeline::capture::{CaptureProfile, Frame, FrameSource};
use ar_overlay_pipeline::config::Config;
use ar_overlay_pipeline::landmark_tracking::{Landmark, LandmarkDetector, LandmarkSet};
use ar_overlay_pipeline::marker_gate::{MarkerDecoder, MarkerDetection, Quad};
use ar_overlay_pipeline::scene_composer::{ComposedScene, SceneRenderer};
use clap::Parser;
use glam::Vec2;
use log::info;
use std::time::{Duration, Instant};

const FEED_WIDTH: u32 = 320;
const FEED_HEIGHT: u32 = 240;
/// Region of the synthetic frame the marker block occupies
const MARKER_RECT: (u32, u32, u32, u32) = (16, 16, 64, 64);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// How long to run the demo, in seconds
    #[arg(short, long, default_value = "6")]
    duration: u64,

    /// Seconds of each marker on/off phase
    #[arg(long, default_value = "2")]
    marker_period: u64,

    /// Particle pool capacity override (0 = config default)
    #[arg(long, default_value = "0")]
    capacity: usize,

    /// Decode in-thread instead of on the worker
    #[arg(long)]
    no_worker: bool,

    /// Don't require the marker for particle emission
    #[arg(long)]
    no_marker_gate: bool,

    /// Write a PNG snapshot here when the run ends
    #[arg(long)]
    photo: Option<String>,

    /// Enable debug output
    #[arg(short = 'D', long)]
    debug: bool,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,
}

/// Synthetic camera: a flat gray feed with a dark marker block that pulses
/// on and off.
struct SyntheticCamera {
    started: bool,
    t0: Instant,
    marker_period: Duration,
}

impl SyntheticCamera {
    fn new(marker_period: Duration) -> Self {
        Self {
            started: false,
            t0: Instant::now(),
            marker_period,
        }
    }

    fn marker_visible(&self) -> bool {
        let phase = self.t0.elapsed().as_secs_f64() / self.marker_period.as_secs_f64();
        (phase as u64) % 2 == 0
    }
}

impl FrameSource for SyntheticCamera {
    fn start(&mut self, profile: CaptureProfile) -> ar_overlay_pipeline::Result<()> {
        info!("synthetic camera started with {:?} profile", profile);
        self.started = true;
        self.t0 = Instant::now();
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn grab(&mut self) -> ar_overlay_pipeline::Result<Option<Frame>> {
        if !self.started {
            return Ok(None);
        }
        let mut pixels = vec![128u8; (FEED_WIDTH * FEED_HEIGHT * 4) as usize];
        for px in pixels.chunks_exact_mut(4) {
            px[3] = 255;
        }
        if self.marker_visible() {
            let (mx, my, mw, mh) = MARKER_RECT;
            for y in my..my + mh {
                for x in mx..mx + mw {
                    let i = ((y * FEED_WIDTH + x) * 4) as usize;
                    pixels[i] = 10;
                    pixels[i + 1] = 10;
                    pixels[i + 2] = 10;
                }
            }
        }
        Ok(Some(Frame::new(pixels, FEED_WIDTH, FEED_HEIGHT)?))
    }
}

/// Scripted face orbit: nose tip sways gently, head refs track above it.
struct OrbitingFace {
    t0: Instant,
    result: Option<Option<LandmarkSet>>,
}

impl OrbitingFace {
    fn new() -> Self {
        Self {
            t0: Instant::now(),
            result: None,
        }
    }
}

impl LandmarkDetector for OrbitingFace {
    fn submit(&mut self, _frame: &Frame) -> ar_overlay_pipeline::Result<()> {
        let t = self.t0.elapsed().as_secs_f32();
        let nose = Landmark::new(
            0.5 + 0.08 * (t * 0.9).sin(),
            0.45 + 0.04 * (t * 0.6).cos(),
            -0.02,
        );
        let forehead = Landmark::new(nose.x, nose.y - 0.18, nose.z);
        let head_top = Landmark::new(nose.x, nose.y - 0.26, nose.z);

        let mut points = vec![nose; 468];
        points[ar_overlay_pipeline::constants::FOREHEAD_INDEX] = forehead;
        points[ar_overlay_pipeline::constants::HEAD_TOP_INDEX] = head_top;
        self.result = Some(Some(LandmarkSet::new(points)));
        Ok(())
    }

    fn poll(&mut self) -> Option<Option<LandmarkSet>> {
        self.result.take()
    }
}

/// Decoder that looks for the synthetic marker block by mean brightness.
struct BlockDecoder;

impl MarkerDecoder for BlockDecoder {
    fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Option<MarkerDetection> {
        let (mx, my, mw, mh) = MARKER_RECT;
        if mx + mw > width || my + mh > height {
            return None;
        }
        let mut sum: u64 = 0;
        for y in my..my + mh {
            for x in mx..mx + mw {
                let i = ((y * width + x) * 4) as usize;
                sum += u64::from(pixels[i]);
            }
        }
        let mean = sum / u64::from(mw * mh);
        if mean < 40 {
            Some(MarkerDetection {
                payload: "demo-marker".to_string(),
                quad: Quad {
                    top_left: Vec2::new(mx as f32, my as f32),
                    top_right: Vec2::new((mx + mw) as f32, my as f32),
                    bottom_right: Vec2::new((mx + mw) as f32, (my + mh) as f32),
                    bottom_left: Vec2::new(mx as f32, (my + mh) as f32),
                },
            })
        } else {
            None
        }
    }
}

/// Renderer that just counts frames.
struct LogRenderer {
    frames: u64,
}

impl SceneRenderer for LogRenderer {
    fn resize(&mut self, width: u32, height: u32) {
        info!("renderer resized to {width}x{height}");
    }

    fn render(&mut self, scene: &ComposedScene<'_>) -> ar_overlay_pipeline::Result<()> {
        self.frames += 1;
        if self.frames % 60 == 0 {
            let active = scene.particles.iter().filter(|p| p.scale > 0.0).count();
            info!(
                "frame {}: {} active particles, fov {:.0}",
                self.frames, active, scene.camera.fov_degrees
            );
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("AR Overlay Pipeline - synthetic demo");

    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {config_path}");
        Config::from_file(config_path)?
    } else {
        Config::default()
    };
    if args.capacity > 0 {
        config.particles.capacity = args.capacity;
    }
    if args.no_worker {
        config.marker.use_worker = false;
    }
    if args.no_marker_gate {
        config.marker.required = false;
    }

    let components = SessionComponents {
        frame_source: Box::new(SyntheticCamera::new(Duration::from_secs(args.marker_period))),
        detector: Box::new(OrbitingFace::new()),
        decoder: Box::new(BlockDecoder),
        worker_decoder: Some(Box::new(BlockDecoder)),
        renderer: Box::new(LogRenderer { frames: 0 }),
    };

    let mut session = OverlaySession::new(&config, components, Instant::now())?;
    if let SessionState::CaptureFailed(reason) = session.state() {
        anyhow::bail!("capture failed: {reason}");
    }
    session.set_container_size(1280, 720, 1.0);

    let deadline = Instant::now() + Duration::from_secs(args.duration);
    let mut last_report = Instant::now();
    while Instant::now() < deadline {
        session.tick(Instant::now());

        if last_report.elapsed() >= Duration::from_secs(1) {
            let marker = session.marker_state();
            info!(
                "marker {}, face {}, {} active particles",
                if marker.present { "present" } else { "absent" },
                if session.face_detected() { "tracked" } else { "lost" },
                session.active_particles()
            );
            last_report = Instant::now();
        }
        std::thread::sleep(Duration::from_millis(16));
    }

    if let Some(path) = &args.photo {
        let png = session.snapshot()?;
        std::fs::write(path, png)?;
        info!("snapshot written to {path}");
    }

    info!(
        "done: {} ticks, {} active particles at exit",
        session.ticks(),
        session.active_particles()
    );
    session.shutdown();
    Ok(())
}
