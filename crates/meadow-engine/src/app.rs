//! Headless frame loop.
//!
//! Builds the terrain from the scene configuration, picks a backend and flies
//! the camera along a slow circle, keeping it at eye height above the ground.

use anyhow::{Context, Result};
use glam::Vec3;
use std::time::Instant;
use tracing::{debug, info, warn};

use meadow_kernel::{CpuBackend, GpuBackend, Heightmap, RenderBackend, Terrain};

use crate::camera::FpsCamera;
use crate::config::SceneConfig;

/// Side length of the generated fallback heightmap.
const SYNTHETIC_SIZE: u32 = 128;

/// Totals over a whole run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Frames rendered
    pub frames: u32,
    /// Largest resident chunk count seen
    pub peak_loaded_chunks: usize,
    /// Tiles drawn, summed over all frames
    pub total_tiles: usize,
    /// Chunks created over the run
    pub chunks_loaded: usize,
    /// Chunks dropped over the run
    pub chunks_unloaded: usize,
    /// Final eye position
    pub final_position: Vec3,
    /// Whether the wgpu backend was used
    pub used_gpu: bool,
}

/// Runs the flythrough described by `config`.
pub fn run(config: &SceneConfig) -> Result<RunSummary> {
    let heightmap = load_heightmap(config)?;
    let mut terrain = Terrain::new(&config.terrain, &config.wind, &config.grass, heightmap)
        .context("Invalid terrain configuration")?;

    let (mut backend, used_gpu) = select_backend(config.use_gpu);
    terrain
        .init_device_buffers(backend.as_mut())
        .context("Failed to initialize device buffers")?;

    let start = Vec3::new(0.0, config.camera.eye_height, 0.0);
    let mut camera = FpsCamera::new(start, &config.camera);
    let mut summary = RunSummary {
        used_gpu,
        ..RunSummary::default()
    };

    let started = Instant::now();
    for frame in 0..config.frames {
        camera.rotate(0.0, config.turn_rate);
        camera.advance(1.0);

        let stats = terrain
            .update(camera.position(), camera.frame_delta(), &camera.view_projection(), backend.as_mut())
            .with_context(|| format!("Frame {frame} update failed"))?;
        terrain.render(backend.as_mut()).with_context(|| format!("Frame {frame} draw failed"))?;

        // Follow the ground now that the chunk under the camera is resident
        let pos = camera.position();
        let ground = terrain.height_at(pos.x, pos.z);
        camera.set_position(Vec3::new(pos.x, ground + config.camera.eye_height, pos.z));
        camera.end_frame();

        debug!(
            "Frame {}: {} chunks ({} visible, +{} -{}), {} tiles",
            frame,
            stats.loaded_chunks,
            stats.visible_chunks,
            stats.chunks_loaded,
            stats.chunks_unloaded,
            stats.tile_count
        );

        summary.frames += 1;
        summary.peak_loaded_chunks = summary.peak_loaded_chunks.max(stats.loaded_chunks);
        summary.total_tiles += stats.tile_count;
        summary.chunks_loaded += stats.chunks_loaded;
        summary.chunks_unloaded += stats.chunks_unloaded;
    }
    summary.final_position = camera.position();

    let elapsed = started.elapsed();
    info!(
        "Ran {} frames in {:.2?} ({:.2?}/frame): peak {} chunks, {} loaded, {} unloaded",
        summary.frames,
        elapsed,
        elapsed / summary.frames.max(1),
        summary.peak_loaded_chunks,
        summary.chunks_loaded,
        summary.chunks_unloaded
    );
    Ok(summary)
}

fn select_backend(use_gpu: bool) -> (Box<dyn RenderBackend>, bool) {
    if use_gpu {
        match GpuBackend::new(false) {
            Ok(gpu) => return (Box::new(gpu), true),
            Err(e) => warn!("GPU backend unavailable ({e}), falling back to CPU"),
        }
    }
    info!("Using CPU backend");
    (Box::new(CpuBackend::new()), false)
}

fn load_heightmap(config: &SceneConfig) -> Result<Heightmap> {
    let max_height = config.terrain.terrain_height;
    if config.heightmap.exists() {
        return Heightmap::load(&config.heightmap, max_height)
            .with_context(|| format!("Failed to load heightmap {}", config.heightmap.display()));
    }

    warn!(
        "Heightmap {} not found, generating a {}x{} substitute",
        config.heightmap.display(),
        SYNTHETIC_SIZE,
        SYNTHETIC_SIZE
    );
    Ok(synthetic_heightmap(SYNTHETIC_SIZE, max_height)?)
}

/// Rolling hills that repeat seamlessly across the map edges.
fn synthetic_heightmap(size: u32, max_height: f32) -> Result<Heightmap, meadow_common::HeightmapError> {
    let step = std::f32::consts::TAU / size as f32;
    let mut red = Vec::with_capacity((size * size) as usize);
    for y in 0..size {
        for x in 0..size {
            let a = (x as f32 * step).sin() * (y as f32 * step * 2.0).cos();
            let b = (x as f32 * step * 3.0 + y as f32 * step).sin();
            let v = 0.5 + 0.35 * a + 0.15 * b;
            red.push((v.clamp(0.0, 1.0) * 255.0) as u8);
        }
    }
    Heightmap::from_red_channel(size, size, &red, max_height)
}
