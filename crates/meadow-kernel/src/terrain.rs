//! Per-frame terrain driver.
//!
//! [`Terrain`] ties the chunk streamer, the wind field and the grass layout
//! to a [`RenderBackend`]. A frame is:
//!
//! 1. [`Terrain::update`]: stream chunks, cull, advance the wind, upload
//! 2. [`Terrain::render`]: issue the draw
//!
//! [`Terrain::init_device_buffers`] must run once before the first frame.

use std::path::Path;

use glam::{Mat4, Vec3};
use meadow_common::{BackendError, ConfigError, MeadowResult};
use tracing::{debug, info};

use crate::backend::{BufferTarget, DrawCall, RenderBackend};
use crate::chunk::ChunkFactory;
use crate::config::{GrassConfig, TerrainConfig, WindConfig};
use crate::frustum::Frustum;
use crate::grass::GrassField;
use crate::heightmap::Heightmap;
use crate::streaming::{ChunkStreamer, TerrainStreamingState};
use crate::tile::TileFactory;
use crate::wind::WindField;

/// Terrain fades out this far inside the unload distance.
const TERRAIN_FADE_INSET: f32 = 200.0;

/// What one [`Terrain::update`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Resident chunks after the update
    pub loaded_chunks: usize,
    /// Chunks that passed the frustum test
    pub visible_chunks: usize,
    /// Resident chunks that were culled
    pub culled_chunks: usize,
    /// Chunks created this frame
    pub chunks_loaded: usize,
    /// Chunks dropped this frame
    pub chunks_unloaded: usize,
    /// Tiles uploaded for drawing
    pub tile_count: usize,
}

/// Streaming terrain with wind and grass.
#[derive(Debug)]
pub struct Terrain {
    streamer: ChunkStreamer,
    state: TerrainStreamingState,
    wind: WindField,
    grass: GrassField,
    tile_size: f32,
    view_distance: f32,
    tile_count: usize,
    camera_position: Vec3,
}

impl Terrain {
    /// Builds the terrain around an already loaded heightmap.
    ///
    /// The heightmap should have been loaded with `config.terrain_height`.
    pub fn new(
        config: &TerrainConfig,
        wind: &WindConfig,
        grass: &GrassConfig,
        heightmap: Heightmap,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        wind.validate()?;
        grass.validate()?;

        let tiles = TileFactory::new(config.tile_size(), config.tiles_per_block(), heightmap);
        let chunk_height = config.terrain_height + grass.blade_height;
        let chunks = ChunkFactory::new(config.chunk_size(), chunk_height, config.chunk_resolution, tiles);
        let streamer = ChunkStreamer::from_config(chunks, config)?;

        info!(
            "Creating terrain: chunk_size={}, tile_size={}, load={}, unload={}",
            config.chunk_size(),
            config.tile_size(),
            streamer.load_distance(),
            streamer.unload_distance()
        );

        Ok(Self {
            streamer,
            state: TerrainStreamingState::new(),
            wind: WindField::new(wind, config.tile_size()),
            grass: GrassField::new(grass),
            tile_size: config.tile_size(),
            view_distance: config.view_distance,
            tile_count: 0,
            camera_position: Vec3::ZERO,
        })
    }

    /// Loads the heightmap at `path` and builds the terrain.
    pub fn load<P: AsRef<Path>>(
        path: P,
        config: &TerrainConfig,
        wind: &WindConfig,
        grass: &GrassConfig,
    ) -> MeadowResult<Self> {
        let heightmap = Heightmap::load(path, config.terrain_height)?;
        Ok(Self::new(config, wind, grass, heightmap)?)
    }

    /// The chunk streamer.
    #[must_use]
    pub const fn streamer(&self) -> &ChunkStreamer {
        &self.streamer
    }

    /// Currently resident chunks.
    #[must_use]
    pub const fn state(&self) -> &TerrainStreamingState {
        &self.state
    }

    /// The wind field.
    #[must_use]
    pub const fn wind(&self) -> &WindField {
        &self.wind
    }

    /// The grass layout.
    #[must_use]
    pub const fn grass(&self) -> &GrassField {
        &self.grass
    }

    /// Tiles uploaded by the last update.
    #[must_use]
    pub const fn tile_count(&self) -> usize {
        self.tile_count
    }

    /// Terrain surface height at world `(x, z)`, or 0 outside the loaded area.
    #[must_use]
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        self.streamer.height_at(&self.state, x, z)
    }

    /// Allocates every device buffer and uploads the static data.
    pub fn init_device_buffers<B: RenderBackend + ?Sized>(&self, backend: &mut B) -> Result<(), BackendError> {
        let size = self.wind.field_size();
        backend.resize_device_buffer(BufferTarget::WindVelocity, size)?;
        backend.upload_flat_buffer(BufferTarget::WindVelocity, bytemuck::cast_slice(self.wind.velocity()))?;
        backend.resize_device_buffer(BufferTarget::WindAcceleration, size)?;
        backend.upload_flat_buffer(
            BufferTarget::WindAcceleration,
            bytemuck::cast_slice(self.wind.acceleration()),
        )?;

        backend.resize_device_buffer(BufferTarget::GrassRoots, self.grass.blade_count())?;
        backend.upload_flat_buffer(BufferTarget::GrassRoots, self.grass.flat_roots())?;

        backend.resize_device_buffer(BufferTarget::TilePositions, 0)?;
        backend.resize_device_buffer(BufferTarget::TileData, 0)?;

        debug!("Initialized device buffers ({} wind cells, {} blades)", size, self.grass.blade_count());
        Ok(())
    }

    /// Streams, culls and uploads terrain for a camera at `camera_pos` that
    /// moved by `camera_delta` since the last frame.
    pub fn update<B: RenderBackend + ?Sized>(
        &mut self,
        camera_pos: Vec3,
        camera_delta: Vec3,
        view_projection: &Mat4,
        backend: &mut B,
    ) -> Result<FrameStats, BackendError> {
        let frustum = Frustum::from_matrix(view_projection);
        let update = self.streamer.update(&mut self.state, camera_pos, &frustum);

        let params = self.wind.update(camera_pos, camera_delta);
        backend.invoke_parallel_kernel(self.wind.workgroup_count(), &params)?;

        let buffers = update.buffers;
        if buffers.tile_count > 0 {
            backend.resize_device_buffer(BufferTarget::TilePositions, buffers.tile_count)?;
            backend.upload_flat_buffer(BufferTarget::TilePositions, &buffers.positions)?;
            backend.resize_device_buffer(BufferTarget::TileData, buffers.tile_count)?;
            backend.upload_flat_buffer(BufferTarget::TileData, &buffers.data)?;
        }

        self.tile_count = buffers.tile_count;
        self.camera_position = camera_pos;

        if update.loaded > 0 || update.unloaded > 0 {
            debug!(
                "Streaming: +{} -{} chunks, {} resident",
                update.loaded,
                update.unloaded,
                self.state.len()
            );
        }

        Ok(FrameStats {
            loaded_chunks: self.state.len(),
            visible_chunks: buffers.visible_chunks,
            culled_chunks: buffers.culled_chunks,
            chunks_loaded: update.loaded,
            chunks_unloaded: update.unloaded,
            tile_count: buffers.tile_count,
        })
    }

    /// Draw parameters for the current frame.
    #[must_use]
    pub fn draw_call(&self) -> DrawCall {
        let terrain_far = (self.streamer.unload_distance() - TERRAIN_FADE_INSET).max(0.0);
        DrawCall {
            tile_count: self.tile_count as u32,
            tile_size: self.tile_size,
            camera_position: self.camera_position.to_array(),
            terrain_fade: [terrain_far / 8.0, terrain_far],
            blade_count: self.grass.blade_count() as u32,
            blade_height: self.grass.blade_height(),
            grass_fade: [self.view_distance / 8.0, self.view_distance],
            wind_radius: self.wind.radius(),
            time: self.wind.time(),
        }
    }

    /// Draws the terrain uploaded by the last update.
    pub fn render<B: RenderBackend + ?Sized>(&self, backend: &mut B) -> Result<(), BackendError> {
        backend.render_draw_buffer(&self.draw_call())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu_backend::CpuBackend;

    fn config() -> TerrainConfig {
        TerrainConfig {
            block_size: 64.0,
            block_resolution: 4,
            chunk_resolution: 4,
            terrain_height: 20.0,
            view_distance: 24.0,
            unload_margin_chunks: 0.5,
        }
    }

    fn terrain() -> Terrain {
        let red: Vec<u8> = (0..64u32).map(|i| ((i * 53 + 7) % 256) as u8).collect();
        let heightmap = Heightmap::from_red_channel(8, 8, &red, 20.0).expect("valid heightmap");
        let wind = WindConfig {
            radius: 4,
            influence: 1.0,
        };
        Terrain::new(&config(), &wind, &GrassConfig::default(), heightmap).expect("valid terrain")
    }

    fn looking_down(pos: Vec3) -> Mat4 {
        let projection = Mat4::perspective_rh_gl(90f32.to_radians(), 1.0, 0.1, 500.0);
        let view = Mat4::look_at_rh(pos, pos + Vec3::new(0.0, -1.0, -0.01), Vec3::Y);
        projection * view
    }

    #[test]
    fn test_rejects_invalid_config() {
        let heightmap = Heightmap::from_red_channel(2, 2, &[0; 4], 1.0).expect("valid heightmap");
        let bad = TerrainConfig {
            view_distance: -1.0,
            ..config()
        };
        assert!(Terrain::new(&bad, &WindConfig::default(), &GrassConfig::default(), heightmap).is_err());
    }

    #[test]
    fn test_update_requires_device_buffers() {
        let mut terrain = terrain();
        let mut backend = CpuBackend::new();
        let err = terrain
            .update(Vec3::ZERO, Vec3::ZERO, &looking_down(Vec3::Y * 50.0), &mut backend)
            .unwrap_err();
        assert!(matches!(err, BackendError::UnknownBuffer(_)));
    }

    #[test]
    fn test_frame_uploads_visible_tiles() {
        let mut terrain = terrain();
        let mut backend = CpuBackend::new();
        terrain.init_device_buffers(&mut backend).expect("init");
        assert_eq!(backend.buffer(BufferTarget::GrassRoots).len(), 64 * 2);
        assert_eq!(backend.buffer(BufferTarget::WindAcceleration).len(), 81 * 4);

        let pos = Vec3::new(0.0, 60.0, 0.0);
        let stats = terrain
            .update(pos, Vec3::ZERO, &looking_down(pos), &mut backend)
            .expect("update");
        assert!(stats.chunks_loaded > 0);
        assert_eq!(stats.loaded_chunks, stats.chunks_loaded);
        assert_eq!(stats.visible_chunks + stats.culled_chunks, stats.loaded_chunks);
        assert!(stats.tile_count > 0);
        assert_eq!(stats.tile_count, stats.visible_chunks * 16);
        assert_eq!(backend.buffer(BufferTarget::TilePositions).len(), stats.tile_count * 3);
        assert_eq!(backend.buffer(BufferTarget::TileData).len(), stats.tile_count * 12);
        assert_eq!(backend.stats().dispatches, 1);

        terrain.render(&mut backend).expect("render");
        let draw = backend.last_draw().expect("draw recorded");
        assert_eq!(draw.tile_count as usize, stats.tile_count);
        assert_eq!(draw.blade_count, 64);
        assert_eq!(draw.grass_fade, [3.0, 24.0]);
        assert_eq!(draw.terrain_fade, [0.0, 0.0]);
        assert_eq!(draw.time, 1.0);
        assert_eq!(draw.camera_position, [0.0, 60.0, 0.0]);
    }

    #[test]
    fn test_nothing_visible_skips_upload() {
        let mut terrain = terrain();
        let mut backend = CpuBackend::new();
        terrain.init_device_buffers(&mut backend).expect("init");
        let uploaded = backend.stats().floats_uploaded;

        // Looking straight up from high above the terrain
        let pos = Vec3::new(0.0, 100.0, 0.0);
        let projection = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 50.0);
        let view = Mat4::look_at_rh(pos, pos + Vec3::new(0.0, 1.0, 0.01), Vec3::Y);
        let stats = terrain
            .update(pos, Vec3::ZERO, &(projection * view), &mut backend)
            .expect("update");

        assert!(stats.loaded_chunks > 0);
        assert_eq!(stats.tile_count, 0);
        assert_eq!(stats.culled_chunks, stats.loaded_chunks);
        assert_eq!(backend.stats().floats_uploaded, uploaded);
        assert_eq!(terrain.draw_call().tile_count, 0);
    }

    #[test]
    fn test_height_follows_streaming() {
        let mut terrain = terrain();
        let mut backend = CpuBackend::new();
        terrain.init_device_buffers(&mut backend).expect("init");
        assert_eq!(terrain.height_at(5.0, 5.0), 0.0);

        let pos = Vec3::new(0.0, 60.0, 0.0);
        terrain
            .update(pos, Vec3::ZERO, &looking_down(pos), &mut backend)
            .expect("update");
        let h = terrain.height_at(5.0, 5.0);
        assert!((0.0..=20.0).contains(&h));
        assert_eq!(h, terrain.streamer().height_at(terrain.state(), 5.0, 5.0));
    }
}
