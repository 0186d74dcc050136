//! Chunk streaming around a moving camera.
//!
//! The loaded chunk set lives in [`TerrainStreamingState`], owned by the
//! caller and handed to [`ChunkStreamer::update`] every frame. Each update:
//!
//! 1. unloads chunks whose center is farther than the unload distance
//! 2. loads missing chunks whose center is closer than the load distance
//! 3. frustum-culls the resident chunks and concatenates the tile data of the
//!    visible ones into flat buffers ready for upload
//!
//! The unload distance is strictly larger than the load distance, so a camera
//! hovering at a chunk boundary does not reload the same chunk every frame.
//! All distances are measured on the XZ plane between the camera and the
//! chunk center. Culled chunks stay resident.

use ahash::AHashMap;
use glam::{Vec2, Vec3};
use meadow_common::{ChunkCoord, ConfigError};
use tracing::{debug, error, trace};

use crate::chunk::{Chunk, ChunkFactory};
use crate::config::TerrainConfig;
use crate::frustum::Frustum;
use crate::tile::TILE_RECORD_FLOATS;

/// Tolerance, in tiles, when checking that a height query hit the right tile.
const TILE_MATCH_EPSILON: f32 = 1e-3;

/// Chunks currently resident in memory, keyed by chunk coordinate.
#[derive(Debug, Default)]
pub struct TerrainStreamingState {
    chunks: AHashMap<ChunkCoord, Chunk>,
}

impl TerrainStreamingState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resident chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunk is resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Whether the chunk at `coord` is resident.
    #[must_use]
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// The resident chunk at `coord`.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// Iterates over resident chunks in map order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }
}

/// Flat tile buffers of all visible chunks for one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameBuffers {
    /// Tile centers, 3 floats per tile
    pub positions: Vec<f32>,
    /// Tile records, 12 floats per tile
    pub data: Vec<f32>,
    /// Tiles in the buffers
    pub tile_count: usize,
    /// Chunks that passed the frustum test
    pub visible_chunks: usize,
    /// Resident chunks rejected by the frustum test
    pub culled_chunks: usize,
}

/// Result of one streaming update.
#[derive(Debug, Clone, Default)]
pub struct StreamingUpdate {
    /// Chunks created this update
    pub loaded: usize,
    /// Chunks dropped this update
    pub unloaded: usize,
    /// Buffers to upload
    pub buffers: FrameBuffers,
}

/// Loads and unloads chunks around the camera and answers height queries.
#[derive(Debug)]
pub struct ChunkStreamer {
    factory: ChunkFactory,
    load_distance: f32,
    unload_distance: f32,
}

impl ChunkStreamer {
    /// Creates a streamer from explicit distances.
    ///
    /// Fails unless `0 < load_distance < unload_distance`.
    pub fn new(factory: ChunkFactory, load_distance: f32, unload_distance: f32) -> Result<Self, ConfigError> {
        if load_distance <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "load_distance",
                value: load_distance,
            });
        }
        if unload_distance <= load_distance {
            return Err(ConfigError::NonPositive {
                name: "unload margin",
                value: unload_distance - load_distance,
            });
        }
        Ok(Self {
            factory,
            load_distance,
            unload_distance,
        })
    }

    /// Creates a streamer with the distances derived from `config`.
    pub fn from_config(factory: ChunkFactory, config: &TerrainConfig) -> Result<Self, ConfigError> {
        Self::new(factory, config.load_distance(), config.unload_distance())
    }

    /// The chunk factory.
    #[must_use]
    pub const fn factory(&self) -> &ChunkFactory {
        &self.factory
    }

    /// Chunks closer than this are loaded.
    #[must_use]
    pub const fn load_distance(&self) -> f32 {
        self.load_distance
    }

    /// Chunks farther than this are unloaded.
    #[must_use]
    pub const fn unload_distance(&self) -> f32 {
        self.unload_distance
    }

    /// Runs one streaming step for a camera at `camera_pos`.
    pub fn update(
        &self,
        state: &mut TerrainStreamingState,
        camera_pos: Vec3,
        frustum: &Frustum,
    ) -> StreamingUpdate {
        let unloaded = self.unload(state, camera_pos);
        let loaded = self.load(state, camera_pos);
        let buffers = Self::assemble(state, frustum);
        trace!(
            "Streaming update: +{} -{}, {}/{} chunks visible",
            loaded,
            unloaded,
            buffers.visible_chunks,
            state.len()
        );
        StreamingUpdate {
            loaded,
            unloaded,
            buffers,
        }
    }

    /// Drops chunks beyond the unload distance. Returns how many were dropped.
    pub fn unload(&self, state: &mut TerrainStreamingState, camera_pos: Vec3) -> usize {
        let before = state.chunks.len();
        let limit = self.unload_distance;
        state.chunks.retain(|coord, chunk| {
            let keep = xz_distance(chunk.position(), camera_pos) <= limit;
            if !keep {
                debug!("Unloading {}", coord);
            }
            keep
        });
        before - state.chunks.len()
    }

    /// Creates missing chunks within the load distance. Returns how many were created.
    pub fn load(&self, state: &mut TerrainStreamingState, camera_pos: Vec3) -> usize {
        let chunk_size = self.factory.chunk_size();
        let center = ChunkCoord::containing(camera_pos.x, camera_pos.z, chunk_size);
        let radius = (self.load_distance / chunk_size).ceil() as i32;

        let mut created = 0;
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                let coord = center.offset(dx, dz);
                if state.chunks.contains_key(&coord) {
                    continue;
                }
                let (cx, cz) = coord.center(chunk_size);
                if Vec2::new(cx - camera_pos.x, cz - camera_pos.z).length() >= self.load_distance {
                    continue;
                }
                debug!("Loading {}", coord);
                state.chunks.insert(coord, self.factory.make_chunk(coord));
                created += 1;
            }
        }
        created
    }

    /// Concatenates the tile data of every chunk that passes the frustum test.
    #[must_use]
    pub fn assemble(state: &TerrainStreamingState, frustum: &Frustum) -> FrameBuffers {
        let mut buffers = FrameBuffers::default();
        for chunk in state.chunks.values() {
            if !frustum.classify(chunk.aabb()).is_visible() {
                buffers.culled_chunks += 1;
                continue;
            }
            buffers.positions.extend_from_slice(chunk.positions());
            buffers.data.extend_from_slice(chunk.data());
            buffers.tile_count += chunk.tile_count();
            buffers.visible_chunks += 1;
        }
        debug_assert_eq!(buffers.data.len(), buffers.tile_count * TILE_RECORD_FLOATS);
        buffers
    }

    /// Terrain surface height at world `(x, z)`.
    ///
    /// Returns 0 when the containing chunk is not resident.
    #[must_use]
    pub fn height_at(&self, state: &TerrainStreamingState, x: f32, z: f32) -> f32 {
        let chunk_size = self.factory.chunk_size();
        let tile_size = self.factory.tiles().tile_size();
        let coord = ChunkCoord::containing(x, z, chunk_size);
        let Some(chunk) = state.chunks.get(&coord) else {
            return 0.0;
        };

        let (origin_x, origin_z) = coord.origin(chunk_size);
        let local_x = x - origin_x;
        let local_z = z - origin_z;
        let last = chunk.resolution() - 1;
        let tx = ((local_x / tile_size).floor() as i32).clamp(0, last);
        let tz = ((local_z / tile_size).floor() as i32).clamp(0, last);

        let Some(record) = chunk.tile(tx, tz) else {
            return 0.0;
        };

        let tolerance = tile_size * (0.5 + TILE_MATCH_EPSILON);
        let matches = (record.center[0] - x).abs() <= tolerance && (record.center[1] - z).abs() <= tolerance;
        if !matches {
            error!(
                "Height query ({}, {}) resolved to tile ({}, {}) of {} centered at {:?}",
                x, z, tx, tz, coord, record.center
            );
        }
        debug_assert!(matches, "height query landed in the wrong tile");

        let rx = local_x - tx as f32 * tile_size;
        let rz = local_z - tz as f32 * tile_size;
        record.plane_for_offset(rx, rz).height_at(x, z)
    }
}

fn xz_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(a.x - b.x, a.z - b.z).length()
}
