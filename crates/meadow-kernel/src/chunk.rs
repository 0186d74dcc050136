//! Chunk factory: square grids of tiles, the unit of streaming.
//!
//! Tiles inside a chunk are stored row-major, `z` outer and `x` inner, so the
//! record of local tile `(tx, tz)` lives at index `tz * resolution + tx`.
//! Height queries depend on that order.

use glam::Vec3;
use meadow_common::{ChunkCoord, TileCoord};
use tracing::trace;

use crate::geometry::Aabb;
use crate::tile::{TileFactory, TileRecord};

/// A loaded chunk: bounds plus the packed data of all its tiles.
#[derive(Debug, Clone)]
pub struct Chunk {
    coord: ChunkCoord,
    position: Vec3,
    aabb: Aabb,
    resolution: i32,
    positions: Vec<[f32; 3]>,
    records: Vec<TileRecord>,
}

impl Chunk {
    /// Chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Chunk center. `y` is half the chunk height.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Bounding box covering the footprint and the full terrain plus grass height.
    #[must_use]
    pub const fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// Tiles per side.
    #[must_use]
    pub const fn resolution(&self) -> i32 {
        self.resolution
    }

    /// Number of tiles.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.records.len()
    }

    /// Index of local tile `(tx, tz)` in the record array.
    #[must_use]
    pub fn tile_index(&self, tx: i32, tz: i32) -> Option<usize> {
        let in_range = |v: i32| (0..self.resolution).contains(&v);
        (in_range(tx) && in_range(tz)).then(|| (tz * self.resolution + tx) as usize)
    }

    /// Record of local tile `(tx, tz)`.
    #[must_use]
    pub fn tile(&self, tx: i32, tz: i32) -> Option<&TileRecord> {
        self.tile_index(tx, tz).and_then(|idx| self.records.get(idx))
    }

    /// All tile records in row-major order.
    #[must_use]
    pub fn records(&self) -> &[TileRecord] {
        &self.records
    }

    /// Tile records as one flat float array (12 floats per tile).
    #[must_use]
    pub fn data(&self) -> &[f32] {
        bytemuck::cast_slice(&self.records)
    }

    /// Tile center positions as one flat float array (3 floats per tile).
    #[must_use]
    pub fn positions(&self) -> &[f32] {
        bytemuck::cast_slice(&self.positions)
    }
}

/// Creates chunks of `chunk_resolution²` tiles.
#[derive(Debug)]
pub struct ChunkFactory {
    chunk_size: f32,
    chunk_height: f32,
    chunk_resolution: i32,
    tiles: TileFactory,
}

impl ChunkFactory {
    /// Creates a chunk factory.
    ///
    /// `chunk_height` is the terrain height plus the maximum grass height.
    #[must_use]
    pub fn new(chunk_size: f32, chunk_height: f32, chunk_resolution: i32, tiles: TileFactory) -> Self {
        Self {
            chunk_size,
            chunk_height,
            chunk_resolution,
            tiles,
        }
    }

    /// World size of one chunk side.
    #[must_use]
    pub const fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    /// Vertical extent of every chunk's bounding box.
    #[must_use]
    pub const fn chunk_height(&self) -> f32 {
        self.chunk_height
    }

    /// Tiles per chunk side.
    #[must_use]
    pub const fn chunk_resolution(&self) -> i32 {
        self.chunk_resolution
    }

    /// The underlying tile factory.
    #[must_use]
    pub const fn tiles(&self) -> &TileFactory {
        &self.tiles
    }

    /// Builds the chunk at `coord`.
    #[must_use]
    pub fn make_chunk(&self, coord: ChunkCoord) -> Chunk {
        let (center_x, center_z) = coord.center(self.chunk_size);
        let half_height = self.chunk_height / 2.0;
        let position = Vec3::new(center_x, half_height, center_z);
        let half_extents = Vec3::new(self.chunk_size / 2.0, half_height, self.chunk_size / 2.0);

        let first = coord.first_tile(self.chunk_resolution);
        let count = (self.chunk_resolution * self.chunk_resolution) as usize;
        let mut positions = Vec::with_capacity(count);
        let mut records = Vec::with_capacity(count);

        for tz in 0..self.chunk_resolution {
            for tx in 0..self.chunk_resolution {
                let tile = self.tiles.make_tile(TileCoord::new(first.x + tx, first.z + tz));
                positions.push(tile.position.to_array());
                records.push(tile.record);
            }
        }

        trace!("Built {} with {} tiles", coord, records.len());

        Chunk {
            coord,
            position,
            aabb: Aabb::from_center(position, half_extents),
            resolution: self.chunk_resolution,
            positions,
            records,
        }
    }
}
