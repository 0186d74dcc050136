//! Coordinate types for chunk and tile positions on the XZ ground plane.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Chunk coordinate (identifies a chunk in the streaming grid).
///
/// Chunk `(x, z)` covers the world square
/// `[x * chunk_size, (x + 1) * chunk_size) × [z * chunk_size, (z + 1) * chunk_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Z coordinate in chunk space
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Returns the chunk containing the world position `(world_x, world_z)`.
    ///
    /// Uses floor division, so `-0.5` lands in chunk `-1`, not `0`.
    #[must_use]
    pub fn containing(world_x: f32, world_z: f32, chunk_size: f32) -> Self {
        Self {
            x: (world_x / chunk_size).floor() as i32,
            z: (world_z / chunk_size).floor() as i32,
        }
    }

    /// Returns the world position of the chunk's minimum corner.
    #[must_use]
    pub fn origin(self, chunk_size: f32) -> (f32, f32) {
        (self.x as f32 * chunk_size, self.z as f32 * chunk_size)
    }

    /// Returns the world position of the chunk's center.
    #[must_use]
    pub fn center(self, chunk_size: f32) -> (f32, f32) {
        let half = chunk_size / 2.0;
        (
            self.x as f32 * chunk_size + half,
            self.z as f32 * chunk_size + half,
        )
    }

    /// Returns the first (minimum) tile coordinate inside this chunk.
    #[must_use]
    pub const fn first_tile(self, resolution: i32) -> TileCoord {
        TileCoord {
            x: self.x * resolution,
            z: self.z * resolution,
        }
    }

    /// Returns this coordinate shifted by `(dx, dz)` chunks.
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Chunk({}, {})", self.x, self.z)
    }
}

/// Global tile coordinate. Tiles are unit cells scaled by the tile size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct TileCoord {
    /// X coordinate in tile space
    pub x: i32,
    /// Z coordinate in tile space
    pub z: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Returns this coordinate shifted by `(dx, dz)` tiles.
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// Wraps both components into `[0, period)`, negative values included.
    #[must_use]
    pub const fn wrap(self, period: i32) -> Self {
        Self {
            x: self.x.rem_euclid(period),
            z: self.z.rem_euclid(period),
        }
    }
}

/// Linearly remaps `value` from `[src_start, src_end]` onto `[dst_start, dst_end]`.
///
/// The result is truncated toward zero. `src_start` and `src_end` must differ.
#[must_use]
pub fn map_range_i32(value: i32, src_start: i32, src_end: i32, dst_start: i32, dst_end: i32) -> i32 {
    let t = (value - src_start) as f32 / (src_end - src_start) as f32;
    (t * (dst_end - dst_start) as f32 + dst_start as f32) as i32
}
