//! Tile factory: per-tile plane geometry sampled from the heightmap.
//!
//! A tile is a unit quad split along one diagonal into two triangles that
//! share corners 2 and 3. Both are wound counter-clockwise (1-2-3 and
//! 3-2-4) so their normals point up.
//!
//! ```text
//!    x ------->
//!  ^ 1-------3
//!  | |     / |
//!  | |   /   |
//!  | | /     |
//!  z 2-------4
//! ```
//!
//! Triangle 1 covers the part of the quad where the local offset satisfies
//! `rx < rz`, triangle 2 the rest.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use meadow_common::{map_range_i32, TileCoord};

use crate::geometry::Plane;
use crate::heightmap::Heightmap;

/// Number of `f32`s in one packed tile record.
pub const TILE_RECORD_FLOATS: usize = 12;

/// Level-of-detail flag written into every record.
pub const TILE_LOD: f32 = 3.0;

/// Packed per-tile data, laid out to match the device-side structure.
///
/// `vec4 triangle1, vec4 triangle2, vec2 center, float lod, float pad`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct TileRecord {
    /// Plane `(A, B, C, D)` of triangle 1-2-3
    pub triangle1: [f32; 4],
    /// Plane `(A, B, C, D)` of triangle 3-2-4
    pub triangle2: [f32; 4],
    /// Tile center `(x, z)`
    pub center: [f32; 2],
    /// Level of detail
    pub lod: f32,
    /// Padding to 48 bytes
    pub padding: f32,
}

impl TileRecord {
    /// Plane of triangle 1-2-3.
    #[must_use]
    pub fn plane1(&self) -> Plane {
        plane_from_array(self.triangle1)
    }

    /// Plane of triangle 3-2-4.
    #[must_use]
    pub fn plane2(&self) -> Plane {
        plane_from_array(self.triangle2)
    }

    /// Plane covering the local in-tile offset `(rx, rz)`.
    #[must_use]
    pub fn plane_for_offset(&self, rx: f32, rz: f32) -> Plane {
        if rx < rz {
            self.plane1()
        } else {
            self.plane2()
        }
    }
}

fn plane_from_array(coefficients: [f32; 4]) -> Plane {
    let v = Vec4::from_array(coefficients);
    Plane {
        normal: v.truncate(),
        d: v.w,
    }
}

/// A single tile: its center position and packed record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    /// Global tile coordinate
    pub coord: TileCoord,
    /// Center position, `y` is always zero
    pub position: Vec3,
    /// Packed plane data
    pub record: TileRecord,
}

/// Creates tiles from a heightmap that repeats every `tiles_per_block` tiles.
#[derive(Debug)]
pub struct TileFactory {
    tile_size: f32,
    tiles_per_block: i32,
    heightmap: Heightmap,
}

impl TileFactory {
    /// Creates a tile factory.
    ///
    /// `tiles_per_block` must be at least 2 so the pixel remap is defined.
    #[must_use]
    pub fn new(tile_size: f32, tiles_per_block: i32, heightmap: Heightmap) -> Self {
        debug_assert!(tiles_per_block >= 2, "tiles_per_block must be >= 2");
        Self {
            tile_size,
            tiles_per_block,
            heightmap,
        }
    }

    /// World size of one tile.
    #[must_use]
    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Tiles per heightmap repetition.
    #[must_use]
    pub const fn tiles_per_block(&self) -> i32 {
        self.tiles_per_block
    }

    /// The sampled heightmap.
    #[must_use]
    pub const fn heightmap(&self) -> &Heightmap {
        &self.heightmap
    }

    /// Builds the tile at global coordinate `coord`.
    #[must_use]
    pub fn make_tile(&self, coord: TileCoord) -> Tile {
        let c1 = coord.offset(0, 1);
        let c2 = coord;
        let c3 = coord.offset(1, 1);
        let c4 = coord.offset(1, 0);

        let p1 = self.corner_position(c1);
        let p2 = self.corner_position(c2);
        let p3 = self.corner_position(c3);
        let p4 = self.corner_position(c4);

        let tri1 = Plane::from_triangle(p1, p2, p3);
        let tri2 = Plane::from_triangle(p3, p2, p4);

        let center_x = (p1.x + p3.x) / 2.0;
        let center_z = (p1.z + p2.z) / 2.0;

        Tile {
            coord,
            position: Vec3::new(center_x, 0.0, center_z),
            record: TileRecord {
                triangle1: tri1.to_vec4().to_array(),
                triangle2: tri2.to_vec4().to_array(),
                center: [center_x, center_z],
                lod: TILE_LOD,
                padding: 0.0,
            },
        }
    }

    /// Height at tile corner `coord`, with the heightmap repeating in both axes.
    #[must_use]
    pub fn corner_height(&self, coord: TileCoord) -> f32 {
        let wrapped = coord.wrap(self.tiles_per_block);
        let last_tile = self.tiles_per_block - 1;
        let px = map_range_i32(wrapped.x, 0, last_tile, 0, self.heightmap.width() as i32 - 1);
        let pz = map_range_i32(wrapped.z, 0, last_tile, 0, self.heightmap.height() as i32 - 1);
        self.heightmap.height_at(px as u32, pz as u32)
    }

    fn corner_position(&self, coord: TileCoord) -> Vec3 {
        Vec3::new(
            coord.x as f32 * self.tile_size,
            self.corner_height(coord),
            coord.z as f32 * self.tile_size,
        )
    }
}
