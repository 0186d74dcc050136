//! Terrain, wind and grass parameters.
//!
//! All sizes are world units. Derived quantities follow from the block
//! layout: a heightmap block of `block_size` is split into
//! `block_resolution²` chunks, each of `chunk_resolution²` tiles.

use meadow_common::ConfigError;
use serde::{Deserialize, Serialize};

/// Terrain layout and streaming distances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// World size covered by one repetition of the heightmap
    pub block_size: f32,
    /// Chunks per block side
    pub block_resolution: i32,
    /// Tiles per chunk side
    pub chunk_resolution: i32,
    /// Height of a fully white heightmap pixel
    pub terrain_height: f32,
    /// Distance up to which terrain is drawn
    pub view_distance: f32,
    /// Extra unload distance beyond the load distance, in chunks
    pub unload_margin_chunks: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            block_size: 512.0,
            block_resolution: 8,
            chunk_resolution: 16,
            terrain_height: 40.0,
            view_distance: 256.0,
            unload_margin_chunks: 0.5,
        }
    }
}

impl TerrainConfig {
    /// Side length of a chunk.
    #[must_use]
    pub fn chunk_size(&self) -> f32 {
        self.block_size / self.block_resolution as f32
    }

    /// Side length of a tile.
    #[must_use]
    pub fn tile_size(&self) -> f32 {
        self.chunk_size() / self.chunk_resolution as f32
    }

    /// Tiles per heightmap repetition.
    #[must_use]
    pub const fn tiles_per_block(&self) -> i32 {
        self.block_resolution * self.chunk_resolution
    }

    /// Chunks whose center is closer than this are loaded.
    #[must_use]
    pub fn load_distance(&self) -> f32 {
        self.view_distance + self.chunk_size()
    }

    /// Chunks whose center is farther than this are unloaded.
    #[must_use]
    pub fn unload_distance(&self) -> f32 {
        self.load_distance() + self.unload_margin_chunks * self.chunk_size()
    }

    /// Checks that every parameter is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("block_size", self.block_size)?;
        positive("terrain_height", self.terrain_height)?;
        positive("view_distance", self.view_distance)?;
        positive("unload_margin_chunks", self.unload_margin_chunks)?;
        at_least("block_resolution", self.block_resolution.into(), 1)?;
        at_least("chunk_resolution", self.chunk_resolution.into(), 1)?;
        at_least("tiles_per_block", self.tiles_per_block().into(), 2)?;
        Ok(())
    }
}

/// Wind grid parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindConfig {
    /// Cells from the grid center to its edge; the side is `2 * radius + 1`
    pub radius: i32,
    /// Bell curve tightness; higher values give a narrower, stronger peak
    pub influence: f32,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            radius: 32,
            influence: 1.0,
        }
    }
}

impl WindConfig {
    /// Checks that every parameter is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        at_least("wind radius", self.radius.into(), 1)?;
        positive("wind influence", self.influence)
    }
}

/// Grass blade parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrassConfig {
    /// Blades per tile
    pub blade_count: u32,
    /// Maximum blade height
    pub blade_height: f32,
    /// Seed for scattering blade roots
    pub seed: u64,
}

impl Default for GrassConfig {
    fn default() -> Self {
        Self {
            blade_count: 64,
            blade_height: 1.5,
            seed: 0x5EED,
        }
    }
}

impl GrassConfig {
    /// Checks that every parameter is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("blade_height", self.blade_height)
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

fn at_least(name: &'static str, value: i64, min: i64) -> Result<(), ConfigError> {
    if value >= min {
        Ok(())
    } else {
        Err(ConfigError::TooSmall { name, min, value })
    }
}
