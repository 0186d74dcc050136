//! # Meadow Common
//!
//! Common types, utilities, and shared abstractions for Meadow.
//!
//! This crate provides foundational types used across the terrain core:
//! - Coordinate types (chunk, tile)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_tile_relationship() {
        let chunk = ChunkCoord::containing(100.0, -1.0, 32.0);
        assert_eq!(chunk, ChunkCoord::new(3, -1));
        assert_eq!(chunk.first_tile(4), TileCoord::new(12, -4));
    }
}
