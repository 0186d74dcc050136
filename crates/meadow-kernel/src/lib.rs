//! # Meadow Kernel
//!
//! Real-time procedural terrain and vegetation core.
//!
//! This crate provides:
//! - Plane and bounding-box geometry with frustum classification
//! - Heightmap sampling with seamless, repeating borders
//! - Tile and chunk factories producing packed per-tile plane data
//! - Distance-based chunk streaming with hysteresis and a height query
//! - A camera-centered toroidal wind field
//! - A rendering backend seam with host and wgpu implementations
//!
//! ## Frame Flow
//!
//! Each frame the streamer unloads far chunks, loads near ones and culls the
//! rest against the view frustum. The wind field advances by one step on the
//! backend, and the visible tile data is uploaded and drawn.
//!
//! ## Validation
//!
//! `request_device` enables the wgpu validation layer in debug builds and
//! logs uncaptured device errors.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod chunk;
pub mod config;
pub mod cpu_backend;
pub mod frustum;
pub mod geometry;
pub mod gpu_backend;
pub mod grass;
pub mod heightmap;
pub mod streaming;
pub mod terrain;
pub mod tile;
pub mod validation;
pub mod wind;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::*;
    pub use crate::chunk::*;
    pub use crate::config::*;
    pub use crate::cpu_backend::*;
    pub use crate::frustum::*;
    pub use crate::geometry::*;
    pub use crate::gpu_backend::*;
    pub use crate::grass::*;
    pub use crate::heightmap::*;
    pub use crate::streaming::*;
    pub use crate::terrain::*;
    pub use crate::tile::*;
    pub use crate::validation::*;
    pub use crate::wind::*;
}

pub use prelude::*;
