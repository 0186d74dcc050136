//! Rendering backend seam.
//!
//! The terrain core never talks to a graphics API directly. Everything it
//! needs from the device goes through [`RenderBackend`]: flat float uploads,
//! buffer resizes, the wind kernel dispatch and the final draw.

use meadow_common::BackendError;

use crate::tile::TILE_RECORD_FLOATS;
use crate::wind::WindParams;

/// Device buffers the terrain core writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Tile centers, per-instance vertex data
    TilePositions,
    /// Packed tile records
    TileData,
    /// Wind velocity grid
    WindVelocity,
    /// Wind acceleration grid
    WindAcceleration,
    /// Grass blade roots
    GrassRoots,
}

impl BufferTarget {
    /// Every target, in a fixed order.
    pub const ALL: [Self; 5] = [
        Self::TilePositions,
        Self::TileData,
        Self::WindVelocity,
        Self::WindAcceleration,
        Self::GrassRoots,
    ];

    /// Floats per element.
    #[must_use]
    pub const fn element_floats(self) -> usize {
        match self {
            Self::TilePositions => 3,
            Self::TileData => TILE_RECORD_FLOATS,
            Self::WindVelocity | Self::WindAcceleration => 4,
            Self::GrassRoots => 2,
        }
    }

    /// Debug label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TilePositions => "Tile Positions",
            Self::TileData => "Tile Data",
            Self::WindVelocity => "Wind Velocity",
            Self::WindAcceleration => "Wind Acceleration",
            Self::GrassRoots => "Grass Roots",
        }
    }

    /// Position in [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Everything the draw stage needs besides the uploaded buffers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DrawCall {
    /// Tile instances to draw
    pub tile_count: u32,
    /// World size of one tile
    pub tile_size: f32,
    /// Camera position
    pub camera_position: [f32; 3],
    /// Terrain fade start and end distance
    pub terrain_fade: [f32; 2],
    /// Grass blades per tile
    pub blade_count: u32,
    /// Maximum blade height
    pub blade_height: f32,
    /// Grass fade start and end distance
    pub grass_fade: [f32; 2],
    /// Wind grid radius in cells
    pub wind_radius: i32,
    /// Simulated wind time
    pub time: f32,
}

/// Device operations used by the terrain core.
pub trait RenderBackend {
    /// Copies `data` into the start of `target`.
    ///
    /// Fails with [`BackendError::BufferTooSmall`] when `target` holds fewer floats.
    fn upload_flat_buffer(&mut self, target: BufferTarget, data: &[f32]) -> Result<(), BackendError>;

    /// Resizes `target` to hold `element_count` elements, keeping the
    /// overlapping prefix of its contents.
    fn resize_device_buffer(&mut self, target: BufferTarget, element_count: usize) -> Result<(), BackendError>;

    /// Runs the wind kernel over `workgroup_count` workgroups.
    fn invoke_parallel_kernel(&mut self, workgroup_count: u32, params: &WindParams) -> Result<(), BackendError>;

    /// Draws the terrain and grass for the current buffers.
    fn render_draw_buffer(&mut self, draw: &DrawCall) -> Result<(), BackendError>;
}
