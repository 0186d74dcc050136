//! Host-memory backend.
//!
//! Keeps every buffer in a `Vec<f32>`, runs the wind kernel on the CPU and
//! records draw calls instead of rasterizing. Used for headless runs and
//! tests.

use meadow_common::BackendError;
use tracing::trace;

use crate::backend::{BufferTarget, DrawCall, RenderBackend};
use crate::wind::{advance_velocity, WindParams, WIND_WORKGROUP_SIZE};

/// Counters for work submitted to a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Floats uploaded
    pub floats_uploaded: usize,
    /// Buffer resizes
    pub resizes: usize,
    /// Kernel dispatches
    pub dispatches: usize,
    /// Draw calls
    pub draws: usize,
}

/// Backend that keeps all buffers in host memory.
#[derive(Debug, Default)]
pub struct CpuBackend {
    buffers: [Vec<f32>; 5],
    allocated: [bool; 5],
    scratch: Vec<[f32; 4]>,
    last_draw: Option<DrawCall>,
    stats: BackendStats,
}

impl CpuBackend {
    /// Creates a backend with no allocated buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of `target`.
    #[must_use]
    pub fn buffer(&self, target: BufferTarget) -> &[f32] {
        &self.buffers[target.index()]
    }

    /// The most recent draw call.
    #[must_use]
    pub const fn last_draw(&self) -> Option<&DrawCall> {
        self.last_draw.as_ref()
    }

    /// Work submitted so far.
    #[must_use]
    pub const fn stats(&self) -> &BackendStats {
        &self.stats
    }

    fn require(&self, target: BufferTarget) -> Result<(), BackendError> {
        if self.allocated[target.index()] {
            Ok(())
        } else {
            Err(BackendError::UnknownBuffer(target.label()))
        }
    }
}

impl RenderBackend for CpuBackend {
    fn upload_flat_buffer(&mut self, target: BufferTarget, data: &[f32]) -> Result<(), BackendError> {
        let buffer = &mut self.buffers[target.index()];
        if !self.allocated[target.index()] || data.len() > buffer.len() {
            return Err(BackendError::BufferTooSmall {
                target: target.label(),
                capacity: buffer.len(),
                len: data.len(),
            });
        }
        buffer[..data.len()].copy_from_slice(data);
        self.stats.floats_uploaded += data.len();
        Ok(())
    }

    fn resize_device_buffer(&mut self, target: BufferTarget, element_count: usize) -> Result<(), BackendError> {
        let len = element_count * target.element_floats();
        let buffer = &mut self.buffers[target.index()];
        self.allocated[target.index()] = true;
        if buffer.len() != len {
            trace!("Resizing {} to {} floats", target.label(), len);
            buffer.resize(len, 0.0);
            self.stats.resizes += 1;
        }
        Ok(())
    }

    fn invoke_parallel_kernel(&mut self, workgroup_count: u32, params: &WindParams) -> Result<(), BackendError> {
        self.require(BufferTarget::WindVelocity)?;
        self.require(BufferTarget::WindAcceleration)?;
        let velocity: &[[f32; 4]] = bytemuck::cast_slice(&self.buffers[BufferTarget::WindVelocity.index()]);
        let acceleration: &[[f32; 4]] =
            bytemuck::cast_slice(&self.buffers[BufferTarget::WindAcceleration.index()]);

        let threads = workgroup_count as usize * WIND_WORKGROUP_SIZE as usize;
        let cells = velocity.len().min(threads);

        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        scratch.extend_from_slice(velocity);
        advance_velocity(velocity, acceleration, params, &mut scratch[..cells]);

        let out: &[f32] = bytemuck::cast_slice(&scratch);
        self.buffers[BufferTarget::WindVelocity.index()].copy_from_slice(out);
        self.scratch = scratch;
        self.stats.dispatches += 1;
        Ok(())
    }

    fn render_draw_buffer(&mut self, draw: &DrawCall) -> Result<(), BackendError> {
        self.require(BufferTarget::TileData)?;
        self.require(BufferTarget::GrassRoots)?;
        self.last_draw = Some(*draw);
        self.stats.draws += 1;
        Ok(())
    }
}
