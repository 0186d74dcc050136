//! wgpu backend.
//!
//! Each [`BufferTarget`] maps to one storage buffer. Resizing allocates a new
//! buffer and copies the overlapping prefix on the device. The wind kernel
//! reads `velocity_in`, writes a scratch buffer of the same size, and the
//! scratch is copied back so the next dispatch sees the new state.

use bytemuck::{Pod, Zeroable};
use meadow_common::BackendError;
use tracing::{debug, info};
use wgpu::util::DeviceExt;
use wgpu::{Device, Queue};

use crate::backend::{BufferTarget, DrawCall, RenderBackend};
use crate::cpu_backend::BackendStats;
use crate::validation::request_device;
use crate::wind::{WindParams, WIND_SHADER};

/// Per-frame draw constants, laid out as a 64-byte uniform block.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    /// Camera position
    pub camera_position: [f32; 3],
    /// World size of one tile
    pub tile_size: f32,
    /// Terrain fade start and end
    pub terrain_fade: [f32; 2],
    /// Grass fade start and end
    pub grass_fade: [f32; 2],
    /// Tile instances
    pub tile_count: u32,
    /// Blades per tile
    pub blade_count: u32,
    /// Maximum blade height
    pub blade_height: f32,
    /// Wind grid radius
    pub wind_radius: i32,
    /// Simulated wind time
    pub time: f32,
    /// Padding to 64 bytes
    pub padding: [f32; 3],
}

impl From<&DrawCall> for DrawUniforms {
    fn from(draw: &DrawCall) -> Self {
        Self {
            camera_position: draw.camera_position,
            tile_size: draw.tile_size,
            terrain_fade: draw.terrain_fade,
            grass_fade: draw.grass_fade,
            tile_count: draw.tile_count,
            blade_count: draw.blade_count,
            blade_height: draw.blade_height,
            wind_radius: draw.wind_radius,
            time: draw.time,
            padding: [0.0; 3],
        }
    }
}

struct DeviceBuffer {
    buffer: wgpu::Buffer,
    len: usize,
}

impl DeviceBuffer {
    fn new(device: &Device, label: &str, len: usize) -> Self {
        // Empty storage bindings are invalid, keep at least one vec4
        let size = (len.max(4) * std::mem::size_of::<f32>()) as u64;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        Self { buffer, len }
    }

    fn byte_len(&self) -> u64 {
        (self.len * std::mem::size_of::<f32>()) as u64
    }
}

/// Backend that keeps all buffers on a wgpu device.
pub struct GpuBackend {
    device: Device,
    queue: Queue,
    buffers: [Option<DeviceBuffer>; 5],
    velocity_scratch: Option<DeviceBuffer>,
    params_buffer: wgpu::Buffer,
    draw_buffer: wgpu::Buffer,
    wind_layout: wgpu::BindGroupLayout,
    wind_pipeline: wgpu::ComputePipeline,
    last_draw: Option<DrawCall>,
    stats: BackendStats,
}

impl GpuBackend {
    /// Opens a headless device and builds the wind pipeline.
    pub fn new(force_fallback: bool) -> Result<Self, BackendError> {
        let (device, queue) = pollster::block_on(request_device(force_fallback))?;
        Ok(Self::from_device(device, queue))
    }

    /// Builds the backend on an existing device.
    pub fn from_device(device: Device, queue: Queue) -> Self {
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Wind Params Buffer"),
            contents: bytemuck::bytes_of(&WindParams::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let draw_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Draw Uniforms Buffer"),
            contents: bytemuck::bytes_of(&DrawUniforms::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let wind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Wind Bind Group Layout"),
            entries: &[
                storage(0, true),
                storage(1, false),
                storage(2, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Wind Shader"),
            source: wgpu::ShaderSource::Wgsl(WIND_SHADER.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Wind Pipeline Layout"),
            bind_group_layouts: &[&wind_layout],
            push_constant_ranges: &[],
        });
        let wind_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Wind Compute Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        info!("GPU backend ready");

        Self {
            device,
            queue,
            buffers: Default::default(),
            velocity_scratch: None,
            params_buffer,
            draw_buffer,
            wind_layout,
            wind_pipeline,
            last_draw: None,
            stats: BackendStats::default(),
        }
    }

    /// The device.
    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// Uniform buffer holding the last [`DrawUniforms`].
    #[must_use]
    pub const fn draw_uniforms(&self) -> &wgpu::Buffer {
        &self.draw_buffer
    }

    /// Device buffer behind `target`, once allocated.
    #[must_use]
    pub fn buffer(&self, target: BufferTarget) -> Option<&wgpu::Buffer> {
        self.buffers[target.index()].as_ref().map(|b| &b.buffer)
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

    fn require(&self, target: BufferTarget) -> Result<&DeviceBuffer, BackendError> {
        self.buffers[target.index()]
            .as_ref()
            .ok_or(BackendError::UnknownBuffer(target.label()))
    }

    /// Copies `target` back to the host. Blocks until the device is idle.
    pub fn read_buffer(&self, target: BufferTarget) -> Result<Vec<f32>, BackendError> {
        let source = self.require(target)?;
        if source.len == 0 {
            return Ok(Vec::new());
        }

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging Buffer"),
            size: source.byte_len(),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_buffer_to_buffer(&source.buffer, 0, &staging, 0, source.byte_len());
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(BackendError::Readback(e.to_string())),
            Err(e) => return Err(BackendError::Readback(e.to_string())),
        }
        let data = slice.get_mapped_range();
        let floats: Vec<f32> = bytemuck::cast_slice(&data[..]).to_vec();
        drop(data);
        staging.unmap();
        Ok(floats)
    }
}

impl RenderBackend for GpuBackend {
    fn upload_flat_buffer(&mut self, target: BufferTarget, data: &[f32]) -> Result<(), BackendError> {
        let capacity = self.buffers[target.index()].as_ref().map_or(0, |b| b.len);
        let buffer = match &self.buffers[target.index()] {
            Some(b) if data.len() <= b.len => &b.buffer,
            _ => {
                return Err(BackendError::BufferTooSmall {
                    target: target.label(),
                    capacity,
                    len: data.len(),
                })
            }
        };
        if !data.is_empty() {
            self.queue.write_buffer(buffer, 0, bytemuck::cast_slice(data));
        }
        self.stats.floats_uploaded += data.len();
        Ok(())
    }

    fn resize_device_buffer(&mut self, target: BufferTarget, element_count: usize) -> Result<(), BackendError> {
        let len = element_count * target.element_floats();
        let slot = &mut self.buffers[target.index()];
        if slot.as_ref().is_some_and(|b| b.len == len) {
            return Ok(());
        }

        let resized = DeviceBuffer::new(&self.device, target.label(), len);
        if let Some(old) = slot.take() {
            let keep = old.byte_len().min(resized.byte_len());
            if keep > 0 {
                let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Resize Encoder"),
                });
                encoder.copy_buffer_to_buffer(&old.buffer, 0, &resized.buffer, 0, keep);
                self.queue.submit(std::iter::once(encoder.finish()));
            }
        }
        debug!("Resized {} to {} floats", target.label(), len);
        *slot = Some(resized);
        self.stats.resizes += 1;
        Ok(())
    }

    fn invoke_parallel_kernel(&mut self, workgroup_count: u32, params: &WindParams) -> Result<(), BackendError> {
        let velocity_len = self.require(BufferTarget::WindVelocity)?.len;
        self.require(BufferTarget::WindAcceleration)?;
        if self.velocity_scratch.as_ref().map_or(true, |b| b.len != velocity_len) {
            self.velocity_scratch = Some(DeviceBuffer::new(&self.device, "Wind Velocity Scratch", velocity_len));
        }

        let (Some(velocity), Some(acceleration), Some(scratch)) = (
            self.buffers[BufferTarget::WindVelocity.index()].as_ref(),
            self.buffers[BufferTarget::WindAcceleration.index()].as_ref(),
            self.velocity_scratch.as_ref(),
        ) else {
            return Err(BackendError::UnknownBuffer(BufferTarget::WindVelocity.label()));
        };

        self.queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(params));

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Wind Bind Group"),
            layout: &self.wind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: velocity.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: scratch.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: acceleration.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.params_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Wind Compute Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Wind Compute Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.wind_pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(workgroup_count, 1, 1);
        }
        if velocity.len > 0 {
            encoder.copy_buffer_to_buffer(&scratch.buffer, 0, &velocity.buffer, 0, velocity.byte_len());
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        self.stats.dispatches += 1;
        Ok(())
    }

    fn render_draw_buffer(&mut self, draw: &DrawCall) -> Result<(), BackendError> {
        self.require(BufferTarget::TileData)?;
        self.require(BufferTarget::GrassRoots)?;
        self.queue
            .write_buffer(&self.draw_buffer, 0, bytemuck::bytes_of(&DrawUniforms::from(draw)));
        self.last_draw = Some(*draw);
        self.stats.draws += 1;
        Ok(())
    }
}

impl std::fmt::Debug for GpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBackend")
            .field("allocated", &self.buffers.iter().map(|b| b.as_ref().map(|b| b.len)).collect::<Vec<_>>())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindConfig;
    use crate::wind::{advance_velocity, WindField};
    use glam::Vec3;

    /// Returns a backend on any available adapter, or `None` on machines without one.
    fn backend() -> Option<GpuBackend> {
        GpuBackend::new(false).or_else(|_| GpuBackend::new(true)).ok()
    }

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 64);
    }

    #[test]
    fn test_resize_keeps_prefix() {
        let Some(mut gpu) = backend() else {
            return;
        };
        gpu.resize_device_buffer(BufferTarget::GrassRoots, 2).unwrap();
        gpu.upload_flat_buffer(BufferTarget::GrassRoots, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        gpu.resize_device_buffer(BufferTarget::GrassRoots, 3).unwrap();
        assert_eq!(
            gpu.read_buffer(BufferTarget::GrassRoots).unwrap(),
            vec![1.0, 2.0, 3.0, 4.0, 0.0, 0.0]
        );
        assert!(gpu.upload_flat_buffer(BufferTarget::GrassRoots, &[0.0; 7]).is_err());
    }

    #[test]
    fn test_wind_kernel_matches_host() {
        let Some(mut gpu) = backend() else {
            return;
        };
        let mut wind = WindField::new(&WindConfig { radius: 5, influence: 1.0 }, 1.0);
        for (target, data) in [
            (BufferTarget::WindVelocity, wind.velocity()),
            (BufferTarget::WindAcceleration, wind.acceleration()),
        ] {
            gpu.resize_device_buffer(target, wind.field_size()).unwrap();
            gpu.upload_flat_buffer(target, bytemuck::cast_slice(data)).unwrap();
        }

        let mut host = wind.velocity().to_vec();
        let mut pos = Vec3::ZERO;
        for step in 0..4 {
            let delta = Vec3::new(0.7, 0.0, -0.4 * step as f32);
            pos += delta;
            let params = wind.update(pos, delta);
            gpu.invoke_parallel_kernel(wind.workgroup_count(), &params).unwrap();

            let mut next = vec![[0.0; 4]; host.len()];
            advance_velocity(&host, wind.acceleration(), &params, &mut next);
            host = next;
        }

        let device = gpu.read_buffer(BufferTarget::WindVelocity).unwrap();
        let host: &[f32] = bytemuck::cast_slice(&host);
        for (d, h) in device.iter().zip(host) {
            assert!((d - h).abs() < 1e-4, "{d} vs {h}");
        }
    }
}
