//! Headless device setup.
//!
//! Debug builds turn on the wgpu validation layer and route uncaptured
//! device errors to the log.

use meadow_common::BackendError;
use tracing::{debug, error, info};

/// Instance flags for the build profile: validation in debug builds only.
fn validation_flags() -> wgpu::InstanceFlags {
    if cfg!(debug_assertions) {
        wgpu::InstanceFlags::debugging()
    } else {
        wgpu::InstanceFlags::empty()
    }
}

/// Requests a headless device and queue.
///
/// `force_fallback` asks for a software adapter, which is what CI usually has.
pub async fn request_device(force_fallback: bool) -> Result<(wgpu::Device, wgpu::Queue), BackendError> {
    let flags = validation_flags();
    debug!("Creating wgpu instance with {flags:?}");
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags,
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: force_fallback,
        })
        .await
        .ok_or(BackendError::AdapterUnavailable)?;

    let adapter_info = adapter.get_info();
    info!("Using GPU adapter: {} ({:?})", adapter_info.name, adapter_info.backend);

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Meadow Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        )
        .await
        .map_err(|e| BackendError::DeviceRequest(e.to_string()))?;

    device.on_uncaptured_error(Box::new(|e| error!("Uncaptured wgpu error: {e}")));
    Ok((device, queue))
}
