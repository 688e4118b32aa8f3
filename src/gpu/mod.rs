// SPDX-License-Identifier: GPL-3.0-only

//! GPU initialization for the preview surface
//!
//! Picks an adapter that can present to the window surface, creates the
//! device and queue, and chooses the surface configuration.

use crate::errors::RenderError;
use tracing::{debug, info};

/// Information about the created GPU device
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, DX12, etc.)
    pub backend: wgpu::Backend,
}

/// Create a wgpu device and queue able to present to `surface`.
///
/// # Arguments
///
/// * `instance` - The instance the surface was created from
/// * `surface` - Window surface the device must be compatible with
/// * `label` - A label for the device (for debugging)
pub async fn create_surface_device(
    instance: &wgpu::Instance,
    surface: &wgpu::Surface<'_>,
    label: &str,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue, GpuDeviceInfo), RenderError> {
    info!(label = label, "Creating GPU device for preview");

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(surface),
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| RenderError::NoAdapter(e.to_string()))?;

    let adapter_info = adapter.get_info();
    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        "GPU adapter selected for preview"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                .using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await
        .map_err(|e| RenderError::Device(format!("Failed to create GPU device: {}", e)))?;

    let info = GpuDeviceInfo {
        adapter_name: adapter_info.name.clone(),
        backend: adapter_info.backend,
    };

    Ok((adapter, device, queue, info))
}

/// Surface configuration for a `width x height` window
///
/// Prefers a linear (non-sRGB) format so luminance bytes reach the display
/// without an extra transfer curve.
pub fn surface_config(
    surface: &wgpu::Surface<'_>,
    adapter: &wgpu::Adapter,
    width: u32,
    height: u32,
) -> Result<wgpu::SurfaceConfiguration, RenderError> {
    let caps = surface.get_capabilities(adapter);
    let format = preferred_format(&caps.formats)
        .ok_or_else(|| RenderError::Surface("surface reports no formats".into()))?;
    let alpha_mode = caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

    debug!(?format, ?alpha_mode, width, height, "Surface configuration");

    Ok(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: width.max(1),
        height: height.max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    })
}

/// First non-sRGB format, else the first format
pub fn preferred_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
}
