use anyhow::{Context, Result};
use wgpu::util::DeviceExt;

use super::{BufferDesc, BufferUsage, DeviceCapabilities, DeviceError, MeshDevice};

/// Initialization parameters for a headless device.
///
/// Keep this structure minimal; meshes only upload vertex and indirect buffers.
#[derive(Debug, Clone)]
pub struct HeadlessInit {
    pub power_preference: wgpu::PowerPreference,

    /// Use the software fallback adapter (useful on CI machines).
    pub force_fallback_adapter: bool,

    /// Required wgpu features.
    ///
    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,
}

impl Default for HeadlessInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        }
    }
}

/// Mesh device backed by wgpu.
///
/// Owns (or shares, via [`WgpuDevice::from_parts`]) the logical device and
/// queue used to upload compiled geometry.
pub struct WgpuDevice {
    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,

    /// Selected adapter description, for diagnostics.
    adapter_info: wgpu::AdapterInfo,

    capabilities: DeviceCapabilities,
}

impl WgpuDevice {
    /// Acquires an adapter and device without a surface.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(init: HeadlessInit) -> Result<Self> {
        let HeadlessInit {
            power_preference,
            force_fallback_adapter,
            required_features,
            required_limits,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("reproj-engine device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self::from_parts(&adapter, device, queue))
    }

    /// Blocking variant of [`WgpuDevice::new`] for hosts without an executor.
    pub fn new_blocking(init: HeadlessInit) -> Result<Self> {
        pollster::block_on(Self::new(init))
    }

    /// Wraps a device the host already created (e.g. the one bound to its
    /// window surface).
    pub fn from_parts(adapter: &wgpu::Adapter, device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let downlevel = adapter.get_downlevel_capabilities();
        let capabilities = DeviceCapabilities {
            multi_draw: downlevel
                .flags
                .contains(wgpu::DownlevelFlags::INDIRECT_EXECUTION),
        };
        let adapter_info = adapter.get_info();
        log::debug!(
            "mesh device on {} ({:?}), multi-draw: {}",
            adapter_info.name,
            adapter_info.backend,
            capabilities.multi_draw
        );

        Self {
            device,
            queue,
            adapter_info,
            capabilities,
        }
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }
}

impl MeshDevice for WgpuDevice {
    type Buffer = wgpu::Buffer;

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<wgpu::Buffer, DeviceError> {
        let size = desc.contents.len() as u64;
        let limit = self.device.limits().max_buffer_size;
        if size > limit {
            return Err(DeviceError::BufferTooLarge {
                label: desc.label.to_string(),
                size,
                limit,
            });
        }

        let usage = match desc.usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Indirect => wgpu::BufferUsages::INDIRECT,
        };

        Ok(self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(desc.label),
                contents: desc.contents,
                usage,
            }))
    }
}
