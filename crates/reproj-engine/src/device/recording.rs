use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use super::{
    BufferDesc, BufferUsage, DeviceCapabilities, DeviceError, DrawIndirectArgs, DrawPass,
    DrawRanges, MeshDevice, MeshPainter, StripDraw, TextureWrap,
};

/// Software mesh device.
///
/// Keeps uploaded bytes in host memory and counts live buffers, so headless
/// hosts and tests can inspect exactly what would have reached the GPU.
#[derive(Debug)]
pub struct RecordingDevice {
    capabilities: DeviceCapabilities,
    next_id: AtomicU64,
    live: Arc<AtomicUsize>,
    created: AtomicUsize,
    fail_uploads: AtomicBool,
}

impl RecordingDevice {
    pub fn new(capabilities: DeviceCapabilities) -> Self {
        Self {
            capabilities,
            next_id: AtomicU64::new(1),
            live: Arc::new(AtomicUsize::new(0)),
            created: AtomicUsize::new(0),
            fail_uploads: AtomicBool::new(false),
        }
    }

    /// Device that draws one call per segment.
    pub fn single_draw() -> Self {
        Self::new(DeviceCapabilities { multi_draw: false })
    }

    /// Device that supports indirect multi-draw.
    pub fn multi_draw() -> Self {
        Self::new(DeviceCapabilities { multi_draw: true })
    }

    /// Buffers created and not yet dropped.
    pub fn live_buffers(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Buffers created over the device lifetime.
    pub fn buffers_created(&self) -> usize {
        self.created.load(Ordering::Acquire)
    }

    /// Makes every following upload fail, simulating device memory exhaustion.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::Release);
    }
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::single_draw()
    }
}

impl MeshDevice for RecordingDevice {
    type Buffer = RecordedBuffer;

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<RecordedBuffer, DeviceError> {
        if self.fail_uploads.load(Ordering::Acquire) {
            return Err(DeviceError::AllocationFailed {
                label: desc.label.to_string(),
                reason: "uploads disabled on recording device".to_string(),
            });
        }
        self.created.fetch_add(1, Ordering::AcqRel);
        self.live.fetch_add(1, Ordering::AcqRel);
        Ok(RecordedBuffer {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            label: desc.label.to_string(),
            usage: desc.usage,
            data: desc.contents.to_vec(),
            live: Arc::clone(&self.live),
        })
    }
}

/// A host-memory copy of an uploaded buffer.
#[derive(Debug)]
pub struct RecordedBuffer {
    id: u64,
    label: String,
    usage: BufferUsage,
    data: Vec<u8>,
    live: Arc<AtomicUsize>,
}

impl RecordedBuffer {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Contents reinterpreted as floats (vertex buffers).
    pub fn floats(&self) -> Vec<f32> {
        bytemuck::pod_collect_to_vec(&self.data)
    }

    /// Contents reinterpreted as indirect draw records.
    pub fn indirect_args(&self) -> Vec<DrawIndirectArgs> {
        bytemuck::pod_collect_to_vec(&self.data)
    }
}

impl Drop for RecordedBuffer {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/// One recorded `draw_strips` call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub pass: DrawPass,
    pub vertex_buffer: u64,
    pub tex_coord_buffer: u64,
    /// `(first, count)` per strip.
    pub strips: Vec<(u32, u32)>,
    /// Driver calls this draw would cost.
    pub driver_calls: usize,
    pub wrap: TextureWrap,
    pub alpha: f32,
}

/// Painter for [`RecordingDevice`]; records draws instead of issuing them.
#[derive(Debug)]
pub struct RecordingPainter<'d> {
    device: &'d RecordingDevice,
    wrap: TextureWrap,
    draws: Vec<DrawRecord>,
    repaint_requested: bool,
}

impl<'d> RecordingPainter<'d> {
    pub fn new(device: &'d RecordingDevice) -> Self {
        Self {
            device,
            wrap: TextureWrap::Clamp,
            draws: Vec::new(),
            repaint_requested: false,
        }
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn repaint_requested(&self) -> bool {
        self.repaint_requested
    }

    /// Clears per-frame records (draws and the repaint flag).
    pub fn begin_frame(&mut self) {
        self.draws.clear();
        self.repaint_requested = false;
    }
}

impl MeshPainter for RecordingPainter<'_> {
    type Device = RecordingDevice;

    fn device(&self) -> &RecordingDevice {
        self.device
    }

    fn set_texture_wrap(&mut self, wrap: TextureWrap) {
        self.wrap = wrap;
    }

    fn draw_strips(&mut self, draw: StripDraw<'_, RecordedBuffer>) {
        let (strips, driver_calls) = match &draw.ranges {
            DrawRanges::Segments(_) => {
                let strips: Vec<_> = draw.ranges.iter().collect();
                let calls = strips.len();
                (strips, calls)
            }
            DrawRanges::MultiDraw { indirect, .. } => {
                // Read back what the GPU would consume.
                let strips = indirect
                    .indirect_args()
                    .iter()
                    .map(|a| (a.first_vertex, a.vertex_count))
                    .collect();
                (strips, 1)
            }
        };
        self.draws.push(DrawRecord {
            pass: draw.pass,
            vertex_buffer: draw.vertices.id(),
            tex_coord_buffer: draw.tex_coords.id(),
            strips,
            driver_calls,
            wrap: self.wrap,
            alpha: draw.alpha,
        });
    }

    fn request_repaint(&mut self) {
        self.repaint_requested = true;
    }
}
