use bytemuck::{Pod, Zeroable};

use super::DeviceError;

/// Capability flags that select how compiled geometry is drawn.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DeviceCapabilities {
    /// One driver call can draw every segment of a buffer (indirect multi-draw).
    pub multi_draw: bool,
}

/// What an uploaded buffer is bound as.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    Vertex,
    Indirect,
}

/// Immutable buffer upload request.
#[derive(Debug, Copy, Clone)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub usage: BufferUsage,
    pub contents: &'a [u8],
}

/// Allocates device-resident buffers.
///
/// Buffers are released when dropped, so a compiled geometry frees its device
/// storage deterministically on dispose.
pub trait MeshDevice: Send + Sync {
    type Buffer: Send + Sync;

    fn capabilities(&self) -> DeviceCapabilities;

    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<Self::Buffer, DeviceError>;
}

/// Horizontal texture addressing for the next draws.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum TextureWrap {
    #[default]
    Clamp,
    /// Worldwide sources repeat across the seam.
    Repeat,
}

/// Which part of a mesh a draw belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DrawPass {
    /// The filtered triangle strips.
    Primary,
    /// Triangles and quads rebuilt on both sides of the antimeridian.
    WrapFill,
}

/// Per-segment draw ranges of a compiled geometry.
#[derive(Debug)]
pub enum DrawRanges<'a, B> {
    /// Segment start indices followed by a sentinel equal to the point count.
    /// One draw call per segment.
    Segments(&'a [u32]),
    /// One indirect record per segment, drawn with a single call.
    MultiDraw {
        indirect: &'a B,
        starts: &'a [u32],
        lengths: &'a [u32],
    },
}

impl<B> DrawRanges<'_, B> {
    /// `(first, count)` for every segment.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (u32, u32)> + '_> {
        match self {
            DrawRanges::Segments(starts) => {
                Box::new(starts.windows(2).map(|w| (w[0], w[1] - w[0])))
            }
            DrawRanges::MultiDraw { starts, lengths, .. } => {
                Box::new(starts.iter().copied().zip(lengths.iter().copied()))
            }
        }
    }

    pub fn segment_count(&self) -> usize {
        match self {
            DrawRanges::Segments(starts) => starts.len().saturating_sub(1),
            DrawRanges::MultiDraw { starts, .. } => starts.len(),
        }
    }
}

/// One strip-draw request: paired vertex/texture buffers plus ranges.
#[derive(Debug)]
pub struct StripDraw<'a, B> {
    pub pass: DrawPass,
    pub vertices: &'a B,
    pub tex_coords: &'a B,
    pub ranges: DrawRanges<'a, B>,
    pub alpha: f32,
}

/// Render-thread drawing surface handed to `Mesh::paint`.
pub trait MeshPainter {
    type Device: MeshDevice;

    fn device(&self) -> &Self::Device;

    fn set_texture_wrap(&mut self, wrap: TextureWrap);

    fn draw_strips(&mut self, draw: StripDraw<'_, <Self::Device as MeshDevice>::Buffer>);

    /// Asks the host to paint again on a later frame.
    fn request_repaint(&mut self);
}

/// Indirect draw record, laid out as the GPU consumes it.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct DrawIndirectArgs {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}
