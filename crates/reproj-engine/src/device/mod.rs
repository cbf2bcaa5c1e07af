//! Graphics device abstraction.
//!
//! The mesh layer only needs three things from a GPU: upload an immutable
//! buffer, report whether one call can draw many strips, and issue strip
//! draws. Those are [`MeshDevice`] and [`MeshPainter`]; `wgpu` and a software
//! recorder implement them.

mod error;
mod recording;
mod traits;
mod wgpu_device;

pub use error::DeviceError;
pub use recording::{DrawRecord, RecordedBuffer, RecordingDevice, RecordingPainter};
pub use traits::{
    BufferDesc, BufferUsage, DeviceCapabilities, DrawIndirectArgs, DrawPass, DrawRanges,
    MeshDevice, MeshPainter, StripDraw, TextureWrap,
};
pub use wgpu_device::{HeadlessInit, WgpuDevice};
