//! wgpu drawing of compiled meshes.
//!
//! Convention:
//! - vertex positions are target-grid pixels (pixel centers on integers,
//!   row 0 at the top); the vertex shader maps them to NDC
//! - texture coordinates are `[0, 1]` over the source grid, row 0 at the top
//! - per-draw alpha is applied through the blend constant

mod layout;
mod painter;
mod pipeline;

pub use layout::{MeshTexCoord, MeshVertex, TargetUniform};
pub use painter::WgpuPainter;
pub use pipeline::{MeshBindings, MeshPipeline};
