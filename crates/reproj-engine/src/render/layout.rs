use bytemuck::{Pod, Zeroable};

// ── vertex slot 0 ─────────────────────────────────────────────────────────

/// One compiled mesh vertex, target-grid pixels.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct MeshVertex {
    pub pos: [f32; 2],
}

impl MeshVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

// ── vertex slot 1 ─────────────────────────────────────────────────────────

/// Texture coordinate paired with the vertex of the same index.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct MeshTexCoord {
    pub uv: [f32; 2],
}

impl MeshTexCoord {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshTexCoord>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

// ── uniform ───────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct TargetUniform {
    /// Target grid width/height in pixels.
    pub size: [f32; 2],
    pub _pad: [f32; 2], // 16-byte alignment
}
