/// Mesh lifecycle.
///
/// `New -> Calculating -> {Calculated | Invalid} -> Compiled -> Invalid`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MeshState {
    /// Constructed, `initialize` not called yet.
    New,
    /// Calculation scheduled or running.
    Calculating,
    /// Geometry computed on the CPU, not uploaded.
    Calculated,
    /// Uploaded and drawable.
    Compiled,
    /// Failed or disposed; never drawn again.
    Invalid,
}

/// Outcome of one `paint` call.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PaintStatus {
    Painted,
    /// Nothing drawn yet; a repaint was requested.
    Repaint,
    /// Nothing drawn and nothing will be.
    Error,
}

/// Per-paint parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PaintProperties {
    pub alpha: f32,
}

impl Default for PaintProperties {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}
