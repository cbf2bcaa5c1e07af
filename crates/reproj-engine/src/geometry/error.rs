use crate::device::DeviceError;

/// Geometry buffer failures.
///
/// Everything except `Device` is a caller contract violation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("geometry '{label}' is already compiled")]
    AlreadyCompiled { label: &'static str },

    #[error("geometry '{label}' has been disposed")]
    Disposed { label: &'static str },

    #[error("geometry '{label}': {len} floats is not a whole number of {dims}-d points")]
    Misaligned {
        label: &'static str,
        len: usize,
        dims: usize,
    },

    #[error("geometry '{label}' holds more points than a u32 index can address")]
    TooManyPoints { label: &'static str },

    #[error(transparent)]
    Device(#[from] DeviceError),
}
