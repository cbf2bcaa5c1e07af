/// Device-side failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// No adapter/device could be acquired.
    #[error("no graphics device available: {0}")]
    Unavailable(String),

    /// The upload is larger than the device allows for one buffer.
    #[error("buffer '{label}' of {size} bytes exceeds the device limit of {limit} bytes")]
    BufferTooLarge { label: String, size: u64, limit: u64 },

    /// The device refused the allocation.
    #[error("buffer '{label}' allocation failed: {reason}")]
    AllocationFailed { label: String, reason: String },
}
