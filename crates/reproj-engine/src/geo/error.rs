/// Failure to transform a point or to derive a transform.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// The input lies outside the domain of the transform (e.g. a singularity).
    #[error("point ({x}, {y}) is outside the domain of {transform}")]
    OutOfDomain { transform: &'static str, x: f64, y: f64 },

    /// A transform could not be inverted.
    #[error("transform is not invertible: {0}")]
    NotInvertible(String),

    /// Any other collaborator failure.
    #[error("transform failed: {0}")]
    Failed(String),
}
