use crate::device::DeviceError;
use crate::geo::TransformError;
use crate::geometry::GeometryError;

/// Mesh failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    /// A transform could not be derived; fatal to this mesh.
    #[error("invalid mesh configuration: {what}")]
    Configuration {
        what: &'static str,
        #[source]
        source: TransformError,
    },

    /// A lattice point could not be projected.
    #[error("mesh transform failed: {0}")]
    Transform(#[from] TransformError),

    /// The caller broke the mesh contract (e.g. paint before initialize).
    #[error("mesh contract violated: {0}")]
    Contract(&'static str),

    #[error("mesh geometry: {0}")]
    Geometry(GeometryError),

    #[error("mesh upload: {0}")]
    Device(#[from] DeviceError),
}

impl From<GeometryError> for MeshError {
    fn from(e: GeometryError) -> Self {
        match e {
            GeometryError::Device(e) => MeshError::Device(e),
            other => MeshError::Geometry(other),
        }
    }
}
