//! Geographic collaborators: map projections, grid geometries and the
//! antimeridian wrap checker.
//!
//! The projection math itself lives behind [`MapProjection`]; this module only
//! composes projections with pixel grids and answers wrap questions.

mod error;
mod geometry;
mod projection;
mod wrap;

pub use error::TransformError;
pub use geometry::{GridGeometry, GridToLatLon, LatLonToGrid, PointTransform};
pub use projection::{roll_longitude, Equirectangular, MapProjection};
pub use wrap::{source_wrap_columns, WorldWrapChecker, WrapCheck};
