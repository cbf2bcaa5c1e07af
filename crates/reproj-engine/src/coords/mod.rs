//! Coordinate types shared by the projection, mesh and geometry layers.
//!
//! Geographic points are `(longitude, latitude)` in degrees. Grid points are
//! pixel coordinates with the origin at the center of pixel `(0, 0)`.

mod affine;
mod point;

pub use affine::Affine2;
pub use point::Point;
