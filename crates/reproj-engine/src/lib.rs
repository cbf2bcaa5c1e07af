//! Reproj engine crate.
//!
//! Maps a source data grid onto the pixel space of a target map projection by
//! computing a sparse lattice of reprojected vertices off the render thread and
//! drawing it as triangle strips with shared texture coordinates.

pub mod cache;
pub mod coords;
pub mod device;
pub mod geo;
pub mod geometry;
pub mod logging;
pub mod mesh;
pub mod render;
pub mod scheduler;
