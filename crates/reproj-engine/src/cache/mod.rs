//! Process-wide registry of texture coordinates shared by meshes with the
//! same lattice size.

mod shared;

pub use shared::{texture_coordinates, SharedCoordinateCache, SharedCoordinates};
