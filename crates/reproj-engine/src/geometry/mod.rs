//! Growable point storage that compiles once into device buffers.
//!
//! A [`GeometryBuffer`] collects segments (triangle-strip runs) on the CPU
//! while a mesh is being calculated, then uploads them exactly once. After
//! compilation the CPU copy is gone and the buffer is draw-only.

mod buffer;
mod error;

pub use buffer::{CoordRole, DEFAULT_INITIAL_POINTS, GeometryBuffer, GeometryState, Topology};
pub use error::GeometryError;
