//! Reprojected grid meshes.
//!
//! A [`Mesh`] maps a source grid onto a target map. Its lattice is computed on
//! a [`Scheduler`](crate::scheduler::Scheduler) worker, wrap-corrected and
//! filtered there, then compiled and drawn on the render thread.
//!
//! Flow per mesh:
//! - `initialize` derives transforms and schedules the calculation
//! - the worker samples a [`WorldLattice`], walks its strips and fills the
//!   primary and wrap-fill geometry
//! - the first `paint` after calculation compiles everything to the device
//! - later paints only draw

mod calculate;
mod controller;
mod error;
mod filter;
mod key;
mod lattice;
mod state;
mod wrap_fix;

pub use controller::{Mesh, MeshSnapshot};
pub use error::MeshError;
pub use filter::LargeTriangleFilter;
pub use key::MeshKey;
pub use lattice::{LatticeSampler, SamplerConfig, UniformSampler, WorldLattice};
pub use state::{MeshState, PaintProperties, PaintStatus};
pub use wrap_fix::{WrapCorrection, WrapCorrector, WrapTopology};
