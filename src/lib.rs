//! Foundation and ground heat transfer on a two-dimensional finite-volume grid.
//!
//! See [`sim::ground`] for the model and [`sim::heat_transfer`] for the
//! underlying conduction solver.

pub mod geom;
pub mod sim;

// Prelude
pub use geom::footprint::{Footprint, Point2};
pub use sim::ground::{
    BoundaryConditionSeries, BoundaryConditions, Foundation, Ground, GroundError, GroundResult,
    OutputKind, Settings, SurfaceKind,
};
pub use sim::materials::{Layer, Material};
