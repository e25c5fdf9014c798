//! Two-dimensional heat transfer between a building foundation and the ground.
//!
//! A [`Foundation`] is reduced to a 2D cross-section (Cartesian slice or
//! axisymmetric cylinder) whose perimeter, area and construction layers
//! reproduce the 3D heat loss. The cross-section is meshed, boundary
//! conditions are applied to named surfaces and the resulting system is
//! solved for steady state or stepped through time.
//!
//! ```text
//! Foundation + Settings ──► Ground::new() ──► GroundMesh
//!                                               │
//! BoundaryConditions ──► solve_steady() / step() / simulate()
//!                                               │
//!                      output(SurfaceKind, OutputKind) ──► GroundOutputValue
//! ```

pub mod applier;
pub mod conditions;
pub mod convection;
pub mod error;
pub mod foundation;
pub mod mesher;
pub mod output;
pub mod settings;
pub mod simulation;

pub use applier::{AppliedBoundaries, apply_boundary_conditions};
pub use conditions::{BoundaryConditionSeries, BoundaryConditions};
pub use error::{GroundError, GroundResult};
pub use foundation::{
    DeepGroundBoundary, Footing, Foundation, HorizontalInsulation, Slab, VerticalInsulation, Wall,
    WallTopBoundary,
};
pub use mesher::{CellRole, GroundMesh, Reduction, build_ground_mesh};
pub use output::{GroundOutputValue, OutputKind, SurfaceKind};
pub use settings::{InitialCondition, MeshSettings, NumericalScheme, Settings};
pub use simulation::{Ground, Solution};
