//! Finite Volume Method (FVM) conduction on structured 2D grids.
//!
//! Cells are laid out on a tensor grid of x and z edges, in Cartesian or
//! axisymmetric coordinates. Each cell is either solid (one material) or
//! air, and every solid cell side that touches air or the domain edge is a
//! [`BoundaryFace`] carrying a [`BoundaryCondition`].
//!
//! # Architecture
//!
//! ```text
//! StructuredMesh + [BoundaryCondition] ──► LinearSystem::assemble()
//!                                              │
//!                      time_step(C, T, dt, θ) ─┤
//!                                              ▼
//!                                   solve() ──► temperatures
//! ```
//!
//! The system stores a five-point stencil per cell, so the same solver code
//! serves steady and transient problems.

pub mod boundary;
pub mod mesh;
pub mod solver;
pub mod system;

pub use boundary::BoundaryCondition;
pub use mesh::{BoundaryFace, CoordinateSystem, Direction, StructuredMesh};
pub use solver::{ConvergenceStatus, LinearSolver, SolverConfig, solve};
pub use system::LinearSystem;
