//! Error types for foundation heat transfer.

use thiserror::Error;

use crate::sim::ground::output::SurfaceKind;

/// Result alias used throughout the ground model.
pub type GroundResult<T> = Result<T, GroundError>;

/// Errors raised while setting up or running a ground heat transfer solve.
///
/// `InvalidMaterial`, `Geometry` and `Boundary` form the configuration
/// family: they are always reported before any solve is attempted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GroundError {
    #[error("invalid material `{material}`: {property} must be positive and finite (got {value})")]
    InvalidMaterial {
        material: String,
        property: &'static str,
        value: f64,
    },

    #[error("invalid geometry: {0}")]
    Geometry(String),

    #[error("invalid boundary configuration for {region}: {reason}")]
    Boundary { region: &'static str, reason: String },

    #[error("solver did not converge after {iterations} iterations (last max change {max_change:.3e} K)")]
    ConvergenceFailure { iterations: usize, max_change: f64 },

    #[error("time step of {time_step} s exceeds the explicit stability limit of {limit:.3} s")]
    NumericalInstability { time_step: f64, limit: f64 },

    #[error("surface {0:?} has no faces in this mesh")]
    EmptySurface(SurfaceKind),

    #[error("no temperature field has been computed yet")]
    NotSolved,
}

impl GroundError {
    pub fn geometry(reason: impl Into<String>) -> Self {
        Self::Geometry(reason.into())
    }

    pub fn boundary(region: &'static str, reason: impl Into<String>) -> Self {
        Self::Boundary {
            region,
            reason: reason.into(),
        }
    }

    /// True for errors caused by the inputs rather than by the solve.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidMaterial { .. } | Self::Geometry(_) | Self::Boundary { .. }
        )
    }
}
