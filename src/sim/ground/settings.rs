use serde::{Deserialize, Serialize};

use crate::sim::ground::conditions::check_temperature;
use crate::sim::ground::error::{GroundError, GroundResult};
use crate::sim::heat_transfer::solver::{LinearSolver, SolverConfig};

/// Controls for the mesh builder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// Cell size at geometric discontinuities [m].
    pub min_cell_dim: f64,
    /// Ratio between the sizes of neighbouring cells.
    pub max_growth_coefficient: f64,
    /// Upper bound on the cell size [m].
    pub max_cell_dim: f64,
    /// Upper bound on the long/short side ratio of any solid cell.
    pub max_aspect_ratio: f64,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            min_cell_dim: 0.02,
            max_growth_coefficient: 1.5,
            max_cell_dim: 1.0,
            max_aspect_ratio: 100.0,
        }
    }
}

impl MeshSettings {
    pub fn validate(&self) -> GroundResult<()> {
        if !(self.min_cell_dim.is_finite() && self.min_cell_dim > 0.0) {
            return Err(GroundError::geometry(format!(
                "minimum cell dimension must be positive (got {})",
                self.min_cell_dim
            )));
        }
        if !(self.max_cell_dim.is_finite() && self.max_cell_dim >= self.min_cell_dim) {
            return Err(GroundError::geometry(format!(
                "maximum cell dimension {} is below the minimum {}",
                self.max_cell_dim, self.min_cell_dim
            )));
        }
        if !(self.max_growth_coefficient.is_finite() && self.max_growth_coefficient >= 1.0) {
            return Err(GroundError::geometry(format!(
                "growth coefficient must be at least 1 (got {})",
                self.max_growth_coefficient
            )));
        }
        if !(self.max_aspect_ratio.is_finite() && self.max_aspect_ratio >= 1.0) {
            return Err(GroundError::geometry(format!(
                "maximum aspect ratio must be at least 1 (got {})",
                self.max_aspect_ratio
            )));
        }
        Ok(())
    }
}

/// Time integration scheme (θ-method).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NumericalScheme {
    /// Forward Euler, θ = 0. Conditionally stable.
    Explicit,
    /// Backward Euler, θ = 1.
    #[default]
    Implicit,
    /// Trapezoidal rule, θ = 1/2.
    CrankNicolson,
}

impl NumericalScheme {
    pub fn theta(self) -> f64 {
        match self {
            NumericalScheme::Explicit => 0.0,
            NumericalScheme::Implicit => 1.0,
            NumericalScheme::CrankNicolson => 0.5,
        }
    }
}

/// How the temperature field is set before time stepping.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum InitialCondition {
    /// Steady-state solve with the first snapshot of the series.
    #[default]
    SteadyState,
    /// Same temperature everywhere [K].
    Uniform { temperature: f64 },
}

/// Solver, scheme and physical defaults for a [`crate::sim::ground::Ground`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mesh: MeshSettings,
    pub solver: SolverConfig,
    pub scheme: NumericalScheme,
    pub initial_condition: InitialCondition,
    /// Upper bound on the outer passes that update correlation-based
    /// coefficients in a steady solve.
    pub max_coefficient_passes: usize,
    /// Passes stop once no surface temperature moves by more than this [K].
    pub coefficient_tolerance: f64,
    /// Undisturbed ground temperature for `DeepGroundBoundary::AutoTemperature` [K].
    ///
    /// When absent the mean outdoor temperature of the driving conditions is used.
    pub annual_average_temperature: Option<f64>,
    /// Field temperature before the first solve [K].
    pub initial_guess_temperature: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mesh: MeshSettings::default(),
            solver: SolverConfig::default(),
            scheme: NumericalScheme::default(),
            initial_condition: InitialCondition::default(),
            max_coefficient_passes: 25,
            coefficient_tolerance: 1e-4,
            annual_average_temperature: None,
            initial_guess_temperature: 283.15,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> GroundResult<()> {
        self.mesh.validate()?;
        if self.solver.max_iterations == 0 {
            return Err(GroundError::boundary(
                "solver",
                "max_iterations must be at least 1",
            ));
        }
        if !(self.solver.tolerance.is_finite() && self.solver.tolerance > 0.0) {
            return Err(GroundError::boundary(
                "solver",
                format!("tolerance must be positive (got {})", self.solver.tolerance),
            ));
        }
        if let LinearSolver::Sor { relaxation } = self.solver.method {
            if !(relaxation > 0.0 && relaxation < 2.0) {
                return Err(GroundError::boundary(
                    "solver",
                    format!("SOR relaxation must lie in (0, 2) (got {relaxation})"),
                ));
            }
        }
        if self.max_coefficient_passes == 0 {
            return Err(GroundError::boundary(
                "solver",
                "max_coefficient_passes must be at least 1",
            ));
        }
        if let Some(t) = self.annual_average_temperature {
            check_temperature("deep ground", t)?;
        }
        check_temperature("initial guess", self.initial_guess_temperature)?;
        if let InitialCondition::Uniform { temperature } = self.initial_condition {
            check_temperature("initial condition", temperature)?;
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
