use tracing::{debug, warn};

use crate::sim::ground::applier::{
    AppliedBoundaries, apply_boundary_conditions, needs_coefficient_passes,
};
use crate::sim::ground::conditions::{BoundaryConditionSeries, BoundaryConditions};
use crate::sim::ground::error::{GroundError, GroundResult};
use crate::sim::ground::foundation::{DeepGroundBoundary, Foundation};
use crate::sim::ground::mesher::{GroundMesh, build_ground_mesh};
use crate::sim::ground::output::{GroundOutputValue, OutputKind, SurfaceKind, aggregate};
use crate::sim::ground::settings::{InitialCondition, NumericalScheme, Settings};
use crate::sim::heat_transfer::boundary::BoundaryCondition;
use crate::sim::heat_transfer::solver::{ConvergenceStatus, solve};
use crate::sim::heat_transfer::system::LinearSystem;

/// Outcome of a steady solve or a time step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    pub status: ConvergenceStatus,
    /// Outer passes used to settle temperature-dependent coefficients.
    pub coefficient_passes: usize,
}

impl Solution {
    pub fn is_converged(&self) -> bool {
        self.status.is_converged()
    }

    /// Turns a non-converged status into [`GroundError::ConvergenceFailure`].
    pub fn require_converged(self) -> GroundResult<Self> {
        match self.status {
            ConvergenceStatus::Converged { .. } => Ok(self),
            ConvergenceStatus::NotConverged {
                iterations,
                max_change,
            } => Err(GroundError::ConvergenceFailure {
                iterations,
                max_change,
            }),
        }
    }
}

/// Foundation heat transfer model: mesh, temperature field and solver state.
///
/// ```text
/// Foundation ──► build_ground_mesh() ──► GroundMesh
///                                          │
///   BoundaryConditions ──► apply_boundary_conditions()
///                                          │
///                         LinearSystem ──► solve() ──► temperatures
///                                                        │
///                                             output() / outputs()
/// ```
#[derive(Debug, Clone)]
pub struct Ground {
    foundation: Foundation,
    settings: Settings,
    mesh: GroundMesh,
    capacitance: Vec<f64>,
    temperatures: Vec<f64>,
    boundaries: Option<AppliedBoundaries>,
    status: ConvergenceStatus,
    /// Mean outdoor temperature of the series passed to `initialize`.
    series_average_temperature: Option<f64>,
    time: f64,
}

impl Ground {
    /// Validate the inputs and build the mesh.
    pub fn new(foundation: Foundation, settings: Settings) -> GroundResult<Self> {
        settings.validate()?;
        let mesh = build_ground_mesh(&foundation, &settings.mesh)?;
        let capacitance = mesh.capacitance();
        let temperatures = vec![settings.initial_guess_temperature; capacitance.len()];
        Ok(Self {
            foundation,
            settings,
            mesh,
            capacitance,
            temperatures,
            boundaries: None,
            status: ConvergenceStatus::Converged { iterations: 0 },
            series_average_temperature: None,
            time: 0.0,
        })
    }

    pub fn foundation(&self) -> &Foundation {
        &self.foundation
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn mesh(&self) -> &GroundMesh {
        &self.mesh
    }

    /// Cell temperatures [K], indexed like the mesh grid.
    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    /// Simulated time since `initialize` [s].
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Status of the most recent solve.
    pub fn status(&self) -> ConvergenceStatus {
        self.status
    }

    /// Boundary conditions of the most recent solve.
    pub fn boundaries(&self) -> Option<&AppliedBoundaries> {
        self.boundaries.as_ref()
    }

    /// Condition of the domain bottom for `conditions`.
    fn deep_ground_condition(&self, conditions: &BoundaryConditions) -> BoundaryCondition {
        match self.foundation.deep_ground_boundary {
            DeepGroundBoundary::FixedTemperature(temperature) => {
                BoundaryCondition::Dirichlet { temperature }
            }
            DeepGroundBoundary::AutoTemperature => BoundaryCondition::Dirichlet {
                temperature: self
                    .settings
                    .annual_average_temperature
                    .or(self.series_average_temperature)
                    .unwrap_or(conditions.outdoor_temperature),
            },
            DeepGroundBoundary::ConstantFlux { heat_flux } => {
                BoundaryCondition::Neumann { heat_flux }
            }
            DeepGroundBoundary::ZeroFlux => BoundaryCondition::Adiabatic,
        }
    }

    fn surface_temperatures(&self, boundaries: &AppliedBoundaries, field: &[f64]) -> Vec<f64> {
        self.mesh
            .structured()
            .faces()
            .iter()
            .zip(&boundaries.conditions)
            .map(|(face, bc)| bc.surface_temperature(field[face.cell], face.conductance, face.area))
            .collect()
    }

    /// Steady-state temperature field for constant `conditions`.
    ///
    /// When film coefficients depend on the surface temperature the solve is
    /// repeated until no surface temperature moves by more than
    /// `settings.coefficient_tolerance`. Every call starts from
    /// `settings.initial_guess_temperature` with coefficients evaluated at
    /// the air temperatures, so the result only depends on the inputs.
    pub fn solve_steady(&mut self, conditions: &BoundaryConditions) -> GroundResult<Solution> {
        let deep = self.deep_ground_condition(conditions);
        let max_passes = if needs_coefficient_passes(&self.foundation) {
            self.settings.max_coefficient_passes
        } else {
            1
        };

        let mut field = vec![self.settings.initial_guess_temperature; self.temperatures.len()];
        let mut surface: Option<Vec<f64>> = None;
        let mut status: Option<ConvergenceStatus> = None;
        let mut applied = None;
        let mut passes = 0;
        let mut shift = f64::INFINITY;

        for pass in 1..=max_passes {
            let pass_boundaries = apply_boundary_conditions(
                &self.mesh,
                &self.foundation,
                conditions,
                surface.as_deref(),
                deep,
            )?;
            if !pass_boundaries.is_anchored(&self.mesh) {
                return Err(GroundError::boundary(
                    "domain",
                    "no boundary fixes the temperature level, the steady problem has no unique solution",
                ));
            }

            let system =
                LinearSystem::assemble(self.mesh.structured(), &pass_boundaries.conditions, &field);
            let pass_status = solve(&system, &mut field, &self.settings.solver);
            status = Some(match status {
                Some(s) => s.merge(pass_status),
                None => pass_status,
            });

            let updated = self.surface_temperatures(&pass_boundaries, &field);
            shift = match &surface {
                Some(previous) => previous
                    .iter()
                    .zip(&updated)
                    .map(|(a, b)| (a - b).abs())
                    .fold(0.0, f64::max),
                None => f64::INFINITY,
            };
            surface = Some(updated);
            applied = Some(pass_boundaries);
            passes = pass;
            debug!(pass, ?pass_status, shift, "steady pass finished");
            if max_passes == 1 || shift <= self.settings.coefficient_tolerance {
                break;
            }
        }

        let mut status = status.unwrap_or(ConvergenceStatus::Converged { iterations: 0 });
        if max_passes > 1 && shift > self.settings.coefficient_tolerance {
            status = status.merge(ConvergenceStatus::NotConverged {
                iterations: 0,
                max_change: shift,
            });
        }
        if !status.is_converged() {
            warn!(?status, passes, "steady solve did not converge");
        }

        self.temperatures = field;
        self.boundaries = applied;
        self.status = status;
        Ok(Solution {
            status,
            coefficient_passes: passes,
        })
    }

    /// Prepare for time stepping through `series`.
    pub fn initialize(&mut self, series: &BoundaryConditionSeries) -> GroundResult<Solution> {
        self.series_average_temperature = Some(series.average_outdoor_temperature());
        self.time = 0.0;
        match self.settings.initial_condition {
            InitialCondition::SteadyState => self.solve_steady(series.first()),
            InitialCondition::Uniform { temperature } => {
                let deep = self.deep_ground_condition(series.first());
                let applied = apply_boundary_conditions(
                    &self.mesh,
                    &self.foundation,
                    series.first(),
                    None,
                    deep,
                )?;
                self.temperatures.fill(temperature);
                self.boundaries = Some(applied);
                self.status = ConvergenceStatus::Converged { iterations: 0 };
                Ok(Solution {
                    status: self.status,
                    coefficient_passes: 0,
                })
            }
        }
    }

    /// Advance the field by `dt` seconds to the instant described by `conditions`.
    ///
    /// Film coefficients are linearised around the committed surface
    /// temperatures of the previous step. Explicit steps longer than the
    /// stability limit are rejected before anything changes.
    pub fn step(&mut self, conditions: &BoundaryConditions, dt: f64) -> GroundResult<Solution> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(GroundError::boundary(
                "time step",
                format!("time step must be positive (got {dt})"),
            ));
        }
        let deep = self.deep_ground_condition(conditions);
        let surface = self
            .boundaries
            .as_ref()
            .map(|b| self.surface_temperatures(b, &self.temperatures));
        let applied = apply_boundary_conditions(
            &self.mesh,
            &self.foundation,
            conditions,
            surface.as_deref(),
            deep,
        )?;

        let system =
            LinearSystem::assemble(self.mesh.structured(), &applied.conditions, &self.temperatures);
        if self.settings.scheme == NumericalScheme::Explicit {
            let limit = system.explicit_time_step_limit(&self.capacitance);
            if dt > limit {
                return Err(GroundError::NumericalInstability {
                    time_step: dt,
                    limit,
                });
            }
        }

        let theta = self.settings.scheme.theta();
        let stepped = system.time_step(&self.capacitance, &self.temperatures, dt, theta);
        let mut next = self.temperatures.clone();
        let status = solve(&stepped, &mut next, &self.settings.solver);
        if !status.is_converged() {
            warn!(?status, time = self.time + dt, "time step did not converge");
        }

        self.temperatures = next;
        self.boundaries = Some(applied);
        self.status = status;
        self.time += dt;
        Ok(Solution {
            status,
            coefficient_passes: 1,
        })
    }

    /// Run `series` from its initial state and collect `requests` after every step.
    pub fn simulate(
        &mut self,
        series: &BoundaryConditionSeries,
        requests: &[(SurfaceKind, OutputKind)],
    ) -> GroundResult<Vec<Vec<GroundOutputValue>>> {
        self.initialize(series)?;
        let mut rows = Vec::with_capacity(series.len());
        for conditions in series.iter() {
            self.step(conditions, series.time_step())?;
            rows.push(self.outputs(requests)?);
        }
        debug!(
            steps = series.len(),
            time = self.time,
            "transient simulation finished"
        );
        Ok(rows)
    }

    /// Aggregate `kind` over `surface` for the current field.
    pub fn output(&self, surface: SurfaceKind, kind: OutputKind) -> GroundResult<GroundOutputValue> {
        let boundaries = self.boundaries.as_ref().ok_or(GroundError::NotSolved)?;
        let value = aggregate(&self.mesh, boundaries, &self.temperatures, surface, kind)?;
        Ok(GroundOutputValue {
            value,
            status: self.status,
        })
    }

    pub fn outputs(
        &self,
        requests: &[(SurfaceKind, OutputKind)],
    ) -> GroundResult<Vec<GroundOutputValue>> {
        requests
            .iter()
            .map(|&(surface, kind)| self.output(surface, kind))
            .collect()
    }
}
