use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::sim::heat_transfer::system::LinearSystem;

/// Iterative method used for the linear solve.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum LinearSolver {
    /// Conjugate gradients with a Jacobi (diagonal) preconditioner.
    #[default]
    ConjugateGradient,
    /// Successive over-relaxation (Gauss-Seidel sweeps in grid order).
    Sor { relaxation: f64 },
}

/// Configuration for the linear solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub method: LinearSolver,
    /// Maximum number of iterations per solve.
    pub max_iterations: usize,
    /// Relative tolerance: stop once the largest temperature change of an
    /// iteration is at most `tolerance * max|T|`.
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: LinearSolver::ConjugateGradient,
            max_iterations: 10_000,
            tolerance: 1e-8,
        }
    }
}

/// Outcome of an iterative solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    Converged { iterations: usize },
    NotConverged { iterations: usize, max_change: f64 },
}

impl ConvergenceStatus {
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceStatus::Converged { .. })
    }

    pub fn iterations(&self) -> usize {
        match *self {
            ConvergenceStatus::Converged { iterations }
            | ConvergenceStatus::NotConverged { iterations, .. } => iterations,
        }
    }

    /// Combine the status of two consecutive solves (e.g. Picard passes).
    pub fn merge(self, other: ConvergenceStatus) -> ConvergenceStatus {
        let iterations = self.iterations() + other.iterations();
        match (self, other) {
            (ConvergenceStatus::Converged { .. }, ConvergenceStatus::Converged { .. }) => {
                ConvergenceStatus::Converged { iterations }
            }
            (ConvergenceStatus::NotConverged { max_change, .. }, ConvergenceStatus::Converged { .. })
            | (ConvergenceStatus::Converged { .. }, ConvergenceStatus::NotConverged { max_change, .. }) => {
                ConvergenceStatus::NotConverged {
                    iterations,
                    max_change,
                }
            }
            (
                ConvergenceStatus::NotConverged { max_change: a, .. },
                ConvergenceStatus::NotConverged { max_change: b, .. },
            ) => ConvergenceStatus::NotConverged {
                iterations,
                max_change: a.max(b),
            },
        }
    }
}

/// Solve `system` in place, using `x` as the initial guess.
pub fn solve(system: &LinearSystem, x: &mut [f64], config: &SolverConfig) -> ConvergenceStatus {
    assert_eq!(x.len(), system.len(), "solution vector must match the system");
    let status = match config.method {
        LinearSolver::ConjugateGradient => pcg_solve(system, x, config),
        LinearSolver::Sor { relaxation } => sor_solve(system, x, relaxation, config),
    };
    trace!(?status, "linear solve finished");
    status
}

fn pcg_solve(system: &LinearSystem, x: &mut [f64], config: &SolverConfig) -> ConvergenceStatus {
    let n = system.len();
    if n == 0 {
        return ConvergenceStatus::Converged { iterations: 0 };
    }

    let mut r = system.residual(x);
    let mut z = vec![0.0; n];
    precondition(system, &r, &mut z);
    let mut p = z.clone();
    let mut rz_old = dot(&r, &z);
    if rz_old.abs() < 1e-300 {
        return ConvergenceStatus::Converged { iterations: 0 };
    }

    let mut ap = vec![0.0; n];
    let mut max_change = f64::INFINITY;
    for iteration in 1..=config.max_iterations {
        system.apply(&p, &mut ap);
        let denom = dot(&p, &ap);
        if denom.abs() < 1e-300 {
            return ConvergenceStatus::NotConverged {
                iterations: iteration,
                max_change,
            };
        }

        let alpha = rz_old / denom;
        max_change = 0.0;
        let mut max_value: f64 = 0.0;
        for i in 0..n {
            let step = alpha * p[i];
            x[i] += step;
            r[i] -= alpha * ap[i];
            max_change = max_change.max(step.abs());
            max_value = max_value.max(x[i].abs());
        }

        if max_change <= config.tolerance * max_value {
            return ConvergenceStatus::Converged {
                iterations: iteration,
            };
        }

        precondition(system, &r, &mut z);
        let rz_new = dot(&r, &z);
        if rz_new.abs() < 1e-300 {
            return ConvergenceStatus::Converged {
                iterations: iteration,
            };
        }
        let beta = rz_new / rz_old;
        for i in 0..n {
            p[i] = z[i] + beta * p[i];
        }
        rz_old = rz_new;
    }

    ConvergenceStatus::NotConverged {
        iterations: config.max_iterations,
        max_change,
    }
}

fn sor_solve(
    system: &LinearSystem,
    x: &mut [f64],
    relaxation: f64,
    config: &SolverConfig,
) -> ConvergenceStatus {
    let rows = system.rows();
    let mut max_change = f64::INFINITY;
    for iteration in 1..=config.max_iterations {
        max_change = 0.0;
        let mut max_value: f64 = 0.0;
        for (idx, row) in rows.iter().enumerate() {
            if row.diagonal.abs() < 1e-300 {
                continue;
            }
            let gauss_seidel = (row.rhs + system.neighbor_sum(idx, x)) / row.diagonal;
            let change = relaxation * (gauss_seidel - x[idx]);
            x[idx] += change;
            max_change = max_change.max(change.abs());
            max_value = max_value.max(x[idx].abs());
        }
        if max_change <= config.tolerance * max_value {
            return ConvergenceStatus::Converged {
                iterations: iteration,
            };
        }
    }
    ConvergenceStatus::NotConverged {
        iterations: config.max_iterations,
        max_change,
    }
}

fn precondition(system: &LinearSystem, r: &[f64], z: &mut [f64]) {
    for (i, zi) in z.iter_mut().enumerate() {
        let d = system.diagonal(i);
        *zi = if d.abs() > 1e-30 { r[i] / d } else { r[i] };
    }
}

/// Sequential dot product; the fixed summation order keeps repeated solves
/// bitwise identical.
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
