use rayon::prelude::*;

use crate::sim::heat_transfer::boundary::BoundaryCondition;
use crate::sim::heat_transfer::mesh::{Direction, NO_FACE, StructuredMesh};

/// One row of the 5-point operator.
///
/// The row reads `diagonal * T_i - sum(neighbors[d] * T_d) = rhs`, with
/// `neighbors` in [`Direction::ALL`] order and holding positive conductances.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stencil {
    pub diagonal: f64,
    pub neighbors: [f64; 4],
    pub rhs: f64,
}

/// Assembled conduction system `K T = b` on a [`StructuredMesh`].
///
/// Air rows are decoupled identity rows holding their current value.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    nx: usize,
    rows: Vec<Stencil>,
    active: Vec<bool>,
}

impl LinearSystem {
    /// Assemble the steady operator.
    ///
    /// `conditions[f]` applies to `mesh.faces()[f]`; `hold` provides the value
    /// kept by air rows. Rows are independent, so they are built in parallel
    /// and each row is written only once.
    pub fn assemble(
        mesh: &StructuredMesh,
        conditions: &[BoundaryCondition],
        hold: &[f64],
    ) -> Self {
        assert_eq!(
            conditions.len(),
            mesh.faces().len(),
            "one boundary condition per boundary face is required"
        );
        assert_eq!(hold.len(), mesh.len(), "hold vector must cover the grid");

        let mut rows = vec![Stencil::default(); mesh.len()];
        rows.par_iter_mut().enumerate().for_each(|(idx, row)| {
            *row = assemble_row(mesh, conditions, idx, hold[idx]);
        });
        let active = (0..mesh.len()).map(|idx| mesh.is_solid(idx)).collect();

        Self {
            nx: mesh.nx(),
            rows,
            active,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Stencil] {
        &self.rows
    }

    pub fn is_active(&self, idx: usize) -> bool {
        self.active[idx]
    }

    pub fn diagonal(&self, idx: usize) -> f64 {
        self.rows[idx].diagonal
    }

    pub fn rhs(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.rhs).collect()
    }

    /// Grid index of the neighbour in slot `s` of row `idx`.
    ///
    /// Only meaningful when the slot's coefficient is non-zero, which the
    /// assembly guarantees only happens for in-range neighbours.
    #[inline]
    pub(crate) fn neighbor_index(&self, idx: usize, slot: usize) -> usize {
        match slot {
            0 => idx - 1,
            1 => idx + 1,
            2 => idx - self.nx,
            _ => idx + self.nx,
        }
    }

    /// Off-diagonal part of row `idx` applied to `x`.
    #[inline]
    pub(crate) fn neighbor_sum(&self, idx: usize, x: &[f64]) -> f64 {
        let row = &self.rows[idx];
        let mut sum = 0.0;
        for (slot, &c) in row.neighbors.iter().enumerate() {
            if c != 0.0 {
                sum += c * x[self.neighbor_index(idx, slot)];
            }
        }
        sum
    }

    /// `y = K x`, parallel over output rows.
    pub fn apply(&self, x: &[f64], y: &mut [f64]) {
        y.par_iter_mut().enumerate().for_each(|(idx, yi)| {
            *yi = self.rows[idx].diagonal * x[idx] - self.neighbor_sum(idx, x);
        });
    }

    /// `b - K x` for every row.
    pub fn residual(&self, x: &[f64]) -> Vec<f64> {
        let mut kx = vec![0.0; self.len()];
        self.apply(x, &mut kx);
        self.rows
            .iter()
            .zip(kx)
            .map(|(row, kxi)| row.rhs - kxi)
            .collect()
    }

    /// θ-scheme system for one step of length `dt`:
    ///
    /// `(C/dt + θK) T' = C/dt T - (1-θ) K T + b`
    ///
    /// `capacitance[i]` is `rho*c_p*V` of cell `i`.
    pub fn time_step(&self, capacitance: &[f64], previous: &[f64], dt: f64, theta: f64) -> Self {
        let mut kt = vec![0.0; self.len()];
        if theta < 1.0 {
            self.apply(previous, &mut kt);
        }
        let mut rows = self.rows.clone();
        rows.par_iter_mut().enumerate().for_each(|(idx, row)| {
            if !self.active[idx] {
                row.rhs = previous[idx];
                return;
            }
            let c_dt = capacitance[idx] / dt;
            let explicit = if theta < 1.0 { (1.0 - theta) * kt[idx] } else { 0.0 };
            row.rhs = c_dt * previous[idx] - explicit + row.rhs;
            row.diagonal = c_dt + theta * row.diagonal;
            for c in row.neighbors.iter_mut() {
                *c *= theta;
            }
        });
        Self {
            nx: self.nx,
            rows,
            active: self.active.clone(),
        }
    }

    /// Largest explicit time step that keeps every cell update positive:
    /// `min(C_i / K_ii)` over solid rows.
    pub fn explicit_time_step_limit(&self, capacitance: &[f64]) -> f64 {
        (0..self.len())
            .filter(|&idx| self.active[idx] && self.rows[idx].diagonal > 0.0)
            .map(|idx| capacitance[idx] / self.rows[idx].diagonal)
            .fold(f64::INFINITY, f64::min)
    }
}

fn assemble_row(
    mesh: &StructuredMesh,
    conditions: &[BoundaryCondition],
    idx: usize,
    hold: f64,
) -> Stencil {
    if !mesh.is_solid(idx) {
        return Stencil {
            diagonal: 1.0,
            neighbors: [0.0; 4],
            rhs: hold,
        };
    }

    let mut row = Stencil::default();
    for dir in Direction::ALL {
        let c = mesh.conductance(idx, dir);
        if c > 0.0 {
            row.diagonal += c;
            row.neighbors[dir.slot()] = c;
        }
        let face_idx = mesh.cell_face(idx, dir);
        if face_idx != NO_FACE {
            let face = &mesh.faces()[face_idx];
            let contribution = conditions[face_idx].contribution(face.conductance, face.area);
            row.diagonal += contribution.diagonal;
            row.rhs += contribution.rhs;
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::heat_transfer::mesh::{Axis, CoordinateSystem, MaterialId};
    use crate::sim::materials::Material;

    fn column(n: usize) -> StructuredMesh {
        let edges: Vec<f64> = (0..=n).map(|k| -(n as f64) + k as f64).collect();
        StructuredMesh::new(
            CoordinateSystem::Cartesian,
            Axis::new(vec![0.0, 1.0]),
            Axis::new(edges),
            vec![Material::new("m", 2.0, 1000.0, 1000.0)],
            vec![Some(MaterialId(0)); n],
        )
    }

    fn dirichlet_ends(mesh: &StructuredMesh, bottom: f64, top: f64) -> Vec<BoundaryCondition> {
        mesh.faces()
            .iter()
            .map(|f| match f.direction {
                Direction::Down => BoundaryCondition::Dirichlet { temperature: bottom },
                Direction::Up => BoundaryCondition::Dirichlet { temperature: top },
                _ => BoundaryCondition::Adiabatic,
            })
            .collect()
    }

    #[test]
    fn test_row_sums_and_symmetry() {
        let mesh = column(3);
        let bcs = dirichlet_ends(&mesh, 0.0, 0.0);
        let sys = LinearSystem::assemble(&mesh, &bcs, &vec![0.0; mesh.len()]);
        // Interior cell: two neighbours with K = 2
        let mid = sys.rows()[1];
        assert!((mid.diagonal - 4.0).abs() < 1e-12);
        assert_eq!(mid.neighbors[2], 2.0);
        assert_eq!(mid.neighbors[3], 2.0);
        // Bottom cell: neighbour + Dirichlet half-cell (k*A/0.5 = 4)
        assert!((sys.rows()[0].diagonal - 6.0).abs() < 1e-12);
        // Symmetric coupling
        assert_eq!(sys.rows()[0].neighbors[3], sys.rows()[1].neighbors[2]);
    }

    #[test]
    fn test_linear_profile_is_exact_solution() {
        let mesh = column(4);
        let bcs = dirichlet_ends(&mesh, 0.0, 40.0);
        let sys = LinearSystem::assemble(&mesh, &bcs, &vec![0.0; mesh.len()]);
        // Column spans z in [-4, 0]; T = 10 * (z + 4).
        let exact: Vec<f64> = (0..4).map(|k| 10.0 * (k as f64 + 0.5)).collect();
        let r = sys.residual(&exact);
        assert!(r.iter().all(|v| v.abs() < 1e-9), "residual {r:?}");
    }

    #[test]
    fn test_air_rows_are_identity() {
        let mesh = StructuredMesh::new(
            CoordinateSystem::Cartesian,
            Axis::new(vec![0.0, 1.0]),
            Axis::new(vec![0.0, 1.0, 2.0]),
            vec![Material::new("m", 1.0, 1.0, 1.0)],
            vec![Some(MaterialId(0)), None],
        );
        let bcs = vec![BoundaryCondition::Dirichlet { temperature: 5.0 }; mesh.faces().len()];
        let sys = LinearSystem::assemble(&mesh, &bcs, &[0.0, 293.15]);
        assert!(!sys.is_active(1));
        assert_eq!(sys.rows()[1].diagonal, 1.0);
        assert_eq!(sys.rows()[1].rhs, 293.15);
        assert_eq!(sys.rows()[0].neighbors[3], 0.0);
    }

    #[test]
    fn test_time_step_system() {
        let mesh = column(2);
        let bcs = dirichlet_ends(&mesh, 0.0, 0.0);
        let sys = LinearSystem::assemble(&mesh, &bcs, &vec![0.0; mesh.len()]);
        let cap: Vec<f64> = (0..mesh.len()).map(|i| mesh.capacity(i)).collect();
        let prev = vec![10.0, 10.0];

        let implicit = sys.time_step(&cap, &prev, 100.0, 1.0);
        let c_dt = 1.0e6 / 100.0;
        assert!((implicit.diagonal(0) - (c_dt + sys.diagonal(0))).abs() < 1e-9);
        assert!((implicit.rows()[0].rhs - c_dt * 10.0).abs() < 1e-9);

        let explicit = sys.time_step(&cap, &prev, 100.0, 0.0);
        assert_eq!(explicit.rows()[0].neighbors, [0.0; 4]);
        // rhs = C/dt T - K T with K T = (6 - 2) * 10 = 40
        assert!((explicit.rows()[0].rhs - (c_dt * 10.0 - 40.0)).abs() < 1e-9);

        let limit = sys.explicit_time_step_limit(&cap);
        assert!((limit - 1.0e6 / 6.0).abs() < 1e-6);
    }
}
