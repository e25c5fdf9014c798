use serde::{Deserialize, Serialize};

use crate::sim::ground::applier::AppliedBoundaries;
use crate::sim::ground::error::{GroundError, GroundResult};
use crate::sim::ground::mesher::GroundMesh;
use crate::sim::heat_transfer::solver::ConvergenceStatus;

/// Named group of boundary faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    SlabCore,
    SlabPerimeter,
    WallInterior,
    WallTop,
    WallExterior,
    Grade,
    DeepGround,
    FarField,
    Symmetry,
}

impl SurfaceKind {
    pub const ALL: [SurfaceKind; 9] = [
        SurfaceKind::SlabCore,
        SurfaceKind::SlabPerimeter,
        SurfaceKind::WallInterior,
        SurfaceKind::WallTop,
        SurfaceKind::WallExterior,
        SurfaceKind::Grade,
        SurfaceKind::DeepGround,
        SurfaceKind::FarField,
        SurfaceKind::Symmetry,
    ];

    /// Surfaces exposed to indoor air.
    pub fn is_interior(self) -> bool {
        matches!(
            self,
            SurfaceKind::SlabCore | SurfaceKind::SlabPerimeter | SurfaceKind::WallInterior
        )
    }

    /// Surfaces exposed to outdoor air.
    pub fn is_exterior(self) -> bool {
        matches!(self, SurfaceKind::WallExterior | SurfaceKind::Grade)
    }

    /// Lateral and bottom edges of the computational domain.
    pub fn is_domain_edge(self) -> bool {
        matches!(
            self,
            SurfaceKind::DeepGround | SurfaceKind::FarField | SurfaceKind::Symmetry
        )
    }
}

/// Quantity reported for a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputKind {
    /// Heat rate into the soil domain [W].
    Rate,
    /// Heat flux into the soil domain [W/m²].
    Flux,
    /// Area-weighted surface temperature [K].
    Temperature,
    /// Area-weighted convective coefficient [W/(m²·K)].
    ConvectiveCoefficient,
}

/// Result of an output query with the status of the solve that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundOutputValue {
    pub value: f64,
    pub status: ConvergenceStatus,
}

/// Aggregate one quantity over the faces of `surface`.
///
/// Rates are scaled by the reduction multiplier so they refer to the whole
/// foundation. Fluxes, temperatures and coefficients are area averages and
/// do not depend on the multiplier.
pub fn aggregate(
    mesh: &GroundMesh,
    boundaries: &AppliedBoundaries,
    temperatures: &[f64],
    surface: SurfaceKind,
    kind: OutputKind,
) -> GroundResult<f64> {
    let faces = mesh.structured().faces();
    let mut area = 0.0;
    let mut weighted = 0.0;
    let mut count = 0usize;
    for f in mesh.faces_of(surface) {
        let face = &faces[f];
        let bc = &boundaries.conditions[f];
        let t_cell = temperatures[face.cell];
        count += 1;
        area += face.area;
        weighted += match kind {
            OutputKind::Rate | OutputKind::Flux => {
                bc.heat_rate(t_cell, face.conductance, face.area)
            }
            OutputKind::Temperature => {
                bc.surface_temperature(t_cell, face.conductance, face.area) * face.area
            }
            OutputKind::ConvectiveCoefficient => {
                boundaries.convective_coefficients[f] * face.area
            }
        };
    }
    if count == 0 {
        return Err(GroundError::EmptySurface(surface));
    }

    let value = match kind {
        OutputKind::Rate => weighted * mesh.reduction().multiplier,
        _ if area > 0.0 => weighted / area,
        // Faces of zero area (cylindrical axis): nothing to average over.
        _ => 0.0,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_groups() {
        let interior: Vec<_> = SurfaceKind::ALL
            .into_iter()
            .filter(|s| s.is_interior())
            .collect();
        assert_eq!(interior.len(), 3);
        assert!(SurfaceKind::Grade.is_exterior());
        assert!(SurfaceKind::Symmetry.is_domain_edge());
        assert!(!SurfaceKind::WallTop.is_interior() && !SurfaceKind::WallTop.is_exterior());
    }

    #[test]
    fn test_output_value_serializes() {
        let v = GroundOutputValue {
            value: 12.5,
            status: ConvergenceStatus::Converged { iterations: 4 },
        };
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("Converged"));
    }
}
