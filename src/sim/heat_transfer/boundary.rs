/// Boundary condition applied at a mesh boundary face.
///
/// All fluxes are positive **into** the solid domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryCondition {
    /// Zero flux (symmetry planes, far field, adiabatic wall tops).
    Adiabatic,
    /// Fixed temperature: T_surface = temperature.
    Dirichlet { temperature: f64 },
    /// Fixed heat flux: q = heat_flux  [W/m^2].
    Neumann { heat_flux: f64 },
    /// Convective: q = h * (T_fluid - T_surface).
    ///
    /// `h` may already combine convection and linearised radiation, in which
    /// case `t_fluid` is the matching combined environment temperature.
    Convective { h: f64, t_fluid: f64 },
    /// Convective with an additional imposed surface flux (absorbed solar).
    ///
    /// `q_total = h*(T_fluid - T_surface) + heat_flux`. Only part of the
    /// source enters the domain; the rest leaves by convection, split by the
    /// half-cell conductance at the face.
    ConvectiveWithFlux {
        h: f64,
        t_fluid: f64,
        heat_flux: f64,
    },
}

/// Implicit contribution of one boundary face to the row of its cell:
/// the equation gains `diagonal * T_cell` on the left and `rhs` on the right.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaceContribution {
    pub diagonal: f64,
    pub rhs: f64,
}

impl BoundaryCondition {
    /// Whether this condition ties the temperature level of the domain.
    pub fn anchors_temperature(&self, face_conductance: f64) -> bool {
        match *self {
            BoundaryCondition::Dirichlet { .. } => face_conductance > 0.0,
            BoundaryCondition::Convective { h, .. }
            | BoundaryCondition::ConvectiveWithFlux { h, .. } => {
                h > 0.0 && face_conductance > 0.0
            }
            BoundaryCondition::Adiabatic | BoundaryCondition::Neumann { .. } => false,
        }
    }

    /// Linear contribution for a face with half-cell conductance
    /// `face_conductance` (k*A/half_dx) and area `area`.
    pub fn contribution(&self, face_conductance: f64, area: f64) -> FaceContribution {
        match *self {
            BoundaryCondition::Adiabatic => FaceContribution::default(),
            BoundaryCondition::Dirichlet { temperature } => FaceContribution {
                diagonal: face_conductance,
                rhs: face_conductance * temperature,
            },
            BoundaryCondition::Neumann { heat_flux } => FaceContribution {
                diagonal: 0.0,
                rhs: heat_flux * area,
            },
            BoundaryCondition::Convective { h, t_fluid } => {
                let k_eff = effective_conductance(h * area, face_conductance);
                FaceContribution {
                    diagonal: k_eff,
                    rhs: k_eff * t_fluid,
                }
            }
            BoundaryCondition::ConvectiveWithFlux {
                h,
                t_fluid,
                heat_flux,
            } => {
                let h_a = h * area;
                if h_a <= 0.0 {
                    return FaceContribution {
                        diagonal: 0.0,
                        rhs: heat_flux * area,
                    };
                }
                let k_eff = effective_conductance(h_a, face_conductance);
                // Fraction of the surface source conducted into the cell:
                //   alpha = K_face / (K_face + h*A)
                let alpha = if face_conductance > 0.0 {
                    face_conductance / (face_conductance + h_a)
                } else {
                    0.0
                };
                FaceContribution {
                    diagonal: k_eff,
                    rhs: k_eff * t_fluid + alpha * heat_flux * area,
                }
            }
        }
    }

    /// Heat rate through the face into the domain [W] given the centroid
    /// temperature of the adjacent cell.
    pub fn heat_rate(&self, t_cell: f64, face_conductance: f64, area: f64) -> f64 {
        let c = self.contribution(face_conductance, area);
        c.rhs - c.diagonal * t_cell
    }

    /// Reconstruct the surface temperature from the adjacent centroid.
    ///
    /// The face node is eliminated in the assembly; this recovers it from
    /// the energy balance `K_face (T_s - T_c) = h A (T_f - T_s) + q A`.
    pub fn surface_temperature(&self, t_cell: f64, face_conductance: f64, area: f64) -> f64 {
        match *self {
            BoundaryCondition::Dirichlet { temperature } => temperature,
            BoundaryCondition::Adiabatic => t_cell,
            BoundaryCondition::Neumann { heat_flux } => {
                if face_conductance > 0.0 {
                    t_cell + heat_flux * area / face_conductance
                } else {
                    t_cell
                }
            }
            BoundaryCondition::Convective { h, t_fluid } => {
                let h_a = h * area;
                if h_a <= 0.0 || face_conductance <= 0.0 {
                    return t_cell;
                }
                (face_conductance * t_cell + h_a * t_fluid) / (face_conductance + h_a)
            }
            BoundaryCondition::ConvectiveWithFlux {
                h,
                t_fluid,
                heat_flux,
            } => {
                let h_a = h.max(0.0) * area;
                if face_conductance <= 0.0 {
                    return t_cell;
                }
                (face_conductance * t_cell + h_a * t_fluid + heat_flux * area)
                    / (face_conductance + h_a)
            }
        }
    }
}

/// Series combination of the film conductance `h_a` and the half-cell
/// conductance `k_face`: `1 / (1/(h*A) + 1/K_face)`.
fn effective_conductance(h_a: f64, k_face: f64) -> f64 {
    if h_a <= 0.0 {
        return 0.0;
    }
    if k_face > 0.0 {
        1.0 / (1.0 / h_a + 1.0 / k_face)
    } else {
        h_a
    }
}
