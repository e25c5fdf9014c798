use crate::sim::ground::conditions::{BoundaryConditions, check_temperature};
use crate::sim::ground::convection::{
    combine_film, doe2_exterior_h, radiative_h, sky_view_factor, tarp_natural_h,
};
use crate::sim::ground::error::{GroundError, GroundResult};
use crate::sim::ground::foundation::{Foundation, WallTopBoundary};
use crate::sim::ground::mesher::{GroundMesh, face_normal_z};
use crate::sim::ground::output::SurfaceKind;
use crate::sim::heat_transfer::boundary::BoundaryCondition;
use crate::sim::heat_transfer::mesh::BoundaryFace;

/// Boundary conditions for every boundary face of a [`GroundMesh`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedBoundaries {
    /// Condition of face `f`, in face order.
    pub conditions: Vec<BoundaryCondition>,
    /// Convective part of the film coefficient of face `f` [W/(m²·K)].
    pub convective_coefficients: Vec<f64>,
}

impl AppliedBoundaries {
    /// Whether any face ties the temperature level of the domain.
    pub fn is_anchored(&self, mesh: &GroundMesh) -> bool {
        mesh.structured()
            .faces()
            .iter()
            .zip(&self.conditions)
            .any(|(face, bc)| bc.anchors_temperature(face.conductance))
    }
}

/// Translate foundation selectors and environmental conditions into
/// per-face boundary conditions.
///
/// `surface_temperatures` holds the current estimate of each face's
/// temperature; it drives the correlation-based coefficients and the
/// linearised radiation. Without it the adjacent air temperatures are used.
/// `deep_ground` is the resolved condition of the domain bottom.
pub fn apply_boundary_conditions(
    mesh: &GroundMesh,
    foundation: &Foundation,
    conditions: &BoundaryConditions,
    surface_temperatures: Option<&[f64]>,
    deep_ground: BoundaryCondition,
) -> GroundResult<AppliedBoundaries> {
    conditions.validate()?;
    match deep_ground {
        BoundaryCondition::Dirichlet { temperature } => {
            check_temperature("deep ground", temperature)?
        }
        BoundaryCondition::Neumann { heat_flux } if !heat_flux.is_finite() => {
            return Err(GroundError::boundary(
                "deep ground",
                format!("heat flux must be finite (got {heat_flux})"),
            ));
        }
        _ => {}
    }

    let faces = mesh.structured().faces();
    if let Some(ts) = surface_temperatures {
        if ts.len() != faces.len() {
            return Err(GroundError::boundary(
                "surface temperatures",
                format!(
                    "expected one value per boundary face ({}), got {}",
                    faces.len(),
                    ts.len()
                ),
            ));
        }
    }

    let mut applied = AppliedBoundaries {
        conditions: Vec::with_capacity(faces.len()),
        convective_coefficients: Vec::with_capacity(faces.len()),
    };
    for (f, face) in faces.iter().enumerate() {
        let surface = mesh.face_surface(f);
        let t_surface = surface_temperatures.map(|ts| ts[f]);
        let (bc, h_conv) = match surface {
            s if s.is_interior() => interior(face, foundation, conditions, t_surface),
            s if s.is_exterior() => exterior(face, foundation, conditions, t_surface),
            SurfaceKind::WallTop => (wall_top(face, mesh, foundation.wall_top_boundary), 0.0),
            SurfaceKind::DeepGround => (deep_ground, 0.0),
            _ => (BoundaryCondition::Adiabatic, 0.0),
        };
        applied.conditions.push(bc);
        applied.convective_coefficients.push(h_conv);
    }
    Ok(applied)
}

/// Whether any surface coefficient depends on the surface temperature, so a
/// steady solve needs outer passes.
pub fn needs_coefficient_passes(foundation: &Foundation) -> bool {
    foundation.interior_convective_coefficient.is_none()
        || foundation.exterior_convective_coefficient.is_none()
        || foundation.interior_emissivity > 0.0
        || foundation.exterior_emissivity > 0.0
}

fn interior(
    face: &BoundaryFace,
    foundation: &Foundation,
    conditions: &BoundaryConditions,
    t_surface: Option<f64>,
) -> (BoundaryCondition, f64) {
    let t_air = conditions.indoor_temperature;
    let t_s = t_surface.unwrap_or(t_air);
    let h_conv = foundation
        .interior_convective_coefficient
        .unwrap_or_else(|| tarp_natural_h(t_s - t_air, face_normal_z(face)));
    let t_rad = conditions.indoor_radiant_temperature();
    let h_rad = radiative_h(foundation.interior_emissivity, t_s, t_rad);
    let (h, t_fluid) = combine_film(h_conv, t_air, h_rad, t_rad);
    (BoundaryCondition::Convective { h, t_fluid }, h_conv)
}

fn exterior(
    face: &BoundaryFace,
    foundation: &Foundation,
    conditions: &BoundaryConditions,
    t_surface: Option<f64>,
) -> (BoundaryCondition, f64) {
    let t_air = conditions.outdoor_temperature;
    let t_s = t_surface.unwrap_or(t_air);
    let normal_z = face_normal_z(face);
    let h_conv = foundation.exterior_convective_coefficient.unwrap_or_else(|| {
        doe2_exterior_h(t_s - t_air, normal_z, conditions.local_wind_speed)
    });

    // Sky for the upward view, outdoor air for the ground-facing part.
    let f_sky = sky_view_factor(normal_z);
    let t_env = f_sky * conditions.sky_temperature() + (1.0 - f_sky) * t_air;
    let h_rad = radiative_h(foundation.exterior_emissivity, t_s, t_env);
    let (h, t_fluid) = combine_film(h_conv, t_air, h_rad, t_env);

    let irradiance = if normal_z > 0.5 {
        conditions.horizontal_irradiance
    } else {
        conditions.vertical_irradiance
    };
    let heat_flux = foundation.exterior_absorptivity * irradiance;
    let bc = if heat_flux != 0.0 {
        BoundaryCondition::ConvectiveWithFlux {
            h,
            t_fluid,
            heat_flux,
        }
    } else {
        BoundaryCondition::Convective { h, t_fluid }
    };
    (bc, h_conv)
}

fn wall_top(face: &BoundaryFace, mesh: &GroundMesh, selector: WallTopBoundary) -> BoundaryCondition {
    match selector {
        WallTopBoundary::ZeroFlux => BoundaryCondition::Adiabatic,
        WallTopBoundary::FixedTemperature { temperature } => {
            BoundaryCondition::Dirichlet { temperature }
        }
        WallTopBoundary::LinearGradient {
            interior_temperature,
            exterior_temperature,
        } => {
            let temperature = match mesh.wall_top_extent() {
                Some((x0, x1)) if x1 - x0 > 0.0 => {
                    let s = ((face.center.0 - x0) / (x1 - x0)).clamp(0.0, 1.0);
                    interior_temperature + s * (exterior_temperature - interior_temperature)
                }
                _ => 0.5 * (interior_temperature + exterior_temperature),
            };
            BoundaryCondition::Dirichlet { temperature }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::footprint::Footprint;
    use crate::sim::ground::foundation::Wall;
    use crate::sim::ground::mesher::build_ground_mesh;
    use crate::sim::ground::settings::MeshSettings;
    use crate::sim::materials::{Layer, Material};

    fn foundation() -> Foundation {
        let soil = Material::new("soil", 1.9, 1490.0, 1800.0);
        let mut f = Foundation::new(soil.clone(), Footprint::rectangle(12.0, 12.0));
        f.wall = Some(Wall {
            layers: vec![Layer::new("wall", 0.24, soil)],
            height_above_grade: 0.0,
            depth_below_slab: 0.0,
        });
        f.deep_ground_depth = 15.0;
        f.far_field_width = 15.0;
        f
    }

    #[test]
    fn test_linear_gradient_wall_top() {
        let mut f = foundation();
        f.wall_top_boundary = WallTopBoundary::LinearGradient {
            interior_temperature: 303.15,
            exterior_temperature: 283.15,
        };
        let mesh = build_ground_mesh(&f, &MeshSettings::default()).unwrap();
        let bc = BoundaryConditions::new(303.15, 283.15);
        let applied = apply_boundary_conditions(&mesh, &f, &bc, None, BoundaryCondition::Dirichlet { temperature: 283.15 }).unwrap();

        let faces = mesh.structured().faces();
        let mut temps: Vec<(f64, f64)> = mesh
            .faces_of(SurfaceKind::WallTop)
            .map(|i| match applied.conditions[i] {
                BoundaryCondition::Dirichlet { temperature } => (faces[i].center.0, temperature),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        temps.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert!(temps.len() >= 2);
        // Strictly decreasing from the interior to the exterior edge.
        assert!(temps.windows(2).all(|w| w[1].1 < w[0].1));
        for (x, t) in temps {
            let expected = 303.15 - 20.0 * (x - 3.0) / 0.24;
            assert!((t - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_override_coefficients_and_deep_ground() {
        let mut f = foundation();
        f.interior_convective_coefficient = Some(7.95);
        f.exterior_convective_coefficient = Some(11.95);
        f.interior_emissivity = 0.0;
        f.exterior_emissivity = 0.0;
        let mesh = build_ground_mesh(&f, &MeshSettings::default()).unwrap();
        let bc = BoundaryConditions::new(303.15, 283.15);
        let applied = apply_boundary_conditions(&mesh, &f, &bc, None, BoundaryCondition::Dirichlet { temperature: 283.15 }).unwrap();

        for i in mesh.faces_of(SurfaceKind::SlabCore) {
            assert_eq!(
                applied.conditions[i],
                BoundaryCondition::Convective {
                    h: 7.95,
                    t_fluid: 303.15
                }
            );
            assert_eq!(applied.convective_coefficients[i], 7.95);
        }
        for i in mesh.faces_of(SurfaceKind::Grade) {
            assert_eq!(
                applied.conditions[i],
                BoundaryCondition::Convective {
                    h: 11.95,
                    t_fluid: 283.15
                }
            );
        }
        for i in mesh.faces_of(SurfaceKind::DeepGround) {
            assert_eq!(
                applied.conditions[i],
                BoundaryCondition::Dirichlet { temperature: 283.15 }
            );
        }
        for s in [SurfaceKind::Symmetry, SurfaceKind::FarField, SurfaceKind::WallTop] {
            for i in mesh.faces_of(s) {
                assert_eq!(applied.conditions[i], BoundaryCondition::Adiabatic);
            }
        }
        assert!(applied.is_anchored(&mesh));
        assert!(!needs_coefficient_passes(&f));
    }

    #[test]
    fn test_radiation_and_solar_on_grade() {
        let mut f = foundation();
        f.exterior_convective_coefficient = Some(10.0);
        let mesh = build_ground_mesh(&f, &MeshSettings::default()).unwrap();
        let mut bc = BoundaryConditions::new(293.15, 273.15);
        bc.sky_temperature = Some(253.15);
        bc.horizontal_irradiance = 500.0;
        let applied = apply_boundary_conditions(&mesh, &f, &bc, None, BoundaryCondition::Adiabatic).unwrap();
        let i = mesh.faces_of(SurfaceKind::Grade).next().unwrap();
        match applied.conditions[i] {
            BoundaryCondition::ConvectiveWithFlux {
                h,
                t_fluid,
                heat_flux,
            } => {
                assert!(h > 10.0);
                // Radiation to the colder sky pulls the environment below air.
                assert!(t_fluid < 273.15 && t_fluid > 253.15);
                assert!((heat_flux - 400.0).abs() < 1e-12);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(applied.convective_coefficients[i], 10.0);
        assert!(needs_coefficient_passes(&f));
    }

    #[test]
    fn test_all_adiabatic_is_not_anchored() {
        let mut f = foundation();
        f.interior_convective_coefficient = Some(0.0);
        f.exterior_convective_coefficient = Some(0.0);
        f.interior_emissivity = 0.0;
        f.exterior_emissivity = 0.0;
        let mesh = build_ground_mesh(&f, &MeshSettings::default()).unwrap();
        let bc = BoundaryConditions::new(293.15, 273.15);
        let applied = apply_boundary_conditions(&mesh, &f, &bc, None, BoundaryCondition::Adiabatic).unwrap();
        assert!(!applied.is_anchored(&mesh));
    }

    #[test]
    fn test_constant_flux_deep_ground() {
        let f = foundation();
        let mesh = build_ground_mesh(&f, &MeshSettings::default()).unwrap();
        let bc = BoundaryConditions::new(293.15, 273.15);
        let geothermal = BoundaryCondition::Neumann { heat_flux: 0.06 };
        let applied = apply_boundary_conditions(&mesh, &f, &bc, None, geothermal).unwrap();
        assert!(mesh.has_surface(SurfaceKind::DeepGround));
        for i in mesh.faces_of(SurfaceKind::DeepGround) {
            assert_eq!(applied.conditions[i], geothermal);
        }
        let bad = BoundaryCondition::Neumann {
            heat_flux: f64::INFINITY,
        };
        assert!(apply_boundary_conditions(&mesh, &f, &bc, None, bad)
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_surface_temperature_count_must_match_faces() {
        let f = foundation();
        let mesh = build_ground_mesh(&f, &MeshSettings::default()).unwrap();
        let bc = BoundaryConditions::new(293.15, 273.15);
        let short = vec![290.0; mesh.structured().faces().len() - 1];
        let err = apply_boundary_conditions(&mesh, &f, &bc, Some(&short), BoundaryCondition::Adiabatic)
            .unwrap_err();
        assert!(matches!(
            err,
            GroundError::Boundary {
                region: "surface temperatures",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_invalid_sources() {
        let f = foundation();
        let mesh = build_ground_mesh(&f, &MeshSettings::default()).unwrap();
        let bc = BoundaryConditions::new(f64::NAN, 273.15);
        assert!(apply_boundary_conditions(&mesh, &f, &bc, None, BoundaryCondition::Adiabatic)
            .unwrap_err()
            .is_configuration());
        let bc = BoundaryConditions::new(293.15, 273.15);
        assert!(apply_boundary_conditions(&mesh, &f, &bc, None, BoundaryCondition::Dirichlet { temperature: -4.0 }).is_err());
    }
}
