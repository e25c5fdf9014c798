use ground2d::sim::ground::{
    DeepGroundBoundary, GroundError, InitialCondition, NumericalScheme, Slab, Wall,
};
use ground2d::sim::heat_transfer::CoordinateSystem;
use ground2d::{
    BoundaryConditionSeries, BoundaryConditions, Footprint, Foundation, Ground, Layer, Material,
    OutputKind, Settings, SurfaceKind,
};

fn soil() -> Material {
    Material::new("soil", 1.9, 1490.0, 1800.0)
}

/// Slab flush with grade, soil wall, finite films and no radiation.
fn slab_on_grade() -> Foundation {
    let mut fnd = Foundation::new(soil(), Footprint::rectangle(12.0, 12.0));
    fnd.wall = Some(Wall {
        layers: vec![Layer::new("wall", 0.24, soil())],
        height_above_grade: 0.0,
        depth_below_slab: 0.0,
    });
    fnd.deep_ground_boundary = DeepGroundBoundary::FixedTemperature(283.15);
    fnd.deep_ground_depth = 15.0;
    fnd.far_field_width = 15.0;
    fnd.interior_convective_coefficient = Some(7.95);
    fnd.exterior_convective_coefficient = Some(11.95);
    fnd.interior_emissivity = 0.0;
    fnd.exterior_emissivity = 0.0;
    fnd.exterior_absorptivity = 0.0;
    fnd
}

/// Soil column under an unexposed slab.
fn column(depth: f64) -> Foundation {
    let mut fnd = slab_on_grade();
    fnd.exposed_fraction = 0.0;
    fnd.deep_ground_depth = depth;
    fnd
}

fn conditions() -> BoundaryConditions {
    BoundaryConditions::new(303.15, 283.15)
}

fn steady(fnd: Foundation, settings: Settings) -> Ground {
    let mut ground = Ground::new(fnd, settings).unwrap();
    ground
        .solve_steady(&conditions())
        .unwrap()
        .require_converged()
        .unwrap();
    ground
}

fn rate(ground: &Ground, surface: SurfaceKind) -> f64 {
    ground.output(surface, OutputKind::Rate).unwrap().value
}

fn configuration_error(fnd: Foundation) -> GroundError {
    Ground::new(fnd, Settings::default())
        .and_then(|mut ground| ground.solve_steady(&conditions()).map(|_| ()))
        .unwrap_err()
}

#[test]
fn test_series_resistances_in_column() {
    let concrete = Material::new("concrete", 0.5, 2300.0, 900.0);
    let mut fnd = column(1.0);
    fnd.slab = Some(Slab {
        layers: vec![Layer::new("concrete", 0.2, concrete)],
    });
    let ground = steady(fnd, Settings::default());

    let resistance = 1.0 / 7.95 + 0.2 / 0.5 + 0.8 / 1.9;
    let expected = 144.0 * 20.0 / resistance;
    let q = rate(&ground, SurfaceKind::SlabCore);
    assert!((q - expected).abs() < 1e-3 * expected, "got {q}, expected {expected}");
}

#[test]
fn test_rate_grows_with_interior_coefficient() {
    let rates: Vec<f64> = [2.0, 7.95, 100.0]
        .into_iter()
        .map(|h| {
            let mut fnd = slab_on_grade();
            fnd.interior_convective_coefficient = Some(h);
            rate(&steady(fnd, Settings::default()), SurfaceKind::SlabCore)
        })
        .collect();
    assert!(rates[0] < rates[1] && rates[1] < rates[2], "{rates:?}");
}

#[test]
fn test_repeated_runs_are_identical() {
    let a = steady(slab_on_grade(), Settings::default());
    let b = steady(slab_on_grade(), Settings::default());
    assert_eq!(a.temperatures(), b.temperatures());
    for surface in [SurfaceKind::SlabCore, SurfaceKind::Grade, SurfaceKind::DeepGround] {
        assert_eq!(
            rate(&a, surface).to_bits(),
            rate(&b, surface).to_bits(),
            "{surface:?}"
        );
    }
}

#[test]
fn test_steady_solve_does_not_depend_on_previous_calls() {
    let mut fnd = slab_on_grade();
    fnd.interior_convective_coefficient = None;
    fnd.exterior_convective_coefficient = None;
    fnd.interior_emissivity = 0.9;
    fnd.exterior_emissivity = 0.9;
    let windy = BoundaryConditions::new(303.15, 283.15).with_wind_speed(3.0);

    let mut ground = Ground::new(fnd.clone(), Settings::default()).unwrap();
    ground.solve_steady(&windy).unwrap();
    let first_field = ground.temperatures().to_vec();
    let first = rate(&ground, SurfaceKind::SlabCore);

    // A different solve in between must not leak into the next one.
    ground
        .solve_steady(&BoundaryConditions::new(293.15, 253.15))
        .unwrap();
    ground.solve_steady(&windy).unwrap();
    assert_eq!(ground.temperatures(), &first_field[..]);
    assert_eq!(rate(&ground, SurfaceKind::SlabCore).to_bits(), first.to_bits());

    let mut fresh = Ground::new(fnd, Settings::default()).unwrap();
    fresh.solve_steady(&windy).unwrap();
    assert_eq!(fresh.temperatures(), &first_field[..]);
    assert_eq!(rate(&fresh, SurfaceKind::SlabCore).to_bits(), first.to_bits());
}

#[test]
fn test_geothermal_flux_leaves_through_slab() {
    let mut fnd = column(1.0);
    fnd.deep_ground_boundary = DeepGroundBoundary::ConstantFlux { heat_flux: 0.06 };
    let mut ground = Ground::new(fnd, Settings::default()).unwrap();
    ground
        .solve_steady(&BoundaryConditions::new(293.15, 293.15))
        .unwrap()
        .require_converged()
        .unwrap();

    let expected = -0.06 * 144.0;
    let slab = rate(&ground, SurfaceKind::SlabCore);
    assert!((slab - expected).abs() < 0.01 * expected.abs(), "got {slab}, expected {expected}");
    let flux = ground
        .output(SurfaceKind::DeepGround, OutputKind::Flux)
        .unwrap()
        .value;
    assert!((flux - 0.06).abs() < 1e-9, "{flux}");
    let bottom = ground
        .output(SurfaceKind::DeepGround, OutputKind::Temperature)
        .unwrap()
        .value;
    assert!(bottom > 293.15, "{bottom}");
}

#[test]
fn test_zero_conductivity_soil_is_rejected() {
    let mut fnd = slab_on_grade();
    fnd.soil.conductivity = 0.0;
    let err = configuration_error(fnd);
    assert!(matches!(err, GroundError::InvalidMaterial { .. }), "{err}");
}

#[test]
fn test_unanchored_domain_is_rejected() {
    let mut fnd = slab_on_grade();
    fnd.interior_convective_coefficient = Some(0.0);
    fnd.exterior_convective_coefficient = Some(0.0);
    fnd.deep_ground_boundary = DeepGroundBoundary::ZeroFlux;
    let err = configuration_error(fnd);
    assert!(err.is_configuration(), "{err}");
}

#[test]
fn test_iteration_cap_is_reported() {
    let mut settings = Settings::default();
    settings.solver.max_iterations = 2;
    let mut ground = Ground::new(slab_on_grade(), settings).unwrap();
    let solution = ground.solve_steady(&conditions()).unwrap();
    assert!(!solution.is_converged());

    let value = ground
        .output(SurfaceKind::SlabCore, OutputKind::Rate)
        .unwrap();
    assert!(!value.status.is_converged());
    assert!(matches!(
        solution.require_converged(),
        Err(GroundError::ConvergenceFailure { iterations: 2, .. })
    ));
}

#[test]
fn test_detailed_perimeter_matches_fraction() {
    for (exposed, fraction) in [(vec![true; 4], 1.0), (vec![true, true, false, false], 0.5)] {
        let mut detailed = slab_on_grade();
        detailed.footprint = detailed.footprint.with_exposed_edges(exposed);
        detailed.use_detailed_exposed_perimeter = true;
        let mut simple = slab_on_grade();
        simple.exposed_fraction = fraction;

        let a = rate(&steady(detailed, Settings::default()), SurfaceKind::SlabCore);
        let b = rate(&steady(simple, Settings::default()), SurfaceKind::SlabCore);
        assert!((a - b).abs() <= 1e-9 * b.abs(), "fraction {fraction}: {a} vs {b}");
    }
}

#[test]
fn test_partial_exposure_lowers_loss() {
    let full = rate(&steady(slab_on_grade(), Settings::default()), SurfaceKind::SlabCore);
    let mut fnd = slab_on_grade();
    fnd.exposed_fraction = 0.5;
    let half = rate(&steady(fnd, Settings::default()), SurfaceKind::SlabCore);
    assert!(half < full, "{half} >= {full}");
}

#[test]
fn test_transient_relaxes_to_steady() {
    let mut fnd = slab_on_grade();
    fnd.deep_ground_depth = 5.0;
    fnd.far_field_width = 5.0;
    let target = rate(&steady(fnd.clone(), Settings::default()), SurfaceKind::SlabCore);

    let settings = Settings {
        initial_condition: InitialCondition::Uniform {
            temperature: 283.15,
        },
        ..Settings::default()
    };
    let mut ground = Ground::new(fnd, settings).unwrap();
    let series = BoundaryConditionSeries::constant(conditions(), 1e8, 40).unwrap();
    let rows = ground
        .simulate(&series, &[(SurfaceKind::SlabCore, OutputKind::Rate)])
        .unwrap();

    assert_eq!(rows.len(), 40);
    assert!((ground.time() - 4e9).abs() < 1.0);
    let last = rows[39][0].value;
    assert!((last - target).abs() < 1e-3 * target, "{last} vs {target}");
    // Warming from a cold start: the loss falls towards the steady value.
    assert!(rows[0][0].value > last);
}

#[test]
fn test_grade_responds_to_outdoor_step() {
    let mut fnd = slab_on_grade();
    fnd.deep_ground_depth = 5.0;
    fnd.far_field_width = 5.0;
    let settings = Settings {
        initial_condition: InitialCondition::Uniform {
            temperature: 283.15,
        },
        ..Settings::default()
    };
    let mut ground = Ground::new(fnd, settings).unwrap();
    let mut snapshots = vec![BoundaryConditions::new(303.15, 283.15); 3];
    snapshots.extend(vec![BoundaryConditions::new(303.15, 263.15); 3]);
    let series = BoundaryConditionSeries::new(3600.0, snapshots).unwrap();
    let rows = ground
        .simulate(
            &series,
            &[
                (SurfaceKind::Grade, OutputKind::Rate),
                (SurfaceKind::Grade, OutputKind::Temperature),
            ],
        )
        .unwrap();

    assert_eq!(rows.len(), 6);
    let (before, after) = (&rows[2], &rows[3]);
    assert!(
        after[0].value < before[0].value - 1000.0,
        "grade rate {} -> {}",
        before[0].value,
        after[0].value
    );
    assert!(after[1].value < before[1].value);
    assert!(after[1].value > 263.15 && after[1].value < 283.15, "{}", after[1].value);
    // The grade keeps cooling while the cold spell lasts.
    assert!(rows[5][1].value < after[1].value);
}

#[test]
fn test_steady_state_is_a_fixed_point() {
    for scheme in [NumericalScheme::Implicit, NumericalScheme::CrankNicolson] {
        let settings = Settings {
            scheme,
            ..Settings::default()
        };
        let mut ground = Ground::new(column(2.0), settings).unwrap();
        let series = BoundaryConditionSeries::constant(conditions(), 3600.0, 1).unwrap();
        ground.initialize(&series).unwrap();
        let before = rate(&ground, SurfaceKind::SlabCore);
        ground.step(&conditions(), 3600.0).unwrap();
        let after = rate(&ground, SurfaceKind::SlabCore);
        assert!((after - before).abs() < 1e-4 * before, "{scheme:?}: {before} -> {after}");
    }
}

#[test]
fn test_crank_nicolson_tracks_implicit() {
    let run = |scheme| {
        let settings = Settings {
            scheme,
            initial_condition: InitialCondition::Uniform {
                temperature: 283.15,
            },
            ..Settings::default()
        };
        let mut ground = Ground::new(column(2.0), settings).unwrap();
        let series = BoundaryConditionSeries::constant(conditions(), 600.0, 288).unwrap();
        let rows = ground
            .simulate(&series, &[(SurfaceKind::SlabCore, OutputKind::Rate)])
            .unwrap();
        rows[287][0].value
    };
    let implicit = run(NumericalScheme::Implicit);
    let crank_nicolson = run(NumericalScheme::CrankNicolson);
    assert!(
        (implicit - crank_nicolson).abs() < 0.02 * implicit,
        "{implicit} vs {crank_nicolson}"
    );
}

#[test]
fn test_explicit_step_above_limit_is_rejected() {
    let settings = Settings {
        scheme: NumericalScheme::Explicit,
        initial_condition: InitialCondition::Uniform {
            temperature: 283.15,
        },
        ..Settings::default()
    };
    let mut ground = Ground::new(column(2.0), settings).unwrap();
    let series = BoundaryConditionSeries::constant(conditions(), 3600.0, 1).unwrap();
    ground.initialize(&series).unwrap();
    let before = ground.temperatures().to_vec();

    let limit = match ground.step(&conditions(), 86400.0) {
        Err(GroundError::NumericalInstability { time_step, limit }) => {
            assert_eq!(time_step, 86400.0);
            limit
        }
        other => panic!("expected an instability error, got {other:?}"),
    };
    assert_eq!(ground.temperatures(), &before[..]);
    assert_eq!(ground.time(), 0.0);

    ground.step(&conditions(), 0.5 * limit).unwrap();
    assert!(ground.time() > 0.0);
    let surface = ground
        .output(SurfaceKind::SlabCore, OutputKind::Temperature)
        .unwrap()
        .value;
    assert!(surface > 283.15 && surface < 303.15);
}

#[test]
fn test_cylindrical_section_is_close_to_cartesian() {
    let cartesian = rate(&steady(slab_on_grade(), Settings::default()), SurfaceKind::SlabCore);
    let mut fnd = slab_on_grade();
    fnd.coordinate_system = CoordinateSystem::Cylindrical;
    let cylindrical = rate(&steady(fnd, Settings::default()), SurfaceKind::SlabCore);
    assert!(cylindrical > 0.0);
    assert!(
        (cylindrical - cartesian).abs() < 0.1 * cartesian,
        "{cylindrical} vs {cartesian}"
    );
}

#[test]
fn test_perimeter_band_partitions_slab() {
    let whole = rate(&steady(slab_on_grade(), Settings::default()), SurfaceKind::SlabCore);
    let mut fnd = slab_on_grade();
    fnd.perimeter_surface_width = 1.0;
    let ground = steady(fnd, Settings::default());
    let core = rate(&ground, SurfaceKind::SlabCore);
    let perimeter = rate(&ground, SurfaceKind::SlabPerimeter);
    assert!(perimeter > 0.0 && core > 0.0);
    // Most of the loss leaves near the edge.
    let perimeter_flux = ground
        .output(SurfaceKind::SlabPerimeter, OutputKind::Flux)
        .unwrap()
        .value;
    let core_flux = ground
        .output(SurfaceKind::SlabCore, OutputKind::Flux)
        .unwrap()
        .value;
    assert!(perimeter_flux > core_flux);
    assert!((core + perimeter - whole).abs() < 0.02 * whole);
}
