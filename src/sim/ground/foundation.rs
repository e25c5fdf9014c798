use serde::{Deserialize, Serialize};

use crate::geom::footprint::Footprint;
use crate::sim::ground::conditions::check_temperature;
use crate::sim::ground::error::{GroundError, GroundResult};
use crate::sim::heat_transfer::mesh::CoordinateSystem;
use crate::sim::materials::{Layer, Material, total_thickness};

/// Foundation wall, layers listed from the exterior to the interior face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub layers: Vec<Layer>,
    /// Height of the wall top above grade [m]. Zero puts the top at grade.
    pub height_above_grade: f64,
    /// Extension of the wall below the underside of the slab [m].
    pub depth_below_slab: f64,
}

impl Wall {
    pub fn thickness(&self) -> f64 {
        total_thickness(&self.layers)
    }
}

/// Floor slab, layers listed from the top (room side) down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slab {
    pub layers: Vec<Layer>,
}

impl Slab {
    pub fn thickness(&self) -> f64 {
        total_thickness(&self.layers)
    }
}

/// Footing centred under the wall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footing {
    pub material: Material,
    pub width: f64,
    pub depth: f64,
}

/// Horizontal insulation board.
///
/// `depth` is the depth of the board's top face below grade. Interior boards
/// extend `width` inwards from the interior wall face; exterior boards extend
/// `width` outwards from the exterior wall face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizontalInsulation {
    pub layer: Layer,
    pub width: f64,
    pub depth: f64,
}

/// Vertical insulation against a wall face, from the wall top down to `depth`
/// below grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalInsulation {
    pub layer: Layer,
    pub depth: f64,
}

/// Condition at the top of the foundation wall.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum WallTopBoundary {
    #[default]
    ZeroFlux,
    FixedTemperature {
        temperature: f64,
    },
    /// Temperature varying linearly from the interior edge of the wall top
    /// to its exterior edge.
    LinearGradient {
        interior_temperature: f64,
        exterior_temperature: f64,
    },
}

/// Condition at the bottom of the domain.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DeepGroundBoundary {
    FixedTemperature(f64),
    /// Undisturbed ground temperature estimated from the settings or from
    /// the mean outdoor temperature of the driving conditions.
    AutoTemperature,
    /// Imposed flux into the domain through the bottom [W/m²], e.g. the
    /// geothermal heat flow.
    ConstantFlux {
        heat_flux: f64,
    },
    #[default]
    ZeroFlux,
}

/// Geometric and material description of a foundation and its soil domain.
///
/// The 2D section runs from the slab centre (`x = 0`) outwards; grade is at
/// `z = 0` and `z` points up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Foundation {
    pub soil: Material,
    pub footprint: Footprint,
    /// Share of the footprint perimeter bordering outdoor conditions.
    pub exposed_fraction: f64,
    /// Take the exposed perimeter from the footprint's per-edge flags
    /// instead of `exposed_fraction`.
    pub use_detailed_exposed_perimeter: bool,
    /// Depth of the slab top below grade [m].
    pub foundation_depth: f64,
    pub slab: Option<Slab>,
    pub wall: Option<Wall>,
    pub footing: Option<Footing>,
    pub interior_horizontal_insulation: Option<HorizontalInsulation>,
    pub interior_vertical_insulation: Option<VerticalInsulation>,
    pub exterior_horizontal_insulation: Option<HorizontalInsulation>,
    pub exterior_vertical_insulation: Option<VerticalInsulation>,
    /// Width of the slab band next to the wall reported as `SlabPerimeter`.
    pub perimeter_surface_width: f64,
    /// Depth of the domain bottom below grade [m].
    pub deep_ground_depth: f64,
    /// Distance from the exterior wall face to the far-field edge [m].
    pub far_field_width: f64,
    pub wall_top_boundary: WallTopBoundary,
    pub deep_ground_boundary: DeepGroundBoundary,
    /// Fixed interior film coefficient; TARP natural convection when absent.
    pub interior_convective_coefficient: Option<f64>,
    /// Fixed exterior film coefficient; DOE-2 when absent.
    pub exterior_convective_coefficient: Option<f64>,
    pub interior_emissivity: f64,
    pub exterior_emissivity: f64,
    pub exterior_absorptivity: f64,
    pub coordinate_system: CoordinateSystem,
}

impl Foundation {
    /// Slab-on-grade with no wall, slab or insulation and typical domain extents.
    pub fn new(soil: Material, footprint: Footprint) -> Self {
        Self {
            soil,
            footprint,
            exposed_fraction: 1.0,
            use_detailed_exposed_perimeter: false,
            foundation_depth: 0.0,
            slab: None,
            wall: None,
            footing: None,
            interior_horizontal_insulation: None,
            interior_vertical_insulation: None,
            exterior_horizontal_insulation: None,
            exterior_vertical_insulation: None,
            perimeter_surface_width: 0.0,
            deep_ground_depth: 40.0,
            far_field_width: 40.0,
            wall_top_boundary: WallTopBoundary::default(),
            deep_ground_boundary: DeepGroundBoundary::default(),
            interior_convective_coefficient: None,
            exterior_convective_coefficient: None,
            interior_emissivity: 0.8,
            exterior_emissivity: 0.8,
            exterior_absorptivity: 0.8,
            coordinate_system: CoordinateSystem::Cartesian,
        }
    }

    pub fn wall_thickness(&self) -> f64 {
        self.wall.as_ref().map_or(0.0, Wall::thickness)
    }

    pub fn slab_thickness(&self) -> f64 {
        self.slab.as_ref().map_or(0.0, Slab::thickness)
    }

    /// Exposed perimeter [m] in the active perimeter mode.
    pub fn exposed_perimeter(&self) -> f64 {
        if self.use_detailed_exposed_perimeter {
            self.footprint.exposed_perimeter()
        } else {
            self.exposed_fraction * self.footprint.perimeter()
        }
    }

    /// Depth of the bottom of the wall below grade [m].
    pub fn wall_bottom_depth(&self) -> f64 {
        let below_slab = self.wall.as_ref().map_or(0.0, |w| w.depth_below_slab);
        self.foundation_depth + self.slab_thickness() + below_slab
    }

    /// Deepest point of any foundation element below grade [m].
    pub fn lowest_element_depth(&self) -> f64 {
        let mut lowest = self.foundation_depth + self.slab_thickness();
        if self.wall.is_some() {
            lowest = lowest.max(self.wall_bottom_depth());
        }
        if let Some(footing) = &self.footing {
            lowest = lowest.max(self.wall_bottom_depth() + footing.depth);
        }
        for ins in [
            &self.interior_horizontal_insulation,
            &self.exterior_horizontal_insulation,
        ]
        .into_iter()
        .flatten()
        {
            lowest = lowest.max(ins.depth + ins.layer.thickness);
        }
        for ins in [
            &self.interior_vertical_insulation,
            &self.exterior_vertical_insulation,
        ]
        .into_iter()
        .flatten()
        {
            lowest = lowest.max(ins.depth);
        }
        lowest
    }

    /// Horizontal reach of foundation elements beyond the exterior wall face [m].
    pub fn exterior_overhang(&self) -> f64 {
        let mut reach: f64 = 0.0;
        if let Some(ins) = &self.exterior_horizontal_insulation {
            reach = reach.max(ins.width);
        }
        if let Some(ins) = &self.exterior_vertical_insulation {
            reach = reach.max(ins.layer.thickness);
        }
        if let Some(footing) = &self.footing {
            reach = reach.max(0.5 * (footing.width - self.wall_thickness()));
        }
        reach
    }

    /// Checks every input before a mesh is built.
    pub fn validate(&self) -> GroundResult<()> {
        self.soil.validate()?;
        self.footprint.validate()?;

        if !(0.0..=1.0).contains(&self.exposed_fraction) {
            return Err(GroundError::geometry(format!(
                "exposed fraction must lie in [0, 1] (got {})",
                self.exposed_fraction
            )));
        }
        non_negative("foundation depth", self.foundation_depth)?;
        non_negative("perimeter surface width", self.perimeter_surface_width)?;
        positive("deep ground depth", self.deep_ground_depth)?;
        positive("far field width", self.far_field_width)?;

        if let Some(slab) = &self.slab {
            if slab.layers.is_empty() {
                return Err(GroundError::geometry("slab has no layers"));
            }
            slab.layers.iter().try_for_each(Layer::validate)?;
        }
        if let Some(wall) = &self.wall {
            if wall.layers.is_empty() {
                return Err(GroundError::geometry("wall has no layers"));
            }
            wall.layers.iter().try_for_each(Layer::validate)?;
            non_negative("wall depth below slab", wall.depth_below_slab)?;
            if !wall.height_above_grade.is_finite()
                || wall.height_above_grade < -self.foundation_depth
            {
                return Err(GroundError::geometry(format!(
                    "wall top ({} m above grade) lies below the slab top",
                    wall.height_above_grade
                )));
            }
        }
        if let Some(footing) = &self.footing {
            if self.wall.is_none() {
                return Err(GroundError::geometry("a footing requires a wall"));
            }
            footing.material.validate()?;
            positive("footing width", footing.width)?;
            positive("footing depth", footing.depth)?;
        }
        for (name, ins) in [
            ("interior horizontal insulation", &self.interior_horizontal_insulation),
            ("exterior horizontal insulation", &self.exterior_horizontal_insulation),
        ] {
            if let Some(ins) = ins {
                ins.layer.validate()?;
                positive(name, ins.width)?;
                non_negative(name, ins.depth)?;
            }
        }
        for (name, ins) in [
            ("interior vertical insulation", &self.interior_vertical_insulation),
            ("exterior vertical insulation", &self.exterior_vertical_insulation),
        ] {
            if let Some(ins) = ins {
                ins.layer.validate()?;
                positive(name, ins.depth)?;
            }
        }

        if self.deep_ground_depth <= self.lowest_element_depth() {
            return Err(GroundError::geometry(format!(
                "deep ground depth {} m does not contain the foundation (lowest element at {} m)",
                self.deep_ground_depth,
                self.lowest_element_depth()
            )));
        }
        if self.far_field_width <= self.exterior_overhang() {
            return Err(GroundError::geometry(format!(
                "far field width {} m does not contain the foundation (elements reach {} m)",
                self.far_field_width,
                self.exterior_overhang()
            )));
        }

        match self.wall_top_boundary {
            WallTopBoundary::ZeroFlux => {}
            WallTopBoundary::FixedTemperature { temperature } => {
                check_temperature("wall top", temperature)?
            }
            WallTopBoundary::LinearGradient {
                interior_temperature,
                exterior_temperature,
            } => {
                check_temperature("wall top", interior_temperature)?;
                check_temperature("wall top", exterior_temperature)?;
            }
        }
        match self.deep_ground_boundary {
            DeepGroundBoundary::FixedTemperature(t) => check_temperature("deep ground", t)?,
            DeepGroundBoundary::ConstantFlux { heat_flux } if !heat_flux.is_finite() => {
                return Err(GroundError::boundary(
                    "deep ground",
                    format!("heat flux must be finite (got {heat_flux})"),
                ));
            }
            _ => {}
        }

        for (region, h) in [
            ("interior surfaces", self.interior_convective_coefficient),
            ("exterior surfaces", self.exterior_convective_coefficient),
        ] {
            if let Some(h) = h {
                if !h.is_finite() || h < 0.0 {
                    return Err(GroundError::boundary(
                        region,
                        format!("convective coefficient must be non-negative (got {h})"),
                    ));
                }
            }
        }
        for (region, value) in [
            ("interior surfaces", self.interior_emissivity),
            ("exterior surfaces", self.exterior_emissivity),
            ("exterior surfaces", self.exterior_absorptivity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GroundError::boundary(
                    region,
                    format!("emissivity and absorptivity must lie in [0, 1] (got {value})"),
                ));
            }
        }
        Ok(())
    }
}

fn positive(what: &str, value: f64) -> GroundResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GroundError::geometry(format!(
            "{what} must be positive (got {value})"
        )))
    }
}

fn non_negative(what: &str, value: f64) -> GroundResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GroundError::geometry(format!(
            "{what} must not be negative (got {value})"
        )))
    }
}
