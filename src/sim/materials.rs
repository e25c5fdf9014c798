use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sim::ground::error::GroundError;

/// Thermal properties of a solid material (soil, concrete, insulation, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Thermal conductivity in W/(m*K).
    pub conductivity: f64,
    /// Density in kg/m^3.
    pub density: f64,
    /// Specific heat capacity in J/(kg*K).
    pub specific_heat: f64,
}

/// A single layer in a slab or wall construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    /// Thickness in meters.
    pub thickness: f64,
    pub material: Material,
}

/// Library of named materials.
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    materials: HashMap<String, Material>,
}

impl Material {
    pub fn new(name: &str, conductivity: f64, density: f64, specific_heat: f64) -> Self {
        Self {
            name: name.to_string(),
            conductivity,
            density,
            specific_heat,
        }
    }

    /// Volumetric heat capacity rho * c_p in J/(m^3*K).
    pub fn volumetric_heat_capacity(&self) -> f64 {
        self.density * self.specific_heat
    }

    /// Thermal diffusivity k / (rho * c_p) in m^2/s.
    pub fn diffusivity(&self) -> f64 {
        self.conductivity / self.volumetric_heat_capacity()
    }

    /// Rejects non-finite or non-positive properties.
    pub fn validate(&self) -> Result<(), GroundError> {
        for (property, value) in [
            ("conductivity", self.conductivity),
            ("density", self.density),
            ("specific heat", self.specific_heat),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GroundError::InvalidMaterial {
                    material: self.name.clone(),
                    property,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Identity used to share one table entry between cells of the same material.
    pub(crate) fn same_properties(&self, other: &Material) -> bool {
        self.name == other.name
            && self.conductivity.to_bits() == other.conductivity.to_bits()
            && self.density.to_bits() == other.density.to_bits()
            && self.specific_heat.to_bits() == other.specific_heat.to_bits()
    }
}

impl Layer {
    pub fn new(name: &str, thickness: f64, material: Material) -> Self {
        Self {
            name: name.to_string(),
            thickness,
            material,
        }
    }

    /// Thermal resistance of this layer in m^2*K/W.
    pub fn resistance(&self) -> f64 {
        self.thickness / self.material.conductivity
    }

    pub fn validate(&self) -> Result<(), GroundError> {
        if !self.thickness.is_finite() || self.thickness <= 0.0 {
            return Err(GroundError::geometry(format!(
                "layer `{}` must have a positive thickness (got {})",
                self.name, self.thickness
            )));
        }
        self.material.validate()
    }
}

/// Total thickness of a layer stack in meters.
pub fn total_thickness(layers: &[Layer]) -> f64 {
    layers.iter().map(|l| l.thickness).sum()
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self {
            materials: HashMap::new(),
        }
    }

    /// Adds a material to the library.
    pub fn add(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    /// Returns a reference to a material by name.
    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    /// Creates a library pre-populated with common foundation materials.
    pub fn with_presets() -> Self {
        let mut lib = Self::new();
        // BESTEST ground-coupling soil
        lib.add(Material::new("soil", 1.9, 1490.0, 1800.0));
        lib.add(Material::new("clay", 1.73, 1842.0, 419.0));
        lib.add(Material::new("concrete", 1.95, 2240.0, 900.0));
        lib.add(Material::new("xps", 0.029, 28.0, 1450.0));
        lib.add(Material::new("eps", 0.035, 20.0, 1450.0));
        lib.add(Material::new("gravel", 0.36, 1840.0, 840.0));
        lib.add(Material::new("gypsum", 0.16, 800.0, 1090.0));
        lib
    }
}
