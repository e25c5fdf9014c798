use serde::{Deserialize, Serialize};

use crate::sim::ground::error::GroundError;

/// Point in the horizontal (plan) plane, meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Plan outline of the slab (interior face of the foundation wall).
///
/// Edge `i` runs from vertex `i` to vertex `i + 1` (wrapping). `exposed[i]`
/// tells whether that edge borders outdoor conditions; unexposed edges border
/// e.g. an adjacent heated building and carry no edge heat loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    vertices: Vec<Point2>,
    exposed: Vec<bool>,
}

impl Footprint {
    /// Polygon with every edge exposed.
    pub fn new(vertices: Vec<Point2>) -> Self {
        let exposed = vec![true; vertices.len()];
        Self { vertices, exposed }
    }

    /// Axis-aligned rectangle centered at the origin.
    pub fn rectangle(length: f64, width: f64) -> Self {
        let (hl, hw) = (length / 2.0, width / 2.0);
        Self::new(vec![
            Point2::new(-hl, -hw),
            Point2::new(hl, -hw),
            Point2::new(hl, hw),
            Point2::new(-hl, hw),
        ])
    }

    /// Replaces the per-edge exposure flags.
    pub fn with_exposed_edges(mut self, exposed: Vec<bool>) -> Self {
        self.exposed = exposed;
        self
    }

    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }

    pub fn exposed_edges(&self) -> &[bool] {
        &self.exposed
    }

    fn edges(&self) -> impl Iterator<Item = (&Point2, &Point2)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (&self.vertices[i], &self.vertices[(i + 1) % n]))
    }

    /// Enclosed area (shoelace formula), independent of vertex winding.
    pub fn area(&self) -> f64 {
        let twice: f64 = self.edges().map(|(a, b)| a.x * b.y - b.x * a.y).sum();
        twice.abs() / 2.0
    }

    pub fn perimeter(&self) -> f64 {
        self.edges().map(|(a, b)| a.distance(b)).sum()
    }

    /// Sum of the lengths of edges flagged as exposed.
    pub fn exposed_perimeter(&self) -> f64 {
        self.edges()
            .zip(&self.exposed)
            .filter(|(_, exposed)| **exposed)
            .map(|((a, b), _)| a.distance(b))
            .sum()
    }

    pub fn validate(&self) -> Result<(), GroundError> {
        if self.vertices.len() < 3 {
            return Err(GroundError::geometry(format!(
                "footprint needs at least 3 vertices (got {})",
                self.vertices.len()
            )));
        }
        if self.exposed.len() != self.vertices.len() {
            return Err(GroundError::geometry(format!(
                "footprint has {} edges but {} exposure flags",
                self.vertices.len(),
                self.exposed.len()
            )));
        }
        if self
            .vertices
            .iter()
            .any(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(GroundError::geometry("footprint vertex is not finite"));
        }
        if self.edges().any(|(a, b)| a.distance(b) < 1e-9) {
            return Err(GroundError::geometry("footprint has a zero-length edge"));
        }
        if self.area() < 1e-9 {
            return Err(GroundError::geometry("footprint encloses no area"));
        }
        Ok(())
    }
}
