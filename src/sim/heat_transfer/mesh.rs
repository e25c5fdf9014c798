use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::sim::materials::Material;

/// Sentinel index indicating "no boundary face" in [`StructuredMesh::cell_face`].
pub const NO_FACE: usize = usize::MAX;

/// Geometry of the 2D cross-section.
///
/// `Cartesian` is a slice of unit depth (results per metre of length);
/// `Cylindrical` is axisymmetric about `x = 0` (x is the radius).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoordinateSystem {
    #[default]
    Cartesian,
    Cylindrical,
}

/// Face direction of a cell. `Down` and `Up` follow the vertical axis
/// (z grows upwards, grade at z = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    West,
    East,
    Down,
    Up,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::West,
        Direction::East,
        Direction::Down,
        Direction::Up,
    ];

    pub(crate) fn slot(self) -> usize {
        match self {
            Direction::West => 0,
            Direction::East => 1,
            Direction::Down => 2,
            Direction::Up => 3,
        }
    }

    pub fn is_horizontal_normal(self) -> bool {
        matches!(self, Direction::West | Direction::East)
    }
}

/// Index into [`StructuredMesh::materials`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

/// Cell edges along one axis, strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    edges: Vec<f64>,
}

impl Axis {
    pub fn new(edges: Vec<f64>) -> Self {
        assert!(edges.len() >= 2, "an axis needs at least one cell");
        assert!(
            edges.windows(2).all(|w| w[1] > w[0]),
            "axis edges must be strictly increasing"
        );
        Self { edges }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn start(&self, i: usize) -> f64 {
        self.edges[i]
    }

    pub fn end(&self, i: usize) -> f64 {
        self.edges[i + 1]
    }

    pub fn width(&self, i: usize) -> f64 {
        self.edges[i + 1] - self.edges[i]
    }

    pub fn center(&self, i: usize) -> f64 {
        0.5 * (self.edges[i] + self.edges[i + 1])
    }

    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    pub fn max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }
}

/// A cell face on the boundary of the solid domain (domain edge or air).
#[derive(Debug, Clone)]
pub struct BoundaryFace {
    /// Index of the adjacent solid cell.
    pub cell: usize,
    /// Outward direction of the face as seen from `cell`.
    pub direction: Direction,
    /// Face area in m^2 (per metre of depth in Cartesian coordinates).
    pub area: f64,
    /// Half-cell conductance between cell centroid and face: k*A/(d/2) [W/K].
    pub conductance: f64,
    /// Face centroid (x, z).
    pub center: (f64, f64),
    /// Extent of the face along its own axis (x-range for `Up`/`Down`, z-range otherwise).
    pub span: (f64, f64),
}

/// Structured 2D finite-volume mesh stored as a flat arena.
///
/// Cell `(i, k)` lives at index `k * nx + i`; `k = 0` is the bottom row.
/// Cells without a material are air and take no part in the solve.
#[derive(Debug, Clone)]
pub struct StructuredMesh {
    coordinates: CoordinateSystem,
    x: Axis,
    z: Axis,
    materials: Vec<Material>,
    cell_materials: Vec<Option<MaterialId>>,
    faces: Vec<BoundaryFace>,
    cell_faces: Vec<[usize; 4]>,
}

impl StructuredMesh {
    /// Build a mesh from axes and per-cell materials.
    ///
    /// Boundary faces are enumerated in cell order, then in
    /// [`Direction::ALL`] order, so face indices are deterministic.
    pub fn new(
        coordinates: CoordinateSystem,
        x: Axis,
        z: Axis,
        materials: Vec<Material>,
        cell_materials: Vec<Option<MaterialId>>,
    ) -> Self {
        let n = x.len() * z.len();
        assert_eq!(
            cell_materials.len(),
            n,
            "cell material count ({}) must match grid size ({n})",
            cell_materials.len()
        );
        assert!(
            cell_materials
                .iter()
                .flatten()
                .all(|id| id.0 < materials.len()),
            "cell refers to a material outside the table"
        );

        let mut mesh = Self {
            coordinates,
            x,
            z,
            materials,
            cell_materials,
            faces: Vec::new(),
            cell_faces: vec![[NO_FACE; 4]; n],
        };

        let mut faces = Vec::new();
        for idx in 0..n {
            if mesh.cell_materials[idx].is_none() {
                continue;
            }
            for dir in Direction::ALL {
                let open = match mesh.neighbor(idx, dir) {
                    None => true,
                    Some(nb) => mesh.cell_materials[nb].is_none(),
                };
                if !open {
                    continue;
                }
                let (i, k) = mesh.position(idx);
                let area = mesh.face_area(i, k, dir);
                let half = mesh.half_distance(i, k, dir);
                let conductivity = mesh.conductivity(idx).unwrap_or(0.0);
                let (center, span) = mesh.face_geometry(i, k, dir);
                mesh.cell_faces[idx][dir.slot()] = faces.len();
                faces.push(BoundaryFace {
                    cell: idx,
                    direction: dir,
                    area,
                    conductance: conductivity * area / half,
                    center,
                    span,
                });
            }
        }
        mesh.faces = faces;
        mesh
    }

    pub fn coordinates(&self) -> CoordinateSystem {
        self.coordinates
    }

    pub fn x(&self) -> &Axis {
        &self.x
    }

    pub fn z(&self) -> &Axis {
        &self.z
    }

    pub fn nx(&self) -> usize {
        self.x.len()
    }

    pub fn nz(&self) -> usize {
        self.z.len()
    }

    /// Total number of grid positions (solid and air).
    pub fn len(&self) -> usize {
        self.cell_materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_materials.is_empty()
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn faces(&self) -> &[BoundaryFace] {
        &self.faces
    }

    pub fn index(&self, i: usize, k: usize) -> usize {
        k * self.nx() + i
    }

    pub fn position(&self, idx: usize) -> (usize, usize) {
        (idx % self.nx(), idx / self.nx())
    }

    pub fn material(&self, idx: usize) -> Option<&Material> {
        self.cell_materials[idx].map(|id| &self.materials[id.0])
    }

    pub fn is_solid(&self, idx: usize) -> bool {
        self.cell_materials[idx].is_some()
    }

    fn conductivity(&self, idx: usize) -> Option<f64> {
        self.material(idx).map(|m| m.conductivity)
    }

    /// Neighbouring grid index, or `None` at the domain edge.
    pub fn neighbor(&self, idx: usize, dir: Direction) -> Option<usize> {
        let (i, k) = self.position(idx);
        match dir {
            Direction::West => (i > 0).then(|| idx - 1),
            Direction::East => (i + 1 < self.nx()).then(|| idx + 1),
            Direction::Down => (k > 0).then(|| idx - self.nx()),
            Direction::Up => (k + 1 < self.nz()).then(|| idx + self.nx()),
        }
    }

    /// Boundary face index of `idx` in direction `dir`, or [`NO_FACE`].
    pub fn cell_face(&self, idx: usize, dir: Direction) -> usize {
        self.cell_faces[idx][dir.slot()]
    }

    /// Cell volume in m^3 (per metre of depth for Cartesian).
    pub fn volume(&self, idx: usize) -> f64 {
        let (i, k) = self.position(idx);
        let dz = self.z.width(k);
        match self.coordinates {
            CoordinateSystem::Cartesian => self.x.width(i) * dz,
            CoordinateSystem::Cylindrical => {
                let (r0, r1) = (self.x.start(i), self.x.end(i));
                PI * (r1 * r1 - r0 * r0) * dz
            }
        }
    }

    /// Thermal capacity rho * c_p * V of a solid cell [J/K]; zero for air.
    pub fn capacity(&self, idx: usize) -> f64 {
        self.material(idx)
            .map(|m| m.volumetric_heat_capacity() * self.volume(idx))
            .unwrap_or(0.0)
    }

    /// Area of the face of cell `(i, k)` in direction `dir`.
    pub fn face_area(&self, i: usize, k: usize, dir: Direction) -> f64 {
        match self.coordinates {
            CoordinateSystem::Cartesian => match dir {
                Direction::West | Direction::East => self.z.width(k),
                Direction::Down | Direction::Up => self.x.width(i),
            },
            CoordinateSystem::Cylindrical => match dir {
                Direction::West => 2.0 * PI * self.x.start(i) * self.z.width(k),
                Direction::East => 2.0 * PI * self.x.end(i) * self.z.width(k),
                Direction::Down | Direction::Up => {
                    let (r0, r1) = (self.x.start(i), self.x.end(i));
                    PI * (r1 * r1 - r0 * r0)
                }
            },
        }
    }

    /// Distance from the cell centroid to the face in direction `dir`.
    pub fn half_distance(&self, i: usize, k: usize, dir: Direction) -> f64 {
        if dir.is_horizontal_normal() {
            0.5 * self.x.width(i)
        } else {
            0.5 * self.z.width(k)
        }
    }

    fn face_geometry(&self, i: usize, k: usize, dir: Direction) -> ((f64, f64), (f64, f64)) {
        let (x0, x1) = (self.x.start(i), self.x.end(i));
        let (z0, z1) = (self.z.start(k), self.z.end(k));
        match dir {
            Direction::West => ((x0, 0.5 * (z0 + z1)), (z0, z1)),
            Direction::East => ((x1, 0.5 * (z0 + z1)), (z0, z1)),
            Direction::Down => ((0.5 * (x0 + x1), z0), (x0, x1)),
            Direction::Up => ((0.5 * (x0 + x1), z1), (x0, x1)),
        }
    }

    /// Conductance between `idx` and its neighbour across `dir` [W/K].
    ///
    /// Series-resistance form `K = A / (d_1/k_1 + d_2/k_2)`, i.e. the
    /// area-weighted harmonic mean of the two conductivities. Zero when the
    /// neighbour is air, outside the domain, or `idx` itself is air.
    pub fn conductance(&self, idx: usize, dir: Direction) -> f64 {
        let Some(nb) = self.neighbor(idx, dir) else {
            return 0.0;
        };
        let (Some(k1), Some(k2)) = (self.conductivity(idx), self.conductivity(nb)) else {
            return 0.0;
        };
        let (i, k) = self.position(idx);
        let (ni, nk) = self.position(nb);
        let area = self.face_area(i, k, dir);
        let d1 = self.half_distance(i, k, dir);
        let d2 = self.half_distance(ni, nk, dir);
        area / (d1 / k1 + d2 / k2)
    }

    /// Largest cell aspect ratio (long side over short side) among solid cells.
    pub fn max_aspect_ratio(&self) -> f64 {
        (0..self.len())
            .filter(|&idx| self.is_solid(idx))
            .map(|idx| {
                let (i, k) = self.position(idx);
                let (dx, dz) = (self.x.width(i), self.z.width(k));
                dx.max(dz) / dx.min(dz)
            })
            .fold(1.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(conductivity: f64) -> Material {
        Material::new("m", conductivity, 1000.0, 1000.0)
    }

    #[test]
    fn test_indexing_and_neighbors() {
        let mesh = StructuredMesh::new(
            CoordinateSystem::Cartesian,
            Axis::new(vec![0.0, 1.0, 2.0, 3.0]),
            Axis::new(vec![-2.0, -1.0, 0.0]),
            vec![uniform(1.0)],
            vec![Some(MaterialId(0)); 6],
        );
        assert_eq!(mesh.nx(), 3);
        assert_eq!(mesh.nz(), 2);
        let idx = mesh.index(1, 1);
        assert_eq!(idx, 4);
        assert_eq!(mesh.position(idx), (1, 1));
        assert_eq!(mesh.neighbor(idx, Direction::West), Some(3));
        assert_eq!(mesh.neighbor(idx, Direction::East), Some(5));
        assert_eq!(mesh.neighbor(idx, Direction::Down), Some(1));
        assert_eq!(mesh.neighbor(idx, Direction::Up), None);
        // 3x2 grid: perimeter of 3+3+2+2 boundary faces
        assert_eq!(mesh.faces().len(), 10);
        assert_ne!(mesh.cell_face(idx, Direction::Up), NO_FACE);
        assert_eq!(mesh.cell_face(idx, Direction::West), NO_FACE);
    }

    #[test]
    fn test_interface_conductance_is_series_resistance() {
        // Two 0.5 m cells with k = 1 and k = 3, face area 1 m^2.
        let mesh = StructuredMesh::new(
            CoordinateSystem::Cartesian,
            Axis::new(vec![0.0, 0.5, 1.0]),
            Axis::new(vec![0.0, 1.0]),
            vec![uniform(1.0), uniform(3.0)],
            vec![Some(MaterialId(0)), Some(MaterialId(1))],
        );
        let k = mesh.conductance(0, Direction::East);
        let expected = 1.0 / (0.25 / 1.0 + 0.25 / 3.0);
        assert!((k - expected).abs() < 1e-12, "K = {k}");
        // Arithmetic mean would give 2 * 1 / 0.5 = 4
        assert!((k - 4.0).abs() > 0.5);
        assert!((mesh.conductance(1, Direction::West) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_air_cells_expose_faces() {
        // Air in the top-left corner of a 2x2 grid.
        let mesh = StructuredMesh::new(
            CoordinateSystem::Cartesian,
            Axis::new(vec![0.0, 1.0, 2.0]),
            Axis::new(vec![0.0, 1.0, 2.0]),
            vec![uniform(1.0)],
            vec![Some(MaterialId(0)), Some(MaterialId(0)), None, Some(MaterialId(0))],
        );
        assert_eq!(mesh.conductance(0, Direction::Up), 0.0);
        assert_ne!(mesh.cell_face(0, Direction::Up), NO_FACE);
        assert_ne!(mesh.cell_face(3, Direction::West), NO_FACE);
        assert_eq!(mesh.capacity(2), 0.0);
        // 3 solid cells: 6 domain-edge faces + 2 faces against air
        assert_eq!(mesh.faces().len(), 8);
    }

    #[test]
    fn test_cylindrical_volume_and_areas() {
        let mesh = StructuredMesh::new(
            CoordinateSystem::Cylindrical,
            Axis::new(vec![0.0, 1.0, 3.0]),
            Axis::new(vec![0.0, 2.0]),
            vec![uniform(1.0)],
            vec![Some(MaterialId(0)); 2],
        );
        let total: f64 = (0..mesh.len()).map(|i| mesh.volume(i)).sum();
        assert!((total - PI * 9.0 * 2.0).abs() < 1e-9);
        // Axis face has zero area
        assert_eq!(mesh.face_area(0, 0, Direction::West), 0.0);
        assert!((mesh.face_area(1, 0, Direction::East) - 2.0 * PI * 3.0 * 2.0).abs() < 1e-9);
        assert!((mesh.face_area(1, 0, Direction::Up) - PI * 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_boundary_face_conductance() {
        let mesh = StructuredMesh::new(
            CoordinateSystem::Cartesian,
            Axis::new(vec![0.0, 2.0]),
            Axis::new(vec![0.0, 0.5]),
            vec![uniform(2.0)],
            vec![Some(MaterialId(0))],
        );
        let up = &mesh.faces()[mesh.cell_face(0, Direction::Up)];
        // k*A/(dz/2) = 2 * 2 / 0.25
        assert!((up.conductance - 16.0).abs() < 1e-12);
        assert_eq!(up.center, (1.0, 0.5));
        assert_eq!(up.span, (0.0, 2.0));
    }
}
