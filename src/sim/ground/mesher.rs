//! Builds the structured 2D section of a foundation and its soil domain.
//!
//! # Section layout
//!
//! ```text
//!  z ^            interior air      | wall |  exterior air
//!    |  ..........................  |      |  ..................
//!  0 +--------------------------+   |      +-------------------- grade
//!    |  slab layers (top->bottom)|  |      |
//!    |..........................|   +------+
//!    |                                                 soil
//!    |                                                         |
//! -D +---------------------------------------------------------+--> x
//!    0 (symmetry)           xi    xi+t                       x_max
//! ```
//!
//! Blocks are painted in order (soil, air, slab, wall, footing,
//! insulation); each cell takes the material of the last block that
//! contains its centre. Cell edges are placed at every block edge and each
//! interval between breakpoints is filled with geometrically growing cells.

use std::collections::HashMap;
use std::f64::consts::PI;

use tracing::{debug, warn};

use crate::sim::ground::error::{GroundError, GroundResult};
use crate::sim::ground::foundation::Foundation;
use crate::sim::ground::output::SurfaceKind;
use crate::sim::ground::settings::MeshSettings;
use crate::sim::heat_transfer::mesh::{
    Axis, BoundaryFace, CoordinateSystem, Direction, MaterialId, NO_FACE, StructuredMesh,
};
use crate::sim::materials::Material;

/// Geometric tolerance for matching coordinates [m].
const EPS: f64 = 1e-8;

/// Passes of max-cell-size reduction when enforcing the aspect ratio bound.
const MAX_REFINEMENT_PASSES: usize = 8;

/// How the 3D foundation is represented by the 2D section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reduction {
    /// Footprint area [m²].
    pub area: f64,
    /// Exposed perimeter used for the reduction [m].
    pub exposed_perimeter: f64,
    /// Distance from the symmetry plane to the interior wall face [m].
    pub half_width: f64,
    /// Factor turning section heat rates into whole-foundation heat rates.
    pub multiplier: f64,
    pub coordinates: CoordinateSystem,
    /// No exposed perimeter: a unit-width column under the slab.
    pub one_dimensional: bool,
}

impl Reduction {
    /// Cartesian: half-width `A/Pe`, results per metre of exposed perimeter
    /// times `Pe`. Cylindrical: radius `2A/Pe`, results scaled by `A/(πR²)`.
    pub fn from_foundation(foundation: &Foundation) -> Self {
        let area = foundation.footprint.area();
        let exposed_perimeter = foundation.exposed_perimeter();
        if exposed_perimeter <= EPS {
            return Self {
                area,
                exposed_perimeter: 0.0,
                half_width: 1.0,
                multiplier: area,
                coordinates: CoordinateSystem::Cartesian,
                one_dimensional: true,
            };
        }
        match foundation.coordinate_system {
            CoordinateSystem::Cartesian => Self {
                area,
                exposed_perimeter,
                half_width: area / exposed_perimeter,
                multiplier: exposed_perimeter,
                coordinates: CoordinateSystem::Cartesian,
                one_dimensional: false,
            },
            CoordinateSystem::Cylindrical => {
                let radius = 2.0 * area / exposed_perimeter;
                Self {
                    area,
                    exposed_perimeter,
                    half_width: radius,
                    multiplier: area / (PI * radius * radius),
                    coordinates: CoordinateSystem::Cylindrical,
                    one_dimensional: false,
                }
            }
        }
    }
}

/// Role of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRole {
    Air,
    Interior,
    Boundary(SurfaceKind),
}

/// Mesh of a foundation section with surface bookkeeping.
#[derive(Debug, Clone)]
pub struct GroundMesh {
    mesh: StructuredMesh,
    roles: Vec<CellRole>,
    face_surfaces: Vec<SurfaceKind>,
    surface_faces: HashMap<SurfaceKind, Vec<usize>>,
    reduction: Reduction,
    wall_top_extent: Option<(f64, f64)>,
}

impl GroundMesh {
    pub fn structured(&self) -> &StructuredMesh {
        &self.mesh
    }

    pub fn roles(&self) -> &[CellRole] {
        &self.roles
    }

    pub fn role(&self, idx: usize) -> CellRole {
        self.roles[idx]
    }

    pub fn reduction(&self) -> &Reduction {
        &self.reduction
    }

    /// Surface of boundary face `face`.
    pub fn face_surface(&self, face: usize) -> SurfaceKind {
        self.face_surfaces[face]
    }

    /// Boundary faces belonging to `surface`, in face order.
    pub fn faces_of(&self, surface: SurfaceKind) -> impl Iterator<Item = usize> + '_ {
        self.surface_faces
            .get(&surface)
            .into_iter()
            .flat_map(|faces| faces.iter().copied())
    }

    pub fn has_surface(&self, surface: SurfaceKind) -> bool {
        self.surface_faces
            .get(&surface)
            .is_some_and(|faces| !faces.is_empty())
    }

    /// Total face area of `surface` in the section [m² or m per metre].
    pub fn surface_area(&self, surface: SurfaceKind) -> f64 {
        self.faces_of(surface)
            .map(|f| self.mesh.faces()[f].area)
            .sum()
    }

    /// Horizontal extent `(x_min, x_max)` of the wall-top faces.
    pub fn wall_top_extent(&self) -> Option<(f64, f64)> {
        self.wall_top_extent
    }

    /// Thermal capacitance of every grid cell [J/K].
    pub fn capacitance(&self) -> Vec<f64> {
        (0..self.mesh.len()).map(|i| self.mesh.capacity(i)).collect()
    }
}

/// Vertical component of the outward normal of a face.
pub fn face_normal_z(face: &BoundaryFace) -> f64 {
    match face.direction {
        Direction::Up => 1.0,
        Direction::Down => -1.0,
        Direction::West | Direction::East => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Soil,
    Air,
    Layer,
}

#[derive(Debug, Clone)]
struct Block {
    name: String,
    kind: BlockKind,
    material: Option<MaterialId>,
    x: (f64, f64),
    z: (f64, f64),
}

impl Block {
    fn contains(&self, x: f64, z: f64) -> bool {
        x > self.x.0 && x < self.x.1 && z > self.z.0 && z < self.z.1
    }

    fn has_extent(&self) -> bool {
        self.x.1 - self.x.0 > EPS && self.z.1 - self.z.0 > EPS
    }
}

/// Key positions of the section used for surface classification.
#[derive(Debug, Clone, Copy)]
struct Section {
    x_domain: (f64, f64),
    z_domain: (f64, f64),
    interior_face: f64,
    grade_start: f64,
    slab_top: f64,
    perimeter_width: f64,
    one_dimensional: bool,
}

impl Section {
    fn classify(&self, face: &BoundaryFace, domain_edge: bool) -> SurfaceKind {
        match face.direction {
            Direction::West if domain_edge => SurfaceKind::Symmetry,
            Direction::East if domain_edge => SurfaceKind::FarField,
            Direction::Down if domain_edge => SurfaceKind::DeepGround,
            Direction::West => SurfaceKind::WallInterior,
            Direction::East => SurfaceKind::WallExterior,
            Direction::Up | Direction::Down => self.classify_horizontal(face.center),
        }
    }

    fn classify_horizontal(&self, (x, z): (f64, f64)) -> SurfaceKind {
        if (z - self.slab_top).abs() < EPS && x < self.interior_face {
            let perimeter = !self.one_dimensional
                && self.perimeter_width > 0.0
                && x > self.interior_face - self.perimeter_width;
            if perimeter {
                SurfaceKind::SlabPerimeter
            } else {
                SurfaceKind::SlabCore
            }
        } else if z.abs() < EPS && x > self.grade_start {
            SurfaceKind::Grade
        } else {
            SurfaceKind::WallTop
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Spacing {
    /// Fine at both ends, coarse in the middle.
    Both,
    /// Fine at the start of the interval.
    Start,
    /// Fine at the end of the interval.
    End,
}

/// Build the mesh of `foundation`.
pub fn build_ground_mesh(
    foundation: &Foundation,
    settings: &MeshSettings,
) -> GroundResult<GroundMesh> {
    foundation.validate()?;
    settings.validate()?;

    let reduction = Reduction::from_foundation(foundation);
    let (blocks, materials, section) = layout(foundation, &reduction);

    let x_breaks = breakpoints(
        section.x_domain,
        blocks.iter().map(|b| b.x),
        section_extra_x(&section),
    );
    let z_breaks = breakpoints(section.z_domain, blocks.iter().map(|b| b.z), Vec::new());

    let mut max_dim = settings.max_cell_dim;
    let mut pass = 0;
    let (mesh, owners) = loop {
        let x_edges = if reduction.one_dimensional {
            vec![0.0, reduction.half_width]
        } else {
            let last = x_breaks.len() - 2;
            grid(&x_breaks, settings, max_dim, |i| match i {
                0 if last == 0 => Spacing::Both,
                0 => Spacing::End,
                i if i == last => Spacing::Start,
                _ => Spacing::Both,
            })
        };
        let z_edges = grid(&z_breaks, settings, max_dim, |i| {
            if i == 0 {
                Spacing::End
            } else {
                Spacing::Both
            }
        });

        let (mesh, owners) = paint(
            reduction.coordinates,
            Axis::new(x_edges),
            Axis::new(z_edges),
            &blocks,
            &materials,
        );
        let ratio = mesh.max_aspect_ratio();
        if ratio <= settings.max_aspect_ratio {
            break (mesh, owners);
        }
        pass += 1;
        if max_dim <= settings.min_cell_dim * (1.0 + 1e-9) || pass >= MAX_REFINEMENT_PASSES {
            warn!(
                ratio,
                limit = settings.max_aspect_ratio,
                "mesh aspect ratio exceeds the limit at the finest allowed cell size"
            );
            break (mesh, owners);
        }
        let next = (0.5 * max_dim).max(settings.min_cell_dim);
        debug!(
            ratio,
            limit = settings.max_aspect_ratio,
            max_cell_dim = next,
            "reducing maximum cell size to bound the aspect ratio"
        );
        max_dim = next;
    };

    for (b, block) in blocks.iter().enumerate() {
        if block.kind == BlockKind::Layer && block.has_extent() && !owners.contains(&Some(b)) {
            return Err(GroundError::geometry(format!(
                "`{}` is not resolved by the mesh; reduce the minimum cell dimension",
                block.name
            )));
        }
    }

    let face_surfaces: Vec<SurfaceKind> = mesh
        .faces()
        .iter()
        .map(|face| {
            let domain_edge = mesh.neighbor(face.cell, face.direction).is_none();
            section.classify(face, domain_edge)
        })
        .collect();

    let mut surface_faces: HashMap<SurfaceKind, Vec<usize>> = HashMap::new();
    for (f, surface) in face_surfaces.iter().enumerate() {
        surface_faces.entry(*surface).or_default().push(f);
    }

    let roles = (0..mesh.len())
        .map(|idx| cell_role(&mesh, &face_surfaces, idx))
        .collect();

    let wall_top_extent = surface_faces.get(&SurfaceKind::WallTop).map(|faces| {
        faces.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, &f| {
            let span = mesh.faces()[f].span;
            (acc.0.min(span.0), acc.1.max(span.1))
        })
    });

    debug!(
        nx = mesh.nx(),
        nz = mesh.nz(),
        faces = mesh.faces().len(),
        half_width = reduction.half_width,
        multiplier = reduction.multiplier,
        "built ground mesh"
    );

    Ok(GroundMesh {
        mesh,
        roles,
        face_surfaces,
        surface_faces,
        reduction,
        wall_top_extent,
    })
}

fn section_extra_x(section: &Section) -> Vec<f64> {
    let split = section.interior_face - section.perimeter_width;
    if !section.one_dimensional && section.perimeter_width > 0.0 && split > EPS {
        vec![split]
    } else {
        Vec::new()
    }
}

/// Table index of `material`, adding it on first use.
fn intern(materials: &mut Vec<Material>, material: &Material) -> MaterialId {
    if let Some(pos) = materials.iter().position(|m| m.same_properties(material)) {
        return MaterialId(pos);
    }
    materials.push(material.clone());
    MaterialId(materials.len() - 1)
}

fn layout(foundation: &Foundation, reduction: &Reduction) -> (Vec<Block>, Vec<Material>, Section) {
    let mut materials = Vec::new();
    let mut blocks = Vec::new();

    let xi = reduction.half_width;
    let one_d = reduction.one_dimensional;
    let t = if one_d { 0.0 } else { foundation.wall_thickness() };
    let x_max = if one_d {
        xi
    } else {
        xi + t + foundation.far_field_width
    };
    let fd = foundation.foundation_depth;
    let wall_top = match (&foundation.wall, one_d) {
        (Some(wall), false) => wall.height_above_grade,
        _ => 0.0,
    };
    let z_top = wall_top.max(0.0);
    let depth = foundation.deep_ground_depth;

    let soil = intern(&mut materials, &foundation.soil);
    blocks.push(Block {
        name: "soil".into(),
        kind: BlockKind::Soil,
        material: Some(soil),
        x: (0.0, x_max),
        z: (-depth, 0.0),
    });
    blocks.push(Block {
        name: "interior air".into(),
        kind: BlockKind::Air,
        material: None,
        x: (0.0, xi),
        z: (-fd, z_top),
    });
    if !one_d {
        blocks.push(Block {
            name: "exterior air".into(),
            kind: BlockKind::Air,
            material: None,
            x: (xi + t, x_max),
            z: (0.0, z_top),
        });
    }

    if let Some(slab) = &foundation.slab {
        let mut top = -fd;
        for layer in &slab.layers {
            let id = intern(&mut materials, &layer.material);
            blocks.push(Block {
                name: format!("slab layer `{}`", layer.name),
                kind: BlockKind::Layer,
                material: Some(id),
                x: (0.0, xi),
                z: (top - layer.thickness, top),
            });
            top -= layer.thickness;
        }
    }

    let wall_bottom = -foundation.wall_bottom_depth();
    if let (Some(wall), false) = (&foundation.wall, one_d) {
        let mut outer = xi + t;
        for layer in &wall.layers {
            let id = intern(&mut materials, &layer.material);
            blocks.push(Block {
                name: format!("wall layer `{}`", layer.name),
                kind: BlockKind::Layer,
                material: Some(id),
                x: (outer - layer.thickness, outer),
                z: (wall_bottom, wall.height_above_grade),
            });
            outer -= layer.thickness;
        }
    }

    if let (Some(footing), false) = (&foundation.footing, one_d) {
        let id = intern(&mut materials, &footing.material);
        let center = xi + 0.5 * t;
        blocks.push(Block {
            name: "footing".into(),
            kind: BlockKind::Layer,
            material: Some(id),
            x: (
                (center - 0.5 * footing.width).max(0.0),
                center + 0.5 * footing.width,
            ),
            z: (wall_bottom - footing.depth, wall_bottom),
        });
    }

    if let Some(ins) = &foundation.interior_horizontal_insulation {
        let id = intern(&mut materials, &ins.layer.material);
        let x0 = if one_d { 0.0 } else { (xi - ins.width).max(0.0) };
        blocks.push(Block {
            name: "interior horizontal insulation".into(),
            kind: BlockKind::Layer,
            material: Some(id),
            x: (x0, xi),
            z: (-ins.depth - ins.layer.thickness, -ins.depth),
        });
    }

    let mut grade_start = xi + t;
    if !one_d {
        if let Some(ins) = &foundation.interior_vertical_insulation {
            let id = intern(&mut materials, &ins.layer.material);
            blocks.push(Block {
                name: "interior vertical insulation".into(),
                kind: BlockKind::Layer,
                material: Some(id),
                x: ((xi - ins.layer.thickness).max(0.0), xi),
                z: (-ins.depth, wall_top),
            });
        }
        if let Some(ins) = &foundation.exterior_horizontal_insulation {
            let id = intern(&mut materials, &ins.layer.material);
            blocks.push(Block {
                name: "exterior horizontal insulation".into(),
                kind: BlockKind::Layer,
                material: Some(id),
                x: (xi + t, xi + t + ins.width),
                z: (-ins.depth - ins.layer.thickness, -ins.depth),
            });
        }
        if let Some(ins) = &foundation.exterior_vertical_insulation {
            let id = intern(&mut materials, &ins.layer.material);
            blocks.push(Block {
                name: "exterior vertical insulation".into(),
                kind: BlockKind::Layer,
                material: Some(id),
                x: (xi + t, xi + t + ins.layer.thickness),
                z: (-ins.depth, z_top),
            });
            grade_start += ins.layer.thickness;
        }
    }

    let section = Section {
        x_domain: (0.0, x_max),
        z_domain: (-depth, z_top),
        interior_face: xi,
        grade_start,
        slab_top: -fd,
        perimeter_width: foundation.perimeter_surface_width,
        one_dimensional: one_d,
    };
    (blocks, materials, section)
}

/// Sorted, de-duplicated breakpoints clipped to `(lo, hi)`.
fn breakpoints(
    (lo, hi): (f64, f64),
    ranges: impl Iterator<Item = (f64, f64)>,
    extra: Vec<f64>,
) -> Vec<f64> {
    let mut points: Vec<f64> = ranges
        .flat_map(|(a, b)| [a, b])
        .chain([lo, hi])
        .chain(extra)
        .filter(|p| p.is_finite())
        .map(|p| p.clamp(lo, hi))
        .collect();
    points.sort_by(f64::total_cmp);
    points.dedup_by(|b, a| (*b - *a).abs() < EPS);
    points
}

/// Cell edges over all breakpoint intervals.
fn grid(
    breaks: &[f64],
    settings: &MeshSettings,
    max_dim: f64,
    spacing: impl Fn(usize) -> Spacing,
) -> Vec<f64> {
    let mut edges = vec![breaks[0]];
    for (i, w) in breaks.windows(2).enumerate() {
        let start = w[0];
        let mut pos = start;
        let cells = subdivide(
            w[1] - w[0],
            spacing(i),
            settings.min_cell_dim,
            settings.max_growth_coefficient,
            max_dim,
        );
        let n = cells.len();
        for (c, d) in cells.into_iter().enumerate() {
            pos += d;
            // Land exactly on the breakpoint.
            edges.push(if c + 1 == n { w[1] } else { pos });
        }
    }
    edges
}

/// Cell sizes filling an interval of `length`.
fn subdivide(length: f64, spacing: Spacing, min: f64, growth: f64, max: f64) -> Vec<f64> {
    if length <= 2.0 * min {
        let n = ((length / min).round() as usize).max(1);
        return vec![length / n as f64; n];
    }
    match spacing {
        Spacing::Both => {
            let half = growing_sequence(0.5 * length, min, growth, max);
            half.iter().chain(half.iter().rev()).copied().collect()
        }
        Spacing::Start => growing_sequence(length, min, growth, max),
        Spacing::End => {
            let mut cells = growing_sequence(length, min, growth, max);
            cells.reverse();
            cells
        }
    }
}

/// Cells growing from `min` by `growth` (capped at `max`) that exactly fill
/// `target`. The sequence overshooting or undershooting the target is kept,
/// whichever needs the smaller rescaling.
fn growing_sequence(target: f64, min: f64, growth: f64, max: f64) -> Vec<f64> {
    let mut cells = Vec::new();
    let mut total = 0.0;
    let mut size = min.min(max);
    while total < target {
        cells.push(size);
        total += size;
        size = (size * growth).min(max);
    }
    if cells.len() > 1 {
        let last = cells[cells.len() - 1];
        let under = total - last;
        if (target / under - 1.0).abs() < (target / total - 1.0).abs() {
            cells.pop();
            total = under;
        }
    }
    let scale = target / total;
    cells.iter().map(|c| c * scale).collect()
}

fn paint(
    coordinates: CoordinateSystem,
    x: Axis,
    z: Axis,
    blocks: &[Block],
    materials: &[Material],
) -> (StructuredMesh, Vec<Option<usize>>) {
    let (nx, nz) = (x.len(), z.len());
    let mut cell_materials = Vec::with_capacity(nx * nz);
    let mut owners = Vec::with_capacity(nx * nz);
    for k in 0..nz {
        let zc = z.center(k);
        for i in 0..nx {
            let xc = x.center(i);
            let owner = blocks.iter().rposition(|b| b.contains(xc, zc));
            owners.push(owner);
            cell_materials.push(owner.and_then(|b| blocks[b].material));
        }
    }
    let mesh = StructuredMesh::new(coordinates, x, z, materials.to_vec(), cell_materials);
    (mesh, owners)
}

fn cell_role(mesh: &StructuredMesh, face_surfaces: &[SurfaceKind], idx: usize) -> CellRole {
    if !mesh.is_solid(idx) {
        return CellRole::Air;
    }
    let surfaces: Vec<SurfaceKind> = Direction::ALL
        .iter()
        .map(|&dir| mesh.cell_face(idx, dir))
        .filter(|&f| f != NO_FACE)
        .map(|f| face_surfaces[f])
        .collect();
    surfaces
        .iter()
        .find(|s| s.is_domain_edge())
        .or_else(|| surfaces.first())
        .map_or(CellRole::Interior, |s| CellRole::Boundary(*s))
}
