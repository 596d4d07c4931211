//! Seam chamfering between a mesh and its companions.
//!
//! Where an open boundary of the primary mesh coincides with an open
//! boundary of a companion mesh (a detail panel sitting on a shell, for
//! example), the vertices on both sides are pushed apart along the surface
//! and the gap is bridged with new triangles. The result is a small bevel
//! instead of a hard crease.
//!
//! # Pipeline
//!
//! 1. Concatenate the primary and companion buffers ([`CombinedBuffer`]).
//! 2. Group coincident vertices ([`CoincidenceMap`]).
//! 3. Pair directed edges inside and across meshes ([`EdgeTopology`]).
//! 4. Accumulate a push direction per vertex ([`accumulate_push`]).
//! 5. Bridge each seam with two triangles ([`bridge_triangles`]) and close
//!    points where three or more meshes meet ([`closing_fans`]).
//! 6. Displace vertices, keep the primary triangles plus the new ones, and
//!    drop every vertex that is no longer referenced.
//!
//! # Example
//!
//! ```
//! use meshseam::algo::chamfer::{chamfer, ChamferOptions};
//! use meshseam::mesh::MeshBuffer;
//! use nalgebra::{Point3, Vector3};
//!
//! let shell = MeshBuffer::from_triangles(
//!     vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
//!     vec![Vector3::z(); 3],
//!     &[[0, 1, 2]],
//! )
//! .unwrap();
//!
//! let options = ChamferOptions::default().with_locked_edges(true);
//! let result = chamfer(&shell, &[], &options).unwrap();
//! assert_eq!(result.mesh.positions, shell.positions);
//! ```

use std::collections::HashSet;

use nalgebra::{Point3, Vector3};

use super::coincidence::{CoincidenceMap, DEFAULT_EPSILON};
use super::compact::Remap;
use super::topology::{EdgeKind, EdgeTopology};
use super::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::{triangle_centroid, triangle_normal, CombinedBuffer, MeshBuffer};

/// Weight assigned to vertices on a locked outer boundary.
///
/// Large enough that no realistic number of seam contributions lifts it
/// back above zero.
pub const LOCKED_WEIGHT: f64 = -1000.0;

/// Accumulated pushes shorter than this are treated as no push.
const MIN_PUSH_LENGTH: f64 = 1e-4;

/// Fraction of the push used to probe the orientation of fan triangles.
const FAN_PROBE: f64 = 0.01;

/// Number of progress stages reported by [`chamfer_with_progress`].
const STAGES: usize = 6;

/// Options for seam chamfering.
#[derive(Debug, Clone, PartialEq)]
pub struct ChamferOptions {
    /// Scale factor of the mesh in its scene. Displacement is
    /// `chamfer_size / scale`, which keeps the bevel the same size after the
    /// mesh is scaled for display.
    pub scale: f64,

    /// Size of the bevel in scene units.
    pub chamfer_size: f64,

    /// Emit bridge and fan triangles that touch companion vertices.
    /// Triangles made only of companion vertices are never emitted.
    pub add_chamfer_geometry: bool,

    /// Keep vertices on true outer boundaries (edges matched nowhere) fixed.
    pub lock_edges: bool,

    /// Distance below which vertices are considered coincident.
    pub coincidence_epsilon: f64,
}

impl Default for ChamferOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            chamfer_size: 0.02,
            add_chamfer_geometry: false,
            lock_edges: false,
            coincidence_epsilon: DEFAULT_EPSILON,
        }
    }
}

impl ChamferOptions {
    /// Set the mesh scale factor.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the bevel size.
    pub fn with_chamfer_size(mut self, chamfer_size: f64) -> Self {
        self.chamfer_size = chamfer_size;
        self
    }

    /// Set whether bridge geometry touching companion vertices is emitted.
    pub fn with_chamfer_geometry(mut self, add: bool) -> Self {
        self.add_chamfer_geometry = add;
        self
    }

    /// Set whether outer boundary vertices are locked.
    pub fn with_locked_edges(mut self, lock: bool) -> Self {
        self.lock_edges = lock;
        self
    }

    /// Set the coincidence distance.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.coincidence_epsilon = epsilon;
        self
    }

    /// Distance each pushed vertex moves.
    #[inline]
    pub fn displacement(&self) -> f64 {
        self.chamfer_size / self.scale
    }

    /// Check that every parameter is in range.
    pub fn validate(&self) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(MeshError::invalid_param("scale", self.scale, "must be finite and positive"));
        }
        if !(self.chamfer_size.is_finite() && self.chamfer_size >= 0.0) {
            return Err(MeshError::invalid_param(
                "chamfer_size",
                self.chamfer_size,
                "must be finite and non-negative",
            ));
        }
        if !(self.coincidence_epsilon.is_finite() && self.coincidence_epsilon > 0.0) {
            return Err(MeshError::invalid_param(
                "coincidence_epsilon",
                self.coincidence_epsilon,
                "must be finite and positive",
            ));
        }
        Ok(())
    }
}

/// Counters describing one chamfer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChamferStats {
    /// Edges closed inside their own mesh.
    pub interior_edges: usize,
    /// Edges matched only across meshes.
    pub seam_edges: usize,
    /// Edges matched nowhere.
    pub boundary_edges: usize,
    /// Vertices held in place by boundary locking.
    pub locked_vertices: usize,
    /// Vertices that received a non-zero push.
    pub pushed_vertices: usize,
    /// Triangles bridging seams.
    pub bridge_triangles: usize,
    /// Triangles closing multi-way junctions.
    pub fan_triangles: usize,
    /// Combined vertices absent from the output.
    pub dropped_vertices: usize,
}

/// Output of [`chamfer`].
#[derive(Debug, Clone)]
pub struct ChamferResult {
    /// The processed primary mesh, compacted.
    pub mesh: MeshBuffer,
    /// What happened along the way.
    pub stats: ChamferStats,
}

/// Per-vertex push directions and accumulation weights.
#[derive(Debug, Clone, Default)]
pub struct PushField {
    directions: Vec<Vector3<f64>>,
    weights: Vec<f64>,
}

impl PushField {
    /// Unit push direction of `v`, or zero if it does not move.
    #[inline]
    pub fn direction(&self, v: usize) -> Vector3<f64> {
        self.directions[v]
    }

    /// Accumulation weight of `v`. Locked vertices have a negative weight.
    #[inline]
    pub fn weight(&self, v: usize) -> f64 {
        self.weights[v]
    }

    /// All push directions.
    pub fn directions(&self) -> &[Vector3<f64>] {
        &self.directions
    }

    /// Number of vertices held by boundary locking.
    pub fn locked_count(&self) -> usize {
        self.weights.iter().filter(|&&w| w < 0.0).count()
    }

    /// Number of vertices with a non-zero push.
    pub fn pushed_count(&self) -> usize {
        self.directions.iter().filter(|d| **d != Vector3::zeros()).count()
    }

    /// `position + direction * scale` for vertex `v`.
    #[inline]
    fn displaced(&self, positions: &[Point3<f64>], v: usize, scale: f64) -> Point3<f64> {
        positions[v] + self.directions[v] * scale
    }
}

/// Compute the push direction of every combined vertex.
///
/// Each seam edge contributes, at each of its four vertices, the partner
/// side's normal projected onto the vertex's own tangent plane. The sign
/// follows the crease: it flips when the partner triangle lies behind the
/// plane of the edge's own triangle. With `lock_edges`, vertices on edges
/// matched nowhere get [`LOCKED_WEIGHT`] and never move.
pub fn accumulate_push(
    combined: &CombinedBuffer,
    topology: &EdgeTopology,
    lock_edges: bool,
) -> PushField {
    let n = combined.vertex_count();
    let normals = &combined.normals;
    let mut push = vec![Vector3::zeros(); n];
    let mut weights = vec![0.0; n];

    for (_, e0) in topology.edges() {
        match e0.kind() {
            EdgeKind::BoundaryToSelf if lock_edges => {
                weights[e0.v0] = LOCKED_WEIGHT;
                weights[e0.v1] = LOCKED_WEIGHT;
            }
            EdgeKind::BoundaryToOther => {
                let Some(partner) = e0.rep_neighbor else {
                    continue;
                };
                let e1 = topology.edge(partner);

                let [a0, a1, a2] = combined.triangle_positions(e0.triangle);
                let [b0, b1, b2] = combined.triangle_positions(e1.triangle);
                let center0 = triangle_centroid(&a0, &a1, &a2);
                let normal0 = triangle_normal(&a0, &a1, &a2);
                let center1 = triangle_centroid(&b0, &b1, &b2);

                let dir = if normal0.dot(&(center1 - center0)) > 0.0 {
                    1.0
                } else {
                    -1.0
                };

                push[e0.v0] += project_on_plane(&normals[e1.v1], &normals[e0.v0]) * dir;
                push[e0.v1] += project_on_plane(&normals[e1.v0], &normals[e0.v1]) * dir;
                push[e1.v0] += project_on_plane(&normals[e0.v1], &normals[e1.v0]) * dir;
                push[e1.v1] += project_on_plane(&normals[e0.v0], &normals[e1.v1]) * dir;

                for v in [e0.v0, e0.v1, e1.v0, e1.v1] {
                    weights[v] += 1.0;
                }
            }
            _ => {}
        }
    }

    for (p, &w) in push.iter_mut().zip(&weights) {
        if w > 0.0 && p.norm() > MIN_PUSH_LENGTH {
            p.normalize_mut();
        } else {
            *p = Vector3::zeros();
        }
    }

    PushField {
        directions: push,
        weights,
    }
}

/// Set of emitted triangles that ignores vertex order.
///
/// A triangle counts as present if any permutation of its three indices was
/// inserted before. Insertion order is preserved for output.
#[derive(Debug, Clone, Default)]
pub struct TriangleSet {
    triangles: Vec<usize>,
    keys: HashSet<[usize; 3]>,
}

impl TriangleSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if some ordering of `(a, b, c)` was inserted.
    pub fn contains(&self, a: usize, b: usize, c: usize) -> bool {
        self.keys.contains(&sorted_key(a, b, c))
    }

    /// Insert `(a, b, c)` unless some ordering of it is already present.
    /// Returns true if it was inserted.
    pub fn insert(&mut self, a: usize, b: usize, c: usize) -> bool {
        if !self.keys.insert(sorted_key(a, b, c)) {
            return false;
        }
        self.triangles.extend_from_slice(&[a, b, c]);
        true
    }

    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.triangles.len() / 3
    }

    /// True if no triangle was inserted.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Flat index list in insertion order.
    pub fn as_slice(&self) -> &[usize] {
        &self.triangles
    }
}

fn sorted_key(a: usize, b: usize, c: usize) -> [usize; 3] {
    let mut key = [a, b, c];
    key.sort_unstable();
    key
}

/// Whether a new triangle over `vertices` may be emitted.
///
/// Geometry made only of primary vertices is always allowed. Geometry that
/// touches a companion vertex needs `add_chamfer_geometry`, and geometry made
/// only of companion vertices is never allowed.
fn admits(vertices: &[usize], primary_vertex_count: usize, add_chamfer_geometry: bool) -> bool {
    let companions = vertices.iter().filter(|&&v| v >= primary_vertex_count).count();
    if companions == 0 {
        true
    } else {
        add_chamfer_geometry && companions < vertices.len()
    }
}

/// Emit two triangles across every seam.
///
/// For a seam edge `(v0, v1)` with partner `(v2, v3)` the triangles are
/// `(v1, v0, v2)` and `(v2, v0, v3)`. The partner's own visit finds them
/// already present and is skipped. Returns the number of triangles added.
pub fn bridge_triangles(
    topology: &EdgeTopology,
    primary_vertex_count: usize,
    add_chamfer_geometry: bool,
    emitted: &mut TriangleSet,
) -> usize {
    let before = emitted.len();

    for (e0, e1) in topology.seams() {
        let (v0, v1, v2, v3) = (e0.v0, e0.v1, e1.v0, e1.v1);

        if emitted.contains(v1, v0, v2) || emitted.contains(v2, v0, v3) {
            continue;
        }
        if !admits(&[v0, v1, v2, v3], primary_vertex_count, add_chamfer_geometry) {
            continue;
        }

        emitted.insert(v1, v0, v2);
        emitted.insert(v2, v0, v3);
    }

    emitted.len() - before
}

/// Close points where three or more vertices coincide with a triangle fan.
///
/// The cluster is ordered counter-clockwise around its averaged normal,
/// measured on the pushed positions, and fanned from its first vertex. Each
/// triangle is flipped if it faces away from its vertices' normals.
///
/// The fan is not a general polygon triangulation; non-convex clusters can
/// yield overlapping triangles. Returns the number of triangles added.
pub fn closing_fans(
    combined: &CombinedBuffer,
    map: &CoincidenceMap,
    push: &PushField,
    add_chamfer_geometry: bool,
    emitted: &mut TriangleSet,
) -> usize {
    let positions = &combined.positions;
    let normals = &combined.normals;
    let primary_vertex_count = combined.primary_vertex_count();
    let before = emitted.len();

    for rep in map.clusters_of_at_least(3) {
        let mut poly: Vec<usize> = map.cluster(rep).collect();

        if poly.len() > 3 {
            let center = poly
                .iter()
                .fold(Vector3::zeros(), |acc, &v| acc + push.displaced(positions, v, 1.0).coords)
                / poly.len() as f64;
            let center = Point3::from(center);
            let axis = poly
                .iter()
                .fold(Vector3::zeros(), |acc, &v| acc + normals[v]);
            let axis = axis.try_normalize(1e-12).unwrap_or_else(Vector3::zeros);
            let reference = push.displaced(positions, poly[0], 1.0) - center;

            let angle = |v: usize| {
                signed_angle(&reference, &(push.displaced(positions, v, 1.0) - center), &axis)
            };
            poly.sort_by(|&a, &b| angle(a).total_cmp(&angle(b)));
        }

        for j in 1..poly.len() - 1 {
            let v0 = poly[0];
            let mut v1 = poly[j];
            let mut v2 = poly[j + 1];

            if !admits(&[v0, v1, v2], primary_vertex_count, add_chamfer_geometry) {
                continue;
            }

            let n = triangle_normal(
                &push.displaced(positions, v0, FAN_PROBE),
                &push.displaced(positions, v1, FAN_PROBE),
                &push.displaced(positions, v2, FAN_PROBE),
            );
            let average = (normals[v0] + normals[v1] + normals[v2]) / 3.0;
            if n.dot(&average) < 0.0 {
                std::mem::swap(&mut v1, &mut v2);
            }

            emitted.insert(v0, v1, v2);
        }
    }

    emitted.len() - before
}

/// Chamfer the seams between `primary` and `companions`.
///
/// All buffers must share one coordinate frame. The returned mesh contains
/// the primary triangles plus the generated bridge and fan triangles; the
/// companions' own triangles are not part of it. A primary mesh without
/// vertices or triangles is returned unchanged.
pub fn chamfer(
    primary: &MeshBuffer,
    companions: &[MeshBuffer],
    options: &ChamferOptions,
) -> Result<ChamferResult> {
    chamfer_with_progress(primary, companions, options, &Progress::none())
}

/// [`chamfer`] with progress reporting after each stage.
pub fn chamfer_with_progress(
    primary: &MeshBuffer,
    companions: &[MeshBuffer],
    options: &ChamferOptions,
    progress: &Progress,
) -> Result<ChamferResult> {
    options.validate()?;
    let mut combined = CombinedBuffer::new(primary, companions)?;

    if primary.is_empty() {
        log::debug!("chamfer: empty primary mesh, nothing to do");
        let mut mesh = primary.clone();
        mesh.compact();
        return Ok(ChamferResult {
            mesh,
            stats: ChamferStats {
                dropped_vertices: combined.vertex_count(),
                ..ChamferStats::default()
            },
        });
    }

    let map = CoincidenceMap::build(&combined.positions, options.coincidence_epsilon);
    progress.report(1, STAGES, "Indexing coincident vertices");

    let topology = EdgeTopology::build(&combined.triangles, &map);
    progress.report(2, STAGES, "Pairing edges");

    let push = accumulate_push(&combined, &topology, options.lock_edges);
    progress.report(3, STAGES, "Accumulating push directions");

    let mut emitted = TriangleSet::new();
    let bridge_count = bridge_triangles(
        &topology,
        combined.primary_vertex_count(),
        options.add_chamfer_geometry,
        &mut emitted,
    );
    let fan_count = closing_fans(&combined, &map, &push, options.add_chamfer_geometry, &mut emitted);
    progress.report(4, STAGES, "Generating chamfer triangles");

    let displacement = options.displacement();
    for (p, d) in combined.positions.iter_mut().zip(push.directions()) {
        *p += d * displacement;
    }
    progress.report(5, STAGES, "Displacing vertices");

    let mut triangles = combined.primary_triangles().to_vec();
    triangles.extend_from_slice(emitted.as_slice());
    let remap = Remap::from_triangles(&mut triangles, combined.vertex_count());

    let mesh = MeshBuffer {
        positions: remap.project(&combined.positions),
        normals: remap.project(&combined.normals),
        tangents: resolve_column("tangents", combined.tangents.as_deref(), &remap, &map),
        uvs: resolve_column("uvs", combined.uvs.as_deref(), &remap, &map),
        triangles,
    };
    progress.report(6, STAGES, "Compacting");

    let stats = ChamferStats {
        interior_edges: topology.count(EdgeKind::Interior),
        seam_edges: topology.count(EdgeKind::BoundaryToOther),
        boundary_edges: topology.count(EdgeKind::BoundaryToSelf),
        locked_vertices: push.locked_count(),
        pushed_vertices: push.pushed_count(),
        bridge_triangles: bridge_count,
        fan_triangles: fan_count,
        dropped_vertices: combined.vertex_count() - remap.used_count(),
    };
    log::debug!(
        "chamfer: {} seam edges, {} pushed / {} locked vertices, {} bridge + {} fan triangles, {} -> {} vertices",
        stats.seam_edges,
        stats.pushed_vertices,
        stats.locked_vertices,
        stats.bridge_triangles,
        stats.fan_triangles,
        combined.vertex_count(),
        mesh.vertex_count(),
    );

    Ok(ChamferResult { mesh, stats })
}

/// Project an optional combined column onto the surviving vertices.
///
/// Companion vertices without a value borrow their representative's. If a
/// surviving vertex still has none, the column is dropped.
fn resolve_column<T: Copy>(
    name: &str,
    column: Option<&[Option<T>]>,
    remap: &Remap,
    map: &CoincidenceMap,
) -> Option<Vec<T>> {
    let column = column?;
    let values: Option<Vec<T>> = remap
        .kept()
        .iter()
        .map(|&v| column[v].or(column[map.representative(v)]))
        .collect();
    if values.is_none() {
        log::warn!("chamfer: dropping '{}' column, a companion vertex in the output has no value", name);
    }
    values
}

/// Remove from `v` its component along `normal`.
///
/// `normal` need not be unit length. A near-zero `normal` leaves `v` as is.
fn project_on_plane(v: &Vector3<f64>, normal: &Vector3<f64>) -> Vector3<f64> {
    let sqr = normal.norm_squared();
    if sqr < f64::EPSILON {
        return *v;
    }
    v - normal * (v.dot(normal) / sqr)
}

/// Angle in degrees from `from` to `to`, signed by the rotation about `axis`.
///
/// Zero-length inputs give zero. A rotation exactly in the plane of `axis`
/// counts as positive.
fn signed_angle(from: &Vector3<f64>, to: &Vector3<f64>, axis: &Vector3<f64>) -> f64 {
    let denominator = (from.norm_squared() * to.norm_squared()).sqrt();
    if denominator < 1e-15 {
        return 0.0;
    }
    let cos = (from.dot(to) / denominator).clamp(-1.0, 1.0);
    let unsigned = cos.acos().to_degrees();
    if axis.dot(&from.cross(to)) >= 0.0 {
        unsigned
    } else {
        -unsigned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Vector2, Vector4};

    /// Top face of a box: unit square at z = 0, facing +z.
    fn top_face() -> MeshBuffer {
        MeshBuffer::from_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
            ],
            vec![Vector3::z(); 4],
            &[[0, 1, 3], [0, 3, 2]],
        )
        .unwrap()
    }

    /// Front face of the same box: unit square at y = 0 hanging below the
    /// top face's front edge, facing -y.
    fn front_face() -> MeshBuffer {
        MeshBuffer::from_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 0.0, -1.0),
                Point3::new(1.0, 0.0, -1.0),
            ],
            vec![-Vector3::y(); 4],
            &[[0, 2, 1], [1, 2, 3]],
        )
        .unwrap()
    }

    /// Unit square facing -z at the same positions as `top_face`.
    fn back_square() -> MeshBuffer {
        let mut mesh = top_face();
        mesh.normals = vec![-Vector3::z(); 4];
        mesh.triangles = vec![0, 3, 1, 0, 2, 3];
        mesh
    }

    fn open_options() -> ChamferOptions {
        ChamferOptions::default().with_chamfer_geometry(true)
    }

    #[test]
    fn test_options_validate() {
        assert!(ChamferOptions::default().validate().is_ok());
        assert!(ChamferOptions::default().with_scale(0.0).validate().is_err());
        assert!(ChamferOptions::default().with_chamfer_size(-1.0).validate().is_err());
        assert!(ChamferOptions::default().with_epsilon(f64::NAN).validate().is_err());
        assert_relative_eq!(ChamferOptions::default().with_scale(0.5).displacement(), 0.04);
    }

    #[test]
    fn test_convex_seam_pushes_apart() {
        let result = chamfer(&top_face(), &[front_face()], &open_options()).unwrap();
        let mesh = &result.mesh;

        assert_eq!(result.stats.seam_edges, 2);
        assert_eq!(result.stats.bridge_triangles, 2);
        assert_eq!(result.stats.fan_triangles, 0);
        assert_eq!(result.stats.pushed_vertices, 4);

        // Primary triangles first, then the bridge; vertices renumbered by first use.
        assert_eq!(mesh.triangles, vec![0, 1, 2, 0, 2, 3, 1, 0, 4, 4, 0, 5]);
        assert_eq!(mesh.vertex_count(), 6);

        assert_relative_eq!(mesh.positions[0], Point3::new(0.0, 0.02, 0.0), epsilon = 1e-12);
        assert_relative_eq!(mesh.positions[1], Point3::new(1.0, 0.02, 0.0), epsilon = 1e-12);
        assert_relative_eq!(mesh.positions[2], Point3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(mesh.positions[3], Point3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(mesh.positions[4], Point3::new(1.0, 0.0, -0.02), epsilon = 1e-12);
        assert_relative_eq!(mesh.positions[5], Point3::new(0.0, 0.0, -0.02), epsilon = 1e-12);

        // The bevel faces out of the box, between +z and -y.
        let [a, b, c] = mesh.triangle(2);
        let n = triangle_normal(&mesh.positions[a], &mesh.positions[b], &mesh.positions[c]);
        assert_relative_eq!(n, Vector3::new(0.0, -1.0, 1.0).normalize(), epsilon = 1e-9);
    }

    #[test]
    fn test_no_geometry_leakage_without_chamfer_geometry() {
        let primary = top_face();
        let result = chamfer(&primary, &[front_face()], &ChamferOptions::default()).unwrap();
        let mesh = &result.mesh;

        assert_eq!(result.stats.bridge_triangles, 0);
        assert_eq!(mesh.triangle_count(), primary.triangle_count());
        assert_eq!(mesh.vertex_count(), 4);
        // The seam side of the primary still moves.
        assert_relative_eq!(mesh.positions[0], Point3::new(0.0, 0.02, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_lock_edges_holds_corners() {
        let options = open_options().with_locked_edges(true);
        let result = chamfer(&top_face(), &[front_face()], &options).unwrap();

        // Both ends of the only seam also sit on the outer boundary.
        assert_eq!(result.stats.pushed_vertices, 0);
        assert_eq!(result.stats.locked_vertices, 8);
        let original = top_face();
        for v in 0..4 {
            let old = original.positions.iter().position(|p| *p == result.mesh.positions[v]);
            assert!(old.is_some(), "vertex {} moved", v);
        }
    }

    #[test]
    fn test_isolated_triangle_with_locked_edges() {
        let primary = MeshBuffer::from_triangles(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
            vec![Vector3::z(); 3],
            &[[0, 1, 2]],
        )
        .unwrap();

        let options = ChamferOptions::default().with_locked_edges(true);
        let result = chamfer(&primary, &[], &options).unwrap();

        assert_eq!(result.mesh, primary);
        assert_eq!(result.stats.boundary_edges, 3);
        assert_eq!(result.stats.locked_vertices, 3);
    }

    #[test]
    fn test_coincident_squares_bridge_every_perimeter_edge() {
        let combined = CombinedBuffer::new(&top_face(), &[back_square()]).unwrap();
        let map = CoincidenceMap::build(&combined.positions, DEFAULT_EPSILON);
        let topology = EdgeTopology::build(&combined.triangles, &map);

        assert_eq!(map.clusters_of_at_least(2).count(), 4);
        assert_eq!(topology.count(EdgeKind::BoundaryToOther), 8);

        let mut emitted = TriangleSet::new();
        let added = bridge_triangles(&topology, combined.primary_vertex_count(), true, &mut emitted);
        assert_eq!(added, 8);

        let mut emitted = TriangleSet::new();
        let added = bridge_triangles(&topology, combined.primary_vertex_count(), false, &mut emitted);
        assert_eq!(added, 0);
    }

    #[test]
    fn test_emitted_triangles_are_unique_and_anchored() {
        let result = chamfer(&top_face(), &[back_square()], &open_options()).unwrap();
        let mesh = &result.mesh;

        let mut seen = HashSet::new();
        for [a, b, c] in mesh.triangles() {
            assert!(seen.insert(sorted_key(a, b, c)), "duplicate triangle {:?}", [a, b, c]);
        }
        assert_eq!(mesh.triangle_count(), 2 + 8);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_scale_invariance() {
        let scale_up = |mesh: &MeshBuffer| {
            let mut scaled = mesh.clone();
            for p in &mut scaled.positions {
                *p = Point3::from(p.coords * 2.0);
            }
            scaled
        };

        let base = chamfer(&top_face(), &[front_face()], &open_options()).unwrap();
        let doubled = chamfer(
            &scale_up(&top_face()),
            &[scale_up(&front_face())],
            &open_options().with_scale(0.5),
        )
        .unwrap();

        assert_eq!(base.mesh.triangles, doubled.mesh.triangles);
        for (a, b) in base.mesh.positions.iter().zip(&doubled.mesh.positions) {
            assert_relative_eq!(Point3::from(a.coords * 2.0), *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_missing_companion_columns_borrow_from_representative() {
        let mut primary = top_face();
        primary.uvs = Some(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 1.0),
            Vector2::new(1.0, 1.0),
        ]);
        primary.tangents = Some(vec![Vector4::new(1.0, 0.0, 0.0, 1.0); 4]);

        let result = chamfer(&primary, &[front_face()], &open_options()).unwrap();
        let uvs = result.mesh.uvs.as_ref().expect("uvs kept");
        assert_eq!(uvs.len(), 6);
        // Output vertex 4 is the front face's (1, 0, 0) corner.
        assert_eq!(uvs[4], Vector2::new(1.0, 0.0));
        assert_eq!(uvs[5], Vector2::new(0.0, 0.0));
        assert!(result.mesh.tangents.is_some());
        assert!(result.mesh.validate().is_ok());
    }

    #[test]
    fn test_empty_primary_is_compacted() {
        let result = chamfer(&MeshBuffer::new(), &[front_face()], &ChamferOptions::default()).unwrap();
        assert!(result.mesh.positions.is_empty());

        let mut no_triangles = top_face();
        no_triangles.triangles.clear();
        let result = chamfer(&no_triangles, &[], &ChamferOptions::default()).unwrap();
        assert_eq!(result.mesh.vertex_count(), 0);
        assert_eq!(result.mesh.triangle_count(), 0);
        assert_eq!(result.stats.dropped_vertices, 4);
        assert!(result.mesh.validate().is_ok());
    }

    #[test]
    fn test_far_away_triangle_is_chamfered() {
        let far = MeshBuffer::from_triangles(
            vec![
                Point3::new(1e15, 0.0, 0.0),
                Point3::new(1e15 + 1.0, 0.0, 0.0),
                Point3::new(1e15, 1.0, 0.0),
            ],
            vec![Vector3::z(); 3],
            &[[0, 1, 2]],
        )
        .unwrap();
        let result = chamfer(&far, &[], &ChamferOptions::default()).unwrap();
        assert_eq!(result.stats.boundary_edges, 3);
        assert_eq!(result.mesh.triangle_count(), 1);
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let mut primary = top_face();
        primary.normals.pop();
        assert!(matches!(
            chamfer(&primary, &[], &ChamferOptions::default()),
            Err(MeshError::RaggedAttribute { .. })
        ));
    }

    fn cluster_buffer(pushes: &[Vector3<f64>], normal: Vector3<f64>) -> (CombinedBuffer, PushField) {
        let n = pushes.len();
        let primary = MeshBuffer {
            positions: vec![Point3::origin(); n],
            normals: vec![normal; n],
            ..MeshBuffer::default()
        };
        let combined = CombinedBuffer::new(&primary, &[]).unwrap();
        let push = PushField {
            directions: pushes.to_vec(),
            weights: vec![1.0; n],
        };
        (combined, push)
    }

    #[test]
    fn test_three_way_fan_faces_its_normals() {
        let normal = Vector3::new(1.0, 1.0, 1.0).normalize();

        let (combined, push) = cluster_buffer(&[Vector3::x(), Vector3::y(), Vector3::z()], normal);
        let map = CoincidenceMap::build(&combined.positions, DEFAULT_EPSILON);
        let mut emitted = TriangleSet::new();
        assert_eq!(closing_fans(&combined, &map, &push, false, &mut emitted), 1);
        assert_eq!(emitted.as_slice(), &[0, 1, 2]);

        let (combined, push) = cluster_buffer(&[Vector3::x(), Vector3::z(), Vector3::y()], normal);
        let mut emitted = TriangleSet::new();
        closing_fans(&combined, &map, &push, false, &mut emitted);
        assert_eq!(emitted.as_slice(), &[0, 2, 1]);
    }

    #[test]
    fn test_four_way_fan_is_ordered_counter_clockwise() {
        let (combined, push) = cluster_buffer(
            &[Vector3::x(), -Vector3::x(), Vector3::y(), -Vector3::y()],
            Vector3::z(),
        );
        let map = CoincidenceMap::build(&combined.positions, DEFAULT_EPSILON);
        let mut emitted = TriangleSet::new();

        assert_eq!(closing_fans(&combined, &map, &push, false, &mut emitted), 2);
        assert_eq!(emitted.as_slice(), &[3, 0, 2, 3, 2, 1]);
    }

    #[test]
    fn test_admits() {
        assert!(admits(&[0, 1, 2], 3, false));
        assert!(!admits(&[0, 1, 3], 3, false));
        assert!(admits(&[0, 1, 3], 3, true));
        assert!(!admits(&[3, 4, 5], 3, true));
    }

    #[test]
    fn test_triangle_set_ignores_order() {
        let mut set = TriangleSet::new();
        assert!(set.insert(1, 2, 3));
        for (a, b, c) in [(1, 2, 3), (1, 3, 2), (2, 1, 3), (2, 3, 1), (3, 1, 2), (3, 2, 1)] {
            assert!(set.contains(a, b, c));
            assert!(!set.insert(a, b, c));
        }
        assert_eq!(set.len(), 1);
        assert!(!set.contains(1, 2, 4));
    }

    #[test]
    fn test_signed_angle() {
        let z = Vector3::z();
        assert_relative_eq!(signed_angle(&Vector3::x(), &Vector3::y(), &z), 90.0);
        assert_relative_eq!(signed_angle(&Vector3::x(), &-Vector3::y(), &z), -90.0);
        assert_relative_eq!(signed_angle(&Vector3::x(), &-Vector3::x(), &z), 180.0);
        assert_eq!(signed_angle(&Vector3::zeros(), &Vector3::x(), &z), 0.0);
    }

    #[test]
    fn test_project_on_plane() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_relative_eq!(project_on_plane(&v, &(Vector3::z() * 2.0)), Vector3::new(1.0, 2.0, 0.0));
        assert_eq!(project_on_plane(&v, &Vector3::zeros()), v);
    }
}
