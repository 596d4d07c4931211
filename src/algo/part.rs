//! Whole-part processing.
//!
//! A part is a set of named meshes from one imported asset: an outer shell,
//! inset detail panels, colour change surfaces and printed decorations. This
//! module welds them, brings them into a common frame and chamfers each mesh
//! against the meshes it touches.

use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::Matrix4;
use rayon::prelude::*;

use super::chamfer::{chamfer, ChamferOptions};
use super::coincidence::DEFAULT_EPSILON;
use super::weld::{weld_duplicate_vertices, WeldOptions};
use super::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::MeshBuffer;

/// Name fragments of connectivity and cap geometry that is removed from a part.
pub const DISCARDED_NAME_PATTERNS: [&str; 4] = ["knob_", "pin_", "tube_", "_Caps_"];

/// True if a mesh named `name` is knob, pin, tube or cap geometry.
pub fn is_discarded(name: &str) -> bool {
    DISCARDED_NAME_PATTERNS.iter().any(|pattern| name.contains(pattern))
}

/// What a mesh is within its part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceRole {
    /// The outer hull. Receives the bridge geometry.
    Shell,
    /// Panels set into the shell. Their open edges are free to move.
    Detail,
    /// Areas painted in a second colour.
    ColourChange,
    /// Printed decorations. Passed through untouched.
    Decoration,
    /// Anything else.
    Other,
}

impl SurfaceRole {
    /// Role of a scene node, from its own name and its parent's name.
    ///
    /// A node named `Shell` is the shell. Children of `Detail`,
    /// `ColourChangeSurfaces` and `DecorationSurfaces` groups take the
    /// group's role.
    pub fn from_node_names(name: &str, parent: Option<&str>) -> Self {
        if name == "Shell" {
            return Self::Shell;
        }
        match parent {
            Some("Detail") => Self::Detail,
            Some("ColourChangeSurfaces") => Self::ColourChange,
            Some("DecorationSurfaces") => Self::Decoration,
            _ => Self::Other,
        }
    }

    /// Whether meshes of this role are welded before chamfering.
    pub fn is_welded(self) -> bool {
        matches!(self, Self::Shell | Self::Detail | Self::ColourChange)
    }

    /// The role whose meshes are companions of a mesh with this role.
    pub fn companion_role(self) -> Option<SurfaceRole> {
        match self {
            Self::Shell => Some(Self::Detail),
            Self::Detail => Some(Self::Shell),
            _ => None,
        }
    }
}

/// One mesh of a part.
#[derive(Debug, Clone)]
pub struct PartMesh {
    /// Node name.
    pub name: String,
    /// Role within the part.
    pub role: SurfaceRole,
    /// Mesh-to-part transform.
    pub transform: Matrix4<f64>,
    /// Vertex data in mesh space.
    pub buffer: MeshBuffer,
}

impl PartMesh {
    /// Create a mesh with an identity transform.
    pub fn new(name: impl Into<String>, role: SurfaceRole, buffer: MeshBuffer) -> Self {
        Self {
            name: name.into(),
            role,
            transform: Matrix4::identity(),
            buffer,
        }
    }

    /// Set the mesh-to-part transform.
    pub fn with_transform(mut self, transform: Matrix4<f64>) -> Self {
        self.transform = transform;
        self
    }

    /// Length of the transform's x axis.
    pub fn scale(&self) -> f64 {
        self.transform.fixed_view::<3, 1>(0, 0).norm()
    }
}

/// The meshes of one imported part.
#[derive(Debug, Clone, Default)]
pub struct Part {
    /// Part name.
    pub name: String,
    /// Meshes in import order.
    pub meshes: Vec<PartMesh>,
}

impl Part {
    /// Meshes with the given role.
    pub fn meshes_with_role(&self, role: SurfaceRole) -> impl Iterator<Item = &PartMesh> + '_ {
        self.meshes.iter().filter(move |m| m.role == role)
    }
}

/// Options for [`process_part`].
#[derive(Debug, Clone, PartialEq)]
pub struct PartOptions {
    /// Bevel size in part units.
    pub chamfer_size: f64,
    /// Chamfer shell, detail and other meshes.
    pub chamfer: bool,
    /// Weld shell, detail and colour change meshes first.
    pub weld: bool,
    /// Keep texture coordinates on chamfered meshes.
    pub keep_uvs: bool,
    /// Distance below which vertices coincide, for welding and seam matching.
    pub coincidence_epsilon: f64,
    /// Process meshes in parallel (default: true).
    pub parallel: bool,
}

impl Default for PartOptions {
    fn default() -> Self {
        Self {
            chamfer_size: 0.02,
            chamfer: true,
            weld: true,
            keep_uvs: false,
            coincidence_epsilon: DEFAULT_EPSILON,
            parallel: true,
        }
    }
}

impl PartOptions {
    /// Set the bevel size.
    pub fn with_chamfer_size(mut self, chamfer_size: f64) -> Self {
        self.chamfer_size = chamfer_size;
        self
    }

    /// Enable or disable chamfering.
    pub fn with_chamfer(mut self, chamfer: bool) -> Self {
        self.chamfer = chamfer;
        self
    }

    /// Enable or disable welding.
    pub fn with_weld(mut self, weld: bool) -> Self {
        self.weld = weld;
        self
    }

    /// Keep or clear texture coordinates.
    pub fn with_keep_uvs(mut self, keep_uvs: bool) -> Self {
        self.keep_uvs = keep_uvs;
        self
    }

    /// Set the coincidence distance.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.coincidence_epsilon = epsilon;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Use sequential execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Check that every parameter is in range.
    pub fn validate(&self) -> Result<()> {
        self.chamfer_options(1.0).validate()
    }

    fn chamfer_options(&self, scale: f64) -> ChamferOptions {
        ChamferOptions::default()
            .with_scale(scale)
            .with_chamfer_size(self.chamfer_size)
            .with_epsilon(self.coincidence_epsilon)
    }
}

/// Process every mesh of `part`.
///
/// Shell meshes are chamfered against all detail meshes and receive the
/// bridge geometry. Detail meshes are chamfered against all shell meshes
/// with their outer edges unlocked. Other non-decoration meshes are
/// chamfered alone. Decoration meshes are only moved into part space.
///
/// Meshes whose names mark them as knob, pin, tube or cap geometry (see
/// [`is_discarded`]) are dropped before anything else happens. The returned
/// part has the remaining meshes in their original order, in part space,
/// with identity transforms.
pub fn process_part(part: &Part, options: &PartOptions) -> Result<Part> {
    process_part_with_progress(part, options, &Progress::none())
}

/// [`process_part`] with a progress report after each finished mesh.
pub fn process_part_with_progress(
    part: &Part,
    options: &PartOptions,
    progress: &Progress,
) -> Result<Part> {
    options.validate()?;

    let kept: Vec<&PartMesh> = part.meshes.iter().filter(|m| !is_discarded(&m.name)).collect();

    let weld = WeldOptions::default().with_position_epsilon(options.coincidence_epsilon);
    let mut prepared = Vec::with_capacity(kept.len());
    for mesh in &kept {
        let mut buffer = mesh.buffer.clone();
        if options.weld && mesh.role.is_welded() {
            weld_duplicate_vertices(&mut buffer, weld)?;
        }
        prepared.push(buffer.transformed(&mesh.transform));
    }

    let collect_role = |role: SurfaceRole| -> Vec<MeshBuffer> {
        kept.iter()
            .zip(&prepared)
            .filter(|(m, _)| m.role == role)
            .map(|(_, b)| b.clone())
            .collect()
    };
    let shells = collect_role(SurfaceRole::Shell);
    let details = collect_role(SurfaceRole::Detail);
    log::info!(
        "part '{}': {} meshes, {} discarded, {} shell, {} detail",
        part.name,
        kept.len(),
        part.meshes.len() - kept.len(),
        shells.len(),
        details.len()
    );

    let done = AtomicUsize::new(0);
    let total = kept.len();
    let process = |(mesh, buffer): (&&PartMesh, &MeshBuffer)| -> Result<PartMesh> {
        let companions: &[MeshBuffer] = match mesh.role.companion_role() {
            Some(SurfaceRole::Shell) => &shells,
            Some(SurfaceRole::Detail) => &details,
            _ => &[],
        };
        let buffer = process_mesh(mesh, buffer, companions, options)?;
        let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
        progress.report_item(finished, total, &mesh.name);
        Ok(PartMesh::new(mesh.name.clone(), mesh.role, buffer))
    };

    let meshes = if options.parallel {
        kept.par_iter()
            .zip(prepared.par_iter())
            .map(process)
            .collect::<Result<Vec<_>>>()?
    } else {
        kept.iter()
            .zip(&prepared)
            .map(process)
            .collect::<Result<Vec<_>>>()?
    };

    Ok(Part {
        name: part.name.clone(),
        meshes,
    })
}

fn process_mesh(
    mesh: &PartMesh,
    buffer: &MeshBuffer,
    companions: &[MeshBuffer],
    options: &PartOptions,
) -> Result<MeshBuffer> {
    if mesh.role == SurfaceRole::Decoration {
        return Ok(buffer.clone());
    }

    let mut buffer = if options.chamfer {
        let scale = mesh.scale();
        if !(scale.is_finite() && scale > 0.0) {
            return Err(MeshError::invalid_param(
                "transform scale",
                scale,
                "mesh transform must not collapse the x axis",
            ));
        }
        let chamfer_options = options
            .chamfer_options(scale)
            .with_chamfer_geometry(mesh.role == SurfaceRole::Shell)
            .with_locked_edges(mesh.role != SurfaceRole::Detail);
        let result = chamfer(buffer, companions, &chamfer_options)?;
        log::debug!(
            "part mesh '{}' ({:?}): {} bridge, {} fan triangles against {} companions",
            mesh.name,
            mesh.role,
            result.stats.bridge_triangles,
            result.stats.fan_triangles,
            companions.len()
        );
        result.mesh
    } else {
        buffer.clone()
    };

    if !options.keep_uvs {
        buffer.clear_uvs();
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector2, Vector3};
    use std::sync::{Arc, Mutex};

    fn square(z: f64, normal: Vector3<f64>, faces: &[[usize; 3]]) -> MeshBuffer {
        let mut mesh = MeshBuffer::from_triangles(
            vec![
                Point3::new(0.0, 0.0, z),
                Point3::new(1.0, 0.0, z),
                Point3::new(0.0, 1.0, z),
                Point3::new(1.0, 1.0, z),
            ],
            vec![normal; 4],
            faces,
        )
        .unwrap();
        mesh.uvs = Some(vec![Vector2::zeros(); 4]);
        mesh
    }

    /// Top face as the shell and the face below its front edge as a detail.
    fn crease_part() -> Part {
        let shell = square(0.0, Vector3::z(), &[[0, 1, 3], [0, 3, 2]]);
        let detail = MeshBuffer::from_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 0.0, -1.0),
                Point3::new(1.0, 0.0, -1.0),
            ],
            vec![-Vector3::y(); 4],
            &[[0, 2, 1], [1, 2, 3]],
        )
        .unwrap();
        let decoration = square(0.5, Vector3::z(), &[[0, 1, 3]]);

        Part {
            name: "crease".into(),
            meshes: vec![
                PartMesh::new("Shell", SurfaceRole::Shell, shell),
                PartMesh::new("panel", SurfaceRole::Detail, detail),
                PartMesh::new("print", SurfaceRole::Decoration, decoration),
            ],
        }
    }

    #[test]
    fn test_companion_roles() {
        assert_eq!(SurfaceRole::Shell.companion_role(), Some(SurfaceRole::Detail));
        assert_eq!(SurfaceRole::Detail.companion_role(), Some(SurfaceRole::Shell));
        assert_eq!(SurfaceRole::ColourChange.companion_role(), None);
        assert!(SurfaceRole::ColourChange.is_welded());
        assert!(!SurfaceRole::Decoration.is_welded());
    }

    #[test]
    fn test_roles_from_node_names() {
        assert_eq!(SurfaceRole::from_node_names("Shell", Some("Detail")), SurfaceRole::Shell);
        assert_eq!(SurfaceRole::from_node_names("panel_1", Some("Detail")), SurfaceRole::Detail);
        assert_eq!(
            SurfaceRole::from_node_names("stripe", Some("ColourChangeSurfaces")),
            SurfaceRole::ColourChange
        );
        assert_eq!(
            SurfaceRole::from_node_names("logo", Some("DecorationSurfaces")),
            SurfaceRole::Decoration
        );
        assert_eq!(SurfaceRole::from_node_names("Detail", None), SurfaceRole::Other);
    }

    #[test]
    fn test_shell_gets_bridge_and_detail_moves() {
        let part = crease_part();
        let out = process_part(&part, &PartOptions::default()).unwrap();

        assert_eq!(out.meshes.len(), 3);
        let shell = &out.meshes[0].buffer;
        let detail = &out.meshes[1].buffer;

        // Shell: its two triangles plus the two bridge triangles.
        assert_eq!(shell.triangle_count(), 4);
        assert_eq!(shell.vertex_count(), 6);
        assert!(shell.uvs.is_none());

        // Detail: no bridge geometry, outer edges unlocked, so the seam moves down.
        assert_eq!(detail.triangle_count(), 2);
        assert_eq!(detail.vertex_count(), 4);
        assert_relative_eq!(detail.positions[0], Point3::new(0.0, 0.0, -0.02), epsilon = 1e-12);
    }

    #[test]
    fn test_decoration_passes_through() {
        let part = crease_part();
        let out = process_part(&part, &PartOptions::default()).unwrap();
        let print = &out.meshes[2];

        assert_eq!(print.buffer, part.meshes[2].buffer);
        assert_eq!(print.transform, Matrix4::identity());
    }

    #[test]
    fn test_transforms_are_applied() {
        let mut part = crease_part();
        let shift = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 3.0));
        for mesh in &mut part.meshes {
            mesh.transform = shift;
        }

        let options = PartOptions::default().with_chamfer(false).with_keep_uvs(true);
        let out = process_part(&part, &options).unwrap();

        for (before, after) in part.meshes.iter().zip(&out.meshes) {
            assert_eq!(after.transform, Matrix4::identity());
            assert_relative_eq!(after.buffer.positions[0].z, before.buffer.positions[0].z + 3.0);
        }
        assert!(out.meshes[0].buffer.uvs.is_some());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let part = crease_part();
        let parallel = process_part(&part, &PartOptions::default()).unwrap();
        let sequential = process_part(&part, &PartOptions::default().sequential()).unwrap();

        for (a, b) in parallel.meshes.iter().zip(&sequential.meshes) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.buffer, b.buffer);
        }
    }

    #[test]
    fn test_progress_counts_every_mesh() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Progress::new(move |done, total, _| sink.lock().unwrap().push((done, total)));

        process_part_with_progress(&crease_part(), &PartOptions::default(), &progress).unwrap();

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_discarded_names() {
        assert!(is_discarded("knob_0"));
        assert!(is_discarded("Detail_pin_3"));
        assert!(is_discarded("tube_12"));
        assert!(is_discarded("Brick_Caps_1"));
        assert!(!is_discarded("Shell"));
        assert!(!is_discarded("knob"));
        assert!(!is_discarded("caps_1"));
    }

    #[test]
    fn test_connectivity_geometry_is_dropped() {
        let mut part = crease_part();
        // A detail along the shell's back edge would add two more bridge
        // triangles to the shell if it took part in chamfering.
        let back = MeshBuffer::from_triangles(
            vec![
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, -1.0),
                Point3::new(1.0, 1.0, -1.0),
            ],
            vec![Vector3::y(); 4],
            &[[0, 1, 2], [1, 3, 2]],
        )
        .unwrap();
        part.meshes.insert(1, PartMesh::new("tube_1", SurfaceRole::Detail, back));
        part.meshes.push(PartMesh::new(
            "knob_0",
            SurfaceRole::Other,
            square(1.0, Vector3::z(), &[[0, 1, 3]]),
        ));

        let out = process_part(&part, &PartOptions::default().sequential()).unwrap();

        let names: Vec<&str> = out.meshes.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Shell", "panel", "print"]);
        assert_eq!(out.meshes[0].buffer.triangle_count(), 4);
    }

    #[test]
    fn test_collapsed_transform_is_rejected() {
        let mut part = crease_part();
        part.meshes[0].transform = Matrix4::new_nonuniform_scaling(&Vector3::new(0.0, 1.0, 1.0));
        assert!(process_part(&part, &PartOptions::default().sequential()).is_err());
    }
}
