//! Concatenation of a primary mesh with its companion meshes.

use nalgebra::{Point3, Vector2, Vector3, Vector4};

use super::buffer::MeshBuffer;
use super::index::TriangleId;
use crate::error::Result;

/// A primary [`MeshBuffer`] followed by zero or more companion buffers.
///
/// Companion triangle indices are offset by the number of vertices appended
/// before them, so every companion index is `>= primary_vertex_count`.
///
/// Optional columns exist only if the primary mesh has them. Companion
/// vertices whose own buffer lacks such a column hold `None`.
#[derive(Debug, Clone, Default)]
pub struct CombinedBuffer {
    /// Positions of all vertices, primary first.
    pub positions: Vec<Point3<f64>>,
    /// Normals of all vertices.
    pub normals: Vec<Vector3<f64>>,
    /// Tangents, present when the primary mesh has tangents.
    pub tangents: Option<Vec<Option<Vector4<f64>>>>,
    /// Texture coordinates, present when the primary mesh has them.
    pub uvs: Option<Vec<Option<Vector2<f64>>>>,
    /// Triangles of all meshes, primary first.
    pub triangles: Vec<usize>,
    primary_vertex_count: usize,
    primary_index_count: usize,
}

impl CombinedBuffer {
    /// Concatenate `primary` and `companions`.
    ///
    /// All buffers must already share one coordinate frame and pass
    /// [`MeshBuffer::validate`].
    pub fn new(primary: &MeshBuffer, companions: &[MeshBuffer]) -> Result<Self> {
        primary.validate()?;
        for companion in companions {
            companion.validate()?;
        }

        let total_vertices =
            primary.vertex_count() + companions.iter().map(MeshBuffer::vertex_count).sum::<usize>();
        let total_indices =
            primary.triangles.len() + companions.iter().map(|c| c.triangles.len()).sum::<usize>();

        let mut positions = Vec::with_capacity(total_vertices);
        let mut normals = Vec::with_capacity(total_vertices);
        let mut triangles = Vec::with_capacity(total_indices);
        let mut tangents = primary
            .tangents
            .as_ref()
            .map(|_| Vec::with_capacity(total_vertices));
        let mut uvs = primary.uvs.as_ref().map(|_| Vec::with_capacity(total_vertices));

        for mesh in std::iter::once(primary).chain(companions) {
            let offset = positions.len();
            positions.extend_from_slice(&mesh.positions);
            normals.extend_from_slice(&mesh.normals);
            append_column(&mut tangents, mesh.tangents.as_deref(), mesh.vertex_count());
            append_column(&mut uvs, mesh.uvs.as_deref(), mesh.vertex_count());
            triangles.extend(mesh.triangles.iter().map(|&v| v + offset));
        }

        Ok(Self {
            positions,
            normals,
            tangents,
            uvs,
            triangles,
            primary_vertex_count: primary.vertex_count(),
            primary_index_count: primary.triangles.len(),
        })
    }

    /// Number of vertices across all meshes.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of vertices belonging to the primary mesh.
    #[inline]
    pub fn primary_vertex_count(&self) -> usize {
        self.primary_vertex_count
    }

    /// Length of the primary mesh's portion of the triangle list.
    #[inline]
    pub fn primary_index_count(&self) -> usize {
        self.primary_index_count
    }

    /// The primary mesh's triangles.
    pub fn primary_triangles(&self) -> &[usize] {
        &self.triangles[..self.primary_index_count]
    }

    /// True if vertex `v` was contributed by a companion mesh.
    #[inline]
    pub fn is_companion(&self, v: usize) -> bool {
        v >= self.primary_vertex_count
    }

    /// Corner positions of triangle `t`.
    pub fn triangle_positions(&self, t: TriangleId) -> [Point3<f64>; 3] {
        let i = t.first_index();
        [
            self.positions[self.triangles[i]],
            self.positions[self.triangles[i + 1]],
            self.positions[self.triangles[i + 2]],
        ]
    }
}

fn append_column<T: Copy>(column: &mut Option<Vec<Option<T>>>, values: Option<&[T]>, count: usize) {
    let Some(column) = column else {
        return;
    };
    match values {
        Some(values) => column.extend(values.iter().copied().map(Some)),
        None => column.extend(std::iter::repeat(None).take(count)),
    }
}
