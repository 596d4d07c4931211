//! Flat, render-ready mesh buffers.
//!
//! A [`MeshBuffer`] is the plain aggregate handed between an asset pipeline
//! and a renderer: parallel per-vertex arrays plus a flat triangle index list.

use nalgebra::{Matrix3, Matrix4, Point3, Vector2, Vector3, Vector4};

use crate::algo::compact::Remap;
use crate::error::{MeshError, Result};

/// Parallel vertex attribute arrays and a flat triangle index list.
///
/// Every consecutive triple in `triangles` forms one triangle. All present
/// per-vertex arrays have `positions.len()` entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffer {
    /// Vertex positions.
    pub positions: Vec<Point3<f64>>,
    /// Vertex normals.
    pub normals: Vec<Vector3<f64>>,
    /// Vertex tangents (`w` holds the bitangent sign).
    pub tangents: Option<Vec<Vector4<f64>>>,
    /// Texture coordinates of the first UV channel.
    pub uvs: Option<Vec<Vector2<f64>>>,
    /// Flat triangle index list.
    pub triangles: Vec<usize>,
}

impl MeshBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a buffer from positions, normals and triangle faces.
    ///
    /// # Example
    /// ```
    /// use meshseam::mesh::MeshBuffer;
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let mesh = MeshBuffer::from_triangles(
    ///     vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
    ///     vec![Vector3::z(); 3],
    ///     &[[0, 1, 2]],
    /// )
    /// .unwrap();
    /// assert_eq!(mesh.triangle_count(), 1);
    /// ```
    pub fn from_triangles(
        positions: Vec<Point3<f64>>,
        normals: Vec<Vector3<f64>>,
        faces: &[[usize; 3]],
    ) -> Result<Self> {
        let mesh = Self {
            positions,
            normals,
            tangents: None,
            uvs: None,
            triangles: faces.iter().flatten().copied().collect(),
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// True if the buffer has no vertices or no triangles.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.triangles.is_empty()
    }

    /// Vertex indices of triangle `t`.
    #[inline]
    pub fn triangle(&self, t: usize) -> [usize; 3] {
        let i = t * 3;
        [self.triangles[i], self.triangles[i + 1], self.triangles[i + 2]]
    }

    /// Iterate over all triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.triangles.chunks_exact(3).map(|c| [c[0], c[1], c[2]])
    }

    /// Check the buffer invariants.
    pub fn validate(&self) -> Result<()> {
        let n = self.positions.len();
        check_len("normals", n, self.normals.len())?;
        if let Some(tangents) = &self.tangents {
            check_len("tangents", n, tangents.len())?;
        }
        if let Some(uvs) = &self.uvs {
            check_len("uvs", n, uvs.len())?;
        }
        if self.triangles.len() % 3 != 0 {
            return Err(MeshError::IncompleteTriangle {
                len: self.triangles.len(),
            });
        }
        for (i, &v) in self.triangles.iter().enumerate() {
            if v >= n {
                return Err(MeshError::InvalidVertexIndex {
                    triangle: i / 3,
                    vertex: v,
                    vertex_count: n,
                });
            }
        }
        Ok(())
    }

    /// Copy of this buffer with `transform` applied.
    ///
    /// Positions use the full affine transform, normals the inverse-transpose
    /// of its linear part, tangents the linear part (the `w` sign is kept).
    pub fn transformed(&self, transform: &Matrix4<f64>) -> MeshBuffer {
        let linear: Matrix3<f64> = transform.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear
            .try_inverse()
            .map(|m| m.transpose())
            .unwrap_or(linear);

        let positions = self
            .positions
            .iter()
            .map(|p| transform.transform_point(p))
            .collect();
        let normals = self
            .normals
            .iter()
            .map(|n| {
                let m = normal_matrix * n;
                m.try_normalize(1e-12).unwrap_or(m)
            })
            .collect();
        let tangents = self.tangents.as_ref().map(|tangents| {
            tangents
                .iter()
                .map(|t| {
                    let xyz = linear * t.xyz();
                    let xyz = xyz.try_normalize(1e-12).unwrap_or(xyz);
                    Vector4::new(xyz.x, xyz.y, xyz.z, t.w)
                })
                .collect()
        });

        MeshBuffer {
            positions,
            normals,
            tangents,
            uvs: self.uvs.clone(),
            triangles: self.triangles.clone(),
        }
    }

    /// Replace the normals with area-weighted vertex normals.
    pub fn recalculate_normals(&mut self) {
        let mut normals = vec![Vector3::zeros(); self.positions.len()];
        for [a, b, c] in self.triangles() {
            let e1 = self.positions[b] - self.positions[a];
            let e2 = self.positions[c] - self.positions[a];
            let n = e1.cross(&e2); // Area-weighted (not normalized)
            normals[a] += n;
            normals[b] += n;
            normals[c] += n;
        }
        for n in &mut normals {
            *n = n.try_normalize(1e-12).unwrap_or_else(Vector3::zeros);
        }
        self.normals = normals;
    }

    /// Drop the texture coordinates.
    pub fn clear_uvs(&mut self) {
        self.uvs = None;
    }

    /// Axis-aligned bounding box, or `None` for an empty buffer.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;

        for p in &self.positions {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }

        Some((min, max))
    }

    /// Remove vertices that no triangle references.
    ///
    /// Vertices are renumbered in order of first appearance in the triangle
    /// list. Returns the number of vertices removed.
    pub fn compact(&mut self) -> usize {
        let before = self.positions.len();
        let remap = Remap::from_triangles(&mut self.triangles, before);

        self.positions = remap.project(&self.positions);
        if self.normals.len() == before {
            self.normals = remap.project(&self.normals);
        }
        if let Some(tangents) = &self.tangents {
            self.tangents = Some(remap.project(tangents));
        }
        if let Some(uvs) = &self.uvs {
            self.uvs = Some(remap.project(uvs));
        }

        before - self.positions.len()
    }
}

fn check_len(attribute: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(MeshError::RaggedAttribute {
            attribute,
            expected,
            found,
        });
    }
    Ok(())
}

/// Unit normal of a counter-clockwise triangle, or zero if it is degenerate.
pub fn triangle_normal(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Vector3<f64> {
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    e1.cross(&e2).try_normalize(1e-12).unwrap_or_else(Vector3::zeros)
}

/// Centroid of a triangle.
pub fn triangle_centroid(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Point3<f64> {
    Point3::from((p0.coords + p1.coords + p2.coords) / 3.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> MeshBuffer {
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

    #[test]
    fn test_validate_rejects_ragged_normals() {
        let mut mesh = quad();
        mesh.normals.pop();
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::RaggedAttribute { attribute: "normals", expected: 4, found: 3 })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let mut mesh = quad();
        mesh.triangles[4] = 9;
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::InvalidVertexIndex { triangle: 1, vertex: 9, .. })
        ));

        let mut mesh = quad();
        mesh.triangles.push(0);
        assert!(matches!(mesh.validate(), Err(MeshError::IncompleteTriangle { len: 7 })));
    }

    #[test]
    fn test_empty_buffer_is_valid() {
        let mesh = MeshBuffer::new();
        assert!(mesh.validate().is_ok());
        assert!(mesh.is_empty());
        assert!(mesh.bounding_box().is_none());
    }

    #[test]
    fn test_transformed() {
        let mesh = quad();
        let transform = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 2.0))
            * Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 1.0, 1.0));
        let moved = mesh.transformed(&transform);

        assert_relative_eq!(moved.positions[3], Point3::new(2.0, 1.0, 2.0));
        assert_relative_eq!(moved.normals[0], Vector3::z());
        assert_eq!(moved.triangles, mesh.triangles);
    }

    #[test]
    fn test_recalculate_normals() {
        let mut mesh = quad();
        mesh.normals = vec![Vector3::x(); 4];
        mesh.recalculate_normals();
        for n in &mesh.normals {
            assert_relative_eq!(*n, Vector3::z());
        }
    }

    #[test]
    fn test_compact_drops_unused() {
        let mut mesh = quad();
        mesh.positions.push(Point3::new(5.0, 5.0, 5.0));
        mesh.normals.push(Vector3::y());
        mesh.uvs = Some(vec![Vector2::zeros(), Vector2::x(), Vector2::y(), Vector2::new(1.0, 1.0), Vector2::zeros()]);

        let removed = mesh.compact();

        assert_eq!(removed, 1);
        assert_eq!(mesh.vertex_count(), 4);
        assert!(mesh.validate().is_ok());
        // First-appearance order: 0, 1, 3, 2
        assert_eq!(mesh.triangles, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.positions[2], Point3::new(1.0, 1.0, 0.0));
        assert_eq!(mesh.uvs.as_ref().unwrap()[3], Vector2::y());
    }

    #[test]
    fn test_triangle_normal_degenerate() {
        let p = Point3::new(1.0, 1.0, 1.0);
        assert_eq!(triangle_normal(&p, &p, &p), Vector3::zeros());
        let n = triangle_normal(
            &Point3::origin(),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(n, Vector3::z());
    }
}
