//! glTF format support.
//!
//! This module provides loading of mesh buffers and parts from glTF and GLB
//! files. glTF is a modern 3D format designed for efficient transmission and
//! loading.
//!
//! Note: Saving to glTF is not supported.

use std::path::Path;

use nalgebra::{Matrix4, Point3, Vector2, Vector3, Vector4};

use crate::algo::part::{Part, PartMesh, SurfaceRole};
use crate::error::{MeshError, Result};
use crate::mesh::MeshBuffer;

/// Load a mesh from a glTF or GLB file.
///
/// This function loads all meshes from the file and combines them into a
/// single buffer, in mesh space. Node transforms are ignored; use
/// [`load_part`] to keep them.
///
/// # Example
///
/// ```no_run
/// use meshseam::io::gltf;
///
/// let mesh = gltf::load("brick.gltf").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<MeshBuffer> {
    let path = path.as_ref();
    let (document, buffers, _images) = import(path)?;

    let mut merged = MeshBuffer::new();
    for mesh in document.meshes() {
        append(&mut merged, read_mesh(path, &mesh, &buffers)?);
    }

    if merged.triangles.is_empty() {
        return Err(MeshError::load(path, "glTF file contains no triangle meshes"));
    }
    Ok(merged)
}

/// Load every mesh node of the default scene as a [`Part`].
///
/// Node transforms are accumulated from the scene root, so each
/// [`PartMesh::transform`] maps mesh space to scene space. Roles come from
/// [`SurfaceRole::from_node_names`]. The part is named after the file stem.
pub fn load_part<P: AsRef<Path>>(path: P) -> Result<Part> {
    let path = path.as_ref();
    let (document, buffers, _images) = import(path)?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| MeshError::load(path, "glTF file contains no scene"))?;

    let mut meshes = Vec::new();
    for node in scene.nodes() {
        visit(path, &node, None, &Matrix4::identity(), &buffers, &mut meshes)?;
    }
    log::debug!("{}: {} mesh nodes", path.display(), meshes.len());

    Ok(Part {
        name: path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("part")
            .to_string(),
        meshes,
    })
}

type Imported = (
    ::gltf::Document,
    Vec<::gltf::buffer::Data>,
    Vec<::gltf::image::Data>,
);

fn import(path: &Path) -> Result<Imported> {
    ::gltf::import(path).map_err(|e| MeshError::load(path, e.to_string()))
}

fn visit(
    path: &Path,
    node: &::gltf::Node<'_>,
    parent: Option<&str>,
    parent_transform: &Matrix4<f64>,
    buffers: &[::gltf::buffer::Data],
    out: &mut Vec<PartMesh>,
) -> Result<()> {
    let local: Matrix4<f64> = Matrix4::from(node.transform().matrix()).cast();
    let transform = parent_transform * local;
    let name = node
        .name()
        .map(String::from)
        .unwrap_or_else(|| format!("node_{}", node.index()));

    if let Some(mesh) = node.mesh() {
        let role = SurfaceRole::from_node_names(&name, parent);
        out.push(PartMesh {
            name: name.clone(),
            role,
            transform,
            buffer: read_mesh(path, &mesh, buffers)?,
        });
    }

    for child in node.children() {
        visit(path, &child, Some(name.as_str()), &transform, buffers, out)?;
    }
    Ok(())
}

/// Merge the triangle primitives of one glTF mesh.
fn read_mesh(
    path: &Path,
    mesh: &::gltf::Mesh<'_>,
    buffers: &[::gltf::buffer::Data],
) -> Result<MeshBuffer> {
    let mut merged = MeshBuffer::new();
    for primitive in mesh.primitives() {
        if let Some(buffer) = read_primitive(path, &primitive, buffers)? {
            append(&mut merged, buffer);
        }
    }
    Ok(merged)
}

fn read_primitive(
    path: &Path,
    primitive: &::gltf::Primitive<'_>,
    buffers: &[::gltf::buffer::Data],
) -> Result<Option<MeshBuffer>> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let Some(positions) = reader.read_positions() else {
        return Ok(None);
    };
    let positions: Vec<Point3<f64>> = positions
        .map(|p| Point3::new(p[0] as f64, p[1] as f64, p[2] as f64))
        .collect();

    let indices: Vec<usize> = match reader.read_indices() {
        Some(indices) => indices.into_u32().map(|i| i as usize).collect(),
        None => (0..positions.len()).collect(),
    };
    let Some(triangles) = triangulate(primitive.mode(), &indices) else {
        // Skip non-triangle primitives (points, lines)
        return Ok(None);
    };

    let normals: Option<Vec<Vector3<f64>>> = reader
        .read_normals()
        .map(|normals| {
            normals
                .map(|n| Vector3::new(n[0] as f64, n[1] as f64, n[2] as f64))
                .collect()
        });
    let tangents = reader.read_tangents().map(|tangents| {
        tangents
            .map(|t| Vector4::new(t[0] as f64, t[1] as f64, t[2] as f64, t[3] as f64))
            .collect()
    });
    let uvs = reader.read_tex_coords(0).map(|uvs| {
        uvs.into_f32()
            .map(|uv| Vector2::new(uv[0] as f64, uv[1] as f64))
            .collect()
    });

    let recompute_normals = normals.is_none();
    let mut mesh = MeshBuffer {
        normals: normals.unwrap_or_else(|| vec![Vector3::zeros(); positions.len()]),
        positions,
        tangents,
        uvs,
        triangles,
    };
    mesh.validate()
        .map_err(|e| MeshError::load(path, format!("primitive {}: {}", primitive.index(), e)))?;
    if recompute_normals {
        mesh.recalculate_normals();
    }
    Ok(Some(mesh))
}

fn triangulate(mode: ::gltf::mesh::Mode, indices: &[usize]) -> Option<Vec<usize>> {
    let mut triangles = Vec::with_capacity(indices.len());
    match mode {
        ::gltf::mesh::Mode::Triangles => {
            for chunk in indices.chunks_exact(3) {
                triangles.extend_from_slice(chunk);
            }
        }
        ::gltf::mesh::Mode::TriangleStrip => {
            for i in 0..indices.len().saturating_sub(2) {
                if i % 2 == 0 {
                    triangles.extend_from_slice(&[indices[i], indices[i + 1], indices[i + 2]]);
                } else {
                    // Reverse winding for odd triangles
                    triangles.extend_from_slice(&[indices[i], indices[i + 2], indices[i + 1]]);
                }
            }
        }
        ::gltf::mesh::Mode::TriangleFan => {
            for i in 1..indices.len().saturating_sub(1) {
                triangles.extend_from_slice(&[indices[0], indices[i], indices[i + 1]]);
            }
        }
        _ => return None,
    }
    Some(triangles)
}

/// Append `source` to `target`, keeping optional columns both have.
fn append(target: &mut MeshBuffer, source: MeshBuffer) {
    if target.positions.is_empty() {
        *target = source;
        return;
    }

    let offset = target.vertex_count();
    target.positions.extend(source.positions);
    target.normals.extend(source.normals);
    target.tangents = merge_column(target.tangents.take(), source.tangents);
    target.uvs = merge_column(target.uvs.take(), source.uvs);
    target.triangles.extend(source.triangles.iter().map(|&v| v + offset));
}

fn merge_column<T>(a: Option<Vec<T>>, b: Option<Vec<T>>) -> Option<Vec<T>> {
    match (a, b) {
        (Some(mut a), Some(b)) => {
            a.extend(b);
            Some(a)
        }
        _ => None,
    }
}
