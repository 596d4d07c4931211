//! PLY (Stanford polygon) format support.
//!
//! This module provides loading and saving of mesh buffers in the PLY format,
//! also known as the Polygon File Format or Stanford Triangle Format.
//!
//! Recognized vertex properties: `x y z`, `nx ny nz`, `tx ty tz tw`, and
//! texture coordinates as `s t`, `u v` or `texture_u texture_v`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::{Point3, Vector2, Vector3, Vector4};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use crate::error::{MeshError, Result};
use crate::mesh::MeshBuffer;

const UV_NAMES: [(&str, &str); 3] = [("s", "t"), ("u", "v"), ("texture_u", "texture_v")];

/// Load a mesh from a PLY file.
///
/// Polygons are fan-triangulated. Missing normals are recomputed from the
/// triangles. Tangents and UVs are kept only if every vertex has them.
///
/// # Example
///
/// ```no_run
/// use meshseam::io::ply;
///
/// let mesh = ply::load("shell.ply").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<MeshBuffer> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| MeshError::load(path, e.to_string()))?;

    let vertex_element = ply
        .payload
        .get("vertex")
        .ok_or_else(|| MeshError::load(path, "PLY file has no vertex element"))?;

    let mut positions = Vec::with_capacity(vertex_element.len());
    let mut normals = Some(Vec::with_capacity(vertex_element.len()));
    let mut tangents = Some(Vec::with_capacity(vertex_element.len()));
    let mut uvs = Some(Vec::with_capacity(vertex_element.len()));

    for vertex in vertex_element {
        let [x, y, z] = ["x", "y", "z"].map(|name| get_float_property(vertex, name));
        let (Some(x), Some(y), Some(z)) = (x, y, z) else {
            return Err(MeshError::load(path, "vertex missing x, y or z coordinate"));
        };
        positions.push(Point3::new(x, y, z));

        push_if_complete(&mut normals, read_vector3(vertex));
        push_if_complete(&mut tangents, read_vector4(vertex));
        push_if_complete(&mut uvs, read_uv(vertex));
    }

    let face_element = ply
        .payload
        .get("face")
        .ok_or_else(|| MeshError::load(path, "PLY file has no face element"))?;

    let mut triangles = Vec::with_capacity(face_element.len() * 3);
    for face in face_element {
        let indices = get_list_property(face, "vertex_indices")
            .or_else(|| get_list_property(face, "vertex_index"))
            .ok_or_else(|| MeshError::load(path, "face missing vertex_indices property"))?;

        // Triangulate polygon by fan triangulation
        for i in 1..indices.len().saturating_sub(1) {
            triangles.extend_from_slice(&[indices[0], indices[i], indices[i + 1]]);
        }
    }

    if triangles.is_empty() {
        return Err(MeshError::load(path, "PLY file contains no faces"));
    }

    let recompute_normals = normals.is_none();
    let mut mesh = MeshBuffer {
        normals: normals.unwrap_or_else(|| vec![Vector3::zeros(); positions.len()]),
        positions,
        tangents,
        uvs,
        triangles,
    };
    mesh.validate()?;
    if recompute_normals {
        log::debug!("{}: no vertex normals, recomputing", path.display());
        mesh.recalculate_normals();
    }
    Ok(mesh)
}

/// Append `value` to `column`, or drop the column once a value is missing.
fn push_if_complete<T>(column: &mut Option<Vec<T>>, value: Option<T>) {
    match (column.as_mut(), value) {
        (Some(values), Some(value)) => values.push(value),
        _ => *column = None,
    }
}

fn read_vector3(vertex: &DefaultElement) -> Option<Vector3<f64>> {
    Some(Vector3::new(
        get_float_property(vertex, "nx")?,
        get_float_property(vertex, "ny")?,
        get_float_property(vertex, "nz")?,
    ))
}

fn read_vector4(vertex: &DefaultElement) -> Option<Vector4<f64>> {
    Some(Vector4::new(
        get_float_property(vertex, "tx")?,
        get_float_property(vertex, "ty")?,
        get_float_property(vertex, "tz")?,
        get_float_property(vertex, "tw")?,
    ))
}

fn read_uv(vertex: &DefaultElement) -> Option<Vector2<f64>> {
    UV_NAMES.iter().find_map(|(u, v)| {
        Some(Vector2::new(
            get_float_property(vertex, u)?,
            get_float_property(vertex, v)?,
        ))
    })
}

fn get_float_property(element: &DefaultElement, name: &str) -> Option<f64> {
    match element.get(name)? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

fn get_list_property(element: &DefaultElement, name: &str) -> Option<Vec<usize>> {
    match element.get(name)? {
        Property::ListInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        _ => None,
    }
}

/// Save a mesh to a PLY file (ASCII format).
///
/// Every present column is written, in double precision.
///
/// # Example
///
/// ```no_run
/// use meshseam::io::ply;
/// use meshseam::mesh::MeshBuffer;
///
/// let mesh = MeshBuffer::new();
/// ply::save(&mesh, "output.ply").unwrap();
/// ```
pub fn save<P: AsRef<Path>>(mesh: &MeshBuffer, path: P) -> Result<()> {
    let path = path.as_ref();
    mesh.validate()?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    // Write header
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment Generated by meshseam")?;
    writeln!(writer, "element vertex {}", mesh.vertex_count())?;
    for name in ["x", "y", "z", "nx", "ny", "nz"] {
        writeln!(writer, "property double {}", name)?;
    }
    if mesh.tangents.is_some() {
        for name in ["tx", "ty", "tz", "tw"] {
            writeln!(writer, "property double {}", name)?;
        }
    }
    if mesh.uvs.is_some() {
        writeln!(writer, "property double s")?;
        writeln!(writer, "property double t")?;
    }
    writeln!(writer, "element face {}", mesh.triangle_count())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    // Write vertices
    for (i, (p, n)) in mesh.positions.iter().zip(&mesh.normals).enumerate() {
        write!(writer, "{} {} {} {} {} {}", p.x, p.y, p.z, n.x, n.y, n.z)?;
        if let Some(tangents) = &mesh.tangents {
            let t = tangents[i];
            write!(writer, " {} {} {} {}", t.x, t.y, t.z, t.w)?;
        }
        if let Some(uvs) = &mesh.uvs {
            write!(writer, " {} {}", uvs[i].x, uvs[i].y)?;
        }
        writeln!(writer)?;
    }

    // Write faces
    for [a, b, c] in mesh.triangles() {
        writeln!(writer, "3 {} {} {}", a, b, c)?;
    }

    writer.flush()?;
    Ok(())
}
