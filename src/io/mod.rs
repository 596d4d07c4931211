//! Mesh file I/O.
//!
//! This module provides functions for loading and saving mesh buffers and
//! for loading whole parts from scene files.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Parts | Notes |
//! |--------|-----------|------|------|-------|-------|
//! | PLY | `.ply` | ✓ | ✓ | ✗ | Normals, tangents and UVs when present |
//! | glTF | `.gltf`, `.glb` | ✓ | ✗ | ✓ | Node names select surface roles |
//!
//! # Usage
//!
//! ```no_run
//! use meshseam::io::{load, save};
//!
//! let mesh = load("shell.ply").unwrap();
//! save(&mesh, "output.ply").unwrap();
//! ```
//!
//! Parts keep the node hierarchy information the part pipeline needs:
//!
//! ```no_run
//! use meshseam::io::load_part;
//!
//! let part = load_part("brick.glb").unwrap();
//! for mesh in &part.meshes {
//!     println!("{}: {:?}", mesh.name, mesh.role);
//! }
//! ```

pub mod gltf;
pub mod ply;

use std::path::Path;

use crate::algo::part::Part;
use crate::error::{MeshError, Result};
use crate::mesh::MeshBuffer;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// PLY (Stanford polygon) format.
    Ply,
    /// glTF format.
    Gltf,
    /// glTF binary format.
    Glb,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "ply" => Some(Format::Ply),
            "gltf" => Some(Format::Gltf),
            "glb" => Some(Format::Glb),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

fn detect(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load a mesh from a file with automatic format detection.
///
/// The format is determined by the file extension. Scene formats merge every
/// triangle primitive into one buffer, in mesh space.
pub fn load<P: AsRef<Path>>(path: P) -> Result<MeshBuffer> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Ply => ply::load(path),
        Format::Gltf | Format::Glb => gltf::load(path),
    }
}

/// Save a mesh to a file with automatic format detection.
pub fn save<P: AsRef<Path>>(mesh: &MeshBuffer, path: P) -> Result<()> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Ply => ply::save(mesh, path),
        Format::Gltf | Format::Glb => Err(MeshError::SaveError {
            path: path.to_path_buf(),
            message: "glTF saving is not supported".to_string(),
        }),
    }
}

/// Load every mesh node of a scene file as a [`Part`].
pub fn load_part<P: AsRef<Path>>(path: P) -> Result<Part> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Gltf | Format::Glb => gltf::load_part(path),
        Format::Ply => Err(MeshError::load(path, "parts can only be loaded from glTF scenes")),
    }
}
