//! Merging of duplicated vertices.
//!
//! Exported meshes often split every triangle corner into its own vertex.
//! Welding folds coincident vertices back together when their shading
//! attributes agree, so hard edges and UV seams stay split while smooth
//! regions become connected again.

use std::collections::HashMap;

use super::coincidence::{CoincidenceMap, DEFAULT_EPSILON};
use crate::error::{MeshError, Result};
use crate::mesh::MeshBuffer;

/// Tolerances for [`weld_duplicate_vertices`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeldOptions {
    /// Distance below which positions coincide.
    pub position_epsilon: f64,
    /// Largest per-component difference between normals that still welds.
    pub normal_epsilon: f64,
    /// Largest per-component difference between UVs that still welds.
    pub uv_epsilon: f64,
}

impl Default for WeldOptions {
    fn default() -> Self {
        Self {
            position_epsilon: DEFAULT_EPSILON,
            normal_epsilon: 1e-3,
            uv_epsilon: 1e-4,
        }
    }
}

impl WeldOptions {
    /// Set the position tolerance.
    pub fn with_position_epsilon(mut self, epsilon: f64) -> Self {
        self.position_epsilon = epsilon;
        self
    }

    /// Set the normal tolerance.
    pub fn with_normal_epsilon(mut self, epsilon: f64) -> Self {
        self.normal_epsilon = epsilon;
        self
    }

    /// Set the UV tolerance.
    pub fn with_uv_epsilon(mut self, epsilon: f64) -> Self {
        self.uv_epsilon = epsilon;
        self
    }

    /// Check that every tolerance is in range.
    pub fn validate(&self) -> Result<()> {
        if !(self.position_epsilon.is_finite() && self.position_epsilon > 0.0) {
            return Err(MeshError::invalid_param(
                "position_epsilon",
                self.position_epsilon,
                "must be finite and positive",
            ));
        }
        for (name, value) in [("normal_epsilon", self.normal_epsilon), ("uv_epsilon", self.uv_epsilon)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(MeshError::invalid_param(name, value, "must be finite and non-negative"));
            }
        }
        Ok(())
    }
}

/// Merge vertices that share a position, normal and UV.
///
/// Each vertex folds into the first earlier vertex it matches. Triangles that
/// collapse to fewer than three distinct vertices are dropped, then the
/// buffer is compacted. Returns the number of vertices removed.
pub fn weld_duplicate_vertices(mesh: &mut MeshBuffer, options: WeldOptions) -> Result<usize> {
    options.validate()?;
    mesh.validate()?;

    let before = mesh.vertex_count();
    if before == 0 {
        return Ok(0);
    }

    let map = CoincidenceMap::build(&mesh.positions, options.position_epsilon);
    let mut kept: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut target = Vec::with_capacity(before);

    for v in 0..before {
        let candidates = kept.entry(map.representative(v)).or_default();
        match candidates.iter().copied().find(|&c| attributes_match(mesh, c, v, &options)) {
            Some(c) => target.push(c),
            None => {
                candidates.push(v);
                target.push(v);
            }
        }
    }

    let mut triangles = Vec::with_capacity(mesh.triangles.len());
    for [a, b, c] in mesh.triangles() {
        let (a, b, c) = (target[a], target[b], target[c]);
        if a != b && b != c && a != c {
            triangles.extend_from_slice(&[a, b, c]);
        }
    }
    let dropped_triangles = mesh.triangle_count() - triangles.len() / 3;
    mesh.triangles = triangles;

    let removed = mesh.compact();
    log::debug!(
        "weld: {} -> {} vertices, {} degenerate triangles dropped",
        before,
        mesh.vertex_count(),
        dropped_triangles
    );
    Ok(removed)
}

fn attributes_match(mesh: &MeshBuffer, a: usize, b: usize, options: &WeldOptions) -> bool {
    let normals_match = (mesh.normals[a] - mesh.normals[b]).amax() <= options.normal_epsilon;
    let uvs_match = mesh
        .uvs
        .as_ref()
        .map_or(true, |uvs| (uvs[a] - uvs[b]).amax() <= options.uv_epsilon);
    normals_match && uvs_match
}
