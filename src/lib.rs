//! # meshseam
//!
//! Seam chamfering for triangle meshes that are modelled as separate pieces.
//!
//! Assets such as toy bricks are often exported as several meshes that touch
//! without sharing vertices: an outer shell, inset detail panels, colour
//! change surfaces. Where two of them meet there is a hard, aliased crease.
//! meshseam finds those seams by position, pushes the vertices on both sides
//! apart along their surfaces and bridges the gap with a thin bevel.
//!
//! ## Features
//!
//! - **Flat buffers**: parallel attribute arrays and a flat index list, the
//!   layout renderers and importers exchange
//! - **Cross-mesh topology**: edges are paired both within a mesh and across
//!   meshes through a vertex coincidence index
//! - **Chamfering**: push accumulation, bridge triangles and closing fans at
//!   multi-way junctions
//! - **Part processing**: role-aware, parallel processing of every mesh in a
//!   glTF scene
//! - **File formats**: PLY and glTF
//!
//! ## Quick Start
//!
//! ```no_run
//! use meshseam::prelude::*;
//!
//! let shell = meshseam::io::load("shell.ply").unwrap();
//! let panel = meshseam::io::load("panel.ply").unwrap();
//!
//! let options = ChamferOptions::default().with_chamfer_geometry(true);
//! let result = chamfer(&shell, &[panel], &options).unwrap();
//! println!("{} bridge triangles", result.stats.bridge_triangles);
//!
//! meshseam::io::save(&result.mesh, "shell_chamfered.ply").unwrap();
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use meshseam::prelude::*;
//! use nalgebra::{Point3, Vector3};
//!
//! let top = MeshBuffer::from_triangles(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!         Point3::new(1.0, 1.0, 0.0),
//!     ],
//!     vec![Vector3::z(); 4],
//!     &[[0, 1, 3], [0, 3, 2]],
//! )
//! .unwrap();
//!
//! let front = MeshBuffer::from_triangles(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 0.0, -1.0),
//!         Point3::new(1.0, 0.0, -1.0),
//!     ],
//!     vec![-Vector3::y(); 4],
//!     &[[0, 2, 1], [1, 2, 3]],
//! )
//! .unwrap();
//!
//! let options = ChamferOptions::default().with_chamfer_geometry(true);
//! let result = chamfer(&top, &[front], &options).unwrap();
//! assert_eq!(result.stats.bridge_triangles, 2);
//! assert_eq!(result.mesh.triangle_count(), 4);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use meshseam::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::chamfer::{chamfer, ChamferOptions, ChamferResult, ChamferStats};
    pub use crate::algo::coincidence::CoincidenceMap;
    pub use crate::algo::part::{process_part, Part, PartMesh, PartOptions, SurfaceRole};
    pub use crate::algo::topology::{EdgeKind, EdgeTopology};
    pub use crate::algo::weld::{weld_duplicate_vertices, WeldOptions};
    pub use crate::algo::Progress;
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{CombinedBuffer, EdgeId, MeshBuffer, TriangleId};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::{Point3, Vector3};

    /// Closed tetrahedron split into two meshes along the edge loop around
    /// its base.
    #[test]
    fn test_closed_pair_has_no_outer_boundary() {
        let apex = Point3::new(0.5, 0.5, 1.0);
        let base = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];

        let sides = MeshBuffer::from_triangles(
            vec![base[0], base[1], base[2], apex],
            vec![Vector3::z(); 4],
            &[[0, 1, 3], [1, 2, 3], [2, 0, 3]],
        )
        .unwrap();
        let bottom =
            MeshBuffer::from_triangles(base.to_vec(), vec![-Vector3::z(); 3], &[[0, 2, 1]])
                .unwrap();

        let combined = CombinedBuffer::new(&sides, &[bottom.clone()]).unwrap();
        let map = CoincidenceMap::build(&combined.positions, 1e-4);
        let topology = EdgeTopology::build(&combined.triangles, &map);

        assert_eq!(topology.count(EdgeKind::BoundaryToSelf), 0);
        assert_eq!(topology.count(EdgeKind::BoundaryToOther), 6);
        assert_eq!(topology.count(EdgeKind::Interior), 6);

        let options = ChamferOptions::default().with_locked_edges(true);
        let result = chamfer(&sides, &[bottom], &options).unwrap();
        assert_eq!(result.stats.locked_vertices, 0);
        assert_eq!(result.mesh.triangle_count(), 3);
        assert!(result.mesh.validate().is_ok());
    }
}
