//! Core mesh data structures.
//!
//! This module provides the flat buffer representation the chamfer pipeline
//! reads and writes.
//!
//! # Overview
//!
//! - [`MeshBuffer`]: parallel per-vertex arrays plus a flat triangle list, the
//!   format renderers and asset importers exchange.
//! - [`CombinedBuffer`]: a primary buffer concatenated with companion buffers,
//!   so that seams between separate meshes can be found by position.
//!
//! # Index Types
//!
//! Topology code identifies elements with [`EdgeId`] and [`TriangleId`].
//! Vertices are plain `usize` indices into the attribute arrays.
//!
//! # Construction
//!
//! ```
//! use meshseam::mesh::MeshBuffer;
//! use nalgebra::{Point3, Vector3};
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let normals = vec![Vector3::z(); 3];
//!
//! let mesh = MeshBuffer::from_triangles(positions, normals, &[[0, 1, 2]]).unwrap();
//! assert_eq!(mesh.vertex_count(), 3);
//! ```

mod buffer;
mod combined;
mod index;

pub use buffer::{triangle_centroid, triangle_normal, MeshBuffer};
pub use combined::CombinedBuffer;
pub use index::{EdgeId, TriangleId};
