//! Mesh processing algorithms.
//!
//! This module contains the seam chamfering pipeline and the passes around it:
//!
//! - **Coincidence**: grouping of vertices that share a position
//! - **Topology**: directed edge pairing within and across meshes
//! - **Chamfer**: push accumulation, bridge triangles, closing fans
//! - **Compaction**: removal of unreferenced vertices
//! - **Welding**: merging of duplicated vertices
//! - **Parts**: role-aware processing of every mesh in an imported part

pub mod chamfer;
pub mod coincidence;
pub mod compact;
pub mod part;
pub mod topology;
pub mod weld;

mod progress;

pub use progress::Progress;
