//! Error types for meshseam.
//!
//! Every fallible entry point of the crate returns [`Result`]. Malformed input
//! buffers are reported here and never repaired silently.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh operations.
#[derive(Error, Debug)]
pub enum MeshError {
    /// A triangle references a vertex outside the buffer.
    #[error("triangle {triangle} references invalid vertex index {vertex} (vertex count {vertex_count})")]
    InvalidVertexIndex {
        /// The triangle index.
        triangle: usize,
        /// The invalid vertex index.
        vertex: usize,
        /// Number of vertices in the buffer.
        vertex_count: usize,
    },

    /// A per-vertex attribute array does not match the position count.
    #[error("attribute '{attribute}' has {found} entries, expected {expected}")]
    RaggedAttribute {
        /// Name of the attribute array.
        attribute: &'static str,
        /// Expected number of entries (the position count).
        expected: usize,
        /// Actual number of entries.
        found: usize,
    },

    /// The flat triangle list is not a multiple of three.
    #[error("triangle index list has {len} entries, which is not a multiple of 3")]
    IncompleteTriangle {
        /// Length of the index list.
        len: usize,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create a load error for `path`.
    pub(crate) fn load<P: Into<PathBuf>, M: Into<String>>(path: P, message: M) -> Self {
        MeshError::LoadError {
            path: path.into(),
            message: message.into(),
        }
    }
}
