//! Index types for mesh elements.
//!
//! Vertices are addressed with plain `usize` indices because they index flat
//! attribute buffers directly. Edges and triangles get type-safe wrappers so
//! that the two are never mixed up in topology code.

use std::fmt::{self, Debug};

/// A type-safe directed edge index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct EdgeId(u32);

/// A type-safe triangle index (the triangle number, not the offset into the
/// flat index list).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TriangleId(u32);

macro_rules! impl_index_type {
    ($name:ident, $display:literal) => {
        impl $name {
            /// Create a new index from a raw value.
            ///
            /// # Panics
            /// Panics in debug builds if the value does not fit in 32 bits.
            #[inline]
            pub fn new(index: usize) -> Self {
                debug_assert!(index <= u32::MAX as usize, "index {} too large", index);
                Self(index as u32)
            }

            /// Get the raw index value.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $display, self.0)
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                Self::new(v)
            }
        }
    };
}

impl_index_type!(EdgeId, "E");
impl_index_type!(TriangleId, "T");

impl TriangleId {
    /// Offset of this triangle's first vertex in a flat index list.
    #[inline]
    pub fn first_index(self) -> usize {
        self.index() * 3
    }
}
