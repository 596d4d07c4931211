//! Removal of unreferenced vertices.
//!
//! After chamfering, the output triangle list references only a subset of the
//! combined vertices. [`Remap`] renumbers the referenced ones densely, in the
//! order they first appear in the triangle list, and projects attribute
//! arrays through that numbering.

/// Old-to-new vertex numbering produced by one compaction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remap {
    old_to_new: Vec<Option<usize>>,
    new_to_old: Vec<usize>,
}

impl Remap {
    /// Renumber the vertices referenced by `triangles`, rewriting the list in
    /// place.
    ///
    /// `vertex_count` is the length of the attribute arrays the indices point
    /// into. Every index must be below it.
    pub fn from_triangles(triangles: &mut [usize], vertex_count: usize) -> Self {
        let mut old_to_new = vec![None; vertex_count];
        let mut new_to_old = Vec::new();

        for v in triangles.iter_mut() {
            let old = *v;
            *v = *old_to_new[old].get_or_insert_with(|| {
                new_to_old.push(old);
                new_to_old.len() - 1
            });
        }

        Self {
            old_to_new,
            new_to_old,
        }
    }

    /// Number of vertices that survive.
    #[inline]
    pub fn used_count(&self) -> usize {
        self.new_to_old.len()
    }

    /// New index of old vertex `v`, or `None` if it was dropped.
    #[inline]
    pub fn new_index(&self, v: usize) -> Option<usize> {
        self.old_to_new.get(v).copied().flatten()
    }

    /// Old indices of the surviving vertices, in new order.
    pub fn kept(&self) -> &[usize] {
        &self.new_to_old
    }

    /// Project a per-vertex array through the renumbering.
    pub fn project<T: Clone>(&self, values: &[T]) -> Vec<T> {
        self.new_to_old.iter().map(|&old| values[old].clone()).collect()
    }
}
