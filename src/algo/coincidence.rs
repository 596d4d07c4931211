//! Vertex coincidence index.
//!
//! Groups vertices that occupy (nearly) the same position, possibly across
//! several source meshes. Each vertex maps to the lowest-indexed vertex of its
//! group, the group's representative.
//!
//! The lookup is a uniform hash grid with cells of size `epsilon`, so a
//! vertex only compares itself against the 27 cells around it. The result is
//! identical to scanning every earlier vertex: the lowest matching index wins.

use std::collections::HashMap;

use nalgebra::Point3;

use crate::error::{MeshError, Result};

/// Default distance below which two vertices coincide.
pub const DEFAULT_EPSILON: f64 = 1e-4;

/// Per-vertex representatives and per-representative group sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoincidenceMap {
    representatives: Vec<usize>,
    collapse_counts: Vec<usize>,
}

impl CoincidenceMap {
    /// Build the map after checking that `epsilon` is finite and positive.
    pub fn try_build(positions: &[Point3<f64>], epsilon: f64) -> Result<Self> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(MeshError::invalid_param("epsilon", epsilon, "must be finite and positive"));
        }
        Ok(Self::build(positions, epsilon))
    }

    /// Build the map for `positions`.
    ///
    /// Vertices are processed in increasing index order. Vertex `i` maps to
    /// the representative of the lowest `j < i` closer than `epsilon`, or to
    /// itself if there is none.
    pub fn build(positions: &[Point3<f64>], epsilon: f64) -> Self {
        let n = positions.len();
        let mut representatives = Vec::with_capacity(n);
        let mut collapse_counts = vec![0; n];
        let mut grid: HashMap<[i64; 3], Vec<usize>> = HashMap::new();

        for (i, p) in positions.iter().enumerate() {
            let cell = grid_cell(p, epsilon);

            let mut earliest: Option<usize> = None;
            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        // Cells saturate for far-away coordinates; the distance test stays exact.
                        let key = [
                            cell[0].saturating_add(dx),
                            cell[1].saturating_add(dy),
                            cell[2].saturating_add(dz),
                        ];
                        let Some(bucket) = grid.get(&key) else {
                            continue;
                        };
                        // Buckets are filled in index order, so the first hit is the lowest.
                        let hit = bucket
                            .iter()
                            .copied()
                            .find(|&j| (positions[j] - p).norm() < epsilon);
                        if let Some(j) = hit {
                            earliest = Some(earliest.map_or(j, |e| e.min(j)));
                        }
                    }
                }
            }

            let rep = match earliest {
                Some(j) => representatives[j],
                None => i,
            };
            representatives.push(rep);
            collapse_counts[rep] += 1;
            grid.entry(cell).or_default().push(i);
        }

        Self {
            representatives,
            collapse_counts,
        }
    }

    /// Number of vertices covered by the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.representatives.len()
    }

    /// True if the map covers no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.representatives.is_empty()
    }

    /// Representative of vertex `v`.
    #[inline]
    pub fn representative(&self, v: usize) -> usize {
        self.representatives[v]
    }

    /// All representatives, one per vertex.
    pub fn representatives(&self) -> &[usize] {
        &self.representatives
    }

    /// Number of vertices mapping to `v`; zero unless `v` is a representative.
    #[inline]
    pub fn collapse_count(&self, v: usize) -> usize {
        self.collapse_counts[v]
    }

    /// True if `v` is its own representative.
    #[inline]
    pub fn is_representative(&self, v: usize) -> bool {
        self.representatives[v] == v
    }

    /// Vertices mapping to representative `rep`, ascending.
    pub fn cluster(&self, rep: usize) -> impl Iterator<Item = usize> + '_ {
        self.representatives[rep..]
            .iter()
            .enumerate()
            .filter(move |&(_, &r)| r == rep)
            .map(move |(offset, _)| rep + offset)
    }

    /// Representatives whose group has at least `min_count` members.
    pub fn clusters_of_at_least(&self, min_count: usize) -> impl Iterator<Item = usize> + '_ {
        self.collapse_counts
            .iter()
            .enumerate()
            .filter(move |&(_, &c)| c >= min_count && c > 0)
            .map(|(v, _)| v)
    }
}

fn grid_cell(p: &Point3<f64>, cell_size: f64) -> [i64; 3] {
    [
        (p.x / cell_size).floor() as i64,
        (p.y / cell_size).floor() as i64,
        (p.z / cell_size).floor() as i64,
    ]
}
