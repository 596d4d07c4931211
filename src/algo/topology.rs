//! Directed edge topology of a combined mesh.
//!
//! Every triangle contributes three directed edges in winding order. Each
//! edge is paired at most once with a reverse edge by raw vertex index (its
//! neighbor inside the same mesh) and at most once with a reverse edge by
//! coincidence representative (which may belong to another mesh).

use super::coincidence::CoincidenceMap;
use crate::mesh::{EdgeId, TriangleId};

/// A directed edge owned by one triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Start vertex.
    pub v0: usize,
    /// End vertex.
    pub v1: usize,
    /// Representative of `v0`.
    pub rep0: usize,
    /// Representative of `v1`.
    pub rep1: usize,
    /// Reverse edge with the same raw vertex indices.
    pub neighbor: Option<EdgeId>,
    /// Reverse edge with the same representatives.
    pub rep_neighbor: Option<EdgeId>,
    /// Triangle this edge belongs to.
    pub triangle: TriangleId,
}

impl Edge {
    /// Classify the edge by its neighbor links.
    pub fn kind(&self) -> EdgeKind {
        match (self.neighbor, self.rep_neighbor) {
            (Some(_), _) => EdgeKind::Interior,
            (None, Some(_)) => EdgeKind::BoundaryToOther,
            (None, None) => EdgeKind::BoundaryToSelf,
        }
    }
}

/// How an edge relates to the rest of the combined mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Closed by a triangle of the same mesh. Never chamfered.
    Interior,
    /// Open in its own mesh but matched by a coincident edge elsewhere.
    /// These are the seams that get chamfered.
    BoundaryToOther,
    /// Open everywhere: the true outer boundary.
    BoundaryToSelf,
}

/// All directed edges of a triangle list with their neighbor links resolved.
#[derive(Debug, Clone, Default)]
pub struct EdgeTopology {
    edges: Vec<Edge>,
}

impl EdgeTopology {
    /// Build the edge list for `triangles`.
    ///
    /// `map` must cover every vertex referenced by `triangles`.
    pub fn build(triangles: &[usize], map: &CoincidenceMap) -> Self {
        let mut builder = Builder {
            edges: Vec::with_capacity(triangles.len()),
            open: vec![Vec::new(); map.len()],
            open_rep: vec![Vec::new(); map.len()],
            map,
        };

        for (t, tri) in triangles.chunks_exact(3).enumerate() {
            let triangle = TriangleId::new(t);
            builder.add_edge(tri[0], tri[1], triangle);
            builder.add_edge(tri[1], tri[2], triangle);
            builder.add_edge(tri[2], tri[0], triangle);
        }

        Self {
            edges: builder.edges,
        }
    }

    /// Number of edges (three per triangle).
    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// True if there are no edges.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edge by id.
    #[inline]
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    /// Classification of edge `id`.
    #[inline]
    pub fn kind(&self, id: EdgeId) -> EdgeKind {
        self.edge(id).kind()
    }

    /// Iterate over `(id, edge)` pairs in creation order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges.iter().enumerate().map(|(i, e)| (EdgeId::new(i), e))
    }

    /// Seam edges paired with their cross-mesh partner, in creation order.
    pub fn seams(&self) -> impl Iterator<Item = (&Edge, &Edge)> + '_ {
        self.edges.iter().filter_map(move |e| match (e.neighbor, e.rep_neighbor) {
            (None, Some(partner)) => Some((e, self.edge(partner))),
            _ => None,
        })
    }

    /// Number of edges of the given kind.
    pub fn count(&self, kind: EdgeKind) -> usize {
        self.edges.iter().filter(|e| e.kind() == kind).count()
    }
}

struct Builder<'a> {
    edges: Vec<Edge>,
    /// Open edges bucketed by the smaller raw vertex index.
    open: Vec<Vec<EdgeId>>,
    /// Open edges bucketed by the smaller representative.
    open_rep: Vec<Vec<EdgeId>>,
    map: &'a CoincidenceMap,
}

impl Builder<'_> {
    fn add_edge(&mut self, v0: usize, v1: usize, triangle: TriangleId) {
        let id = EdgeId::new(self.edges.len());
        let rep0 = self.map.representative(v0);
        let rep1 = self.map.representative(v1);

        let key = v0.min(v1);
        let neighbor = take_reverse(&mut self.open[key], &self.edges, |e| e.v0 == v1 && e.v1 == v0);
        match neighbor {
            Some(n) => self.edges[n.index()].neighbor = Some(id),
            None => self.open[key].push(id),
        }

        let rep_key = rep0.min(rep1);
        let rep_neighbor = take_reverse(&mut self.open_rep[rep_key], &self.edges, |e| {
            e.rep0 == rep1 && e.rep1 == rep0
        });
        match rep_neighbor {
            Some(n) => self.edges[n.index()].rep_neighbor = Some(id),
            None => self.open_rep[rep_key].push(id),
        }

        self.edges.push(Edge {
            v0,
            v1,
            rep0,
            rep1,
            neighbor,
            rep_neighbor,
            triangle,
        });
    }
}

/// Remove and return the first open edge in `bucket` matching `is_reverse`.
fn take_reverse(
    bucket: &mut Vec<EdgeId>,
    edges: &[Edge],
    is_reverse: impl Fn(&Edge) -> bool,
) -> Option<EdgeId> {
    let pos = bucket.iter().position(|&e| is_reverse(&edges[e.index()]))?;
    Some(bucket.remove(pos))
}
