//! Vertex adjacency graph.
//!
//! An undirected graph over welded vertices with one edge per distinct
//! triangle side. Each edge carries the ids of the charts whose triangles use
//! it as a side: initially the ids of the triangles themselves, re-tagged to
//! the merged chart id as charts merge. An interior edge of a manifold mesh
//! carries two tags and a border edge carries one.
//!
//! Edge records live in a flat arena; per-vertex adjacency maps a neighbor to
//! its edge slot. Euclidean edge lengths are computed once at construction
//! since welded positions never move.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use nalgebra::Point3;

use super::geometry::distance;
use super::index::{ChartId, VertexId};
use super::weld::WeldedMesh;

/// An undirected edge between two vertices, stored with the smaller id first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexEdge {
    a: VertexId,
    b: VertexId,
}

impl VertexEdge {
    /// Create an edge, normalizing the vertex order.
    #[inline]
    pub fn new(v0: VertexId, v1: VertexId) -> Self {
        if v0 <= v1 {
            Self { a: v0, b: v1 }
        } else {
            Self { a: v1, b: v0 }
        }
    }

    /// The smaller endpoint.
    #[inline]
    pub fn a(self) -> VertexId {
        self.a
    }

    /// The larger endpoint.
    #[inline]
    pub fn b(self) -> VertexId {
        self.b
    }

    /// Both endpoints.
    #[inline]
    pub fn vertices(self) -> [VertexId; 2] {
        [self.a, self.b]
    }

    /// The endpoint opposite `v`, or `None` if `v` is not on this edge.
    #[inline]
    pub fn opposite(self, v: VertexId) -> Option<VertexId> {
        if v == self.a {
            Some(self.b)
        } else if v == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// Whether both endpoints are the same vertex.
    #[inline]
    pub fn is_loop(self) -> bool {
        self.a == self.b
    }
}

/// The sides of a triangle as a set of edges.
///
/// Sides collapsed by welding (both endpoints equal) are dropped.
pub fn triangle_edges(tri: &[VertexId; 3]) -> BTreeSet<VertexEdge> {
    [
        VertexEdge::new(tri[0], tri[1]),
        VertexEdge::new(tri[0], tri[2]),
        VertexEdge::new(tri[1], tri[2]),
    ]
    .into_iter()
    .filter(|e| !e.is_loop())
    .collect()
}

/// The set of vertices touched by a set of edges.
pub fn edge_vertices<'a, It>(edges: It) -> BTreeSet<VertexId>
where
    It: IntoIterator<Item = &'a VertexEdge>,
{
    edges.into_iter().flat_map(|e| e.vertices()).collect()
}

#[derive(Debug, Clone)]
struct EdgeSlot {
    edge: VertexEdge,
    /// Sorted, deduplicated chart ids citing this edge.
    tags: Vec<ChartId>,
    length: f64,
}

/// Undirected graph over welded vertices, tagged with chart ids per edge.
#[derive(Debug, Clone, Default)]
pub struct VertexGraph {
    positions: Vec<Point3<f64>>,
    adjacency: Vec<BTreeMap<VertexId, usize>>,
    edges: Vec<EdgeSlot>,
}

impl VertexGraph {
    /// Build the graph from a welded mesh, tagging every side of triangle `i`
    /// with chart id `i`.
    pub fn build(mesh: &WeldedMesh) -> Self {
        let positions: Vec<Point3<f64>> =
            mesh.positions().iter().map(|p| p.cast::<f64>()).collect();
        let mut graph = Self {
            adjacency: vec![BTreeMap::new(); positions.len()],
            edges: Vec::with_capacity(mesh.num_faces() * 3 / 2 + 1),
            positions,
        };

        for face in mesh.face_ids() {
            let chart = ChartId::from(face);
            for edge in triangle_edges(&mesh.triangle(face)) {
                let slot = graph.ensure_edge(edge);
                insert_sorted(&mut graph.edges[slot].tags, chart);
            }
        }

        graph
    }

    fn ensure_edge(&mut self, edge: VertexEdge) -> usize {
        if let Some(&slot) = self.adjacency[edge.a.index()].get(&edge.b) {
            return slot;
        }
        let slot = self.edges.len();
        let length = distance(&self.positions[edge.a.index()], &self.positions[edge.b.index()]);
        self.edges.push(EdgeSlot {
            edge,
            tags: Vec::with_capacity(2),
            length,
        });
        self.adjacency[edge.a.index()].insert(edge.b, slot);
        self.adjacency[edge.b.index()].insert(edge.a, slot);
        slot
    }

    fn slot(&self, edge: VertexEdge) -> Option<&EdgeSlot> {
        let slot = *self.adjacency.get(edge.a.index())?.get(&edge.b)?;
        Some(&self.edges[slot])
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Number of edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> &Point3<f64> {
        &self.positions[v.index()]
    }

    /// Whether the graph contains `edge`.
    #[inline]
    pub fn contains_edge(&self, edge: VertexEdge) -> bool {
        self.slot(edge).is_some()
    }

    /// Euclidean length of an edge, or the endpoint distance if the edge is not
    /// in the graph.
    pub fn edge_length(&self, edge: VertexEdge) -> f64 {
        match self.slot(edge) {
            Some(slot) => slot.length,
            None => distance(self.position(edge.a), self.position(edge.b)),
        }
    }

    /// The endpoint positions of an edge.
    #[inline]
    pub fn segment(&self, edge: VertexEdge) -> (&Point3<f64>, &Point3<f64>) {
        (self.position(edge.a), self.position(edge.b))
    }

    /// Chart ids citing an edge (empty if the edge is not in the graph).
    pub fn tags(&self, edge: VertexEdge) -> &[ChartId] {
        self.slot(edge).map(|s| s.tags.as_slice()).unwrap_or(&[])
    }

    /// Iterate over the neighbors of `v` with the connecting edge length.
    pub fn neighbors(&self, v: VertexId) -> impl Iterator<Item = (VertexId, f64)> + '_ {
        self.adjacency[v.index()]
            .iter()
            .map(move |(&n, &slot)| (n, self.edges[slot].length))
    }

    /// Iterate over all edges with their tags.
    pub fn edges(&self) -> impl Iterator<Item = (VertexEdge, &[ChartId])> + '_ {
        self.edges.iter().map(|s| (s.edge, s.tags.as_slice()))
    }

    /// Distinct chart ids on the edges incident to `v`.
    pub fn incident_charts(&self, v: VertexId) -> BTreeSet<ChartId> {
        self.adjacency[v.index()]
            .values()
            .flat_map(|&slot| self.edges[slot].tags.iter().copied())
            .collect()
    }

    /// Whether `v` touches at least `min_charts` distinct charts.
    pub fn is_corner(&self, v: VertexId, min_charts: usize) -> bool {
        self.incident_charts(v).len() >= min_charts
    }

    /// Replace the tags `from` with `to` on `edge`.
    ///
    /// Returns `true` if any tag was replaced.
    pub fn retag(&mut self, edge: VertexEdge, from: &[ChartId], to: ChartId) -> bool {
        let Some(&slot) = self.adjacency.get(edge.a.index()).and_then(|m| m.get(&edge.b)) else {
            return false;
        };
        let tags = &mut self.edges[slot].tags;
        let before = tags.len();
        tags.retain(|t| !from.contains(t));
        if tags.len() == before {
            return false;
        }
        insert_sorted(tags, to);
        true
    }

    /// Drop the tags `from` from `edge` and add every id in `to`.
    ///
    /// Used when triangles move between existing charts rather than into a
    /// new one.
    pub fn replace_tags(&mut self, edge: VertexEdge, from: &[ChartId], to: &[ChartId]) {
        let Some(&slot) = self.adjacency.get(edge.a.index()).and_then(|m| m.get(&edge.b)) else {
            return;
        };
        let tags = &mut self.edges[slot].tags;
        tags.retain(|t| !from.contains(t));
        for &t in to {
            insert_sorted(tags, t);
        }
    }

    /// Number of connected components, counting isolated vertices.
    pub fn connected_components(&self) -> usize {
        let mut seen = vec![false; self.positions.len()];
        let mut queue = VecDeque::new();
        let mut components = 0;

        for start in 0..self.positions.len() {
            if seen[start] {
                continue;
            }
            components += 1;
            seen[start] = true;
            queue.push_back(start);
            while let Some(v) = queue.pop_front() {
                for n in self.adjacency[v].keys() {
                    if !seen[n.index()] {
                        seen[n.index()] = true;
                        queue.push_back(n.index());
                    }
                }
            }
        }

        components
    }
}

fn insert_sorted(tags: &mut Vec<ChartId>, tag: ChartId) {
    if let Err(pos) = tags.binary_search(&tag) {
        tags.insert(pos, tag);
    }
}
