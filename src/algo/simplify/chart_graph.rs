//! The chart graph.
//!
//! Nodes are charts (connected groups of triangles); an edge links two charts
//! whose boundaries share a connected run of vertex edges. Charts live in an
//! append-only arena indexed by [`ChartId`]: a merge pushes the new chart at
//! the end and leaves the consumed slots empty, so ids are never reused and
//! stale references are detected with a slot lookup.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{MeshError, Result};
use crate::mesh::{
    edge_vertices, triangle_edges, ChartId, FaceId, VertexEdge, VertexGraph, VertexId, WeldedMesh,
};

/// A connected group of triangles simplified as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chart {
    pub(crate) triangles: Vec<FaceId>,
    pub(crate) boundary: BTreeSet<VertexEdge>,
    pub(crate) corners: BTreeSet<VertexId>,
}

impl Chart {
    /// Create a chart from its parts.
    pub fn new(
        triangles: Vec<FaceId>,
        boundary: BTreeSet<VertexEdge>,
        corners: BTreeSet<VertexId>,
    ) -> Self {
        Self {
            triangles,
            boundary,
            corners,
        }
    }

    /// The triangles of this chart, in merge order.
    #[inline]
    pub fn triangles(&self) -> &[FaceId] {
        &self.triangles
    }

    /// Number of triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// The outline of this chart.
    #[inline]
    pub fn boundary(&self) -> &BTreeSet<VertexEdge> {
        &self.boundary
    }

    /// Boundary vertices touching three or more charts.
    ///
    /// Only meaningful after a merge or an explicit corner pass; fresh
    /// single-triangle charts start with no corners.
    #[inline]
    pub fn corners(&self) -> &BTreeSet<VertexId> {
        &self.corners
    }

    /// Vertices on the boundary.
    pub fn boundary_vertices(&self) -> BTreeSet<VertexId> {
        edge_vertices(&self.boundary)
    }
}

/// Graph of charts over a fixed triangle set.
#[derive(Debug, Clone, Default)]
pub struct ChartGraph {
    faces: Vec<[VertexId; 3]>,
    charts: Vec<Option<Chart>>,
    adjacency: Vec<BTreeSet<ChartId>>,
    live: usize,
}

impl ChartGraph {
    /// Create one chart per triangle.
    ///
    /// Two charts are linked when some vertex edge carries exactly their two
    /// tags in `graph`.
    pub fn new(mesh: &WeldedMesh, graph: &VertexGraph) -> Self {
        let n = mesh.num_faces();
        // A full merge sequence allocates n - 1 more charts.
        let capacity = (2 * n).saturating_sub(1);
        let mut charts = Vec::with_capacity(capacity);
        let mut adjacency = Vec::with_capacity(capacity);

        for face in mesh.face_ids() {
            charts.push(Some(Chart {
                triangles: vec![face],
                boundary: triangle_edges(&mesh.triangle(face)),
                corners: BTreeSet::new(),
            }));
            adjacency.push(BTreeSet::new());
        }

        let mut chart_graph = Self {
            faces: mesh.triangles().to_vec(),
            charts,
            adjacency,
            live: n,
        };

        for (_, tags) in graph.edges() {
            if let &[a, b] = tags {
                chart_graph.link(a, b);
            }
        }

        chart_graph
    }

    /// Number of live charts.
    #[inline]
    pub fn num_charts(&self) -> usize {
        self.live
    }

    /// Number of triangles partitioned by the charts.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Vertices of a triangle.
    #[inline]
    pub fn face(&self, f: FaceId) -> [VertexId; 3] {
        self.faces[f.index()]
    }

    /// Whether `id` names a live chart.
    #[inline]
    pub fn contains(&self, id: ChartId) -> bool {
        self.chart(id).is_some()
    }

    /// Get a live chart.
    #[inline]
    pub fn chart(&self, id: ChartId) -> Option<&Chart> {
        self.charts.get(id.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub(crate) fn chart_mut(&mut self, id: ChartId) -> Option<&mut Chart> {
        self.charts.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Iterate over live charts in id order.
    pub fn charts(&self) -> impl Iterator<Item = (ChartId, &Chart)> + '_ {
        self.charts
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (ChartId::new(i), c)))
    }

    /// Ids of live charts in ascending order.
    pub fn chart_ids(&self) -> Vec<ChartId> {
        self.charts().map(|(id, _)| id).collect()
    }

    /// Charts adjacent to `id`.
    pub fn neighbors(&self, id: ChartId) -> impl Iterator<Item = ChartId> + '_ {
        self.adjacency
            .get(id.index())
            .into_iter()
            .flat_map(|n| n.iter().copied())
    }

    /// Whether two charts are linked.
    pub fn are_adjacent(&self, a: ChartId, b: ChartId) -> bool {
        self.adjacency
            .get(a.index())
            .is_some_and(|n| n.contains(&b))
    }

    /// Every linked pair once, smaller id first, in ascending order.
    pub fn adjacent_pairs(&self) -> Vec<(ChartId, ChartId)> {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(i, n)| {
                let a = ChartId::new(i);
                n.iter().filter(move |&&b| a < b).map(move |&b| (a, b))
            })
            .collect()
    }

    /// Append a chart and return its id.
    pub(crate) fn insert(&mut self, chart: Chart) -> ChartId {
        let id = ChartId::new(self.charts.len());
        self.charts.push(Some(chart));
        self.adjacency.push(BTreeSet::new());
        self.live += 1;
        id
    }

    /// Link two live, distinct charts.
    pub(crate) fn link(&mut self, a: ChartId, b: ChartId) {
        if a == b || !self.contains(a) || !self.contains(b) {
            return;
        }
        self.adjacency[a.index()].insert(b);
        self.adjacency[b.index()].insert(a);
    }

    /// Remove a chart and all of its links.
    pub(crate) fn remove(&mut self, id: ChartId) -> Option<Chart> {
        let chart = self.charts.get_mut(id.index())?.take()?;
        let neighbors = std::mem::take(&mut self.adjacency[id.index()]);
        for n in neighbors {
            self.adjacency[n.index()].remove(&id);
        }
        self.live -= 1;
        Some(chart)
    }

    /// Check that the live charts partition the triangle set exactly.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvariantViolation`] if a triangle is out of
    /// range, owned twice, or owned by no chart.
    pub fn validate_partition(&self) -> Result<()> {
        self.chart_of_face().map(|_| ())
    }

    /// The owning chart of every triangle.
    ///
    /// # Errors
    ///
    /// Fails like [`ChartGraph::validate_partition`].
    pub fn chart_of_face(&self) -> Result<Vec<ChartId>> {
        let mut owner = vec![ChartId::invalid(); self.faces.len()];
        for (id, chart) in self.charts() {
            for &f in &chart.triangles {
                let slot = owner.get_mut(f.index()).ok_or_else(|| {
                    MeshError::InvariantViolation(format!(
                        "chart {:?} holds unknown triangle {:?}",
                        id, f
                    ))
                })?;
                if slot.is_valid() {
                    return Err(MeshError::InvariantViolation(format!(
                        "triangle {:?} is owned by both {:?} and {:?}",
                        f, *slot, id
                    )));
                }
                *slot = id;
            }
        }
        if let Some(f) = owner.iter().position(|c| !c.is_valid()) {
            return Err(MeshError::InvariantViolation(format!(
                "triangle {:?} is not owned by any chart",
                FaceId::<u32>::new(f)
            )));
        }
        Ok(owner)
    }

    /// Number of connected components among live charts.
    pub fn connected_components(&self) -> usize {
        let mut seen = BTreeSet::new();
        let mut components = 0;
        for (id, _) in self.charts() {
            if !seen.insert(id) {
                continue;
            }
            components += 1;
            let mut stack = vec![id];
            while let Some(c) = stack.pop() {
                for n in self.neighbors(c) {
                    if seen.insert(n) {
                        stack.push(n);
                    }
                }
            }
        }
        components
    }
}

/// Number of connected chains formed by a set of edges.
pub(crate) fn count_chains(edges: &BTreeSet<VertexEdge>) -> usize {
    let mut parent: BTreeMap<VertexId, VertexId> = BTreeMap::new();

    fn find(parent: &mut BTreeMap<VertexId, VertexId>, v: VertexId) -> VertexId {
        let p = *parent.entry(v).or_insert(v);
        if p == v {
            return v;
        }
        let root = find(parent, p);
        parent.insert(v, root);
        root
    }

    for e in edges {
        let ra = find(&mut parent, e.a());
        let rb = find(&mut parent, e.b());
        if ra != rb {
            parent.insert(ra.max(rb), ra.min(rb));
        }
    }

    let vertices: Vec<VertexId> = parent.keys().copied().collect();
    vertices
        .into_iter()
        .filter(|&v| find(&mut parent, v) == v)
        .count()
}
