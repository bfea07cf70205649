//! Boundary straightening between adjacent charts.
//!
//! After merging, the boundary two charts share is whatever jagged run of
//! triangle edges the merge order left behind. For each adjacent pair this
//! pass looks for a shorter edge path between the pair's shared corners that
//! stays inside the two charts, and if one exists, moves triangles across so
//! the new path becomes the shared boundary.
//!
//! Every check that fails leaves the pair untouched. Only a triangle count
//! that no longer adds up is reported as an error.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};

use crate::algo::geodesic::{astar_path, PathOptions};
use crate::algo::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::{
    edge_vertices, triangle_edges, ChartId, FaceId, VertexEdge, VertexGraph, VertexId,
};

use super::chart_graph::ChartGraph;

/// Why a chart pair was left as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    /// One of the charts is a single triangle.
    SingleTriangle,
    /// The charts no longer share a boundary edge.
    NoSharedBoundary,
    /// The shared boundary is a single edge.
    SingleSharedEdge,
    /// The shared boundary holds no shared corner, or more than two.
    AmbiguousCorners,
    /// Starting from the only shared corner, the shared edges do not form a
    /// simple chain.
    ChainTraceFailed,
    /// No path connects the endpoints inside the two charts.
    NoPath,
    /// The shortest path already is the shared boundary.
    AlreadyStraight,
    /// One chart would be left without a boundary.
    EmptyBoundary,
    /// A triangle ended up on neither side of the new path.
    UnassignedTriangle,
    /// One chart would be left without triangles.
    EmptySide,
}

/// Result of straightening one chart pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StraightenOutcome {
    /// Triangles were moved and both boundaries updated.
    Straightened,
    /// The pair was not modified.
    Skipped(SkipReason),
}

/// Counters collected by [`straighten_boundaries`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StraightenStats {
    /// Adjacent pairs visited.
    pub pairs: usize,
    /// Pairs whose shared boundary was replaced.
    pub straightened: usize,
    /// Skipped pairs by reason.
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl StraightenStats {
    /// Total number of skipped pairs.
    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }

    /// Number of pairs skipped for `reason`.
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }
}

/// Straighten the shared boundary of every adjacent chart pair.
///
/// Pairs are visited in ascending id order and each sees the result of the
/// pairs before it. Chart adjacency and corner sets are left as they are.
///
/// # Errors
///
/// Returns [`MeshError::InvariantViolation`] if a re-partition loses
/// triangles or a chart of a linked pair has disappeared.
pub fn straighten_boundaries(
    charts: &mut ChartGraph,
    graph: &mut VertexGraph,
) -> Result<StraightenStats> {
    straighten_boundaries_internal(charts, graph, None)
}

pub(crate) fn straighten_boundaries_internal(
    charts: &mut ChartGraph,
    graph: &mut VertexGraph,
    progress: Option<(&Progress, usize, usize)>,
) -> Result<StraightenStats> {
    let pairs = charts.adjacent_pairs();
    let mut stats = StraightenStats {
        pairs: pairs.len(),
        ..Default::default()
    };

    for (i, &(a, b)) in pairs.iter().enumerate() {
        match straighten_pair(charts, graph, a, b)? {
            StraightenOutcome::Straightened => {
                trace!("straightened {:?} | {:?}", a, b);
                stats.straightened += 1;
            }
            StraightenOutcome::Skipped(reason) => {
                trace!("skipped {:?} | {:?}: {:?}", a, b, reason);
                *stats.skipped.entry(reason).or_default() += 1;
            }
        }
        if let Some((p, step, total)) = progress {
            p.report_sub(i + 1, pairs.len(), step, total, "Straightening boundaries");
        }
    }

    debug!(
        "straightening done: {} pairs, {} straightened, {} skipped",
        stats.pairs,
        stats.straightened,
        stats.total_skipped()
    );
    Ok(stats)
}

/// Try to replace the shared boundary of charts `a` and `b` with the
/// shortest path between their shared corners.
///
/// # Errors
///
/// Returns [`MeshError::InvariantViolation`] if either chart is missing or
/// the two sides of the new path do not account for every triangle.
pub fn straighten_pair(
    charts: &mut ChartGraph,
    graph: &mut VertexGraph,
    a: ChartId,
    b: ChartId,
) -> Result<StraightenOutcome> {
    use StraightenOutcome::Skipped;

    let (Some(ca), Some(cb)) = (charts.chart(a), charts.chart(b)) else {
        return Err(MeshError::InvariantViolation(format!(
            "linked charts {:?} and {:?} are not both live",
            a, b
        )));
    };

    if ca.num_triangles() <= 1 || cb.num_triangles() <= 1 {
        return Ok(Skipped(SkipReason::SingleTriangle));
    }

    let shared: BTreeSet<VertexEdge> = ca.boundary.intersection(&cb.boundary).copied().collect();
    match shared.len() {
        0 => return Ok(Skipped(SkipReason::NoSharedBoundary)),
        1 => return Ok(Skipped(SkipReason::SingleSharedEdge)),
        _ => {}
    }
    let shared_vertices = edge_vertices(&shared);

    let shared_corners: Vec<VertexId> = ca
        .corners
        .intersection(&cb.corners)
        .filter(|v| shared_vertices.contains(v))
        .copied()
        .collect();
    let (start, end) = match *shared_corners.as_slice() {
        [start, end] => (start, end),
        [start] => match trace_shared_chain(&shared, start) {
            Some(end) => (start, end),
            None => return Ok(Skipped(SkipReason::ChainTraceFailed)),
        },
        _ => return Ok(Skipped(SkipReason::AmbiguousCorners)),
    };

    // The path may not touch the outer boundary of the pair.
    let outer: BTreeSet<VertexEdge> =
        ca.boundary.symmetric_difference(&cb.boundary).copied().collect();
    let stop = edge_vertices(&outer);

    let combined: Vec<FaceId> = ca.triangles.iter().chain(&cb.triangles).copied().collect();
    let region: BTreeSet<VertexId> = combined.iter().flat_map(|&f| charts.face(f)).collect();

    let options = PathOptions::default().within(&region).avoiding(&stop);
    let Some(path) = astar_path(graph, start, end, &options) else {
        return Ok(Skipped(SkipReason::NoPath));
    };

    let path_vertices: BTreeSet<VertexId> = path.vertices().iter().copied().collect();
    if path_vertices == shared_vertices {
        return Ok(Skipped(SkipReason::AlreadyStraight));
    }

    let path_edges: BTreeSet<VertexEdge> = path.edges().collect();
    let boundary_a = reroute(&ca.boundary, &shared, &path_edges);
    let boundary_b = reroute(&cb.boundary, &shared, &path_edges);
    if boundary_a.is_empty() || boundary_b.is_empty() {
        return Ok(Skipped(SkipReason::EmptyBoundary));
    }

    let verts_a = edge_vertices(&boundary_a);
    let verts_b = edge_vertices(&boundary_b);
    let fence: BTreeSet<VertexId> = verts_a
        .iter()
        .chain(&verts_b)
        .chain(&path_vertices)
        .copied()
        .collect();

    let side_a = side_vertices(graph, &verts_a, &verts_b, &path_vertices, &fence, &region);
    let side_b = side_vertices(graph, &verts_b, &verts_a, &path_vertices, &fence, &region);

    let mut tris_a = Vec::new();
    let mut tris_b = Vec::new();
    for &f in &combined {
        let tri = charts.face(f);
        if tri.iter().all(|v| side_a.contains(v)) {
            tris_a.push(f);
        } else if tri.iter().all(|v| side_b.contains(v)) {
            tris_b.push(f);
        } else {
            return Ok(Skipped(SkipReason::UnassignedTriangle));
        }
    }
    if tris_a.is_empty() || tris_b.is_empty() {
        return Ok(Skipped(SkipReason::EmptySide));
    }
    if tris_a.len() + tris_b.len() != combined.len() {
        return Err(MeshError::InvariantViolation(format!(
            "straightening {:?}/{:?} split {} triangles into {} + {}",
            a,
            b,
            combined.len(),
            tris_a.len(),
            tris_b.len()
        )));
    }

    // Tags on every side of a moved triangle follow the triangle.
    let mut citing: BTreeMap<VertexEdge, Vec<ChartId>> = BTreeMap::new();
    for (id, tris) in [(a, &tris_a), (b, &tris_b)] {
        for &f in tris {
            for edge in triangle_edges(&charts.face(f)) {
                let ids = citing.entry(edge).or_default();
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }
    for (edge, ids) in &citing {
        graph.replace_tags(*edge, &[a, b], ids);
    }

    commit(charts, a, tris_a, boundary_a)?;
    commit(charts, b, tris_b, boundary_b)?;
    Ok(StraightenOutcome::Straightened)
}

fn commit(
    charts: &mut ChartGraph,
    id: ChartId,
    triangles: Vec<FaceId>,
    boundary: BTreeSet<VertexEdge>,
) -> Result<()> {
    let chart = charts.chart_mut(id).ok_or_else(|| {
        MeshError::InvariantViolation(format!("chart {:?} vanished while straightening", id))
    })?;
    chart.triangles = triangles;
    chart.boundary = boundary;
    Ok(())
}

/// `boundary` with the `old` shared run swapped for `new`.
fn reroute(
    boundary: &BTreeSet<VertexEdge>,
    old: &BTreeSet<VertexEdge>,
    new: &BTreeSet<VertexEdge>,
) -> BTreeSet<VertexEdge> {
    let kept: BTreeSet<VertexEdge> = boundary.symmetric_difference(old).copied().collect();
    kept.symmetric_difference(new).copied().collect()
}

/// Vertices on one side of the new path: its own boundary, the path, and
/// everything flooded from the boundary without reaching the other side.
fn side_vertices(
    graph: &VertexGraph,
    own: &BTreeSet<VertexId>,
    other: &BTreeSet<VertexId>,
    path: &BTreeSet<VertexId>,
    fence: &BTreeSet<VertexId>,
    region: &BTreeSet<VertexId>,
) -> BTreeSet<VertexId> {
    let seeds: BTreeSet<VertexId> = own.difference(path).copied().collect();
    let reachable: BTreeSet<VertexId> = region.difference(other).copied().collect();

    let mut side = flood_interior(graph, &seeds, fence, &reachable);
    side.extend(seeds);
    side.extend(path.iter().copied());
    side
}

/// Depth-first walk from `seeds` through vertices of `region` that are not
/// on `fence`. Returns the vertices reached, seeds excluded.
pub(crate) fn flood_interior(
    graph: &VertexGraph,
    seeds: &BTreeSet<VertexId>,
    fence: &BTreeSet<VertexId>,
    region: &BTreeSet<VertexId>,
) -> BTreeSet<VertexId> {
    let mut interior = BTreeSet::new();
    let mut stack: Vec<VertexId> = seeds.iter().copied().collect();

    while let Some(u) = stack.pop() {
        for (n, _) in graph.neighbors(u) {
            if region.contains(&n) && !fence.contains(&n) && interior.insert(n) {
                stack.push(n);
            }
        }
    }

    interior
}

/// Walk the shared edges from `start` and return the far end of the chain.
///
/// Gives up (`None`) unless the edges form one simple open chain with
/// `start` at one end.
pub(crate) fn trace_shared_chain(
    shared: &BTreeSet<VertexEdge>,
    start: VertexId,
) -> Option<VertexId> {
    let mut incident: BTreeMap<VertexId, Vec<VertexEdge>> = BTreeMap::new();
    for &edge in shared {
        for v in edge.vertices() {
            incident.entry(v).or_default().push(edge);
        }
    }
    if incident.get(&start).map_or(0, Vec::len) != 1 {
        return None;
    }

    let mut used = BTreeSet::new();
    let mut current = start;
    loop {
        let edges = incident.get(&current)?;
        let mut open = edges.iter().filter(|e| !used.contains(*e));
        let Some(&edge) = open.next() else {
            break;
        };
        if open.next().is_some() {
            return None;
        }
        used.insert(edge);
        current = edge.opposite(current)?;
    }

    (used.len() == shared.len() && current != start).then_some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::simplify::chart_graph::Chart;
    use crate::algo::simplify::merge::merged_boundary;
    use crate::mesh::test_meshes::grid;

    //  6 - 7 - 8
    //  | / | / |
    //  3 - 4 - 5
    //  | / | / |
    //  0 - 1 - 2
    //
    // f0 [0,1,4]  f1 [0,4,3]  f2 [1,2,5]  f3 [1,5,4]
    // f4 [3,4,7]  f5 [3,7,6]  f6 [4,5,8]  f7 [4,8,7]

    fn v(i: usize) -> VertexId {
        VertexId::new(i)
    }

    fn e(a: usize, b: usize) -> VertexEdge {
        VertexEdge::new(v(a), v(b))
    }

    fn faces(ids: &[usize]) -> Vec<FaceId> {
        ids.iter().map(|&f| FaceId::new(f)).collect()
    }

    fn two_charts(
        faces_a: &[usize],
        faces_b: &[usize],
        corners: &[usize],
    ) -> (ChartGraph, VertexGraph, ChartId, ChartId) {
        let mesh = grid(2);
        let mut graph = VertexGraph::build(&mesh);
        let mut charts = ChartGraph::new(&mesh, &graph);
        for id in charts.chart_ids() {
            charts.remove(id);
        }

        let corners: BTreeSet<VertexId> = corners.iter().map(|&i| v(i)).collect();
        let mut ids = Vec::new();
        for list in [faces_a, faces_b] {
            let boundary = list.iter().fold(BTreeSet::new(), |acc, &f| {
                merged_boundary(&acc, &triangle_edges(&mesh.triangle(FaceId::new(f))))
            });
            let id = charts.insert(Chart::new(faces(list), boundary, corners.clone()));
            for &f in list {
                for edge in triangle_edges(&mesh.triangle(FaceId::new(f))) {
                    graph.retag(edge, &[ChartId::new(f)], id);
                }
            }
            ids.push(id);
        }
        charts.link(ids[0], ids[1]);

        (charts, graph, ids[0], ids[1])
    }

    /// Shared boundary runs 1-5-4-7; the straight run is 1-4-7.
    fn zigzag(corners: &[usize]) -> (ChartGraph, VertexGraph, ChartId, ChartId) {
        two_charts(&[0, 1, 4, 5, 3], &[2, 6, 7], corners)
    }

    #[test]
    fn test_straighten_zigzag() {
        let (mut charts, mut graph, a, b) = zigzag(&[1, 7]);

        let outcome = straighten_pair(&mut charts, &mut graph, a, b).unwrap();
        assert_eq!(outcome, StraightenOutcome::Straightened);

        let ca = charts.chart(a).unwrap();
        let cb = charts.chart(b).unwrap();
        assert_eq!(ca.triangles(), faces(&[0, 1, 4, 5]).as_slice());
        assert_eq!(cb.triangles(), faces(&[3, 2, 6, 7]).as_slice());

        let expected: BTreeSet<VertexEdge> =
            [e(0, 1), e(0, 3), e(3, 6), e(6, 7), e(1, 4), e(4, 7)].into();
        assert_eq!(ca.boundary(), &expected);
        assert!(cb.boundary().contains(&e(1, 4)));
        assert!(!cb.boundary().contains(&e(1, 5)));

        assert!(charts.validate_partition().is_ok());
        assert_eq!(graph.tags(e(1, 5)), &[b]);
        assert_eq!(graph.tags(e(1, 4)), &[a, b]);
    }

    #[test]
    fn test_single_corner_traces_chain() {
        let (mut charts, mut graph, a, b) = zigzag(&[1]);

        let outcome = straighten_pair(&mut charts, &mut graph, a, b).unwrap();
        assert_eq!(outcome, StraightenOutcome::Straightened);
        assert_eq!(charts.chart(a).unwrap().num_triangles(), 4);
        assert_eq!(charts.chart(b).unwrap().num_triangles(), 4);
    }

    #[test]
    fn test_already_straight_is_noop() {
        let (mut charts, mut graph, a, b) = two_charts(&[0, 1, 4, 5], &[2, 3, 6, 7], &[1, 7]);
        let before_a = charts.chart(a).unwrap().clone();
        let before_b = charts.chart(b).unwrap().clone();

        let outcome = straighten_pair(&mut charts, &mut graph, a, b).unwrap();
        assert_eq!(outcome, StraightenOutcome::Skipped(SkipReason::AlreadyStraight));
        assert_eq!(charts.chart(a).unwrap(), &before_a);
        assert_eq!(charts.chart(b).unwrap(), &before_b);
    }

    #[test]
    fn test_straightening_is_idempotent() {
        let (mut charts, mut graph, _, _) = zigzag(&[1, 7]);

        let first = straighten_boundaries(&mut charts, &mut graph).unwrap();
        assert_eq!(first.pairs, 1);
        assert_eq!(first.straightened, 1);

        let second = straighten_boundaries(&mut charts, &mut graph).unwrap();
        assert_eq!(second.straightened, 0);
        assert_eq!(second.skipped_for(SkipReason::AlreadyStraight), 1);
    }

    #[test]
    fn test_skip_reasons() {
        let (mut charts, mut graph, a, b) = two_charts(&[0, 1], &[2, 3], &[1, 4]);
        assert_eq!(
            straighten_pair(&mut charts, &mut graph, a, b).unwrap(),
            StraightenOutcome::Skipped(SkipReason::SingleSharedEdge)
        );

        let (mut charts, mut graph, a, b) = two_charts(&[0], &[3], &[]);
        assert_eq!(
            straighten_pair(&mut charts, &mut graph, a, b).unwrap(),
            StraightenOutcome::Skipped(SkipReason::SingleTriangle)
        );

        let (mut charts, mut graph, a, b) = zigzag(&[]);
        assert_eq!(
            straighten_pair(&mut charts, &mut graph, a, b).unwrap(),
            StraightenOutcome::Skipped(SkipReason::AmbiguousCorners)
        );

        // Corner 5 sits mid-chain, so the chain cannot be traced from it.
        let (mut charts, mut graph, a, b) = zigzag(&[5]);
        assert_eq!(
            straighten_pair(&mut charts, &mut graph, a, b).unwrap(),
            StraightenOutcome::Skipped(SkipReason::ChainTraceFailed)
        );
    }

    #[test]
    fn test_missing_chart_is_an_error() {
        let (mut charts, mut graph, a, b) = zigzag(&[1, 7]);
        charts.remove(b);
        assert!(matches!(
            straighten_pair(&mut charts, &mut graph, a, b),
            Err(MeshError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_trace_shared_chain() {
        let chain: BTreeSet<VertexEdge> = [e(0, 1), e(1, 2), e(2, 3)].into();
        assert_eq!(trace_shared_chain(&chain, v(0)), Some(v(3)));
        assert_eq!(trace_shared_chain(&chain, v(3)), Some(v(0)));
        assert_eq!(trace_shared_chain(&chain, v(1)), None);
        assert_eq!(trace_shared_chain(&chain, v(9)), None);

        let cycle: BTreeSet<VertexEdge> = [e(0, 1), e(1, 2), e(2, 0)].into();
        assert_eq!(trace_shared_chain(&cycle, v(0)), None);

        let branch: BTreeSet<VertexEdge> = [e(0, 1), e(1, 2), e(1, 3)].into();
        assert_eq!(trace_shared_chain(&branch, v(0)), None);

        let split: BTreeSet<VertexEdge> = [e(0, 1), e(5, 6)].into();
        assert_eq!(trace_shared_chain(&split, v(0)), None);
    }

    #[test]
    fn test_flood_interior() {
        let graph = VertexGraph::build(&grid(2));
        let ring: BTreeSet<VertexId> = [0, 1, 2, 3, 5, 6, 7, 8].into_iter().map(v).collect();
        let all: BTreeSet<VertexId> = (0..9).map(v).collect();
        let seeds: BTreeSet<VertexId> = [v(0)].into();

        let interior = flood_interior(&graph, &seeds, &ring, &all);
        assert_eq!(interior, BTreeSet::from([v(4)]));

        let without_center: BTreeSet<VertexId> =
            all.iter().copied().filter(|&x| x != v(4)).collect();
        assert!(flood_interior(&graph, &seeds, &ring, &without_center).is_empty());
    }
}
