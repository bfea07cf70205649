//! Greedy chart merging.
//!
//! Every linked chart pair is a merge candidate keyed by the cost of the
//! chart the pair would form. Candidates are popped cheapest first; entries
//! naming a chart that has since been merged away are discarded on pop rather
//! than removed from the heap when the chart dies.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};

use log::{debug, trace};
use nalgebra::Point3;

use crate::algo::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::geometry::{perimeter, plane_fit_error};
use crate::mesh::{edge_vertices, triangle_edges, ChartId, VertexEdge, VertexGraph, VertexId};

use super::chart_graph::{count_chains, Chart, ChartGraph};
use super::SimplifyOptions;

/// A vertex is a corner when its edges carry at least this many chart ids.
pub const CORNER_CHART_COUNT: usize = 3;

/// Counters collected by [`merge_charts`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeStats {
    /// Number of candidates ever pushed.
    pub candidates: usize,
    /// Merges performed.
    pub accepted: usize,
    /// Candidates rejected because the merged chart would have too few corners.
    pub rejected_corners: usize,
    /// Popped candidates naming an already merged chart.
    pub stale: usize,
    /// Largest cost computed for any candidate.
    pub max_cost: f64,
    /// Whether the log-relative threshold ended the pass.
    pub stopped_by_threshold: bool,
}

/// A chart pair waiting in the merge queue.
#[derive(Debug, Clone)]
struct MergeCandidate {
    cost: f64,
    /// Insertion order, breaks cost ties.
    seq: u64,
    a: ChartId,
    b: ChartId,
}

// Min-heap on (cost, seq).
impl PartialEq for MergeCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeCandidate {}

impl PartialOrd for MergeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of merge candidates with a running cost maximum.
struct MergeQueue {
    heap: BinaryHeap<MergeCandidate>,
    next_seq: u64,
    max_cost: f64,
}

impl MergeQueue {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            max_cost: 0.0,
        }
    }

    fn push(&mut self, a: ChartId, b: ChartId, cost: f64) {
        self.max_cost = self.max_cost.max(cost);
        self.heap.push(MergeCandidate {
            cost,
            seq: self.next_seq,
            a,
            b,
        });
        self.next_seq += 1;
    }

    fn pop(&mut self) -> Option<MergeCandidate> {
        self.heap.pop()
    }
}

/// Boundary of the chart formed by merging charts with boundaries `a` and `b`.
pub fn merged_boundary(a: &BTreeSet<VertexEdge>, b: &BTreeSet<VertexEdge>) -> BTreeSet<VertexEdge> {
    a.symmetric_difference(b).copied().collect()
}

/// Cost of a chart with the given boundary: squared perimeter plus the planar
/// fit error of the boundary points.
///
/// Returns `None` for an empty boundary.
pub fn boundary_cost(boundary: &BTreeSet<VertexEdge>, graph: &VertexGraph) -> Option<f64> {
    if boundary.is_empty() {
        return None;
    }

    let length = perimeter(boundary.iter().map(|&e| graph.segment(e)));

    // Each edge contributes both endpoints.
    let points: Vec<Point3<f64>> = boundary
        .iter()
        .flat_map(|e| e.vertices())
        .map(|v| *graph.position(v))
        .collect();

    Some(length * length + plane_fit_error(&points))
}

/// Cost of merging two charts, or `None` if the merged chart has no boundary.
pub fn merge_cost(a: &Chart, b: &Chart, graph: &VertexGraph) -> Option<f64> {
    boundary_cost(&merged_boundary(&a.boundary, &b.boundary), graph)
}

/// Boundary vertices of `boundary` that touch at least
/// [`CORNER_CHART_COUNT`] distinct charts in `graph`.
pub fn boundary_corners(
    boundary: &BTreeSet<VertexEdge>,
    graph: &VertexGraph,
) -> BTreeSet<VertexId> {
    edge_vertices(boundary)
        .into_iter()
        .filter(|&v| graph.is_corner(v, CORNER_CHART_COUNT))
        .collect()
}

/// `log(1 + cost) / log(1 + max_cost)`, or 0 when nothing has cost yet.
#[inline]
pub fn log_relative_cost(cost: f64, max_cost: f64) -> f64 {
    if max_cost <= 0.0 {
        return 0.0;
    }
    cost.ln_1p() / max_cost.ln_1p()
}

/// Greedily merge adjacent charts.
///
/// Pops the cheapest candidate pair, skips it if either chart is gone or if
/// the merged chart would have fewer than `options.min_corners` corners, and
/// stops the whole pass once the log-relative cost of a candidate exceeds
/// `options.stop_threshold`. Accepted merges allocate a new chart id, re-tag
/// the vertex edges of both consumed charts and queue the new chart against
/// its neighbors.
///
/// # Errors
///
/// Returns [`MeshError::InvariantViolation`] if a live chart disappears
/// mid-merge.
pub fn merge_charts(
    charts: &mut ChartGraph,
    graph: &mut VertexGraph,
    options: &SimplifyOptions,
) -> Result<MergeStats> {
    merge_charts_internal(charts, graph, options, None)
}

pub(crate) fn merge_charts_internal(
    charts: &mut ChartGraph,
    graph: &mut VertexGraph,
    options: &SimplifyOptions,
    progress: Option<(&Progress, usize, usize)>,
) -> Result<MergeStats> {
    let mut stats = MergeStats::default();
    let mut queue = MergeQueue::new();

    for (a, b) in charts.adjacent_pairs() {
        let (Some(ca), Some(cb)) = (charts.chart(a), charts.chart(b)) else {
            continue;
        };
        if let Some(cost) = merge_cost(ca, cb, graph) {
            queue.push(a, b, cost);
            stats.candidates += 1;
        }
    }
    debug!("merge queue built: {} candidates, max cost {:.3}", stats.candidates, queue.max_cost);

    let max_merges = charts.num_charts().saturating_sub(1);

    while let Some(candidate) = queue.pop() {
        let MergeCandidate { cost, a, b, .. } = candidate;

        let (Some(ca), Some(cb)) = (charts.chart(a), charts.chart(b)) else {
            stats.stale += 1;
            continue;
        };

        let boundary = merged_boundary(&ca.boundary, &cb.boundary);
        let corners = boundary_corners(&boundary, graph);
        if corners.len() < options.min_corners {
            trace!("merge {:?} + {:?} rejected: {} corners", a, b, corners.len());
            stats.rejected_corners += 1;
            continue;
        }

        let relative = log_relative_cost(cost, queue.max_cost);
        if relative > options.stop_threshold {
            debug!("merge threshold reached: cost {:.3}, relative {:.4}", cost, relative);
            stats.stopped_by_threshold = true;
            break;
        }

        let mut neighbors: BTreeSet<ChartId> =
            charts.neighbors(a).chain(charts.neighbors(b)).collect();
        neighbors.remove(&a);
        neighbors.remove(&b);

        let (Some(ca), Some(cb)) = (charts.remove(a), charts.remove(b)) else {
            return Err(MeshError::InvariantViolation(format!(
                "charts {:?} and {:?} vanished during merge",
                a, b
            )));
        };

        let mut triangles = ca.triangles;
        triangles.extend(cb.triangles);

        let merged = charts.insert(Chart::new(triangles, boundary, corners));
        trace!("merged {:?} + {:?} -> {:?} (cost {:.3})", a, b, merged, cost);

        let Some(chart) = charts.chart(merged) else {
            return Err(MeshError::InvariantViolation(format!("merged chart {:?} missing", merged)));
        };

        // Every edge of a consumed triangle may carry one of the old ids.
        let old = [a, b];
        for &f in &chart.triangles {
            for edge in triangle_edges(&charts.face(f)) {
                graph.retag(edge, &old, merged);
            }
        }

        let mut links = Vec::new();
        for other in neighbors {
            let Some(oc) = charts.chart(other) else {
                continue;
            };
            let common: BTreeSet<VertexEdge> =
                chart.boundary.intersection(&oc.boundary).copied().collect();
            if common.is_empty() || count_chains(&common) > 1 {
                continue;
            }
            links.push((other, merge_cost(chart, oc, graph)));
        }

        for (other, cost) in links {
            charts.link(merged, other);
            if let Some(cost) = cost {
                queue.push(merged, other, cost);
                stats.candidates += 1;
            }
        }

        stats.accepted += 1;
        if let Some((p, step, total)) = progress {
            p.report_sub(stats.accepted, max_merges, step, total, "Merging charts");
        }
    }

    stats.max_cost = queue.max_cost;
    Ok(stats)
}

/// Recompute the corner set of every chart from the current vertex tags.
pub fn recompute_corners(charts: &mut ChartGraph, graph: &VertexGraph) {
    for id in charts.chart_ids() {
        if let Some(chart) = charts.chart_mut(id) {
            chart.corners = boundary_corners(&chart.boundary, graph);
        }
    }
}
