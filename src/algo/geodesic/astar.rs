//! A* search for shortest edge paths.
//!
//! Edge weights are Euclidean lengths and the heuristic is the straight-line
//! distance to the target, which never overestimates, so the first time the
//! target is settled its path is optimal.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use crate::mesh::geometry::distance;
use crate::mesh::{VertexGraph, VertexId};

use super::GeodesicPath;

/// Restrictions on the vertices a path may use.
///
/// The source and target are always allowed.
#[derive(Debug, Clone, Default)]
pub struct PathOptions<'a> {
    /// If set, only these vertices may appear on the path.
    pub within: Option<&'a BTreeSet<VertexId>>,

    /// Vertices the path must not pass through.
    pub avoid: Option<&'a BTreeSet<VertexId>>,
}

impl<'a> PathOptions<'a> {
    /// Confine the path to a vertex subset.
    pub fn within(mut self, allowed: &'a BTreeSet<VertexId>) -> Self {
        self.within = Some(allowed);
        self
    }

    /// Keep the path off a set of vertices.
    pub fn avoiding(mut self, blocked: &'a BTreeSet<VertexId>) -> Self {
        self.avoid = Some(blocked);
        self
    }

    fn admits(&self, v: VertexId) -> bool {
        self.within.is_none_or(|s| s.contains(&v)) && self.avoid.is_none_or(|s| !s.contains(&v))
    }
}

/// Entry in the A* open set.
#[derive(Debug, Clone)]
struct OpenEntry {
    vertex: VertexId,
    /// Path length from the source.
    cost: f64,
    /// `cost` plus the heuristic.
    estimate: f64,
}

// Min-heap on estimate, then vertex id so ties resolve the same way every run.
impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

/// Find the shortest edge path from `source` to `target`.
///
/// Returns `None` if the target cannot be reached under `options`.
///
/// # Example
///
/// ```no_run
/// use std::collections::BTreeSet;
/// use sander::algo::geodesic::{astar_path, PathOptions};
/// use sander::mesh::{VertexGraph, VertexId};
///
/// # fn demo(graph: &VertexGraph, region: &BTreeSet<VertexId>, walls: &BTreeSet<VertexId>) {
/// let options = PathOptions::default().within(region).avoiding(walls);
/// if let Some(path) = astar_path(graph, VertexId::new(0), VertexId::new(9), &options) {
///     println!("{} edges, length {}", path.vertices().len() - 1, path.length());
/// }
/// # }
/// ```
pub fn astar_path(
    graph: &VertexGraph,
    source: VertexId,
    target: VertexId,
    options: &PathOptions<'_>,
) -> Option<GeodesicPath> {
    let n = graph.num_vertices();
    if source.index() >= n || target.index() >= n {
        return None;
    }

    let goal = *graph.position(target);
    let heuristic = |v: VertexId| distance(graph.position(v), &goal);

    // Best known cost and predecessor per reached vertex.
    let mut best: HashMap<VertexId, (f64, Option<VertexId>)> = HashMap::new();
    let mut settled: BTreeSet<VertexId> = BTreeSet::new();
    let mut open = BinaryHeap::new();

    best.insert(source, (0.0, None));
    open.push(OpenEntry {
        vertex: source,
        cost: 0.0,
        estimate: heuristic(source),
    });

    while let Some(entry) = open.pop() {
        let u = entry.vertex;

        // Skip stale entries (a shorter path was already found).
        if !settled.insert(u) {
            continue;
        }

        if u == target {
            return Some(reconstruct(&best, target, entry.cost));
        }

        for (v, length) in graph.neighbors(u) {
            if settled.contains(&v) || (v != target && !options.admits(v)) {
                continue;
            }
            let cost = entry.cost + length;
            let improves = best.get(&v).is_none_or(|&(known, _)| cost < known);
            if improves {
                best.insert(v, (cost, Some(u)));
                open.push(OpenEntry {
                    vertex: v,
                    cost,
                    estimate: cost + heuristic(v),
                });
            }
        }
    }

    None
}

fn reconstruct(
    best: &HashMap<VertexId, (f64, Option<VertexId>)>,
    target: VertexId,
    length: f64,
) -> GeodesicPath {
    let mut vertices = vec![target];
    let mut current = target;
    while let Some(&(_, Some(pred))) = best.get(&current) {
        vertices.push(pred);
        current = pred;
    }
    vertices.reverse();
    GeodesicPath::new(vertices, length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes::{grid, single_triangle};

    fn v(i: usize) -> VertexId {
        VertexId::new(i)
    }

    #[test]
    fn test_path_to_self() {
        let graph = VertexGraph::build(&single_triangle());
        let path = astar_path(&graph, v(1), v(1), &PathOptions::default()).unwrap();
        assert_eq!(path.vertices(), &[v(1)]);
        assert_eq!(path.length(), 0.0);
        assert_eq!(path.edges().count(), 0);
    }

    #[test]
    fn test_single_edge_path() {
        let graph = VertexGraph::build(&single_triangle());
        let path = astar_path(&graph, v(0), v(1), &PathOptions::default()).unwrap();
        assert_eq!(path.vertices(), &[v(0), v(1)]);
        assert!((path.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_grid_diagonal_is_shortest() {
        // 3x3 grid: vertex 0 at (0,0), vertex 15 at (3,3), diagonals run (i,j)-(i+1,j+1).
        let graph = VertexGraph::build(&grid(3));
        let path = astar_path(&graph, v(0), v(15), &PathOptions::default()).unwrap();
        assert_eq!(path.vertices(), &[v(0), v(5), v(10), v(15)]);
        assert!((path.length() - 3.0 * 2.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_avoiding_forces_detour() {
        let graph = VertexGraph::build(&grid(3));
        let blocked: BTreeSet<VertexId> = [v(5)].into_iter().collect();
        let options = PathOptions::default().avoiding(&blocked);
        let path = astar_path(&graph, v(0), v(15), &options).unwrap();

        assert!(!path.vertices().contains(&v(5)));
        assert_eq!(path.source(), Some(v(0)));
        assert_eq!(path.target(), Some(v(15)));
        assert!(path.length() > 3.0 * 2.0_f64.sqrt());
    }

    #[test]
    fn test_within_subset() {
        let graph = VertexGraph::build(&grid(2));
        // Bottom row and right column only; 1-5 is a diagonal.
        let allowed: BTreeSet<VertexId> = [0, 1, 2, 5, 8].into_iter().map(v).collect();
        let options = PathOptions::default().within(&allowed);
        let path = astar_path(&graph, v(0), v(8), &options).unwrap();

        assert_eq!(path.vertices(), &[v(0), v(1), v(5), v(8)]);
        assert!((path.length() - (2.0 + 2.0_f64.sqrt())).abs() < 1e-9);
    }

    #[test]
    fn test_target_allowed_even_if_blocked() {
        let graph = VertexGraph::build(&single_triangle());
        let blocked: BTreeSet<VertexId> = [v(2)].into_iter().collect();
        let options = PathOptions::default().avoiding(&blocked);
        let path = astar_path(&graph, v(0), v(2), &options).unwrap();
        assert_eq!(path.vertices(), &[v(0), v(2)]);
    }

    #[test]
    fn test_unreachable() {
        let graph = VertexGraph::build(&grid(2));
        // The center and the whole middle column cut 0 off from 2.
        let blocked: BTreeSet<VertexId> = [1, 4, 7].into_iter().map(v).collect();
        let options = PathOptions::default().avoiding(&blocked);
        assert!(astar_path(&graph, v(0), v(2), &options).is_none());

        assert!(astar_path(&graph, v(0), v(99), &PathOptions::default()).is_none());
    }
}
