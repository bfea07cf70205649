//! Harmonic parameterization of a single chart.
//!
//! The boundary cycle is pinned to the unit circle with spacing proportional
//! to arc length, and every interior vertex is placed at the edge-length
//! weighted average of its neighbors. The interior positions solve
//!
//! ```text
//! sum_j w_ij (x_j - x_i) = 0,    w_ij = |p_i - p_j|
//! ```
//!
//! where neighbors on the boundary move to the right-hand side. The matrix is
//! the weighted graph Laplacian restricted to interior vertices, so it is
//! symmetric and shared by the u and v channels.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

use nalgebra::{DVector, Point2};

use crate::algo::simplify::ChartGraph;
use crate::error::{MeshError, Result};
use crate::mesh::{edge_vertices, triangle_edges, ChartId, VertexEdge, VertexGraph, VertexId};

use super::sparse::{conjugate_gradient, CsrMatrix};
use super::{LinearSolver, UVMap};

/// Order the boundary edges into one closed vertex cycle.
///
/// The cycle starts at the smallest vertex id and leaves it along its
/// smallest boundary edge.
///
/// # Errors
///
/// Returns [`MeshError::NonSimpleBoundary`] if the boundary is empty, a vertex
/// has boundary degree other than 2, or the edges form several loops.
pub fn boundary_cycle(chart: ChartId, boundary: &BTreeSet<VertexEdge>) -> Result<Vec<VertexId>> {
    let non_simple = |details: String| MeshError::NonSimpleBoundary {
        chart: chart.index(),
        details,
    };

    let mut incident: BTreeMap<VertexId, Vec<VertexEdge>> = BTreeMap::new();
    for &edge in boundary {
        for v in edge.vertices() {
            incident.entry(v).or_default().push(edge);
        }
    }

    if let Some((v, edges)) = incident.iter().find(|(_, edges)| edges.len() != 2) {
        return Err(non_simple(format!("vertex {:?} has boundary degree {}", v, edges.len())));
    }
    let Some((&start, first)) = incident.iter().next() else {
        return Err(non_simple("boundary is empty".to_string()));
    };

    let mut cycle = vec![start];
    let mut current = start;
    let mut edge = first[0];
    loop {
        let next = edge
            .opposite(current)
            .ok_or_else(|| non_simple(format!("edge {:?} does not touch {:?}", edge, current)))?;
        if next == start {
            break;
        }
        let Some(&[e0, e1]) = incident.get(&next).map(Vec::as_slice) else {
            return Err(non_simple(format!("vertex {:?} lost its boundary edges", next)));
        };
        edge = if e0 == edge { e1 } else { e0 };
        cycle.push(next);
        current = next;
    }

    if cycle.len() != incident.len() {
        return Err(non_simple(format!(
            "boundary splits into several loops ({} of {} vertices on the first)",
            cycle.len(),
            incident.len()
        )));
    }
    Ok(cycle)
}

/// Fraction of the total cycle length taken by each edge `cycle[k] -> cycle[k + 1]`
/// (the last one closing back to `cycle[0]`).
///
/// A cycle of zero length is split evenly.
pub fn arc_fractions(cycle: &[VertexId], graph: &VertexGraph) -> Vec<f64> {
    let n = cycle.len();
    let lengths: Vec<f64> = (0..n)
        .map(|k| graph.edge_length(VertexEdge::new(cycle[k], cycle[(k + 1) % n])))
        .collect();
    let total: f64 = lengths.iter().sum();

    if total > 0.0 {
        lengths.iter().map(|l| l / total).collect()
    } else {
        vec![1.0 / n as f64; n]
    }
}

/// Place the cycle on the unit circle: `cycle[0]` at angle 0, each following
/// vertex at `2π` times the arc-length fraction travelled so far, mapped to
/// `(sin θ, cos θ)`.
pub fn embed_boundary(cycle: &[VertexId], graph: &VertexGraph) -> Vec<(VertexId, Point2<f64>)> {
    let fractions = arc_fractions(cycle, graph);
    let mut travelled = 0.0;
    cycle
        .iter()
        .zip(&fractions)
        .map(|(&v, &f)| {
            let (sin, cos) = (TAU * travelled).sin_cos();
            travelled += f;
            (v, Point2::new(sin, cos))
        })
        .collect()
}

/// Compute UVs for every vertex of chart `id`.
///
/// Charts without interior vertices only get the boundary embedding.
///
/// # Errors
///
/// - [`MeshError::NonSimpleBoundary`] if the boundary is not one simple cycle
/// - [`MeshError::SingularSystem`] if the direct solve fails
/// - [`MeshError::ConvergenceFailed`] if conjugate gradient does not converge
/// - [`MeshError::InvariantViolation`] if `id` is not a live chart
pub fn parameterize_chart(
    charts: &ChartGraph,
    graph: &VertexGraph,
    id: ChartId,
    solver: &LinearSolver,
) -> Result<UVMap> {
    let chart = charts
        .chart(id)
        .ok_or_else(|| MeshError::InvariantViolation(format!("chart {:?} does not exist", id)))?;

    let cycle = boundary_cycle(id, chart.boundary())?;
    let mut uv = UVMap::new();
    for (v, p) in embed_boundary(&cycle, graph) {
        uv.set(v, p);
    }

    let edges: BTreeSet<VertexEdge> = chart
        .triangles()
        .iter()
        .flat_map(|&f| triangle_edges(&charts.face(f)))
        .collect();
    let border = edge_vertices(chart.boundary());
    let interior: Vec<VertexId> = edge_vertices(&edges)
        .into_iter()
        .filter(|v| !border.contains(v))
        .collect();
    if interior.is_empty() {
        return Ok(uv);
    }

    let row_of: BTreeMap<VertexId, usize> =
        interior.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    let mut rows = vec![BTreeMap::new(); interior.len()];
    let mut rhs_u = DVector::zeros(interior.len());
    let mut rhs_v = DVector::zeros(interior.len());

    for &edge in &edges {
        let w = graph.edge_length(edge);
        for (from, to) in [(edge.a(), edge.b()), (edge.b(), edge.a())] {
            let Some(&i) = row_of.get(&from) else {
                continue;
            };
            *rows[i].entry(i).or_insert(0.0) += w;
            match row_of.get(&to) {
                Some(&j) => *rows[i].entry(j).or_insert(0.0) -= w,
                None => {
                    if let Some(p) = uv.get(to) {
                        rhs_u[i] += w * p.x;
                        rhs_v[i] += w * p.y;
                    }
                }
            }
        }
    }

    let system = CsrMatrix::from_rows(&rows);
    let (us, vs) = solve(&system, &rhs_u, &rhs_v, solver, id)?;
    for (i, &v) in interior.iter().enumerate() {
        uv.set(v, Point2::new(us[i], vs[i]));
    }
    Ok(uv)
}

fn solve(
    system: &CsrMatrix,
    rhs_u: &DVector<f64>,
    rhs_v: &DVector<f64>,
    solver: &LinearSolver,
    chart: ChartId,
) -> Result<(DVector<f64>, DVector<f64>)> {
    let singular = || MeshError::SingularSystem { chart: chart.index() };

    let (us, vs) = match *solver {
        LinearSolver::Direct => {
            let lu = system.to_dense().lu();
            let us = lu.solve(rhs_u).ok_or_else(singular)?;
            let vs = lu.solve(rhs_v).ok_or_else(singular)?;
            (us, vs)
        }
        LinearSolver::ConjugateGradient {
            max_iterations,
            tolerance,
        } => (
            conjugate_gradient(system, rhs_u, max_iterations, tolerance)?,
            conjugate_gradient(system, rhs_v, max_iterations, tolerance)?,
        ),
    };

    if us.iter().chain(vs.iter()).all(|x| x.is_finite()) {
        Ok((us, vs))
    } else {
        Err(singular())
    }
}
