//! End-to-end checks of the simplification pipeline.

use std::collections::BTreeSet;

use nalgebra::Point3;
use sander::algo::simplify::{simplify_welded, ChartedMesh};
use sander::mesh::VertexId;
use sander::prelude::*;

/// An `n x n` grid of unit quads split along one diagonal, lifted by `height`.
fn grid_batch<F>(n: usize, height: F) -> MeshBatch
where
    F: Fn(f32, f32) -> f32,
{
    let mut positions = Vec::new();
    let mut triangles = Vec::new();

    for j in 0..=n {
        for i in 0..=n {
            let (x, y) = (i as f32, j as f32);
            positions.push(Point3::new(x, y, height(x, y)));
        }
    }
    for j in 0..n {
        for i in 0..n {
            let v = j * (n + 1) + i;
            triangles.push([v, v + 1, v + n + 2]);
            triangles.push([v, v + n + 2, v + n + 1]);
        }
    }

    MeshBatch::new(positions, triangles)
}

fn flat_grid(n: usize) -> MeshBatch {
    grid_batch(n, |_, _| 0.0)
}

fn assert_partition(result: &ChartedMesh) {
    let n = result.mesh.num_faces();
    let mut owned: Vec<usize> = result
        .charts
        .iter()
        .flat_map(|c| c.chart.triangles().iter().map(|f| f.index()))
        .collect();
    owned.sort_unstable();
    assert_eq!(owned, (0..n).collect::<Vec<_>>());

    assert_eq!(result.chart_of_face.len(), n);
    for (f, &slot) in result.chart_of_face.iter().enumerate() {
        assert!(result.charts[slot].chart.triangles().contains(&FaceId::new(f)));
    }
}

/// Corners recomputed from triangle ownership alone.
fn corners_from_scratch(result: &ChartedMesh, slot: usize) -> BTreeSet<VertexId> {
    let chart = &result.charts[slot].chart;
    chart
        .boundary_vertices()
        .into_iter()
        .filter(|&v| {
            let touching: BTreeSet<usize> = result
                .mesh
                .triangles()
                .iter()
                .enumerate()
                .filter(|(_, tri)| tri.contains(&v))
                .map(|(f, _)| result.chart_of_face[f])
                .collect();
            touching.len() >= 3
        })
        .collect()
}

#[test]
fn test_flat_grid_merges() {
    let options = SimplifyOptions::default().with_stop_threshold(1.0);
    let result = simplify(&[flat_grid(4)], &options).unwrap();

    assert_eq!(result.stats.triangles, 32);
    assert_eq!(result.stats.welded_vertices, 25);
    assert!(result.charts.len() < 32);
    assert!(result.stats.merge.accepted > 0);
    assert_eq!(result.stats.initial_charts - result.stats.merge.accepted, result.charts.len());
    assert_partition(&result);
}

#[test]
fn test_corners_match_recomputation() {
    let options = SimplifyOptions::default()
        .with_stop_threshold(1.0)
        .with_straighten(false);
    let result = simplify(&[flat_grid(4)], &options).unwrap();

    for slot in 0..result.charts.len() {
        assert_eq!(
            result.charts[slot].chart.corners(),
            &corners_from_scratch(&result, slot),
            "chart {:?}",
            result.charts[slot].id
        );
    }
}

#[test]
fn test_single_triangle_short_circuits() {
    let batch = MeshBatch::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ],
        vec![[0, 1, 2]],
    );
    let result = simplify(&[batch], &SimplifyOptions::default()).unwrap();

    assert_eq!(result.charts.len(), 1);
    assert_eq!(result.stats.merge.accepted, 0);
    assert_eq!(result.stats.straighten.pairs, 0);

    let chart = &result.charts[0];
    assert_eq!(chart.chart.boundary_vertices().len(), 3);

    let uv = chart.uv.as_ref().unwrap();
    assert_eq!(uv.len(), 3);
    for (_, p) in uv.iter() {
        assert!((p.coords.norm() - 1.0).abs() < 1e-12);
    }
}

#[test]
fn test_uvs_stay_in_unit_disk() {
    let options = SimplifyOptions::default()
        .with_stop_threshold(1.0)
        .with_solver(LinearSolver::conjugate_gradient());
    let result = simplify(&[flat_grid(4)], &options).unwrap();

    assert_eq!(
        result.stats.charts_parameterized + result.stats.charts_failed,
        result.charts.len()
    );
    for chart in &result.charts {
        let Some(uv) = chart.uv.as_ref() else {
            continue;
        };
        let vertices: BTreeSet<VertexId> = chart
            .chart
            .triangles()
            .iter()
            .flat_map(|&f| result.mesh.triangle(f))
            .collect();
        assert_eq!(uv.len(), vertices.len());
        for (_, p) in uv.iter() {
            assert!(p.coords.norm() <= 1.0 + 1e-9);
        }
    }
}

#[test]
fn test_runs_are_deterministic() {
    let batch = grid_batch(6, |x, y| 0.4 * (x * 0.9).sin() + 0.3 * (y * 0.5).cos());
    let options = SimplifyOptions::default().with_stop_threshold(1.0);

    let first = simplify(std::slice::from_ref(&batch), &options).unwrap();
    let second = simplify(std::slice::from_ref(&batch), &options.with_parallel(true)).unwrap();

    assert_eq!(first.charts, second.charts);
    assert_eq!(first.chart_of_face, second.chart_of_face);
    assert_eq!(first.stats, second.stats);
    assert_partition(&first);
}

#[test]
fn test_weld_reproduces_positions() {
    // Two halves of a 2x2 grid, each carrying its own copy of the middle column.
    let full = flat_grid(2);
    let left = MeshBatch::new(
        full.positions.clone(),
        full.triangles.iter().copied().filter(|t| t.iter().all(|&v| v % 3 != 2)).collect(),
    );
    let right = MeshBatch::new(
        full.positions.clone(),
        full.triangles.iter().copied().filter(|t| t.iter().any(|&v| v % 3 == 2)).collect(),
    );
    let batches = [left, right];

    let mesh = weld(&batches).unwrap();
    assert_eq!(mesh.num_input_vertices(), 18);
    assert_eq!(mesh.num_vertices(), 9);
    assert_eq!(mesh.num_faces(), 8);

    let mut welded = mesh.triangles().iter();
    for batch in &batches {
        for tri in &batch.triangles {
            let out = welded.next().unwrap();
            for (&vi, &wv) in tri.iter().zip(out) {
                assert_eq!(mesh.position(wv), batch.positions[vi]);
            }
        }
    }
}

#[test]
fn test_empty_input() {
    let result = simplify(&[], &SimplifyOptions::default()).unwrap();
    assert!(result.charts.is_empty());
    assert!(result.chart_of_face.is_empty());
    assert_eq!(result.stats, SimplifyStats::default());

    let points_only = MeshBatch::new(vec![Point3::new(1.0, 2.0, 3.0)], Vec::new());
    let result = simplify(&[points_only], &SimplifyOptions::default()).unwrap();
    assert!(result.charts.is_empty());
    assert_eq!(result.stats.welded_vertices, 1);
}

#[test]
fn test_bad_index_is_reported() {
    let batches = [
        flat_grid(1),
        MeshBatch::new(vec![Point3::new(0.0, 0.0, 0.0)], vec![[0, 0, 7]]),
    ];
    let err = simplify(&batches, &SimplifyOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        MeshError::InvalidVertexIndex {
            batch: 1,
            face: 0,
            vertex: 7
        }
    ));
}

/// A normal triangle next to one collapsed onto the shared edge `0-1`.
///
/// The collapsed triangle keeps a single boundary edge, so its chart can
/// never be laid out on a disk.
fn collapsed_pair() -> WeldedMesh {
    WeldedMesh::from_parts(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ],
        &[[0, 1, 2], [0, 0, 1]],
    )
    .unwrap()
}

#[test]
fn test_open_chart_is_skipped_when_lenient() {
    let result = simplify_welded(collapsed_pair(), &SimplifyOptions::default()).unwrap();

    assert_eq!(result.charts.len(), 2);
    assert_eq!(result.stats.charts_parameterized, 1);
    assert_eq!(result.stats.charts_failed, 1);

    let good = result.chart_for_face(FaceId::<u32>::new(0)).unwrap();
    assert_eq!(good.uv.as_ref().map(|uv| uv.len()), Some(3));

    let open = result.chart_for_face(FaceId::<u32>::new(1)).unwrap();
    assert_eq!(open.chart.boundary().len(), 1);
    assert!(open.uv.is_none());
}

#[test]
fn test_open_chart_aborts_when_strict() {
    let strict = SimplifyOptions::default().with_strict_parameterization(true);
    let err = simplify_welded(collapsed_pair(), &strict).unwrap_err();
    assert!(err.is_chart_local());
    assert!(matches!(err, MeshError::NonSimpleBoundary { chart: 1, .. }));
}
