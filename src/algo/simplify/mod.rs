//! Chart-based mesh simplification.
//!
//! The mesh is partitioned into charts: connected, nearly planar groups of
//! triangles with compact outlines. Every triangle starts as its own chart;
//! adjacent charts are merged greedily, cheapest first, where the cost of a
//! merge is the squared perimeter of the merged chart plus how far its
//! boundary is from planar. Afterwards the shared boundaries between charts
//! are straightened and every chart is flattened onto the unit disk.
//!
//! # Pipeline
//!
//! 1. [`weld`](crate::mesh::weld) the input batches and normalize the extent
//! 2. build the [`VertexGraph`] and one chart per triangle
//! 3. [`merge_charts`] until the log-relative cost passes `stop_threshold`
//! 4. [`recompute_corners`] from the final vertex tags
//! 5. [`straighten_boundaries`] of adjacent chart pairs
//! 6. [`parameterize_chart`] for every chart
//!
//! # Example
//!
//! ```
//! use sander::algo::simplify::{simplify, SimplifyOptions};
//! use sander::mesh::MeshBatch;
//! use nalgebra::Point3;
//!
//! // A flat 4x4 grid of quads, each split in two.
//! let n = 4;
//! let mut positions = Vec::new();
//! let mut triangles = Vec::new();
//! for j in 0..=n {
//!     for i in 0..=n {
//!         positions.push(Point3::new(i as f32, j as f32, 0.0));
//!     }
//! }
//! for j in 0..n {
//!     for i in 0..n {
//!         let v = j * (n + 1) + i;
//!         triangles.push([v, v + 1, v + n + 2]);
//!         triangles.push([v, v + n + 2, v + n + 1]);
//!     }
//! }
//!
//! let options = SimplifyOptions::default().with_stop_threshold(1.0);
//! let result = simplify(&[MeshBatch::new(positions, triangles)], &options).unwrap();
//!
//! assert!(result.charts.len() < 32);
//! assert_eq!(result.chart_of_face.len(), 32);
//! ```
//!
//! # References
//!
//! - Sander, P., Snyder, J., Gortler, S., & Hoppe, H. (2001). "Texture mapping
//!   progressive meshes." ACM SIGGRAPH.

mod chart_graph;
mod merge;
mod straighten;

pub use chart_graph::{Chart, ChartGraph};
pub use merge::{
    boundary_corners, boundary_cost, log_relative_cost, merge_charts, merge_cost, merged_boundary,
    recompute_corners, MergeStats, CORNER_CHART_COUNT,
};
pub use straighten::{
    straighten_boundaries, straighten_pair, SkipReason, StraightenOutcome, StraightenStats,
};

use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use super::parameterize::{parameterize_chart, LinearSolver, UVMap};
use super::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::geometry::triangle_area;
use crate::mesh::{weld, ChartId, FaceId, MeshBatch, VertexGraph, WeldedMesh};

/// Number of top-level steps reported to a [`Progress`].
const STEPS: usize = 6;

/// Options for [`simplify`].
#[derive(Debug, Clone)]
pub struct SimplifyOptions {
    /// Merging stops once `ln(1 + cost) / ln(1 + max_cost)` of the cheapest
    /// remaining candidate exceeds this value. At 1.0 or above merging only
    /// stops when no candidate is left.
    pub stop_threshold: f64,

    /// A merge is rejected if the merged chart would have fewer corners.
    pub min_corners: usize,

    /// The welded mesh is scaled so its largest coordinate equals this.
    pub normalized_extent: f32,

    /// Whether to run boundary straightening.
    pub straighten: bool,

    /// Whether to compute UVs.
    pub parameterize: bool,

    /// Solver for the interior UV system.
    pub solver: LinearSolver,

    /// Fail the whole run if a chart cannot be parameterized, instead of
    /// leaving that chart without UVs.
    pub strict_parameterization: bool,

    /// Parameterize charts in parallel.
    pub parallel: bool,
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        Self {
            stop_threshold: 0.9,
            min_corners: 3,
            normalized_extent: 1000.0,
            straighten: true,
            parameterize: true,
            solver: LinearSolver::Direct,
            strict_parameterization: false,
            parallel: false,
        }
    }
}

impl SimplifyOptions {
    /// Set the log-relative merge cutoff.
    pub fn with_stop_threshold(mut self, threshold: f64) -> Self {
        self.stop_threshold = threshold;
        self
    }

    /// Set the minimum corner count of a merged chart.
    pub fn with_min_corners(mut self, corners: usize) -> Self {
        self.min_corners = corners;
        self
    }

    /// Set the normalized mesh extent.
    pub fn with_normalized_extent(mut self, extent: f32) -> Self {
        self.normalized_extent = extent;
        self
    }

    /// Enable or disable boundary straightening.
    pub fn with_straighten(mut self, straighten: bool) -> Self {
        self.straighten = straighten;
        self
    }

    /// Enable or disable parameterization.
    pub fn with_parameterize(mut self, parameterize: bool) -> Self {
        self.parameterize = parameterize;
        self
    }

    /// Set the linear solver.
    pub fn with_solver(mut self, solver: LinearSolver) -> Self {
        self.solver = solver;
        self
    }

    /// Make parameterization failures fatal.
    pub fn with_strict_parameterization(mut self, strict: bool) -> Self {
        self.strict_parameterization = strict;
        self
    }

    /// Enable or disable parallel parameterization.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check that every option is in range.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidParameter`] naming the first bad option.
    pub fn validate(&self) -> Result<()> {
        if !self.stop_threshold.is_finite() || self.stop_threshold <= 0.0 {
            return Err(MeshError::invalid_param(
                "stop_threshold",
                self.stop_threshold,
                "must be finite and positive",
            ));
        }
        if self.min_corners == 0 {
            return Err(MeshError::invalid_param(
                "min_corners",
                self.min_corners,
                "must be at least 1",
            ));
        }
        if !self.normalized_extent.is_finite() || self.normalized_extent <= 0.0 {
            return Err(MeshError::invalid_param(
                "normalized_extent",
                self.normalized_extent,
                "must be finite and positive",
            ));
        }
        if let LinearSolver::ConjugateGradient {
            max_iterations,
            tolerance,
        } = self.solver
        {
            if max_iterations == 0 {
                return Err(MeshError::invalid_param(
                    "max_iterations",
                    max_iterations,
                    "must be at least 1",
                ));
            }
            if !tolerance.is_finite() || tolerance <= 0.0 {
                return Err(MeshError::invalid_param(
                    "tolerance",
                    tolerance,
                    "must be finite and positive",
                ));
            }
        }
        Ok(())
    }
}

/// Counters from a whole [`simplify`] run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimplifyStats {
    /// Vertices across all input batches.
    pub input_vertices: usize,
    /// Vertices after welding.
    pub welded_vertices: usize,
    /// Triangles.
    pub triangles: usize,
    /// Connected components of the vertex graph.
    pub vertex_components: usize,
    /// Charts before merging (one per triangle).
    pub initial_charts: usize,
    /// Charts at the end.
    pub final_charts: usize,
    /// Connected components of the chart graph after merging.
    pub chart_components: usize,
    /// Merge pass counters.
    pub merge: MergeStats,
    /// Straightening pass counters.
    pub straighten: StraightenStats,
    /// Charts that received UVs.
    pub charts_parameterized: usize,
    /// Charts left without UVs.
    pub charts_failed: usize,
}

/// A chart of the result.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasChart {
    /// Id of the chart in the chart graph.
    pub id: ChartId,
    /// Triangles, boundary and corners.
    pub chart: Chart,
    /// UVs of the chart's vertices, if it was parameterized.
    pub uv: Option<UVMap>,
    /// Surface area in normalized coordinates.
    pub area: f64,
}

/// The welded mesh partitioned into charts.
#[derive(Debug, Clone)]
pub struct ChartedMesh {
    /// The welded, normalized mesh.
    pub mesh: WeldedMesh,
    /// Charts in ascending id order.
    pub charts: Vec<AtlasChart>,
    /// Index into `charts` for every triangle.
    pub chart_of_face: Vec<usize>,
    /// Run statistics.
    pub stats: SimplifyStats,
}

impl ChartedMesh {
    /// The chart owning triangle `f`.
    pub fn chart_for_face(&self, f: FaceId) -> Option<&AtlasChart> {
        self.chart_of_face.get(f.index()).and_then(|&i| self.charts.get(i))
    }
}

/// Weld `batches` and partition the result into parameterized charts.
///
/// An empty input yields an empty result.
///
/// # Errors
///
/// - [`MeshError::InvalidParameter`] if `options` fail validation
/// - [`MeshError::InvalidVertexIndex`] if a batch references a missing vertex
/// - [`MeshError::InvariantViolation`] if the chart partition gets corrupted
/// - a parameterization error if `strict_parameterization` is set
pub fn simplify(batches: &[MeshBatch], options: &SimplifyOptions) -> Result<ChartedMesh> {
    simplify_internal(batches, options, None)
}

/// [`simplify`] with progress reporting.
pub fn simplify_with_progress(
    batches: &[MeshBatch],
    options: &SimplifyOptions,
    progress: &Progress,
) -> Result<ChartedMesh> {
    simplify_internal(batches, options, Some(progress))
}

/// Run the pipeline on an already welded mesh.
///
/// # Errors
///
/// Fails like [`simplify`], except for the welding error.
pub fn simplify_welded(mesh: WeldedMesh, options: &SimplifyOptions) -> Result<ChartedMesh> {
    options.validate()?;
    run(mesh, options, None)
}

fn simplify_internal(
    batches: &[MeshBatch],
    options: &SimplifyOptions,
    progress: Option<&Progress>,
) -> Result<ChartedMesh> {
    options.validate()?;

    let start = Instant::now();
    let mesh = weld(batches)?;
    info!(
        "welded {} batches: {} -> {} vertices, {} triangles ({:?})",
        batches.len(),
        mesh.num_input_vertices(),
        mesh.num_vertices(),
        mesh.num_faces(),
        start.elapsed()
    );
    report(progress, 0, "Welding");

    run(mesh, options, progress)
}

fn run(
    mut mesh: WeldedMesh,
    options: &SimplifyOptions,
    progress: Option<&Progress>,
) -> Result<ChartedMesh> {
    let mut stats = SimplifyStats {
        input_vertices: mesh.num_input_vertices(),
        welded_vertices: mesh.num_vertices(),
        triangles: mesh.num_faces(),
        ..Default::default()
    };
    mesh.normalize(options.normalized_extent);

    let start = Instant::now();
    let mut graph = VertexGraph::build(&mesh);
    let mut charts = ChartGraph::new(&mesh, &graph);
    stats.initial_charts = charts.num_charts();
    stats.vertex_components = graph.connected_components();
    info!(
        "graphs built: {} edges, {} charts, {} components ({:?})",
        graph.num_edges(),
        charts.num_charts(),
        stats.vertex_components,
        start.elapsed()
    );
    report(progress, 1, "Building graphs");

    let start = Instant::now();
    stats.merge = merge::merge_charts_internal(
        &mut charts,
        &mut graph,
        options,
        progress.map(|p| (p, 2, STEPS)),
    )?;
    charts.validate_partition()?;
    info!(
        "merged {} pairs ({} rejected for corners), {} charts left ({:?})",
        stats.merge.accepted,
        stats.merge.rejected_corners,
        charts.num_charts(),
        start.elapsed()
    );
    report(progress, 2, "Merging charts");

    recompute_corners(&mut charts, &graph);
    stats.chart_components = charts.connected_components();
    debug!("corners recomputed, {} chart components", stats.chart_components);
    report(progress, 3, "Computing corners");

    if options.straighten {
        let start = Instant::now();
        stats.straighten = straighten::straighten_boundaries_internal(
            &mut charts,
            &mut graph,
            progress.map(|p| (p, 4, STEPS)),
        )?;
        charts.validate_partition()?;
        info!(
            "straightened {} of {} chart pairs ({:?})",
            stats.straighten.straightened,
            stats.straighten.pairs,
            start.elapsed()
        );
    }
    report(progress, 4, "Straightening boundaries");

    let ids = charts.chart_ids();
    let mut uvs: Vec<Option<UVMap>> = vec![None; ids.len()];
    if options.parameterize {
        let start = Instant::now();
        let solve = |&id: &ChartId| parameterize_chart(&charts, &graph, id, &options.solver);
        let results: Vec<Result<UVMap>> = if options.parallel {
            ids.par_iter().map(solve).collect()
        } else {
            ids.iter().map(solve).collect()
        };

        for ((slot, &id), result) in uvs.iter_mut().zip(&ids).zip(results) {
            match result {
                Ok(uv) => {
                    *slot = Some(uv);
                    stats.charts_parameterized += 1;
                }
                Err(err) if err.is_chart_local() && !options.strict_parameterization => {
                    warn!("chart {:?} left without UVs: {}", id, err);
                    stats.charts_failed += 1;
                }
                Err(err) => return Err(err),
            }
        }
        info!(
            "parameterized {} charts, {} failed ({:?})",
            stats.charts_parameterized,
            stats.charts_failed,
            start.elapsed()
        );
    }
    report(progress, 5, "Parameterizing charts");

    let owner = charts.chart_of_face()?;
    let mut atlas = Vec::with_capacity(ids.len());
    for (&id, uv) in ids.iter().zip(uvs) {
        let chart = charts
            .chart(id)
            .cloned()
            .ok_or_else(|| MeshError::InvariantViolation(format!("chart {:?} vanished", id)))?;
        let area = chart
            .triangles()
            .iter()
            .map(|&f| {
                let [a, b, c] = mesh.triangle(f).map(|v| mesh.position(v).cast::<f64>());
                triangle_area(&a, &b, &c)
            })
            .sum();
        atlas.push(AtlasChart { id, chart, uv, area });
    }

    // Chart ids ascend, so a binary search finds each owner's slot.
    let chart_of_face = owner
        .iter()
        .map(|id| {
            ids.binary_search(id).map_err(|_| {
                MeshError::InvariantViolation(format!("triangle owner {:?} is not live", id))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    stats.final_charts = atlas.len();
    info!("simplified {} triangles into {} charts", stats.triangles, stats.final_charts);
    report(progress, STEPS, "Done");

    Ok(ChartedMesh {
        mesh,
        charts: atlas,
        chart_of_face,
        stats,
    })
}

#[inline]
fn report(progress: Option<&Progress>, step: usize, message: &str) {
    if let Some(p) = progress {
        p.report(step, STEPS, message);
    }
}
