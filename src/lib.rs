//! # Sander
//!
//! Chart-based mesh simplification.
//!
//! Sander partitions a triangle mesh into charts: connected, nearly planar
//! regions with compact outlines. It merges adjacent triangles greedily under
//! a geometric cost, straightens the boundaries between neighboring charts and
//! computes a harmonic UV parameterization for each chart.
//!
//! ## Features
//!
//! - **Welding**: any number of input batches merged into one deduplicated vertex array
//! - **Type-safe indices**: `VertexId`, `FaceId` and `ChartId` over 16, 32 or 64-bit integers
//! - **Greedy chart merging**: priority queue with lazy invalidation and a log-relative stop
//! - **Boundary straightening**: constrained A* re-routing of shared chart boundaries
//! - **Harmonic parameterization**: dense LU or preconditioned conjugate gradient
//!
//! ## Quick Start
//!
//! ```
//! use sander::prelude::*;
//! use nalgebra::Point3;
//!
//! let batch = MeshBatch::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(1.0, 1.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ],
//!     vec![[0, 1, 2], [0, 2, 3]],
//! );
//!
//! let result = simplify(&[batch], &SimplifyOptions::default()).unwrap();
//! println!("{} charts", result.charts.len());
//!
//! for chart in &result.charts {
//!     println!("chart {:?}: {} triangles", chart.id, chart.chart.num_triangles());
//!     if let Some(uv) = &chart.uv {
//!         for (v, p) in uv.iter() {
//!             println!("  {:?} -> ({:.3}, {:.3})", v, p.x, p.y);
//!         }
//!     }
//! }
//! ```
//!
//! ## Stages
//!
//! Each stage is usable on its own:
//!
//! ```
//! use sander::algo::simplify::{merge_charts, recompute_corners, ChartGraph, SimplifyOptions};
//! use sander::mesh::{weld, MeshBatch, VertexGraph};
//! use nalgebra::Point3;
//!
//! # let batch = MeshBatch::new(
//! #     vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
//! #     vec![[0, 1, 2]],
//! # );
//! let mut mesh = weld(&[batch]).unwrap();
//! mesh.normalize(1000.0);
//!
//! let mut graph = VertexGraph::build(&mesh);
//! let mut charts = ChartGraph::new(&mesh, &graph);
//! let stats = merge_charts(&mut charts, &mut graph, &SimplifyOptions::default()).unwrap();
//! recompute_corners(&mut charts, &graph);
//!
//! assert_eq!(stats.accepted, 0);
//! assert_eq!(charts.num_charts(), 1);
//! ```
//!
//! ## Logging
//!
//! Stages log through the [`log`](https://docs.rs/log) facade; install any
//! logger (such as `env_logger`) to see them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use sander::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::parameterize::{LinearSolver, UVMap};
    pub use crate::algo::simplify::{simplify, ChartedMesh, SimplifyOptions, SimplifyStats};
    pub use crate::algo::Progress;
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{weld, ChartId, FaceId, MeshBatch, MeshIndex, VertexId, WeldedMesh};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_tetrahedron() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];

        let faces = vec![
            [0, 2, 1], // bottom
            [0, 1, 3], // front
            [1, 2, 3], // right
            [2, 0, 3], // left
        ];

        let options = SimplifyOptions::default().with_stop_threshold(1.0);
        let result = simplify(&[MeshBatch::new(vertices, faces)], &options).unwrap();

        assert_eq!(result.stats.welded_vertices, 4);
        assert_eq!(result.stats.triangles, 4);
        assert_eq!(result.chart_of_face.len(), 4);

        let owned: usize = result.charts.iter().map(|c| c.chart.num_triangles()).sum();
        assert_eq!(owned, 4);
        assert!(!result.charts.is_empty());
    }
}
