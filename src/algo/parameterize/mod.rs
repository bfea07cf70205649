//! Per-chart UV parameterization.
//!
//! Each chart is flattened independently onto the unit disk: the boundary
//! cycle is spread around the unit circle by arc length and interior vertices
//! are solved from a harmonic (edge-length weighted Laplacian) system. Charts
//! do not need to agree on the UVs of vertices they share, so every chart gets
//! its own [`UVMap`].
//!
//! # Example
//!
//! ```
//! use sander::algo::parameterize::{parameterize_chart, LinearSolver};
//! use sander::algo::simplify::ChartGraph;
//! use sander::mesh::{weld, ChartId, MeshBatch, VertexGraph};
//! use nalgebra::Point3;
//!
//! let batch = MeshBatch::new(
//!     vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
//!     vec![[0, 1, 2]],
//! );
//! let mesh = weld(&[batch]).unwrap();
//! let graph = VertexGraph::build(&mesh);
//! let charts = ChartGraph::new(&mesh, &graph);
//!
//! let uv = parameterize_chart(&charts, &graph, ChartId::new(0), &LinearSolver::Direct).unwrap();
//! for (_, p) in uv.iter() {
//!     assert!((p.coords.norm() - 1.0).abs() < 1e-12);
//! }
//! ```
//!
//! # References
//!
//! - Sander, P., Snyder, J., Gortler, S., & Hoppe, H. (2001). "Texture mapping
//!   progressive meshes." ACM SIGGRAPH.
//! - Floater, M. (1997). "Parametrization and smooth approximation of surface
//!   triangulations." Computer Aided Geometric Design.

mod harmonic;
mod sparse;
mod uv;

pub use harmonic::{arc_fractions, boundary_cycle, embed_boundary, parameterize_chart};
pub use sparse::{conjugate_gradient, CsrMatrix};
pub use uv::UVMap;

/// How the interior system of a chart is solved.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LinearSolver {
    /// Dense LU factorization, shared by the u and v channels.
    #[default]
    Direct,
    /// Jacobi-preconditioned conjugate gradient on the sparse system.
    ConjugateGradient {
        /// Iteration cap per channel.
        max_iterations: usize,
        /// Relative residual at which a solve stops.
        tolerance: f64,
    },
}

impl LinearSolver {
    /// Conjugate gradient with 1000 iterations and a `1e-10` tolerance.
    pub fn conjugate_gradient() -> Self {
        LinearSolver::ConjugateGradient {
            max_iterations: 1000,
            tolerance: 1e-10,
        }
    }
}
