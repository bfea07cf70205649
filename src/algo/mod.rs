//! Simplification algorithms.
//!
//! - **Simplify**: the chart pipeline (merge, corners, straightening)
//! - **Geodesics**: constrained A* over the vertex graph
//! - **Parameterization**: harmonic per-chart UVs
//!
//! Long-running entry points have a `_with_progress` variant taking a
//! [`Progress`] callback.

pub mod geodesic;
pub mod parameterize;
pub mod progress;
pub mod simplify;

pub use progress::Progress;
