//! Error types for sander.
//!
//! This module defines all error types used throughout the library.
//!
//! Degenerate configurations met while simplifying (a merge that would leave
//! too few corners, a boundary pair with no straighter path) are not errors:
//! the stages skip them and count them in their statistics. The variants here
//! cover invalid input, failed solves and corrupted chart state.

use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh operations.
#[derive(Error, Debug)]
pub enum MeshError {
    /// A triangle references a vertex outside its batch.
    #[error("batch {batch}, face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The batch index.
        batch: usize,
        /// The face index within the batch.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A chart boundary does not form a single simple cycle.
    #[error("chart {chart} boundary is not a simple cycle: {details}")]
    NonSimpleBoundary {
        /// The raw chart id.
        chart: usize,
        /// Description of the defect.
        details: String,
    },

    /// The harmonic system of a chart could not be factorized.
    #[error("chart {chart} produced a singular parameterization system")]
    SingularSystem {
        /// The raw chart id.
        chart: usize,
    },

    /// Algorithm failed to converge.
    #[error("algorithm failed to converge after {iterations} iterations")]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: usize,
    },

    /// Chart state no longer satisfies the partition invariants.
    ///
    /// This indicates a logic defect, never an expected degenerate case.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Whether this error is a per-chart parameterization failure that the
    /// pipeline may recover from by leaving the chart without UVs.
    pub fn is_chart_local(&self) -> bool {
        matches!(
            self,
            MeshError::NonSimpleBoundary { .. }
                | MeshError::SingularSystem { .. }
                | MeshError::ConvergenceFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_param_message() {
        let err = MeshError::invalid_param("stop_threshold", -1.0, "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid parameter: stop_threshold = -1 (must be positive)"
        );
    }

    #[test]
    fn test_chart_local_classification() {
        assert!(MeshError::SingularSystem { chart: 3 }.is_chart_local());
        assert!(MeshError::NonSimpleBoundary {
            chart: 1,
            details: "vertex V(4) has boundary degree 3".into(),
        }
        .is_chart_local());
        assert!(!MeshError::InvariantViolation("duplicate triangle".into()).is_chart_local());
    }
}
