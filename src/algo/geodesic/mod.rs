//! Shortest paths over the vertex adjacency graph.
//!
//! Paths run along mesh edges, weighted by Euclidean edge length, which
//! approximates geodesics on the surface. The search can be confined to a
//! vertex subset and kept away from blocked vertices, which is how chart
//! boundaries get re-routed without leaving the two charts involved.
//!
//! # Example
//!
//! ```
//! use sander::algo::geodesic::{astar_path, PathOptions};
//! use sander::mesh::{weld, MeshBatch, VertexGraph, VertexId};
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
//! let mesh = weld(&[batch]).unwrap();
//! let graph = VertexGraph::build(&mesh);
//!
//! let options = PathOptions::default();
//! let path = astar_path(&graph, VertexId::new(0), VertexId::new(2), &options).unwrap();
//! assert_eq!(path.vertices(), &[VertexId::new(0), VertexId::new(2)]);
//! ```

mod astar;

pub use astar::{astar_path, PathOptions};

use crate::mesh::{VertexEdge, VertexId};

/// A vertex path with its total edge length.
#[derive(Debug, Clone, PartialEq)]
pub struct GeodesicPath {
    vertices: Vec<VertexId>,
    length: f64,
}

impl GeodesicPath {
    pub(crate) fn new(vertices: Vec<VertexId>, length: f64) -> Self {
        Self { vertices, length }
    }

    /// The vertices from source to target, both included.
    #[inline]
    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    /// Total length along the path.
    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// First vertex.
    #[inline]
    pub fn source(&self) -> Option<VertexId> {
        self.vertices.first().copied()
    }

    /// Last vertex.
    #[inline]
    pub fn target(&self) -> Option<VertexId> {
        self.vertices.last().copied()
    }

    /// Consecutive vertex pairs as edges.
    pub fn edges(&self) -> impl Iterator<Item = VertexEdge> + '_ {
        self.vertices.windows(2).map(|w| VertexEdge::new(w[0], w[1]))
    }
}
