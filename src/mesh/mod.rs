//! Core mesh data structures.
//!
//! This module provides the welded triangle mesh and the vertex adjacency
//! graph that every simplification stage reads from.
//!
//! # Overview
//!
//! Input arrives as one or more [`MeshBatch`]es. [`weld`] merges them into a
//! single [`WeldedMesh`] with deduplicated vertices, and [`VertexGraph`]
//! records which triangles (later, which charts) use each vertex-to-vertex
//! edge.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a welded vertex
//! - [`FaceId`] - Identifies an input triangle
//! - [`ChartId`] - Identifies a chart
//!
//! # Construction
//!
//! ```
//! use sander::mesh::{weld, MeshBatch, VertexGraph};
//! use nalgebra::Point3;
//!
//! let batch = MeshBatch::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.5, 1.0, 0.0),
//!     ],
//!     vec![[0, 1, 2]],
//! );
//!
//! let mesh = weld(&[batch]).unwrap();
//! let graph = VertexGraph::build(&mesh);
//! assert_eq!(graph.num_edges(), 3);
//! ```

pub mod geometry;
mod index;
mod vertex_graph;
mod weld;

pub use index::{ChartId, FaceId, MeshIndex, VertexId};
pub use vertex_graph::{edge_vertices, triangle_edges, VertexEdge, VertexGraph};
pub use weld::{weld, MeshBatch, WeldedMesh};
