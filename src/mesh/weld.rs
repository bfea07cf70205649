//! Vertex welding across input batches.
//!
//! A scene usually arrives as several independent (positions, triangles)
//! batches, one per bound geometry primitive. Welding concatenates them into
//! one global vertex space, collapses vertices with bitwise-identical
//! positions into a single entry and remaps the triangle indices.
//!
//! [`WeldedMesh::normalize`] then moves the mesh into a fixed bounding range
//! so geometric error values are commensurable across meshes of different
//! physical scale.

use std::collections::HashMap;

use nalgebra::Point3;

use super::index::{FaceId, VertexId};
use crate::error::{MeshError, Result};

/// One batch of input geometry.
///
/// Triangle indices refer into this batch's own `positions`.
#[derive(Debug, Clone, Default)]
pub struct MeshBatch {
    /// Vertex positions.
    pub positions: Vec<Point3<f32>>,
    /// Triangles as `[v0, v1, v2]` indices into `positions`.
    pub triangles: Vec<[usize; 3]>,
}

impl MeshBatch {
    /// Create a batch from positions and triangles.
    pub fn new(positions: Vec<Point3<f32>>, triangles: Vec<[usize; 3]>) -> Self {
        Self { positions, triangles }
    }
}

/// A triangle mesh with a single deduplicated vertex array.
#[derive(Debug, Clone, Default)]
pub struct WeldedMesh {
    positions: Vec<Point3<f32>>,
    triangles: Vec<[VertexId; 3]>,
    input_vertices: usize,
}

impl WeldedMesh {
    /// Build a welded mesh directly from already unique positions.
    ///
    /// No deduplication is performed; indices are validated.
    pub fn from_parts(positions: Vec<Point3<f32>>, triangles: &[[usize; 3]]) -> Result<Self> {
        let input_vertices = positions.len();
        let triangles = triangles
            .iter()
            .enumerate()
            .map(|(fi, tri)| {
                remap_triangle(0, fi, tri, |vi| positions.get(vi).map(|_| VertexId::new(vi)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            positions,
            triangles,
            input_vertices,
        })
    }

    /// Get the welded vertex positions.
    #[inline]
    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    /// Get the remapped triangles.
    #[inline]
    pub fn triangles(&self) -> &[[VertexId; 3]] {
        &self.triangles
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> Point3<f32> {
        self.positions[v.index()]
    }

    /// Get the vertices of a triangle.
    #[inline]
    pub fn triangle(&self, f: FaceId) -> [VertexId; 3] {
        self.triangles[f.index()]
    }

    /// Number of welded vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.triangles.len()
    }

    /// Number of vertices across all input batches before welding.
    #[inline]
    pub fn num_input_vertices(&self) -> usize {
        self.input_vertices
    }

    /// Check if the mesh has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Iterate over face ids.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> {
        (0..self.triangles.len()).map(FaceId::new)
    }

    /// Translate so every axis starts at 0 and scale uniformly so the largest
    /// coordinate equals `extent`.
    ///
    /// A mesh with no extent (all vertices at one point) is only translated.
    pub fn normalize(&mut self, extent: f32) {
        if self.positions.is_empty() {
            return;
        }

        let mut min = self.positions[0];
        for p in &self.positions {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
        }

        let mut max = 0.0_f32;
        for p in &mut self.positions {
            p.x -= min.x;
            p.y -= min.y;
            p.z -= min.z;
            max = max.max(p.x).max(p.y).max(p.z);
        }

        if max > 0.0 {
            let scale = extent / max;
            for p in &mut self.positions {
                p.coords *= scale;
            }
        }
    }
}

/// Weld all batches into one mesh.
///
/// Vertices are deduplicated by exact position (`-0.0` and `0.0` are the same
/// position); welded vertices keep the order of their first occurrence.
/// An empty input produces an empty mesh.
///
/// # Errors
///
/// Returns [`MeshError::InvalidVertexIndex`] if a triangle references a
/// vertex outside its batch.
///
/// # Example
///
/// ```
/// use sander::mesh::{weld, MeshBatch};
/// use nalgebra::Point3;
///
/// let a = MeshBatch::new(
///     vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
///     vec![[0, 1, 2]],
/// );
/// let b = MeshBatch::new(
///     vec![Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
///     vec![[0, 1, 2]],
/// );
///
/// let mesh = weld(&[a, b]).unwrap();
/// assert_eq!(mesh.num_vertices(), 4);
/// assert_eq!(mesh.num_faces(), 2);
/// ```
pub fn weld(batches: &[MeshBatch]) -> Result<WeldedMesh> {
    let input_vertices: usize = batches.iter().map(|b| b.positions.len()).sum();
    let input_faces: usize = batches.iter().map(|b| b.triangles.len()).sum();

    let mut positions = Vec::with_capacity(input_vertices);
    let mut triangles = Vec::with_capacity(input_faces);
    let mut lookup: HashMap<[u32; 3], VertexId> = HashMap::with_capacity(input_vertices);

    for (bi, batch) in batches.iter().enumerate() {
        // Welded id of every vertex in this batch.
        let remap: Vec<VertexId> = batch
            .positions
            .iter()
            .map(|p| {
                *lookup.entry(position_key(p)).or_insert_with(|| {
                    positions.push(*p);
                    VertexId::new(positions.len() - 1)
                })
            })
            .collect();

        for (fi, tri) in batch.triangles.iter().enumerate() {
            triangles.push(remap_triangle(bi, fi, tri, |vi| remap.get(vi).copied())?);
        }
    }

    Ok(WeldedMesh {
        positions,
        triangles,
        input_vertices,
    })
}

fn remap_triangle<F>(
    batch: usize,
    face: usize,
    tri: &[usize; 3],
    lookup: F,
) -> Result<[VertexId; 3]>
where
    F: Fn(usize) -> Option<VertexId>,
{
    let mut out = [VertexId::invalid(); 3];
    for (slot, &vi) in out.iter_mut().zip(tri) {
        *slot = lookup(vi).ok_or(MeshError::InvalidVertexIndex {
            batch,
            face,
            vertex: vi,
        })?;
    }
    Ok(out)
}

#[inline]
fn position_key(p: &Point3<f32>) -> [u32; 3] {
    // Adding 0.0 turns -0.0 into 0.0.
    [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()]
}
