//! Per-chart UV coordinate storage.
//!
//! A vertex on the border between charts gets one UV per chart, so UVs are
//! stored per chart rather than on the shared vertex array.

use std::collections::BTreeMap;

use nalgebra::Point2;

use crate::mesh::VertexId;

/// UV coordinates of the vertices of one chart.
///
/// # Example
///
/// ```
/// use sander::algo::parameterize::UVMap;
/// use sander::mesh::VertexId;
/// use nalgebra::Point2;
///
/// let mut uv = UVMap::new();
/// uv.set(VertexId::new(4), Point2::new(0.0, 1.0));
/// assert_eq!(uv.get(VertexId::new(4)), Some(Point2::new(0.0, 1.0)));
/// assert_eq!(uv.get(VertexId::new(5)), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UVMap {
    coords: BTreeMap<VertexId, Point2<f64>>,
}

impl UVMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// UV of a vertex, if it belongs to the chart.
    #[inline]
    pub fn get(&self, v: VertexId) -> Option<Point2<f64>> {
        self.coords.get(&v).copied()
    }

    /// Set the UV of a vertex.
    #[inline]
    pub fn set(&mut self, v: VertexId, uv: Point2<f64>) {
        self.coords.insert(v, uv);
    }

    /// Whether `v` has a UV.
    #[inline]
    pub fn contains(&self, v: VertexId) -> bool {
        self.coords.contains_key(&v)
    }

    /// Number of vertices with a UV.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Whether no vertex has a UV.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Iterate in vertex id order.
    pub fn iter(&self) -> impl Iterator<Item = (VertexId, Point2<f64>)> + '_ {
        self.coords.iter().map(|(&v, &uv)| (v, uv))
    }
}
