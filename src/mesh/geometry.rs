//! Geometric primitives used by the chart cost metric and the parameterizer.
//!
//! All functions are pure and operate on `f64` points.

use nalgebra::{Matrix3, Point3};

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (a - b).norm()
}

/// Total length of a set of segments.
pub fn perimeter<'a, It>(segments: It) -> f64
where
    It: IntoIterator<Item = (&'a Point3<f64>, &'a Point3<f64>)>,
{
    segments.into_iter().map(|(a, b)| distance(a, b)).sum()
}

/// Area of the triangle `(a, b, c)`.
#[inline]
pub fn triangle_area(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    (a - b).cross(&(a - c)).norm() * 0.5
}

/// Planar fit error of a point set.
///
/// Builds the scatter matrix `Z = Σ pᵢpᵢᵀ − m mᵀ / n` (with `m` the mean
/// point), takes the eigenvector of its smallest eigenvalue as the plane
/// normal `N`, places the plane at offset `d = −N·m / n` and returns the
/// square of the mean signed distance `mean(N·pᵢ) + d`.
///
/// Points lying on a plane through the origin of the normalized frame
/// (such as a flat mesh welded onto `z = 0`) score exactly zero.
pub fn plane_fit_error(points: &[Point3<f64>]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }

    let n = points.len() as f64;

    let mut scatter = Matrix3::zeros();
    let mut sum = nalgebra::Vector3::zeros();
    for p in points {
        let v = p.coords;
        scatter += v * v.transpose();
        sum += v;
    }
    let mean = sum / n;
    scatter -= mean * mean.transpose() / n;

    let eigen = scatter.symmetric_eigen();
    let mut min_index = 0;
    for i in 1..3 {
        if eigen.eigenvalues[i] < eigen.eigenvalues[min_index] {
            min_index = i;
        }
    }
    let normal = eigen.eigenvectors.column(min_index).into_owned();

    let offset = -normal.dot(&mean) / n;
    let mean_dist = points.iter().map(|p| normal.dot(&p.coords)).sum::<f64>() / n + offset;

    mean_dist * mean_dist
}
