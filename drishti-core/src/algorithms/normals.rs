//! Per-point surface normal estimation.
//!
//! For every point the sphere neighborhood is fetched from the octree, the
//! 3×3 covariance of the centered neighborhood is accumulated, and the
//! eigenvector of the smallest eigenvalue becomes the point's normal. The
//! sign is arbitrary but stable within a run; consumers compare normals with
//! the acute-angle rule rather than relying on orientation.

use nalgebra::{Matrix3, Vector3};

use crate::algorithms::octree::{Kernel, Octree};
use crate::core::types::{Point, Vector};
use crate::error::Result;

/// A neighborhood below this size cannot define a plane.
const MIN_NEIGHBORS: usize = 3;

/// Estimate one normal per input point, aligned by index.
///
/// `octree` must index exactly `points`. Points with fewer than three
/// neighbors inside `radius` (the query point included) get the zero vector,
/// meaning "no valid normal".
pub fn estimate_normals(points: &[Point], octree: &Octree, radius: f64) -> Result<Vec<Vector>> {
    let mut normals = Vec::with_capacity(points.len());
    for p in points {
        let neighbors = octree.search_neighbors(p, radius, Kernel::Sphere)?;
        normals.push(neighborhood_normal(points, &neighbors));
    }
    Ok(normals)
}

fn neighborhood_normal(points: &[Point], neighbors: &[usize]) -> Vector {
    if neighbors.len() < MIN_NEIGHBORS {
        return Vector::ZERO;
    }

    let mut mean = Vector3::zeros();
    for &i in neighbors {
        mean += Vector3::new(points[i].x, points[i].y, points[i].z);
    }
    mean /= neighbors.len() as f64;

    let mut covariance = Matrix3::zeros();
    for &i in neighbors {
        let v = Vector3::new(points[i].x, points[i].y, points[i].z) - mean;
        covariance += v * v.transpose();
    }

    let eig = covariance.symmetric_eigen();
    let mut smallest = 0;
    for k in 1..3 {
        if eig.eigenvalues[k] < eig.eigenvalues[smallest] {
            smallest = k;
        }
    }
    let n = eig.eigenvectors.column(smallest);
    Vector::new(n[0], n[1], n[2]).normalized()
}
