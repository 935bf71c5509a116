//! Characterized-object builder.
//!
//! Turns one bounded point cloud into a [`CharacterizedObject`]:
//!
//! 1. proximity clustering isolates the target — only the largest cluster
//!    survives, everything else is stray noise;
//! 2. a fresh octree and per-point normals are computed over the object;
//! 3. normal-consistency clustering segments the object into planar faces;
//! 4. each face gets its centroid, mean normal, and a bounding box in the
//!    frame whose +Z is the face normal.

use crate::algorithms::clustering::{cluster_by_normals, cluster_by_proximity};
use crate::algorithms::normals::estimate_normals;
use crate::algorithms::octree::Octree;
use crate::config::EngineConfig;
use crate::core::math::{mean, rotation_to_z};
use crate::core::types::{BBox, Point, Vector};
use crate::engine::object::{CharacterizedObject, Face};
use crate::error::{Error, Result};

/// Build a characterized object from a raw point cloud.
///
/// Fails with [`Error::NoObject`] when proximity clustering yields no
/// cluster at all (empty input included).
pub fn characterize(points: Vec<Point>, config: &EngineConfig) -> Result<CharacterizedObject> {
    if points.is_empty() {
        return Err(Error::NoObject);
    }

    let tree = Octree::build(&points, &config.octree);
    let partition = cluster_by_proximity(&points, &tree, &config.clustering)?;
    let largest = partition.largest().ok_or(Error::NoObject)?;

    let object_points: Vec<Point> = partition.clusters[largest]
        .iter()
        .map(|&i| points[i])
        .collect();
    log::debug!(
        "Isolated object: {} of {} points ({} clusters total)",
        object_points.len(),
        points.len(),
        partition.clusters.len()
    );

    let tree = Octree::build(&object_points, &config.octree);
    let normals = estimate_normals(&object_points, &tree, config.faces.normal_radius)?;
    let face_partition = cluster_by_normals(&object_points, &normals, &tree, &config.faces)?;

    let mut faces: Vec<Face> = face_partition
        .clusters
        .iter()
        .filter_map(|members| build_face(&object_points, &normals, members))
        .collect();
    // Largest face first stabilizes downstream matching.
    faces.sort_by(|a, b| b.members.len().cmp(&a.members.len()));

    let bbox = BBox::from_points(&object_points).ok_or(Error::NoObject)?;
    log::debug!("Characterized object: {} faces, bbox {}", faces.len(), bbox.delta());

    Ok(CharacterizedObject {
        bbox,
        faces,
        points: object_points,
    })
}

/// Assemble one face descriptor from a normal-cluster. `None` only for an
/// empty cluster, which the clusterer never emits.
fn build_face(points: &[Point], normals: &[Vector], members: &[usize]) -> Option<Face> {
    let member_points: Vec<Point> = members.iter().map(|&i| points[i]).collect();
    let centroid = mean(&member_points);

    // Mean of the member normals, flipped into one hemisphere before
    // averaging; PCA signs are arbitrary.
    let mut sum = Vector::ZERO;
    for &i in members {
        if sum.dot(&normals[i]) < 0.0 {
            sum += -normals[i];
        } else {
            sum += normals[i];
        }
    }
    let normal = sum.normalized();
    if normal.is_zero() {
        return None;
    }

    let rot = rotation_to_z(&normal);
    let bbox = BBox::from_rotated(points, members, &rot)?;

    Some(Face {
        normal,
        centroid,
        bbox,
        members: members.to_vec(),
    })
}
