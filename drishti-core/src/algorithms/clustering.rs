//! Density-based clustering (DBSCAN schema), in two modes.
//!
//! Both modes share one expansion skeleton: seed a cluster from an
//! unclassified point, fetch its octree neighborhood, and grow a BFS
//! frontier through every neighbor that is similar enough, where a frontier
//! point only expands further if it is a core point (its accepted
//! neighborhood reaches the minimum size).
//!
//! - **Proximity mode** accepts every point inside the ε-sphere and isolates
//!   spatially distinct objects.
//! - **Normal-consistency mode** additionally gates candidates on angular
//!   similarity between normals and the cluster's running mean normal, and
//!   segments one object into planar faces.
//!
//! Labels live in an array parallel to the input, not on the points
//! themselves, so the point set stays value-semantic and read-only. A point
//! labeled noise can still be absorbed by a later expansion (standard
//! DBSCAN); it is then counted in that cluster but never expanded.

use serde::{Deserialize, Serialize};

use crate::algorithms::octree::{Kernel, Octree};
use crate::core::math::acute_angle;
use crate::core::types::{Point, Vector};
use crate::error::Result;

/// Label of a point not yet visited.
pub const UNCLASSIFIED: i32 = -1;
/// Label of a point with no dense neighborhood. Other negative values are
/// reserved; assigned cluster ids are `>= 0`.
pub const NOISE: i32 = -4;

/// Proximity-mode parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Core-point threshold (neighborhood size)
    pub min_points: usize,
    /// ε neighborhood radius in millimeters
    pub radius: f64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            min_points: 20,
            radius: 100.0,
        }
    }
}

/// Normal-consistency-mode parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceConfig {
    /// Core-point threshold (accepted neighborhood size)
    pub min_points: usize,
    /// ε neighborhood radius in millimeters
    pub radius: f64,
    /// Neighborhood radius for normal estimation, in millimeters
    pub normal_radius: f64,
    /// Pairwise gate: max angle between a seed normal and a candidate (radians)
    pub max_normal_angle: f64,
    /// Mean gate: max angle between the cluster mean and a candidate (radians)
    pub max_mean_angle: f64,
    /// Single-sufficient mean gate (radians): a candidate this close to the
    /// mean is accepted regardless of the pairwise gate
    pub max_mean_angle_single: f64,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            min_points: 30,
            radius: 50.0,
            normal_radius: 20.0,
            max_normal_angle: 0.30,
            max_mean_angle: 0.30,
            max_mean_angle_single: 0.10,
        }
    }
}

/// Result of one clustering pass.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Member indices per cluster, in cluster-id order
    pub clusters: Vec<Vec<usize>>,
    /// Final label per input index
    pub labels: Vec<i32>,
}

impl Partition {
    /// Index of the largest cluster by member count.
    pub fn largest(&self) -> Option<usize> {
        (0..self.clusters.len()).max_by_key(|&i| self.clusters[i].len())
    }
}

/// Partition a point set by spatial proximity.
///
/// `octree` must index exactly `points`.
pub fn cluster_by_proximity(
    points: &[Point],
    octree: &Octree,
    config: &ProximityConfig,
) -> Result<Partition> {
    let mut labels = vec![UNCLASSIFIED; points.len()];
    let mut clusters = Vec::new();

    for seed in 0..points.len() {
        if labels[seed] != UNCLASSIFIED {
            continue;
        }
        let id = clusters.len() as i32;
        if let Some(members) = expand_proximity(points, octree, &mut labels, seed, id, config)? {
            clusters.push(members);
        }
    }

    Ok(Partition { clusters, labels })
}

fn expand_proximity(
    points: &[Point],
    octree: &Octree,
    labels: &mut [i32],
    seed: usize,
    id: i32,
    config: &ProximityConfig,
) -> Result<Option<Vec<usize>>> {
    let (count, candidates) = proximity_neighborhood(points, octree, labels, seed, config)?;
    if count < config.min_points {
        labels[seed] = NOISE;
        return Ok(None);
    }

    let mut members = candidates.clone();
    for &i in &members {
        labels[i] = id;
    }
    // The seed's own neighborhood is already absorbed; expand from the rest.
    let mut frontier: Vec<usize> = candidates.into_iter().filter(|&i| i != seed).collect();

    let mut cursor = 0;
    while cursor < frontier.len() {
        let current = frontier[cursor];
        cursor += 1;

        let (count, candidates) =
            proximity_neighborhood(points, octree, labels, current, config)?;
        if count < config.min_points {
            continue;
        }
        for c in candidates {
            if labels[c] == UNCLASSIFIED {
                frontier.push(c);
            }
            labels[c] = id;
            members.push(c);
        }
    }

    Ok(Some(members))
}

/// Total neighborhood size plus the still-absorbable members (label < 0).
fn proximity_neighborhood(
    points: &[Point],
    octree: &Octree,
    labels: &[i32],
    center: usize,
    config: &ProximityConfig,
) -> Result<(usize, Vec<usize>)> {
    let hits = octree.search_neighbors(&points[center], config.radius, Kernel::Sphere)?;
    let candidates = hits.iter().copied().filter(|&i| labels[i] < 0).collect();
    Ok((hits.len(), candidates))
}

/// Partition a point set into planar faces by normal consistency.
///
/// `normals` is aligned by index with `points` (see
/// [`estimate_normals`](crate::algorithms::normals::estimate_normals));
/// zero-normal points are unclassifiable and are skipped entirely.
pub fn cluster_by_normals(
    points: &[Point],
    normals: &[Vector],
    octree: &Octree,
    config: &FaceConfig,
) -> Result<Partition> {
    debug_assert_eq!(points.len(), normals.len());
    let mut labels = vec![UNCLASSIFIED; points.len()];
    let mut clusters = Vec::new();

    for seed in 0..points.len() {
        if labels[seed] != UNCLASSIFIED || normals[seed].is_zero() {
            continue;
        }
        let id = clusters.len() as i32;
        if let Some(members) = expand_normal(points, normals, octree, &mut labels, seed, id, config)?
        {
            clusters.push(members);
        }
    }

    Ok(Partition { clusters, labels })
}

fn expand_normal(
    points: &[Point],
    normals: &[Vector],
    octree: &Octree,
    labels: &mut [i32],
    seed: usize,
    id: i32,
    config: &FaceConfig,
) -> Result<Option<Vec<usize>>> {
    let (count, candidates) =
        normal_neighborhood(points, normals, octree, labels, seed, &normals[seed], config)?;
    if count < config.min_points {
        labels[seed] = NOISE;
        return Ok(None);
    }

    // Running sum of member normals, each flipped into the same hemisphere
    // so the arithmetic mean stays meaningful despite sign-ambiguous PCA
    // output. The comparison is angular, so the sum works as the mean.
    let mut mean = Vector::ZERO;
    let mut members = candidates.clone();
    for &i in &members {
        labels[i] = id;
        accumulate_oriented(&mut mean, &normals[i]);
    }
    let mut frontier: Vec<usize> = candidates.into_iter().filter(|&i| i != seed).collect();

    let mut cursor = 0;
    while cursor < frontier.len() {
        let current = frontier[cursor];
        cursor += 1;

        let (count, candidates) =
            normal_neighborhood(points, normals, octree, labels, current, &mean, config)?;
        if count < config.min_points {
            continue;
        }
        for c in candidates {
            if labels[c] == UNCLASSIFIED {
                frontier.push(c);
            }
            labels[c] = id;
            accumulate_oriented(&mut mean, &normals[c]);
            members.push(c);
        }
    }

    Ok(Some(members))
}

#[inline]
fn accumulate_oriented(sum: &mut Vector, n: &Vector) {
    if sum.dot(n) < 0.0 {
        *sum += -*n;
    } else {
        *sum += *n;
    }
}

/// Accepted neighborhood size plus the still-absorbable accepted members.
///
/// A candidate is accepted iff its normal is non-zero and
/// `(angle(seed, n) <= max_normal_angle AND angle(mean, n) <= max_mean_angle)
/// OR angle(mean, n) <= max_mean_angle_single`, all angles acute.
fn normal_neighborhood(
    points: &[Point],
    normals: &[Vector],
    octree: &Octree,
    labels: &[i32],
    center: usize,
    mean: &Vector,
    config: &FaceConfig,
) -> Result<(usize, Vec<usize>)> {
    let hits = octree.search_neighbors(&points[center], config.radius, Kernel::Sphere)?;

    let mut count = 0;
    let mut candidates = Vec::new();
    for i in hits {
        if normals[i].is_zero() {
            continue;
        }
        let to_mean = acute_angle(mean, &normals[i]);
        let accepted = (acute_angle(&normals[center], &normals[i]) <= config.max_normal_angle
            && to_mean <= config.max_mean_angle)
            || to_mean <= config.max_mean_angle_single;
        if accepted {
            count += 1;
            if labels[i] < 0 {
                candidates.push(i);
            }
        }
    }

    Ok((count, candidates))
}
