//! Octree spatial index with radius neighborhood queries.
//!
//! The tree is built once over a point set and is read-only afterwards.
//! Nodes carry a box as center + half-extents; a node subdivides only while
//! it holds more than [`OctreeConfig::max_leaf_points`] AND its largest
//! extent exceeds [`OctreeConfig::min_leaf_extent`]. Child octants are
//! half-open `[min, mid)` along each axis, so a coordinate exactly at the
//! split plane lands in the upper child.
//!
//! Queries return indices into the indexed point set, never references —
//! every consumer keys back into its own stable vector.

use serde::{Deserialize, Serialize};

use crate::core::types::{BBox, Point, Vector};
use crate::error::{Error, Result};

/// Query kernel shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    /// Euclidean distance <= radius
    Sphere,
    /// Per-axis distance <= radius
    Cube,
}

/// Subdivision limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// A node holding at most this many points stays a leaf
    pub max_leaf_points: usize,
    /// A node whose largest extent is at most this (mm) stays a leaf
    pub min_leaf_extent: f64,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_leaf_points: 16,
            min_leaf_extent: 1.0,
        }
    }
}

enum NodeKind {
    Leaf(Vec<usize>),
    Branch(Vec<Node>),
}

struct Node {
    center: Point,
    half: Vector,
    kind: NodeKind,
}

/// Read-only spatial index over a point cloud.
pub struct Octree {
    points: Vec<Point>,
    root: Node,
}

impl Octree {
    /// Build an index covering the axis-aligned bounding box of `points`.
    ///
    /// The input order is preserved: queries return indices into `points`
    /// as passed here. An empty input builds an empty index.
    pub fn build(points: &[Point], config: &OctreeConfig) -> Self {
        let bbox = BBox::from_points(points).unwrap_or_default();
        let center = (*bbox.min() + *bbox.max()) / 2.0;
        let half = *bbox.delta() / 2.0;
        let indices: Vec<usize> = (0..points.len()).collect();
        let points = points.to_vec();
        let root = subdivide(&points, indices, center, half, config);
        Self { points, root }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the index holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The indexed points, in query-index order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Indices of every point inside the kernel centered at `query`.
    ///
    /// Completeness is guaranteed; ordering is not. Queries outside the root
    /// box clip gracefully to an empty result. A non-positive radius is an
    /// [`Error::EmptyKernel`].
    pub fn search_neighbors(&self, query: &Point, radius: f64, kernel: Kernel) -> Result<Vec<usize>> {
        if radius <= 0.0 {
            return Err(Error::EmptyKernel(radius));
        }
        let mut found = Vec::new();
        if !self.points.is_empty() {
            collect(&self.root, &self.points, query, radius, kernel, &mut found);
        }
        Ok(found)
    }

    /// True if any indexed point lies inside the kernel. Early-exits on the
    /// first hit, which makes it the right call for the background filter.
    pub fn has_neighbor(&self, query: &Point, radius: f64, kernel: Kernel) -> Result<bool> {
        if radius <= 0.0 {
            return Err(Error::EmptyKernel(radius));
        }
        if self.points.is_empty() {
            return Ok(false);
        }
        Ok(probe(&self.root, &self.points, query, radius, kernel))
    }
}

fn subdivide(
    points: &[Point],
    indices: Vec<usize>,
    center: Point,
    half: Vector,
    config: &OctreeConfig,
) -> Node {
    let largest_extent = (half.x.max(half.y).max(half.z)) * 2.0;
    if indices.len() <= config.max_leaf_points || largest_extent <= config.min_leaf_extent {
        return Node {
            center,
            half,
            kind: NodeKind::Leaf(indices),
        };
    }

    let mut buckets: [Vec<usize>; 8] = Default::default();
    for i in indices {
        buckets[octant(&points[i], &center)].push(i);
    }

    let quarter = half / 2.0;
    let children = buckets
        .into_iter()
        .enumerate()
        .map(|(o, bucket)| {
            let child_center = Point::new(
                center.x + if o & 4 != 0 { quarter.x } else { -quarter.x },
                center.y + if o & 2 != 0 { quarter.y } else { -quarter.y },
                center.z + if o & 1 != 0 { quarter.z } else { -quarter.z },
            );
            subdivide(points, bucket, child_center, quarter, config)
        })
        .collect();

    Node {
        center,
        half,
        kind: NodeKind::Branch(children),
    }
}

/// Octant of `p` relative to `center`: bit 2 = x, bit 1 = y, bit 0 = z.
/// `[min, mid)` is the lower half, so a tie goes to the upper octant.
#[inline]
fn octant(p: &Point, center: &Point) -> usize {
    ((p.x >= center.x) as usize) << 2 | ((p.y >= center.y) as usize) << 1 | (p.z >= center.z) as usize
}

/// Kernel/box overlap test used to prune subtrees.
fn intersects(node: &Node, query: &Point, radius: f64, kernel: Kernel) -> bool {
    match kernel {
        Kernel::Sphere => {
            // Squared distance from query to the nearest box point.
            let dx = ((query.x - node.center.x).abs() - node.half.x).max(0.0);
            let dy = ((query.y - node.center.y).abs() - node.half.y).max(0.0);
            let dz = ((query.z - node.center.z).abs() - node.half.z).max(0.0);
            dx * dx + dy * dy + dz * dz <= radius * radius
        }
        Kernel::Cube => {
            (query.x - node.center.x).abs() <= node.half.x + radius
                && (query.y - node.center.y).abs() <= node.half.y + radius
                && (query.z - node.center.z).abs() <= node.half.z + radius
        }
    }
}

#[inline]
fn inside(kernel: Kernel, p: &Point, query: &Point, radius: f64) -> bool {
    match kernel {
        Kernel::Sphere => p.distance_squared(query) <= radius * radius,
        Kernel::Cube => {
            (p.x - query.x).abs() <= radius
                && (p.y - query.y).abs() <= radius
                && (p.z - query.z).abs() <= radius
        }
    }
}

fn collect(
    node: &Node,
    points: &[Point],
    query: &Point,
    radius: f64,
    kernel: Kernel,
    found: &mut Vec<usize>,
) {
    if !intersects(node, query, radius, kernel) {
        return;
    }
    match &node.kind {
        NodeKind::Leaf(indices) => {
            for &i in indices {
                if inside(kernel, &points[i], query, radius) {
                    found.push(i);
                }
            }
        }
        NodeKind::Branch(children) => {
            for child in children {
                collect(child, points, query, radius, kernel, found);
            }
        }
    }
}

fn probe(node: &Node, points: &[Point], query: &Point, radius: f64, kernel: Kernel) -> bool {
    if !intersects(node, query, radius, kernel) {
        return false;
    }
    match &node.kind {
        NodeKind::Leaf(indices) => indices
            .iter()
            .any(|&i| inside(kernel, &points[i], query, radius)),
        NodeKind::Branch(children) => children
            .iter()
            .any(|child| probe(child, points, query, radius, kernel)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn random_cloud(n: usize, extent: f64, seed: u64) -> Vec<Point> {
        let mut rng = SmallRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                Point::new(
                    rng.gen_range(-extent..extent),
                    rng.gen_range(-extent..extent),
                    rng.gen_range(-extent..extent),
                )
            })
            .collect()
    }

    fn brute_force(points: &[Point], query: &Point, radius: f64, kernel: Kernel) -> Vec<usize> {
        (0..points.len())
            .filter(|&i| inside(kernel, &points[i], query, radius))
            .collect()
    }

    #[test]
    fn test_sphere_query_matches_brute_force() {
        let points = random_cloud(800, 500.0, 42);
        let tree = Octree::build(&points, &OctreeConfig::default());

        for seed in 0..8u64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let query = Point::new(
                rng.gen_range(-600.0..600.0),
                rng.gen_range(-600.0..600.0),
                rng.gen_range(-600.0..600.0),
            );
            let radius = rng.gen_range(10.0..300.0);

            let mut got = tree.search_neighbors(&query, radius, Kernel::Sphere).unwrap();
            let mut want = brute_force(&points, &query, radius, Kernel::Sphere);
            got.sort_unstable();
            want.sort_unstable();
            assert_eq!(got, want, "query {} radius {}", query, radius);
        }
    }

    #[test]
    fn test_cube_query_matches_brute_force() {
        let points = random_cloud(500, 200.0, 7);
        let tree = Octree::build(&points, &OctreeConfig::default());
        let query = Point::new(15.0, -40.0, 80.0);

        let mut got = tree.search_neighbors(&query, 60.0, Kernel::Cube).unwrap();
        let mut want = brute_force(&points, &query, 60.0, Kernel::Cube);
        got.sort_unstable();
        want.sort_unstable();
        assert_eq!(got, want);
    }

    #[test]
    fn test_each_hit_reported_once() {
        let points = random_cloud(300, 100.0, 3);
        let tree = Octree::build(&points, &OctreeConfig::default());
        let mut got = tree
            .search_neighbors(&Point::ZERO, 150.0, Kernel::Sphere)
            .unwrap();
        let before = got.len();
        got.sort_unstable();
        got.dedup();
        assert_eq!(got.len(), before);
    }

    #[test]
    fn test_empty_index() {
        let tree = Octree::build(&[], &OctreeConfig::default());
        assert!(tree.is_empty());
        let hits = tree
            .search_neighbors(&Point::ZERO, 10.0, Kernel::Sphere)
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_non_positive_radius_fails() {
        let tree = Octree::build(&random_cloud(10, 10.0, 1), &OctreeConfig::default());
        assert!(matches!(
            tree.search_neighbors(&Point::ZERO, 0.0, Kernel::Sphere),
            Err(Error::EmptyKernel(_))
        ));
        assert!(matches!(
            tree.has_neighbor(&Point::ZERO, -1.0, Kernel::Sphere),
            Err(Error::EmptyKernel(_))
        ));
    }

    #[test]
    fn test_query_outside_root_clips_to_empty() {
        let points = random_cloud(50, 10.0, 9);
        let tree = Octree::build(&points, &OctreeConfig::default());
        let far = Point::new(1e6, 1e6, 1e6);
        assert!(tree.search_neighbors(&far, 5.0, Kernel::Sphere).unwrap().is_empty());
    }

    #[test]
    fn test_identical_points_stop_subdividing() {
        // 100 coincident points can never satisfy the leaf cap; the extent
        // floor must stop the recursion.
        let points = vec![Point::new(1.0, 2.0, 3.0); 100];
        let tree = Octree::build(&points, &OctreeConfig::default());
        let hits = tree
            .search_neighbors(&Point::new(1.0, 2.0, 3.0), 0.5, Kernel::Sphere)
            .unwrap();
        assert_eq!(hits.len(), 100);
    }

    #[test]
    fn test_has_neighbor() {
        let points = vec![Point::new(0.0, 0.0, 0.0), Point::new(100.0, 0.0, 0.0)];
        let tree = Octree::build(&points, &OctreeConfig::default());
        assert!(tree.has_neighbor(&Point::new(1.0, 0.0, 0.0), 2.0, Kernel::Sphere).unwrap());
        assert!(!tree.has_neighbor(&Point::new(50.0, 0.0, 0.0), 10.0, Kernel::Sphere).unwrap());
    }
}
