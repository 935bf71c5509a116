//! Axis-aligned bounding box.

use nalgebra::Rotation3;
use serde::{Deserialize, Serialize};

use super::point::{Point, Vector};
use crate::core::math::rotate_point;

/// Axis-aligned bounding box of a point set.
///
/// Ordering and equality are total on volume.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BBox {
    min: Point,
    max: Point,
    delta: Vector,
}

impl BBox {
    /// Box from explicit extremes.
    pub fn new(min: Point, max: Point) -> Self {
        Self {
            min,
            max,
            delta: max - min,
        }
    }

    /// Box from its dimension deltas, anchored at the origin.
    pub fn from_delta(delta: Vector) -> Self {
        Self {
            min: Point::ZERO,
            max: delta,
            delta,
        }
    }

    /// Tight box around a point set. `None` for an empty set.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut min = first;
        let mut max = first;
        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Some(Self::new(min, max))
    }

    /// Tight box around the selected indices of a point set.
    pub fn from_indexed(points: &[Point], indices: &[usize]) -> Option<Self> {
        Self::from_points(indices.iter().map(|&i| &points[i]))
    }

    /// Tight box around the selected points after rotating each into the
    /// frame given by `rot`. Used for face-local boxes where `rot` maps the
    /// face normal to +Z.
    pub fn from_rotated(points: &[Point], indices: &[usize], rot: &Rotation3<f64>) -> Option<Self> {
        let rotated: Vec<Point> = indices
            .iter()
            .map(|&i| rotate_point(rot, &points[i]))
            .collect();
        Self::from_points(&rotated)
    }

    /// Minimum corner.
    #[inline]
    pub fn min(&self) -> &Point {
        &self.min
    }

    /// Maximum corner.
    #[inline]
    pub fn max(&self) -> &Point {
        &self.max
    }

    /// Dimension deltas (`max - min`).
    #[inline]
    pub fn delta(&self) -> &Vector {
        &self.delta
    }

    /// Box volume.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.delta.x * self.delta.y * self.delta.z
    }

    /// The eight corners of the box.
    pub fn corners(&self) -> [Point; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Point::new(lo.x, lo.y, lo.z),
            Point::new(hi.x, lo.y, lo.z),
            Point::new(lo.x, hi.y, lo.z),
            Point::new(hi.x, hi.y, lo.z),
            Point::new(lo.x, lo.y, hi.z),
            Point::new(hi.x, lo.y, hi.z),
            Point::new(lo.x, hi.y, hi.z),
            Point::new(hi.x, hi.y, hi.z),
        ]
    }
}

impl PartialEq for BBox {
    fn eq(&self, other: &BBox) -> bool {
        self.volume() == other.volume()
    }
}

impl PartialOrd for BBox {
    fn partial_cmp(&self, other: &BBox) -> Option<std::cmp::Ordering> {
        self.volume().partial_cmp(&other.volume())
    }
}
