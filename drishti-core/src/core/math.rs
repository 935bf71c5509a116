//! Math helpers shared across the engine.

use nalgebra::{Rotation3, Unit, Vector3};

use crate::core::types::{Point, Vector};

/// Angular separation of two directions ignoring sign, in `0..=π/2`.
///
/// Surface normals out of PCA have an arbitrary sign, so a plain `acos`
/// angle can report a spurious 180° gap between normals of the same plane.
/// Every comparison between normals in the engine goes through this
/// function. Degenerate (zero) inputs yield `π`, which fails any sensible
/// gate.
#[inline]
pub fn acute_angle(u: &Vector, v: &Vector) -> f64 {
    if u.is_zero() || v.is_zero() {
        return std::f64::consts::PI;
    }
    let theta = u.angle(v);
    theta.min(std::f64::consts::PI - theta)
}

/// Arithmetic mean of a vector set. Zero vector for an empty set.
pub fn mean(vectors: &[Vector]) -> Vector {
    if vectors.is_empty() {
        return Vector::ZERO;
    }
    let mut sum = Vector::ZERO;
    for v in vectors {
        sum += *v;
    }
    sum / vectors.len() as f64
}

/// Rotation that maps the direction `n` onto +Z.
///
/// `n` need not be normalized. For the antiparallel case (n ≈ -Z), where no
/// unique minimal rotation exists, a half-turn about X is used.
pub fn rotation_to_z(n: &Vector) -> Rotation3<f64> {
    let from = Vector3::new(n.x, n.y, n.z);
    let to = Vector3::z();
    match Rotation3::rotation_between(&from, &to) {
        Some(rot) => rot,
        None => Rotation3::from_axis_angle(&Unit::new_normalize(Vector3::x()), std::f64::consts::PI),
    }
}

/// Apply a rotation to a point about the origin.
#[inline]
pub fn rotate_point(rot: &Rotation3<f64>, p: &Point) -> Point {
    let v = rot * Vector3::new(p.x, p.y, p.z);
    Point::new(v.x, v.y, v.z)
}
