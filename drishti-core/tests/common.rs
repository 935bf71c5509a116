//! Test utilities: synthetic clouds and streams for the engine scenarios.

#![allow(dead_code)]

use drishti_core::{EngineConfig, Point, Vector};
use drishti_io::{LidarPoint, Timestamp};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Uniform grid over the six faces of an axis-aligned box.
pub fn box_surface(center: Point, sides: Vector, spacing: f64) -> Vec<Point> {
    let h = sides / 2.0;
    let nx = (sides.x / spacing).round() as usize + 1;
    let ny = (sides.y / spacing).round() as usize + 1;
    let nz = (sides.z / spacing).round() as usize + 1;
    let step = |side: f64, n: usize| side / (n - 1) as f64;
    let (sx, sy, sz) = (step(sides.x, nx), step(sides.y, ny), step(sides.z, nz));

    let mut points = Vec::new();
    // z-normal faces
    for i in 0..nx {
        for j in 0..ny {
            let (u, v) = (i as f64 * sx - h.x, j as f64 * sy - h.y);
            points.push(center + Point::new(u, v, -h.z));
            points.push(center + Point::new(u, v, h.z));
        }
    }
    // y-normal faces
    for i in 0..nx {
        for j in 0..nz {
            let (u, v) = (i as f64 * sx - h.x, j as f64 * sz - h.z);
            points.push(center + Point::new(u, -h.y, v));
            points.push(center + Point::new(u, h.y, v));
        }
    }
    // x-normal faces
    for i in 0..ny {
        for j in 0..nz {
            let (u, v) = (i as f64 * sy - h.y, j as f64 * sz - h.z);
            points.push(center + Point::new(-h.x, u, v));
            points.push(center + Point::new(h.x, u, v));
        }
    }
    points
}

/// Uniform grid over the six faces of an axis-aligned cube.
pub fn cube_surface(center: Point, side: f64, spacing: f64) -> Vec<Point> {
    box_surface(center, Vector::new(side, side, side), spacing)
}

/// Flat wall in the z = `z` plane, spanning ±`half` in x and y.
pub fn wall(z: f64, half: f64, spacing: f64) -> Vec<Point> {
    let n = (2.0 * half / spacing).round() as usize + 1;
    let step = 2.0 * half / (n - 1) as f64;
    let mut points = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            points.push(Point::new(
                i as f64 * step - half,
                j as f64 * step - half,
                z,
            ));
        }
    }
    points
}

/// Uniformly scattered points in a cube of the given extent.
pub fn scatter(n: usize, extent: f64, seed: u64) -> Vec<Point> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let half = extent / 2.0;
    (0..n)
        .map(|_| {
            Point::new(
                rng.gen_range(-half..half),
                rng.gen_range(-half..half),
                rng.gen_range(-half..half),
            )
        })
        .collect()
}

/// Turn a cloud into a stream with timestamps advancing `dt_ns` per point.
pub fn to_stream(points: &[Point], start_ns: u64, dt_ns: u64) -> Vec<LidarPoint> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            LidarPoint::new(
                Timestamp::from_nanos(start_ns + i as u64 * dt_ns),
                1.0,
                p.x,
                p.y,
                p.z,
            )
        })
        .collect()
}

/// Engine configuration tuned for the exact synthetic grids used here
/// (2 mm spacing): tight clustering radii keep the tests fast, and widened
/// normal gates keep one smeared boundary row per face while the 45° edge
/// bisector normals still fail the mean gate.
pub fn tuned_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.clustering.radius = 20.0;
    config.faces.radius = 12.0;
    config.faces.min_points = 30;
    config.faces.normal_radius = 6.0;
    config.faces.max_normal_angle = 0.45;
    config.faces.max_mean_angle = 0.45;
    config
}
