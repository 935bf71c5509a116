//! Synthetic point-stream simulator.
//!
//! Replays a programmed point sequence through the [`PointSource`] contract,
//! optionally perturbing coordinates with Gaussian jitter. This is the mock
//! device for hardware-free testing: the engine cannot tell it apart from a
//! file replay or a live scanner.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::{Error, Result};
use crate::scanner::{PointCallback, PointSource, SourceControl};
use crate::types::{LidarPoint, ScanCode};

/// Canned point-stream source.
pub struct SimScanner {
    points: Vec<LidarPoint>,
    cursor: usize,
    jitter_mm: f64,
    rng: SmallRng,
    callback: Option<PointCallback>,
    control: SourceControl,
}

impl SimScanner {
    /// Create a simulator over a pre-built point sequence.
    ///
    /// Points are emitted in order; timestamps are taken as-is, so the
    /// sequence should be monotonic like a real stream.
    pub fn new(points: Vec<LidarPoint>) -> Self {
        Self {
            points,
            cursor: 0,
            jitter_mm: 0.0,
            rng: SmallRng::seed_from_u64(0x5eed),
            callback: None,
            control: SourceControl::new(),
        }
    }

    /// Enable per-axis Gaussian coordinate jitter with the given standard
    /// deviation in millimeters, seeded for reproducibility.
    pub fn with_jitter(mut self, stddev_mm: f64, seed: u64) -> Self {
        self.jitter_mm = stddev_mm;
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    fn perturb(&mut self, mut point: LidarPoint) -> LidarPoint {
        if self.jitter_mm > 0.0 {
            let mut noise = || {
                let n: f64 = self.rng.sample(StandardNormal);
                n * self.jitter_mm
            };
            point.x += noise();
            point.y += noise();
            point.z += noise();
        }
        point
    }
}

impl PointSource for SimScanner {
    fn init(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn set_callback(&mut self, callback: PointCallback) {
        self.callback = Some(callback);
    }

    fn start(&mut self) -> Result<ScanCode> {
        if self.callback.is_none() {
            return Err(Error::NoCallback);
        }
        if self.control.is_stopped() {
            return Ok(ScanCode::Ok);
        }

        while self.cursor < self.points.len() {
            let point = self.perturb(self.points[self.cursor]);
            self.cursor += 1;
            if let Some(callback) = self.callback.as_mut() {
                callback(point);
            }
            if self.control.take_interrupt() {
                return Ok(ScanCode::Ok);
            }
        }

        // Exhausted; rewind for the next pass.
        self.cursor = 0;
        Ok(ScanCode::Eof)
    }

    fn control(&self) -> SourceControl {
        self.control.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;
    use std::sync::{Arc, Mutex};

    fn stream(n: u64) -> Vec<LidarPoint> {
        (0..n)
            .map(|i| LidarPoint::new(Timestamp::from_nanos(i * 100), 1.0, 1.0, 2.0, 3.0))
            .collect()
    }

    #[test]
    fn test_replays_all_points_then_rewinds() {
        let mut sim = SimScanner::new(stream(10));
        sim.init().unwrap();
        let count = Arc::new(Mutex::new(0usize));
        let c = Arc::clone(&count);
        sim.set_callback(Box::new(move |_| *c.lock().unwrap() += 1));

        assert_eq!(sim.start().unwrap(), ScanCode::Eof);
        assert_eq!(sim.start().unwrap(), ScanCode::Eof);
        assert_eq!(*count.lock().unwrap(), 20);
    }

    #[test]
    fn test_pause_keeps_position() {
        let mut sim = SimScanner::new(stream(4));
        sim.init().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let ctl = sim.control();
        sim.set_callback(Box::new(move |p| {
            s.lock().unwrap().push(p.timestamp.as_nanos());
            ctl.pause();
        }));

        assert_eq!(sim.start().unwrap(), ScanCode::Ok);
        assert_eq!(sim.start().unwrap(), ScanCode::Ok);
        assert_eq!(*seen.lock().unwrap(), vec![0, 100]);
    }

    #[test]
    fn test_jitter_is_deterministic() {
        let mut a = SimScanner::new(stream(3)).with_jitter(0.5, 7);
        let mut b = SimScanner::new(stream(3)).with_jitter(0.5, 7);
        let out_a = Arc::new(Mutex::new(Vec::new()));
        let out_b = Arc::new(Mutex::new(Vec::new()));
        let (ca, cb) = (Arc::clone(&out_a), Arc::clone(&out_b));
        a.set_callback(Box::new(move |p| ca.lock().unwrap().push(p)));
        b.set_callback(Box::new(move |p| cb.lock().unwrap().push(p)));
        a.start().unwrap();
        b.start().unwrap();
        assert_eq!(*out_a.lock().unwrap(), *out_b.lock().unwrap());
    }
}
