//! Stream-level data types shared by every point source.

use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Stream timestamp as (seconds, nanoseconds) since the device epoch.
///
/// Scanner streams carry their own clock. Every phase duration in the engine
/// is measured against these timestamps, never against wall time, so replay
/// from a file behaves identically to live capture.
///
/// Timestamps are monotonic non-decreasing within one scan session.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp {
    secs: u64,
    nanos: u32,
}

impl Timestamp {
    /// Create a timestamp from a seconds/nanoseconds pair.
    ///
    /// `nanos` is normalized into `secs` if it overflows one second.
    pub fn new(secs: u64, nanos: u32) -> Self {
        Self {
            secs: secs + (nanos as u64 / NANOS_PER_SEC),
            nanos: nanos % NANOS_PER_SEC as u32,
        }
    }

    /// Create a timestamp from a raw nanosecond count.
    pub fn from_nanos(nanos: u64) -> Self {
        Self {
            secs: nanos / NANOS_PER_SEC,
            nanos: (nanos % NANOS_PER_SEC) as u32,
        }
    }

    /// Whole seconds component.
    #[inline]
    pub fn secs(&self) -> u64 {
        self.secs
    }

    /// Sub-second nanoseconds component.
    #[inline]
    pub fn subsec_nanos(&self) -> u32 {
        self.nanos
    }

    /// Total nanosecond count.
    #[inline]
    pub fn as_nanos(&self) -> u64 {
        self.secs * NANOS_PER_SEC + self.nanos as u64
    }

    /// Signed difference `self - other` in nanoseconds.
    #[inline]
    pub fn nanos_since(&self, other: Timestamp) -> i64 {
        self.as_nanos() as i64 - other.as_nanos() as i64
    }
}

impl std::ops::Sub for Timestamp {
    type Output = i64;

    fn sub(self, other: Timestamp) -> i64 {
        self.nanos_since(other)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}s", self.secs, self.nanos)
    }
}

/// One raw sample from a scanning range sensor.
///
/// Coordinates are millimeters in the sensor frame. Reflectivity is the
/// device scale, normalized to `0.0..=1.0` by the drivers in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LidarPoint {
    /// Stream timestamp of the sample
    pub timestamp: Timestamp,
    /// Surface reflectivity (0.0 - 1.0)
    pub reflectivity: f32,
    /// X coordinate in millimeters
    pub x: f64,
    /// Y coordinate in millimeters
    pub y: f64,
    /// Z coordinate in millimeters
    pub z: f64,
}

impl LidarPoint {
    /// Create a new sample.
    pub fn new(timestamp: Timestamp, reflectivity: f32, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp,
            reflectivity,
            x,
            y,
            z,
        }
    }
}

/// Outcome of a blocking scan run.
///
/// Read errors are reported through `Result`, not through this code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanCode {
    /// The run was interrupted by a pause or stop request; the read position
    /// is kept so a later `start` resumes where it left off.
    Ok,
    /// The source is exhausted. Replay sources rewind so that a later
    /// `start` begins a fresh pass.
    Eof,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_normalization() {
        let t = Timestamp::new(1, 1_500_000_000);
        assert_eq!(t.secs(), 2);
        assert_eq!(t.subsec_nanos(), 500_000_000);
    }

    #[test]
    fn test_timestamp_nanos_roundtrip() {
        let t = Timestamp::from_nanos(3_250_000_123);
        assert_eq!(t.secs(), 3);
        assert_eq!(t.subsec_nanos(), 250_000_123);
        assert_eq!(t.as_nanos(), 3_250_000_123);
    }

    #[test]
    fn test_timestamp_signed_subtraction() {
        let a = Timestamp::from_nanos(5_000);
        let b = Timestamp::from_nanos(7_500);
        assert_eq!(b - a, 2_500);
        assert_eq!(a - b, -2_500);
    }

    #[test]
    fn test_timestamp_ordering() {
        let a = Timestamp::new(1, 999_999_999);
        let b = Timestamp::new(2, 0);
        assert!(a < b);
    }
}
