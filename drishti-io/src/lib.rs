//! DrishtiIO - point-source abstraction for scanning range sensors.
//!
//! This crate owns the stream-side of the Drishti engine: the
//! [`PointSource`] contract that every scanner driver implements, the raw
//! [`LidarPoint`]/[`Timestamp`] sample types, and the replay drivers used
//! for development and testing:
//!
//! - [`csv::CsvScanner`] — replays CSV point exports
//! - [`capture::CaptureScanner`] / [`capture::CaptureWriter`] — binary
//!   capture record and replay
//! - [`sim::SimScanner`] — synthetic streams for hardware-free tests
//!
//! Sources are policy-free: they emit every decoded point and leave
//! admission filtering (reflectivity, background subtraction) to the
//! consumer.

pub mod capture;
pub mod csv;
pub mod error;
pub mod scanner;
pub mod sim;
pub mod types;

pub use error::{Error, Result};
pub use scanner::{PointCallback, PointSource, SourceControl};
pub use types::{LidarPoint, ScanCode, Timestamp};
