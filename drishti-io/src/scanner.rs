//! Point-source abstraction.
//!
//! A [`PointSource`] pushes [`LidarPoint`]s into a registered callback from a
//! blocking [`start`](PointSource::start) call. Control from other threads is
//! cooperative: sources check a shared [`SourceControl`] after every emitted
//! point, so a pause or stop takes effect at point granularity. Sources carry
//! no admission policy of their own; filtering belongs to the consumer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::types::{LidarPoint, ScanCode};

/// Callback invoked for every emitted point.
pub type PointCallback = Box<dyn FnMut(LidarPoint) + Send>;

/// Cooperative control handle shared with a running source.
///
/// Cloning is cheap; all clones address the same source run.
#[derive(Clone, Debug, Default)]
pub struct SourceControl {
    paused: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

impl SourceControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the blocking `start` call return `ScanCode::Ok`,
    /// keeping the read position for a later resume.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Request that the source shut down for good. A stopped source
    /// returns from `start` and refuses further runs.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// True once `stop` has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Check for a pending interrupt, consuming a pending pause.
    ///
    /// Sources call this after each emitted point and break out of their
    /// read loop when it returns true.
    pub fn take_interrupt(&self) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return true;
        }
        self.paused.swap(false, Ordering::AcqRel)
    }
}

/// Abstract scanning range sensor.
///
/// Implementations in this crate replay recorded data ([`CsvScanner`],
/// [`CaptureScanner`]) or synthesize it ([`SimScanner`]); a live device
/// driver would implement the same contract.
///
/// [`CsvScanner`]: crate::csv::CsvScanner
/// [`CaptureScanner`]: crate::capture::CaptureScanner
/// [`SimScanner`]: crate::sim::SimScanner
pub trait PointSource: Send {
    /// Prepare the source (open files, validate headers).
    fn init(&mut self) -> Result<()>;

    /// Register the per-point callback. Must be called before `start`.
    fn set_callback(&mut self, callback: PointCallback);

    /// Emit points into the callback until exhaustion, a pause, or a stop.
    ///
    /// Blocks the calling thread. Returns [`ScanCode::Eof`] when the data is
    /// exhausted and [`ScanCode::Ok`] when interrupted by the control handle.
    fn start(&mut self) -> Result<ScanCode>;

    /// Control handle for interrupting a blocked `start` from another thread.
    fn control(&self) -> SourceControl;
}
