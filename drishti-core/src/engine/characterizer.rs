//! Streaming object characterizer.
//!
//! A three-phase state machine over an unbounded point stream:
//!
//! - `Background`: admit every point passing the reflectivity gate into the
//!   background map for `background_frame_ms` of stream time, then build the
//!   background octree.
//! - `Object`: admit points that pass the reflectivity gate AND have no
//!   background point within `background_distance`; evict points older than
//!   the object frame; at the end of the frame hand the accumulated cloud to
//!   the builder.
//! - `Discard`: drop everything for a requested stream-time window, then
//!   return to the prior mode.
//!
//! Phase durations are measured in the stream's own timestamps, never wall
//! time, so file replay behaves identically to live capture. The filters run
//! at ingress in the point callback; sources stay policy-free.
//!
//! The callback may run on a scanner thread, so the accumulators and state
//! live behind one mutex. When a phase's span elapses the callback pauses
//! the source cooperatively; the blocked phase call observes the outcome
//! under the lock after `start` returns, so no mutation follows a
//! phase-ending call. `stop` cancels a running phase from any thread.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use drishti_io::{LidarPoint, PointSource, ScanCode, SourceControl, Timestamp};

use crate::algorithms::octree::{Kernel, Octree};
use crate::config::EngineConfig;
use crate::core::types::Point;
use crate::engine::builder;
use crate::engine::object::CharacterizedObject;
use crate::error::{Error, Result};

const NANOS_PER_MS: u64 = 1_000_000;

/// Characterizer phase parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterizerConfig {
    /// Object frame length in milliseconds of stream time
    pub object_frame_ms: u64,
    /// Background capture length in milliseconds of stream time
    pub background_frame_ms: u64,
    /// Points below this reflectivity are dropped at ingress
    pub min_reflectivity: f32,
    /// A point with a background neighbor within this radius (mm) is
    /// background itself
    pub background_distance: f64,
}

impl Default for CharacterizerConfig {
    fn default() -> Self {
        Self {
            object_frame_ms: 1500,
            background_frame_ms: 1000,
            min_reflectivity: 0.0,
            background_distance: 60.0,
        }
    }
}

/// Characterizer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not capturing; points are dropped
    Stopped,
    /// Capturing the static background
    Background,
    /// Capturing a foreground object
    Object,
    /// Dropping points for a requested window
    Discard,
}

/// State shared between the control side and the point callback.
struct Shared {
    state: Phase,
    cancelled: bool,
    /// First timestamp seen in the running phase
    phase_start: Option<Timestamp>,
    /// Target span of the running phase, nanoseconds
    phase_span: u64,
    /// True once the running phase's span has elapsed
    phase_done: bool,

    background_points: Vec<Point>,
    background_index: Option<Octree>,
    object_points: VecDeque<(Timestamp, Point)>,

    discard_start: Option<Timestamp>,
    discard_span: u64,
    discard_prev: Phase,

    min_reflectivity: f32,
    background_distance: f64,
    object_span: u64,
}

impl Shared {
    /// Phase clock: the first point seen in a phase starts it; the span has
    /// elapsed once a point `span` or further past the start arrives. The
    /// triggering point itself belongs to the next state.
    fn span_elapsed(&mut self, now: Timestamp) -> bool {
        let start = *self.phase_start.get_or_insert(now);
        (now - start) as u64 >= self.phase_span
    }

    fn is_background(&self, point: &Point) -> bool {
        match &self.background_index {
            // Radius validated at construction; see EngineConfig::validate.
            Some(index) => index
                .has_neighbor(point, self.background_distance, Kernel::Sphere)
                .unwrap_or(false),
            None => false,
        }
    }

    /// Dispatch one incoming point. Returns true when the source should be
    /// paused because a phase or discard window just completed.
    fn handle_point(&mut self, p: LidarPoint) -> bool {
        match self.state {
            Phase::Stopped => false,
            Phase::Background => {
                if self.span_elapsed(p.timestamp) {
                    self.state = Phase::Stopped;
                    self.phase_done = true;
                    return true;
                }
                if p.reflectivity >= self.min_reflectivity {
                    self.background_points.push(Point::from(&p));
                }
                false
            }
            Phase::Object => {
                if self.span_elapsed(p.timestamp) {
                    self.state = Phase::Stopped;
                    self.phase_done = true;
                    return true;
                }
                if p.reflectivity >= self.min_reflectivity {
                    let point = Point::from(&p);
                    if !self.is_background(&point) {
                        self.object_points.push_back((p.timestamp, point));
                    }
                }
                // Sliding window: drop object points older than one frame,
                // measured against the just-received timestamp.
                while let Some(&(front, _)) = self.object_points.front() {
                    if (p.timestamp - front) as u64 > self.object_span {
                        self.object_points.pop_front();
                    } else {
                        break;
                    }
                }
                false
            }
            Phase::Discard => {
                let start = *self.discard_start.get_or_insert(p.timestamp);
                if (p.timestamp - start) as u64 >= self.discard_span {
                    self.state = self.discard_prev;
                    return true;
                }
                false
            }
        }
    }
}

/// Streaming characterizer over an abstract point source.
pub struct ObjectCharacterizer {
    source: Box<dyn PointSource>,
    control: Option<SourceControl>,
    shared: Arc<Mutex<Shared>>,
    config: EngineConfig,
    initialized: bool,
}

impl ObjectCharacterizer {
    /// Create a characterizer over a point source. Call
    /// [`init`](Self::init) before any phase operation.
    pub fn new(source: Box<dyn PointSource>, config: EngineConfig) -> Self {
        let characterizer = &config.characterizer;
        let shared = Shared {
            state: Phase::Stopped,
            cancelled: false,
            phase_start: None,
            phase_span: 0,
            phase_done: false,
            background_points: Vec::new(),
            background_index: None,
            object_points: VecDeque::new(),
            discard_start: None,
            discard_span: 0,
            discard_prev: Phase::Stopped,
            min_reflectivity: characterizer.min_reflectivity,
            background_distance: characterizer.background_distance,
            object_span: characterizer.object_frame_ms * NANOS_PER_MS,
        };
        Self {
            source,
            control: None,
            shared: Arc::new(Mutex::new(shared)),
            config,
            initialized: false,
        }
    }

    /// Validate the configuration, initialize the source, and wire the
    /// point callback.
    pub fn init(&mut self) -> Result<()> {
        self.config.validate()?;
        self.source.init().map_err(Error::Scanner)?;

        let control = self.source.control();
        let shared = Arc::clone(&self.shared);
        let callback_control = control.clone();
        self.source.set_callback(Box::new(move |p| {
            if shared.lock().handle_point(p) {
                callback_control.pause();
            }
        }));

        self.control = Some(control);
        self.initialized = true;
        log::info!("Characterizer initialized");
        Ok(())
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.shared.lock().state
    }

    /// Number of points currently in the background map.
    pub fn background_size(&self) -> usize {
        let shared = self.shared.lock();
        match &shared.background_index {
            Some(index) => index.len(),
            None => shared.background_points.len(),
        }
    }

    /// Capture the scene background for the configured frame.
    ///
    /// Blocks until the stream's timestamps span the background frame (or
    /// the stream ends, which completes the phase with what accumulated).
    /// The previous background is replaced.
    pub fn define_background(&mut self) -> Result<()> {
        self.enter_phase(Phase::Background, |config| {
            config.characterizer.background_frame_ms * NANOS_PER_MS
        })?;
        {
            let mut shared = self.shared.lock();
            shared.background_points.clear();
            shared.background_index = None;
        }

        let outcome = self.run_phase(Phase::Background);

        let mut shared = self.shared.lock();
        shared.state = Phase::Stopped;
        outcome?;
        if shared.cancelled {
            shared.cancelled = false;
            return Err(Error::Cancelled);
        }

        let points = std::mem::take(&mut shared.background_points);
        log::info!(
            "Background defined: {} points ({})",
            points.len(),
            if shared.phase_done {
                "frame complete"
            } else {
                "stream ended"
            }
        );
        shared.background_index = Some(Octree::build(&points, &self.config.octree));
        Ok(())
    }

    /// Capture one object frame and characterize it.
    ///
    /// Admitted points must pass the reflectivity gate and must not lie
    /// within `background_distance` of any background point. On success the
    /// accumulated cloud is handed to the builder.
    pub fn define_object(&mut self) -> Result<CharacterizedObject> {
        self.enter_phase(Phase::Object, |config| {
            config.characterizer.object_frame_ms * NANOS_PER_MS
        })?;
        {
            let mut shared = self.shared.lock();
            shared.object_points.clear();
        }

        let outcome = self.run_phase(Phase::Object);

        let points = {
            let mut shared = self.shared.lock();
            shared.state = Phase::Stopped;
            outcome?;
            if shared.cancelled {
                // Cancellation discards the object accumulator.
                shared.cancelled = false;
                shared.object_points.clear();
                return Err(Error::Cancelled);
            }
            let accumulated = std::mem::take(&mut shared.object_points);
            if !shared.phase_done {
                log::debug!("Object frame closed by stream end");
            }
            accumulated.into_iter().map(|(_, p)| p).collect::<Vec<_>>()
        };

        log::info!("Object frame closed: {} points", points.len());
        builder::characterize(points, &self.config)
    }

    /// Drop every incoming point for `ms` milliseconds of stream time.
    pub fn wait(&mut self, ms: u64) -> Result<()> {
        if !self.initialized {
            return Err(Error::InvalidState("characterizer not initialized".into()));
        }
        {
            let mut shared = self.shared.lock();
            if shared.state != Phase::Stopped {
                return Err(Error::InvalidState(format!(
                    "wait requested while in {:?}",
                    shared.state
                )));
            }
            shared.discard_prev = shared.state;
            shared.discard_start = None;
            shared.discard_span = ms * NANOS_PER_MS;
            shared.state = Phase::Discard;
        }
        log::debug!("Discarding points for {} ms of stream time", ms);

        let outcome = self.run_phase(Phase::Discard);

        let mut shared = self.shared.lock();
        if shared.state == Phase::Discard {
            shared.state = shared.discard_prev;
        }
        outcome?;
        if shared.cancelled {
            shared.cancelled = false;
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Universal cancel: force the transition to the stopped state.
    ///
    /// A blocked phase operation observes the cancellation and returns
    /// [`Error::Cancelled`]. Object data accumulated so far is discarded;
    /// the background is kept. Safe to call from any thread holding a
    /// clone of [`handle`](Self::handle).
    pub fn stop(&mut self) {
        if let Some(control) = &self.control {
            Handle {
                shared: Arc::clone(&self.shared),
                control: control.clone(),
            }
            .stop();
        }
    }

    /// A cloneable handle that can cancel a running phase from another
    /// thread.
    pub fn handle(&self) -> Option<Handle> {
        self.control.as_ref().map(|control| Handle {
            shared: Arc::clone(&self.shared),
            control: control.clone(),
        })
    }

    /// Shut the source down for good.
    pub fn shutdown(&mut self) {
        if let Some(control) = &self.control {
            control.stop();
        }
    }

    fn enter_phase(&mut self, phase: Phase, span: fn(&EngineConfig) -> u64) -> Result<()> {
        if !self.initialized {
            return Err(Error::InvalidState("characterizer not initialized".into()));
        }
        let mut shared = self.shared.lock();
        if shared.state != Phase::Stopped {
            return Err(Error::InvalidState(format!(
                "{:?} requested while in {:?}",
                phase, shared.state
            )));
        }
        shared.state = phase;
        shared.cancelled = false;
        shared.phase_start = None;
        shared.phase_done = false;
        shared.phase_span = span(&self.config);
        Ok(())
    }

    /// Drive the source until the phase completes, the stream ends, or the
    /// phase is cancelled.
    fn run_phase(&mut self, phase: Phase) -> Result<()> {
        loop {
            let code = self.source.start().map_err(Error::Scanner)?;
            let shared = self.shared.lock();
            match code {
                ScanCode::Ok => {
                    // Paused. A pause left over from a stop issued while no
                    // phase was running must not end this one: keep driving.
                    if shared.state == phase && !shared.cancelled {
                        continue;
                    }
                    return Ok(());
                }
                ScanCode::Eof => {
                    // Stream over: complete the phase with what accumulated.
                    if shared.state == phase {
                        log::warn!("Stream ended during {:?} phase", phase);
                    }
                    return Ok(());
                }
            }
        }
    }
}

impl Drop for ObjectCharacterizer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Cancellation handle for a running characterizer.
#[derive(Clone)]
pub struct Handle {
    shared: Arc<Mutex<Shared>>,
    control: SourceControl,
}

impl Handle {
    /// Cancel the running phase and transition to the stopped state.
    pub fn stop(&self) {
        {
            let mut shared = self.shared.lock();
            if shared.state != Phase::Stopped {
                shared.cancelled = true;
            }
            shared.state = Phase::Stopped;
            shared.object_points.clear();
        }
        self.control.pause();
        log::info!("Characterization stopped");
    }
}
