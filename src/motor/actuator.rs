// Actuator interface for the two track motors
//
// The drive controller only ever talks to this trait. Two backends exist:
// - SysfsActuator: L298N wired to Linux GPIO + hardware PWM (see sysfs.rs)
// - RecordingActuator: in-memory stand-in that records every call

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One side of the skid-steer base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Left,
    Right,
}

impl Track {
    pub const BOTH: [Track; 2] = [Track::Left, Track::Right];

    pub fn index(self) -> usize {
        match self {
            Track::Left => 0,
            Track::Right => 1,
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::Left => f.write_str("left"),
            Track::Right => f.write_str("right"),
        }
    }
}

/// H-bridge direction pin state for a track
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
    /// Both direction pins low, duty 0
    #[default]
    Brake,
}

/// Error types for actuator I/O
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid duty cycle {percent} for {track} track")]
    InvalidDuty { track: Track, percent: f32 },

    #[error("Actuator already released")]
    Released,

    #[error("Actuator fault: {0}")]
    Fault(String),
}

pub type Result<T> = std::result::Result<T, ActuatorError>;

/// Hardware capability used by the drive controller
pub trait Actuator: Send {
    /// One-time pin and PWM channel initialization
    fn setup(&mut self) -> Result<()>;

    fn set_direction(&mut self, track: Track, direction: Direction) -> Result<()>;

    /// Duty cycle in percent, 0..=100
    fn set_duty_cycle(&mut self, track: Track, percent: f32) -> Result<()>;

    /// Stop PWM channels and release pins. Must be safe to call more than once.
    fn teardown(&mut self) -> Result<()>;
}

/// A single call observed by the recording actuator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorCall {
    Setup,
    Direction(Track, Direction),
    Duty(Track, f32),
    Teardown,
}

#[derive(Debug, Default)]
struct TraceInner {
    calls: Vec<ActuatorCall>,
    failing: bool,
}

/// Shared view of a RecordingActuator's call log
///
/// Cloning is cheap; every clone observes the same log, so tests can keep a
/// handle after the actuator has been moved into a controller.
#[derive(Debug, Clone, Default)]
pub struct ActuatorTrace {
    inner: Arc<Mutex<TraceInner>>,
}

impl ActuatorTrace {
    fn lock(&self) -> MutexGuard<'_, TraceInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.lock().calls.clone()
    }

    /// Only the direction/duty writes, without setup/teardown markers
    pub fn writes(&self) -> Vec<ActuatorCall> {
        self.lock()
            .calls
            .iter()
            .copied()
            .filter(|c| matches!(c, ActuatorCall::Direction(..) | ActuatorCall::Duty(..)))
            .collect()
    }

    pub fn clear(&self) {
        self.lock().calls.clear();
    }

    /// Make every following direction/duty write fail with a fault
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Last direction written to a track, if any
    pub fn last_direction(&self, track: Track) -> Option<Direction> {
        self.lock().calls.iter().rev().find_map(|c| match *c {
            ActuatorCall::Direction(t, d) if t == track => Some(d),
            _ => None,
        })
    }

    /// Last duty written to a track, if any
    pub fn last_duty(&self, track: Track) -> Option<f32> {
        self.lock().calls.iter().rev().find_map(|c| match *c {
            ActuatorCall::Duty(t, d) if t == track => Some(d),
            _ => None,
        })
    }

    fn record(&self, call: ActuatorCall) -> Result<()> {
        let mut inner = self.lock();
        if inner.failing && matches!(call, ActuatorCall::Direction(..) | ActuatorCall::Duty(..)) {
            return Err(ActuatorError::Fault(format!("injected failure on {:?}", call)));
        }
        inner.calls.push(call);
        Ok(())
    }
}

/// In-memory actuator: used for tests and for running without hardware
#[derive(Debug, Default)]
pub struct RecordingActuator {
    trace: ActuatorTrace,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trace(&self) -> ActuatorTrace {
        self.trace.clone()
    }
}

impl Actuator for RecordingActuator {
    fn setup(&mut self) -> Result<()> {
        debug!("Recording actuator setup");
        self.trace.record(ActuatorCall::Setup)
    }

    fn set_direction(&mut self, track: Track, direction: Direction) -> Result<()> {
        self.trace.record(ActuatorCall::Direction(track, direction))
    }

    fn set_duty_cycle(&mut self, track: Track, percent: f32) -> Result<()> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(ActuatorError::InvalidDuty { track, percent });
        }
        self.trace.record(ActuatorCall::Duty(track, percent))
    }

    fn teardown(&mut self) -> Result<()> {
        debug!("Recording actuator teardown");
        self.trace.record(ActuatorCall::Teardown)
    }
}
