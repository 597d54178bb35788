// High-level drive controller for the two-track base
//
// Combines kinematics and the actuator to provide a simple API for
// controlling the skid-steer base.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::actuator::{Actuator, ActuatorError, Direction, Track};
use super::kinematics::{TrackOutput, TrackSpeeds, clamp_multiplier, track_output};

/// Per-track calibration multipliers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Multipliers {
    pub left: f32,
    pub right: f32,
}

impl Default for Multipliers {
    fn default() -> Self {
        Self {
            left: 1.0,
            right: 1.0,
        }
    }
}

/// State of one track as last commanded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackState {
    /// Calibration factor in [0, 1]
    pub multiplier: f32,
    /// Last commanded signed speed, before the multiplier
    pub speed: f32,
    /// Output actually written for that speed
    pub output: TrackOutput,
}

impl Default for TrackState {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            speed: 0.0,
            output: TrackOutput::default(),
        }
    }
}

/// High-level drive controller for the skid-steer base
pub struct DriveController {
    actuator: Box<dyn Actuator>,
    tracks: [TrackState; 2], // [left, right]
    released: bool,
}

impl DriveController {
    /// Set up the actuator and leave both tracks braked
    pub fn new(actuator: Box<dyn Actuator>) -> Result<Self, ActuatorError> {
        let mut controller = Self {
            actuator,
            tracks: [TrackState::default(); 2],
            released: false,
        };

        info!("Initializing track actuator");
        controller.actuator.setup()?;
        controller.stop()?;
        info!("Drive controller ready");
        Ok(controller)
    }

    /// Drive one track at a signed speed (-100..=100, negative = backward)
    pub fn set_track(&mut self, track: Track, speed: f32) -> Result<(), ActuatorError> {
        if self.released {
            return Err(ActuatorError::Released);
        }

        let state = &mut self.tracks[track.index()];
        let output = track_output(speed, state.multiplier);
        debug!(
            "Setting {} track: speed={}, multiplier={}, direction={:?}, duty={}",
            track, speed, state.multiplier, output.direction, output.duty
        );

        self.actuator.set_direction(track, output.direction)?;
        self.actuator.set_duty_cycle(track, output.duty)?;

        state.speed = speed;
        state.output = output;
        Ok(())
    }

    /// Write both tracks, left first
    pub fn set_tracks(&mut self, speeds: TrackSpeeds) -> Result<(), ActuatorError> {
        self.set_track(Track::Left, speeds.left)?;
        self.set_track(Track::Right, speeds.right)
    }

    pub fn forward(&mut self, speed: f32) -> Result<(), ActuatorError> {
        self.set_tracks(TrackSpeeds::forward(speed))
    }

    pub fn backward(&mut self, speed: f32) -> Result<(), ActuatorError> {
        self.set_tracks(TrackSpeeds::backward(speed))
    }

    /// Pivot left - left track backward, right track forward
    pub fn pivot_left(&mut self, speed: f32) -> Result<(), ActuatorError> {
        self.set_tracks(TrackSpeeds::pivot_left(speed))
    }

    /// Pivot right - left track forward, right track backward
    pub fn pivot_right(&mut self, speed: f32) -> Result<(), ActuatorError> {
        self.set_tracks(TrackSpeeds::pivot_right(speed))
    }

    /// Turn left - only the right track moves
    pub fn turn_left(&mut self, speed: f32) -> Result<(), ActuatorError> {
        self.set_tracks(TrackSpeeds::turn_left(speed))
    }

    /// Turn right - only the left track moves
    pub fn turn_right(&mut self, speed: f32) -> Result<(), ActuatorError> {
        self.set_tracks(TrackSpeeds::turn_right(speed))
    }

    /// Arc left by slowing the left track
    pub fn arc_left(&mut self, speed: f32) -> Result<(), ActuatorError> {
        self.set_tracks(TrackSpeeds::arc_left(speed))
    }

    /// Arc right by slowing the right track
    pub fn arc_right(&mut self, speed: f32) -> Result<(), ActuatorError> {
        self.set_tracks(TrackSpeeds::arc_right(speed))
    }

    /// Brake both tracks
    pub fn stop(&mut self) -> Result<(), ActuatorError> {
        self.set_tracks(TrackSpeeds::zero())
    }

    /// Update calibration multipliers; `None` leaves a track unchanged
    ///
    /// Values are clamped into [0, 1]. Takes effect on the next track write.
    pub fn set_multipliers(&mut self, left: Option<f32>, right: Option<f32>) -> Multipliers {
        if let Some(left) = left {
            self.tracks[Track::Left.index()].multiplier = clamp_multiplier(left);
        }
        if let Some(right) = right {
            self.tracks[Track::Right.index()].multiplier = clamp_multiplier(right);
        }

        let multipliers = self.multipliers();
        info!(
            "Track multipliers: left={}, right={}",
            multipliers.left, multipliers.right
        );
        multipliers
    }

    pub fn multipliers(&self) -> Multipliers {
        Multipliers {
            left: self.tracks[Track::Left.index()].multiplier,
            right: self.tracks[Track::Right.index()].multiplier,
        }
    }

    pub fn track(&self, track: Track) -> TrackState {
        self.tracks[track.index()]
    }

    pub fn direction(&self, track: Track) -> Direction {
        self.tracks[track.index()].output.direction
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Brake both tracks, then stop PWM and release the pins
    ///
    /// Safe to call more than once. Teardown runs even if braking fails.
    pub fn shutdown(&mut self) -> Result<(), ActuatorError> {
        if self.released {
            return Ok(());
        }

        info!("Stopping tracks and releasing actuator");
        let stopped = self.stop();
        if let Err(e) = &stopped {
            error!("Failed to brake tracks during shutdown: {}", e);
        }

        self.released = true;
        self.actuator.teardown()?;
        info!("Drive controller shut down");
        stopped
    }
}

impl Drop for DriveController {
    fn drop(&mut self) {
        // Runs on every exit path, including unwinding
        if let Err(e) = self.shutdown() {
            warn!("Failed to shut down drive controller on drop: {}", e);
        }
    }
}
