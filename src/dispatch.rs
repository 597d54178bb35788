// Command dispatcher: action names -> drive controller calls
//
// Every hardware-mutating call goes through one mutex, so a maneuver that
// writes both tracks is never interleaved with another caller's writes.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{error, info, warn};

use crate::config::SpeedLimits;
use crate::messages::{
    ControlRequest, ControlResponse, MultiplierRequest, MultiplierResponse, StatusReport,
};
use crate::motor::{ActuatorError, DriveController, Multipliers, TrackSpeeds};

/// Error types for dispatched commands
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown action")]
    UnknownAction(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error(transparent)]
    Actuator(#[from] ActuatorError),
}

impl DispatchError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DispatchError::UnknownAction(_) | DispatchError::InvalidRequest(_)
        )
    }
}

/// Motion intents accepted from callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Forward,
    Backward,
    Left,
    Right,
    ForwardLeft,
    ForwardRight,
    BackwardLeft,
    BackwardRight,
    Stop,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::Forward,
        Action::Backward,
        Action::Left,
        Action::Right,
        Action::ForwardLeft,
        Action::ForwardRight,
        Action::BackwardLeft,
        Action::BackwardRight,
        Action::Stop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Forward => "forward",
            Action::Backward => "backward",
            Action::Left => "left",
            Action::Right => "right",
            Action::ForwardLeft => "forward-left",
            Action::ForwardRight => "forward-right",
            Action::BackwardLeft => "backward-left",
            Action::BackwardRight => "backward-right",
            Action::Stop => "stop",
        }
    }

    /// Human-readable summary returned to the caller
    pub fn describe(self, speed: i32) -> String {
        match self {
            Action::Forward => format!("Forward at {}%", speed),
            Action::Backward => format!("Backward at {}%", speed),
            Action::Left => format!("Pivot left at {}%", speed),
            Action::Right => format!("Pivot right at {}%", speed),
            Action::ForwardLeft => format!("Arc forward-left at {}%", speed),
            Action::ForwardRight => format!("Arc forward-right at {}%", speed),
            Action::BackwardLeft => format!("Arc backward-left at {}%", speed),
            Action::BackwardRight => format!("Arc backward-right at {}%", speed),
            Action::Stop => "Stopped".to_string(),
        }
    }

    fn apply(self, controller: &mut DriveController, speed: f32) -> Result<(), ActuatorError> {
        match self {
            Action::Forward => controller.forward(speed),
            Action::Backward => controller.backward(speed),
            Action::Left => controller.pivot_left(speed),
            Action::Right => controller.pivot_right(speed),
            Action::ForwardLeft => controller.arc_left(speed),
            Action::ForwardRight => controller.arc_right(speed),
            Action::BackwardLeft => controller.set_tracks(TrackSpeeds::arc_backward_left(speed)),
            Action::BackwardRight => controller.set_tracks(TrackSpeeds::arc_backward_right(speed)),
            Action::Stop => controller.stop(),
        }
    }
}

impl FromStr for Action {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownAction(s.to_string()))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializes all callers onto the single drive controller
pub struct CommandDispatcher {
    controller: Mutex<DriveController>,
    speed_limits: SpeedLimits,
}

impl CommandDispatcher {
    pub fn new(controller: DriveController, speed_limits: SpeedLimits) -> Self {
        Self {
            controller: Mutex::new(controller),
            speed_limits,
        }
    }

    // A panic in another caller must not wedge the robot
    fn lock(&self) -> MutexGuard<'_, DriveController> {
        self.controller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one motion command under the dispatch lock
    pub fn dispatch(&self, action: &str, speed: i32) -> Result<String, DispatchError> {
        let action: Action = action.parse()?;

        let mut controller = self.lock();
        action.apply(&mut controller, speed as f32)?;
        drop(controller);

        Ok(action.describe(speed))
    }

    /// Update calibration under the dispatch lock
    pub fn set_multipliers(&self, left: Option<f32>, right: Option<f32>) -> Multipliers {
        self.lock().set_multipliers(left, right)
    }

    pub fn multipliers(&self) -> Multipliers {
        self.lock().multipliers()
    }

    pub fn status(&self) -> StatusReport {
        let controller = self.lock();
        let ready = !controller.is_released();
        StatusReport {
            ready,
            message: if ready {
                "Pi-Bot is ready".to_string()
            } else {
                "Pi-Bot is shut down".to_string()
            },
            multipliers: controller.multipliers(),
            speed_limits: self.speed_limits,
        }
    }

    /// Structured reply for a decoded control request
    pub fn handle_control(&self, request: &ControlRequest) -> ControlResponse {
        match self.dispatch(&request.action, request.speed) {
            Ok(command) => {
                info!("{}", command);
                ControlResponse::Ok { command }
            }
            Err(e) => {
                if e.is_validation() {
                    warn!("Rejected control request {:?}: {}", request, e);
                } else {
                    error!("Control request {:?} failed: {}", request, e);
                }
                ControlResponse::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Decode a JSON control payload and run it
    pub fn handle_control_payload(&self, payload: &[u8]) -> ControlResponse {
        match serde_json::from_slice::<ControlRequest>(payload) {
            Ok(request) => self.handle_control(&request),
            Err(e) => {
                let e = DispatchError::from(e);
                warn!("Failed to parse control request: {}", e);
                ControlResponse::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Decode a JSON multiplier payload and apply it
    pub fn handle_multiplier_payload(&self, payload: &[u8]) -> MultiplierResponse {
        match serde_json::from_slice::<MultiplierRequest>(payload) {
            Ok(request) => self.set_multipliers(request.left, request.right).into(),
            Err(e) => {
                let e = DispatchError::from(e);
                warn!("Failed to parse multiplier request: {}", e);
                MultiplierResponse::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Brake and release the hardware; later commands fail
    pub fn shutdown(&self) -> Result<(), ActuatorError> {
        self.lock().shutdown()
    }
}
