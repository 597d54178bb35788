// Motor control module for the two-track base
//
// Provides:
// - Skid-steer kinematics (motion intent -> signed track speeds -> pin/duty output)
// - Actuator interface with sysfs (L298N) and in-memory backends
// - High-level drive controller API

pub mod actuator;
mod driver;
pub mod kinematics;
pub mod sysfs;

pub use actuator::{Actuator, ActuatorError, ActuatorTrace, Direction, RecordingActuator, Track};
pub use driver::{DriveController, Multipliers, TrackState};
pub use kinematics::{ARC_FACTOR, TrackOutput, TrackSpeeds};
pub use sysfs::{SysfsActuator, SysfsConfig, TrackPins};
