// Topics, wiring, and command-line / environment configuration
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::motor::{Actuator, RecordingActuator, SysfsActuator, SysfsConfig, TrackPins};

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Status report period
pub const STATUS_PERIOD: Duration = Duration::from_millis(500);

// Zenoh topics
pub const TOPIC_CMD_CONTROL: &str = "pibot/cmd/control"; // motion commands
pub const TOPIC_CMD_MULTIPLIERS: &str = "pibot/cmd/multipliers"; // calibration
pub const TOPIC_STATE_CONTROL: &str = "pibot/state/control"; // replies to motion commands
pub const TOPIC_STATE_MULTIPLIERS: &str = "pibot/state/multipliers"; // replies to calibration
pub const TOPIC_STATUS: &str = "pibot/state/status"; // readiness

// L298N wiring (BCM numbering)
// ENA on GPIO12 = PWM0, ENB on GPIO13 = PWM1 (dtoverlay=pwm-2chan)
pub const LEFT_PINS: TrackPins = TrackPins {
    in1: 17,
    in2: 27,
    pwm_channel: 0,
};
pub const RIGHT_PINS: TrackPins = TrackPins {
    in1: 22,
    in2: 23,
    pwm_channel: 1,
};

pub const PWM_FREQUENCY_HZ: u32 = 1000;

// Speed used when a control request omits it
pub const FALLBACK_SPEED: i32 = 60;

/// Errors in user-supplied configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Speed limits out of order: min={min}, default={default}, max={max}")]
    SpeedOrder { min: i32, default: i32, max: i32 },

    #[error("Speed limits must lie within 0..=100, got min={min}, max={max}")]
    SpeedRange { min: i32, max: i32 },
}

/// Speed selector bounds for front-ends
///
/// Only the teleop side uses these. The drive core clamps duty to 100 and
/// nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Args, Serialize, Deserialize)]
pub struct SpeedLimits {
    /// Lowest selectable speed in percent
    #[arg(long = "min-speed", env = "MIN_SPEED", default_value_t = 30)]
    pub min: i32,

    /// Highest selectable speed in percent
    #[arg(long = "max-speed", env = "MAX_SPEED", default_value_t = 100)]
    pub max: i32,

    /// Initial speed in percent
    #[arg(long = "default-speed", env = "DEFAULT_SPEED", default_value_t = 60)]
    pub default: i32,
}

impl Default for SpeedLimits {
    fn default() -> Self {
        Self {
            min: 30,
            max: 100,
            default: 60,
        }
    }
}

impl SpeedLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min < 0 || self.max > 100 {
            return Err(ConfigError::SpeedRange {
                min: self.min,
                max: self.max,
            });
        }
        if !(self.min <= self.default && self.default <= self.max) {
            return Err(ConfigError::SpeedOrder {
                min: self.min,
                default: self.default,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Step a speed by `delta`, staying inside the limits
    pub fn step(&self, speed: i32, delta: i32) -> i32 {
        (speed + delta).clamp(self.min, self.max)
    }
}

/// Which hardware backend to drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorKind {
    /// In-memory recorder, nothing physical moves
    Recording,
    Sysfs(SysfsConfig),
}

impl ActuatorKind {
    pub fn build(&self) -> Box<dyn Actuator> {
        match self {
            ActuatorKind::Recording => Box::new(RecordingActuator::new()),
            ActuatorKind::Sysfs(config) => Box::new(SysfsActuator::new(config.clone())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Mode {
    /// Serve drive commands over zenoh (default)
    Serve,
    /// Run the motion self-test sequence and exit
    Demo,
}

/// Pi-Bot tank drive runtime
#[derive(Debug, Parser)]
#[command(name = "pibot-runtime", version)]
pub struct Cli {
    #[command(subcommand)]
    pub mode: Option<Mode>,

    /// Use the in-memory actuator instead of GPIO/PWM
    #[arg(long, env = "PIBOT_MOCK")]
    pub mock: bool,

    /// sysfs PWM chip carrying the enable pins
    #[arg(long, env = "PWM_CHIP", default_value_t = 0)]
    pub pwm_chip: u32,

    /// sysfs class root (override for testing)
    #[arg(long, env = "SYSFS_ROOT", default_value = crate::motor::sysfs::SYSFS_ROOT)]
    pub sysfs_root: PathBuf,

    #[command(flatten)]
    pub speed: SpeedLimits,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or(Mode::Serve)
    }

    pub fn actuator_kind(&self) -> ActuatorKind {
        if self.mock {
            return ActuatorKind::Recording;
        }
        ActuatorKind::Sysfs(SysfsConfig {
            root: self.sysfs_root.clone(),
            pwm_chip: self.pwm_chip,
            pwm_frequency_hz: PWM_FREQUENCY_HZ,
            left: LEFT_PINS,
            right: RIGHT_PINS,
        })
    }
}
