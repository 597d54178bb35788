// L298N track driver on Linux sysfs GPIO + hardware PWM
//
// Each track uses two direction inputs (IN1/IN2) on GPIO and one enable
// input (ENA/ENB) on a hardware PWM channel:
//   IN1=1 IN2=0 -> forward, IN1=0 IN2=1 -> backward, IN1=0 IN2=0 -> brake
// Duty cycle on the enable pin sets the speed.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::actuator::{Actuator, ActuatorError, Direction, Result, Track};

/// Default sysfs root
pub const SYSFS_ROOT: &str = "/sys/class";

/// Time to wait for udev to fix permissions on freshly exported nodes
const EXPORT_SETTLE: Duration = Duration::from_millis(100);

/// Pin assignment for one track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackPins {
    /// BCM number of the first direction input
    pub in1: u32,
    /// BCM number of the second direction input
    pub in2: u32,
    /// Channel index on the PWM chip driving the enable pin
    pub pwm_channel: u32,
}

/// Full wiring description for the sysfs backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsConfig {
    pub root: PathBuf,
    pub pwm_chip: u32,
    pub pwm_frequency_hz: u32,
    pub left: TrackPins,
    pub right: TrackPins,
}

impl SysfsConfig {
    fn pins(&self, track: Track) -> TrackPins {
        match track {
            Track::Left => self.left,
            Track::Right => self.right,
        }
    }

    fn period_ns(&self) -> u64 {
        1_000_000_000 / u64::from(self.pwm_frequency_hz.max(1))
    }

    fn gpio_dir(&self) -> PathBuf {
        self.root.join("gpio")
    }

    fn gpio_pin(&self, pin: u32) -> PathBuf {
        self.gpio_dir().join(format!("gpio{}", pin))
    }

    fn pwm_dir(&self) -> PathBuf {
        self.root.join("pwm").join(format!("pwmchip{}", self.pwm_chip))
    }

    fn pwm_channel(&self, channel: u32) -> PathBuf {
        self.pwm_dir().join(format!("pwm{}", channel))
    }
}

fn write_attr(path: &Path, value: &str) -> Result<()> {
    fs::write(path, value).map_err(|source| ActuatorError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Hardware actuator for the L298N dual H-bridge
pub struct SysfsActuator {
    config: SysfsConfig,
    // Nodes configured by setup, quiesced on teardown
    pins: Vec<u32>,
    channels: Vec<u32>,
    // Subset this process exported itself; only these get unexported
    exported_pins: Vec<u32>,
    exported_channels: Vec<u32>,
    released: bool,
}

impl SysfsActuator {
    pub fn new(config: SysfsConfig) -> Self {
        Self {
            config,
            pins: Vec::new(),
            channels: Vec::new(),
            exported_pins: Vec::new(),
            exported_channels: Vec::new(),
            released: false,
        }
    }

    fn export_pin(&mut self, pin: u32) -> Result<()> {
        let pin_dir = self.config.gpio_pin(pin);
        if !pin_dir.exists() {
            debug!("Exporting GPIO {}", pin);
            write_attr(&self.config.gpio_dir().join("export"), &pin.to_string())?;
            sleep(EXPORT_SETTLE);
            self.exported_pins.push(pin);
        }
        self.pins.push(pin);
        write_attr(&pin_dir.join("direction"), "out")?;
        self.write_pin(pin, false)
    }

    fn export_channel(&mut self, channel: u32) -> Result<()> {
        let channel_dir = self.config.pwm_channel(channel);
        if !channel_dir.exists() {
            debug!("Exporting PWM channel {}", channel);
            write_attr(&self.config.pwm_dir().join("export"), &channel.to_string())?;
            sleep(EXPORT_SETTLE);
            self.exported_channels.push(channel);
        }
        self.channels.push(channel);

        // Duty must never exceed the period, so zero it before changing period
        write_attr(&channel_dir.join("duty_cycle"), "0")?;
        write_attr(&channel_dir.join("period"), &self.config.period_ns().to_string())?;
        write_attr(&channel_dir.join("enable"), "1")
    }

    fn write_pin(&self, pin: u32, high: bool) -> Result<()> {
        let value = if high { "1" } else { "0" };
        write_attr(&self.config.gpio_pin(pin).join("value"), value)
    }

    fn release(&mut self) -> Result<()> {
        let mut first_err = None;
        let exported_channels = std::mem::take(&mut self.exported_channels);
        let exported_pins = std::mem::take(&mut self.exported_pins);

        for channel in std::mem::take(&mut self.channels) {
            let dir = self.config.pwm_channel(channel);
            let mut steps = vec![
                write_attr(&dir.join("duty_cycle"), "0"),
                write_attr(&dir.join("enable"), "0"),
            ];
            if exported_channels.contains(&channel) {
                steps.push(write_attr(&self.config.pwm_dir().join("unexport"), &channel.to_string()));
            }
            for res in steps {
                if let Err(e) = res {
                    warn!("PWM channel {} release: {}", channel, e);
                    first_err.get_or_insert(e);
                }
            }
        }

        for pin in std::mem::take(&mut self.pins) {
            let mut steps = vec![self.write_pin(pin, false)];
            if exported_pins.contains(&pin) {
                steps.push(write_attr(&self.config.gpio_dir().join("unexport"), &pin.to_string()));
            }
            for res in steps {
                if let Err(e) = res {
                    warn!("GPIO {} release: {}", pin, e);
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Actuator for SysfsActuator {
    fn setup(&mut self) -> Result<()> {
        info!(
            "Setting up L298N on pwmchip{} at {} Hz",
            self.config.pwm_chip, self.config.pwm_frequency_hz
        );

        for track in Track::BOTH {
            let pins = self.config.pins(track);
            self.export_pin(pins.in1)?;
            self.export_pin(pins.in2)?;
            self.export_channel(pins.pwm_channel)?;
            debug!("{} track on GPIO {}/{} PWM{}", track, pins.in1, pins.in2, pins.pwm_channel);
        }
        Ok(())
    }

    fn set_direction(&mut self, track: Track, direction: Direction) -> Result<()> {
        if self.released {
            return Err(ActuatorError::Released);
        }

        let pins = self.config.pins(track);
        let (in1, in2) = match direction {
            Direction::Forward => (true, false),
            Direction::Backward => (false, true),
            Direction::Brake => (false, false),
        };
        // Drop the active side first so both inputs are never high together
        if in1 {
            self.write_pin(pins.in2, in2)?;
            self.write_pin(pins.in1, in1)
        } else {
            self.write_pin(pins.in1, in1)?;
            self.write_pin(pins.in2, in2)
        }
    }

    fn set_duty_cycle(&mut self, track: Track, percent: f32) -> Result<()> {
        if self.released {
            return Err(ActuatorError::Released);
        }
        if !(0.0..=100.0).contains(&percent) {
            return Err(ActuatorError::InvalidDuty { track, percent });
        }

        let pins = self.config.pins(track);
        let duty_ns = (self.config.period_ns() as f64 * f64::from(percent) / 100.0).round() as u64;
        write_attr(
            &self.config.pwm_channel(pins.pwm_channel).join("duty_cycle"),
            &duty_ns.to_string(),
        )
    }

    fn teardown(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        info!("Releasing PWM channels and GPIO pins");
        self.release()
    }
}
