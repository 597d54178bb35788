// Skid-steer kinematics for the two-track base
// Maps motion intents to signed per-track speeds, and signed speeds to the
// direction + duty pair the H-bridge needs.

use super::actuator::{Direction, Track};

/// Inner-track fraction for arc maneuvers (wide-radius curve)
pub const ARC_FACTOR: f32 = 0.3;

/// Duty cycle limit in percent
pub const MAX_DUTY: f32 = 100.0;

/// Signed track speeds in percent, before calibration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackSpeeds {
    pub left: f32,
    pub right: f32,
}

impl TrackSpeeds {
    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn forward(speed: f32) -> Self {
        Self::new(speed, speed)
    }

    pub fn backward(speed: f32) -> Self {
        Self::new(-speed, -speed)
    }

    /// Zero-radius rotation counter-clockwise
    pub fn pivot_left(speed: f32) -> Self {
        Self::new(-speed, speed)
    }

    pub fn pivot_right(speed: f32) -> Self {
        Self::new(speed, -speed)
    }

    /// Left track held, right track drives
    pub fn turn_left(speed: f32) -> Self {
        Self::new(0.0, speed)
    }

    pub fn turn_right(speed: f32) -> Self {
        Self::new(speed, 0.0)
    }

    pub fn arc_left(speed: f32) -> Self {
        Self::new(speed * ARC_FACTOR, speed)
    }

    pub fn arc_right(speed: f32) -> Self {
        Self::new(speed, speed * ARC_FACTOR)
    }

    pub fn arc_backward_left(speed: f32) -> Self {
        Self::new(-speed * ARC_FACTOR, -speed)
    }

    pub fn arc_backward_right(speed: f32) -> Self {
        Self::new(-speed, -speed * ARC_FACTOR)
    }

    pub fn get(&self, track: Track) -> f32 {
        match track {
            Track::Left => self.left,
            Track::Right => self.right,
        }
    }
}

/// What actually goes out to one side of the H-bridge
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackOutput {
    pub direction: Direction,
    pub duty: f32,
}

/// Clamp a calibration multiplier into [0, 1]; NaN counts as 0
pub fn clamp_multiplier(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Convert a signed speed and its track multiplier to pin/duty output
///
/// The sign of the adjusted speed picks the direction, zero means brake.
pub fn track_output(speed: f32, multiplier: f32) -> TrackOutput {
    let adjusted = speed * multiplier;

    if adjusted > 0.0 {
        TrackOutput {
            direction: Direction::Forward,
            duty: adjusted.abs().min(MAX_DUTY),
        }
    } else if adjusted < 0.0 {
        TrackOutput {
            direction: Direction::Backward,
            duty: adjusted.abs().min(MAX_DUTY),
        }
    } else {
        // Also catches NaN speeds
        TrackOutput::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_zero_speed_brakes() {
        let out = track_output(0.0, 1.0);
        assert_eq!(out.direction, Direction::Brake);
        assert_eq!(out.duty, 0.0);

        // Zero multiplier also brakes, whatever the speed
        let out = track_output(80.0, 0.0);
        assert_eq!(out.direction, Direction::Brake);
        assert_eq!(out.duty, 0.0);
    }

    #[test]
    fn test_direction_follows_sign() {
        assert_eq!(track_output(10.0, 0.5).direction, Direction::Forward);
        assert_eq!(track_output(-10.0, 0.5).direction, Direction::Backward);
        assert!(approx(track_output(-10.0, 0.5).duty, 5.0));
    }

    #[test]
    fn test_duty_clamped_to_100() {
        let out = track_output(250.0, 1.0);
        assert_eq!(out.direction, Direction::Forward);
        assert_eq!(out.duty, MAX_DUTY);

        let out = track_output(-250.0, 1.0);
        assert_eq!(out.direction, Direction::Backward);
        assert_eq!(out.duty, MAX_DUTY);
    }

    #[test]
    fn test_duty_matches_magnitude_over_grid() {
        for speed in (-100..=100).step_by(5) {
            for m in 0..=10 {
                let speed = speed as f32;
                let multiplier = m as f32 / 10.0;
                let out = track_output(speed, multiplier);
                let expected = (speed * multiplier).abs().clamp(0.0, 100.0);
                assert!(
                    approx(out.duty, expected),
                    "speed={} mult={} duty={}",
                    speed,
                    multiplier,
                    out.duty
                );
                let adjusted = speed * multiplier;
                let expected_dir = if adjusted > 0.0 {
                    Direction::Forward
                } else if adjusted < 0.0 {
                    Direction::Backward
                } else {
                    Direction::Brake
                };
                assert_eq!(out.direction, expected_dir);
            }
        }
    }

    #[test]
    fn test_clamp_multiplier() {
        assert_eq!(clamp_multiplier(1.5), 1.0);
        assert_eq!(clamp_multiplier(-1.0), 0.0);
        assert_eq!(clamp_multiplier(0.25), 0.25);
        assert_eq!(clamp_multiplier(f32::NAN), 0.0);
    }

    #[test]
    fn test_maneuver_speeds() {
        assert_eq!(TrackSpeeds::forward(60.0), TrackSpeeds::new(60.0, 60.0));
        assert_eq!(TrackSpeeds::backward(60.0), TrackSpeeds::new(-60.0, -60.0));
        assert_eq!(TrackSpeeds::pivot_left(50.0), TrackSpeeds::new(-50.0, 50.0));
        assert_eq!(TrackSpeeds::pivot_right(50.0), TrackSpeeds::new(50.0, -50.0));
        assert_eq!(TrackSpeeds::turn_left(60.0), TrackSpeeds::new(0.0, 60.0));
        assert_eq!(TrackSpeeds::turn_right(60.0), TrackSpeeds::new(60.0, 0.0));

        let arc = TrackSpeeds::arc_right(60.0);
        assert_eq!(arc.left, 60.0);
        assert!(approx(arc.right, 18.0));

        let arc = TrackSpeeds::arc_backward_left(40.0);
        assert!(approx(arc.left, -12.0));
        assert_eq!(arc.right, -40.0);
    }
}
