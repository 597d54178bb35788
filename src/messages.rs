// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::config::{FALLBACK_SPEED, SpeedLimits};
use crate::motor::Multipliers;

fn fallback_speed() -> i32 {
    FALLBACK_SPEED
}

// Motion command from teleop/scripts -> runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRequest {
    pub action: String,
    #[serde(default = "fallback_speed")]
    pub speed: i32,
}

// Calibration update; an absent side is left unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiplierRequest {
    #[serde(default)]
    pub left: Option<f32>,
    #[serde(default)]
    pub right: Option<f32>,
}

/// Reply to a control request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ControlResponse {
    Ok { command: String },
    Error { message: String },
}

/// Reply to a multiplier update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MultiplierResponse {
    Ok { left: f32, right: f32 },
    Error { message: String },
}

impl From<Multipliers> for MultiplierResponse {
    fn from(m: Multipliers) -> Self {
        Self::Ok {
            left: m.left,
            right: m.right,
        }
    }
}

/// Status published by runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub ready: bool,
    pub message: String,
    pub multipliers: Multipliers,
    pub speed_limits: SpeedLimits,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_request_speed_defaults() {
        let req: ControlRequest = serde_json::from_str(r#"{"action":"stop"}"#).unwrap();
        assert_eq!(req.action, "stop");
        assert_eq!(req.speed, 60);
    }

    #[test]
    fn test_multiplier_request_partial() {
        let req: MultiplierRequest = serde_json::from_str(r#"{"left":0.5}"#).unwrap();
        assert_eq!(req.left, Some(0.5));
        assert_eq!(req.right, None);

        let req: MultiplierRequest = serde_json::from_str(r#"{"left":null,"right":2}"#).unwrap();
        assert_eq!(req.left, None);
        assert_eq!(req.right, Some(2.0));
    }

    #[test]
    fn test_response_shapes() {
        let ok = serde_json::to_value(ControlResponse::Ok {
            command: "Stopped".into(),
        })
        .unwrap();
        assert_eq!(ok, serde_json::json!({"status": "ok", "command": "Stopped"}));

        let err = serde_json::to_value(ControlResponse::Error {
            message: "Unknown action".into(),
        })
        .unwrap();
        assert_eq!(err, serde_json::json!({"status": "error", "message": "Unknown action"}));

        let m = serde_json::to_value(MultiplierResponse::from(Multipliers {
            left: 0.5,
            right: 1.0,
        }))
        .unwrap();
        assert_eq!(m, serde_json::json!({"status": "ok", "left": 0.5, "right": 1.0}));
    }
}
