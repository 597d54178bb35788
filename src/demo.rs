// Motion self-test: runs every maneuver once, then stops
use std::time::Duration;

use tracing::{info, warn};

use crate::motor::{ActuatorError, DriveController};

type Maneuver = fn(&mut DriveController, f32) -> Result<(), ActuatorError>;

/// (label, maneuver, speed, how long to hold it)
pub const DEMO_STEPS: [(&str, Maneuver, f32, Duration); 8] = [
    ("forward", DriveController::forward, 60.0, Duration::from_secs(2)),
    ("backward", DriveController::backward, 60.0, Duration::from_secs(2)),
    ("pivot left (tank turn)", DriveController::pivot_left, 50.0, Duration::from_secs(1)),
    ("pivot right (tank turn)", DriveController::pivot_right, 50.0, Duration::from_secs(1)),
    ("turn left (right track only)", DriveController::turn_left, 60.0, Duration::from_secs(2)),
    ("turn right (left track only)", DriveController::turn_right, 60.0, Duration::from_secs(2)),
    ("arc left", DriveController::arc_left, 60.0, Duration::from_secs(2)),
    ("arc right", DriveController::arc_right, 60.0, Duration::from_secs(2)),
];

/// Run the demo sequence with `hold` scaling each step's duration
///
/// Ctrl-C or SIGTERM stops the sequence early. The controller is shut down on every path.
pub async fn run(mut controller: DriveController, hold: f32) -> Result<(), ActuatorError> {
    let result = run_steps(&mut controller, hold).await;
    if let Err(e) = &result {
        warn!("Demo aborted: {}", e);
    }
    controller.shutdown()?;
    result
}

async fn run_steps(controller: &mut DriveController, hold: f32) -> Result<(), ActuatorError> {
    let mut interrupted = std::pin::pin!(crate::runtime::shutdown_signal());

    for (label, maneuver, speed, duration) in DEMO_STEPS {
        info!("Testing {}...", label);
        maneuver(controller, speed)?;

        tokio::select! {
            _ = tokio::time::sleep(duration.mul_f32(hold)) => {}
            _ = &mut interrupted => {
                info!("Interrupted by user");
                return Ok(());
            }
        }
    }

    info!("Stopping...");
    controller.stop()
}
