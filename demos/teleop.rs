// Keyboard teleop: WASD/arrows move, Q/E/Z/C arcs, space stops, +/- speed, Esc quit
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use pibot_zenoh_runtime::config::{SpeedLimits, TOPIC_CMD_CONTROL, TOPIC_STATE_CONTROL};
use pibot_zenoh_runtime::dispatch::Action;
use pibot_zenoh_runtime::messages::{ControlRequest, ControlResponse};

// Longer than the usual key-repeat delay, so a held key does not stutter
const RELEASE_TIMEOUT_MS: u64 = 550;
const SPEED_STEP: i32 = 10;

/// Keyboard teleop for the Pi-Bot drive runtime
#[derive(Debug, Parser)]
#[command(name = "pibot-teleop", version)]
struct Cli {
    #[command(flatten)]
    speed: SpeedLimits,
}

fn key_action(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Char('w') | KeyCode::Up => Some(Action::Forward),
        KeyCode::Char('s') | KeyCode::Down => Some(Action::Backward),
        KeyCode::Char('a') | KeyCode::Left => Some(Action::Left),
        KeyCode::Char('d') | KeyCode::Right => Some(Action::Right),
        KeyCode::Char('q') => Some(Action::ForwardLeft),
        KeyCode::Char('e') => Some(Action::ForwardRight),
        KeyCode::Char('z') => Some(Action::BackwardLeft),
        KeyCode::Char('c') => Some(Action::BackwardRight),
        KeyCode::Char(' ') => Some(Action::Stop),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();
    cli.speed.validate()?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_CONTROL).await?;

    info!("Controls: WASD/arrows=move, Q/E=arc forward, Z/C=arc backward, space=stop, +/-=speed, Esc=quit");
    info!(
        "Speed: {}% (range {}% - {}%)",
        cli.speed.default, cli.speed.min, cli.speed.max
    );

    enable_raw_mode()?;
    let result = run_teleop(&session, &publisher, cli.speed).await;
    // Leave the robot braked whatever happened
    if let Err(e) = send(&publisher, Action::Stop, 0).await {
        warn!("Final stop was not sent, the robot may still be moving: {}", e);
    }
    disable_raw_mode()?;

    result
}

async fn send(
    publisher: &zenoh::pubsub::Publisher<'_>,
    action: Action,
    speed: i32,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let req = ControlRequest {
        action: action.as_str().to_string(),
        speed,
    };
    publisher.put(serde_json::to_string(&req)?).await?;
    Ok(())
}

async fn run_teleop(
    session: &zenoh::Session,
    publisher: &zenoh::pubsub::Publisher<'_>,
    limits: SpeedLimits,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let replies = session.declare_subscriber(TOPIC_STATE_CONTROL).await?;
    let mut speed = limits.default;

    // Motion currently held down, and when we last saw it
    let mut active: Option<Action> = None;
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    KeyCode::Esc if pressed => break,

                    // Speed control, re-send the held motion at the new speed
                    KeyCode::Char('+') | KeyCode::Char('=') if pressed => {
                        speed = limits.step(speed, SPEED_STEP);
                        info!("Speed: {}%", speed);
                        if let Some(action) = active {
                            send(publisher, action, speed).await?;
                        }
                    }
                    KeyCode::Char('-') if pressed => {
                        speed = limits.step(speed, -SPEED_STEP);
                        info!("Speed: {}%", speed);
                        if let Some(action) = active {
                            send(publisher, action, speed).await?;
                        }
                    }

                    code => match key_action(code) {
                        Some(Action::Stop) if pressed => {
                            active = None;
                            send(publisher, Action::Stop, 0).await?;
                        }
                        Some(action) if pressed => {
                            if active != Some(action) {
                                send(publisher, action, speed).await?;
                                active = Some(action);
                            }
                            last_movement_input = Instant::now();
                        }
                        // Terminals with release reporting
                        Some(action) if kind == KeyEventKind::Release && active == Some(action) => {
                            active = None;
                            send(publisher, Action::Stop, 0).await?;
                        }
                        _ => {}
                    },
                }
            }
        }

        // No repeat for a while means the key was let go
        if active.is_some()
            && last_movement_input.elapsed() > Duration::from_millis(RELEASE_TIMEOUT_MS)
        {
            active = None;
            send(publisher, Action::Stop, 0).await?;
        }

        while let Ok(Some(sample)) = replies.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<ControlResponse>(&payload) {
                Ok(ControlResponse::Ok { command }) => info!("Robot: {}", command),
                Ok(ControlResponse::Error { message }) => warn!("Robot error: {}", message),
                Err(e) => warn!("Failed to parse reply: {}", e),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_map_covers_all_actions() {
        let keys = ['w', 's', 'a', 'd', 'q', 'e', 'z', 'c', ' '];
        let mut mapped: Vec<Action> = keys
            .iter()
            .filter_map(|&k| key_action(KeyCode::Char(k)))
            .collect();
        mapped.dedup();
        assert_eq!(mapped.len(), Action::ALL.len());
        assert_eq!(key_action(KeyCode::Up), Some(Action::Forward));
        assert_eq!(key_action(KeyCode::Char('x')), None);
    }
}
