use std::sync::{Arc, Barrier};
use std::thread;

use pibot_zenoh_runtime::config::SpeedLimits;
use pibot_zenoh_runtime::dispatch::CommandDispatcher;
use pibot_zenoh_runtime::motor::actuator::ActuatorCall;
use pibot_zenoh_runtime::motor::{
    ARC_FACTOR, ActuatorTrace, Direction, DriveController, RecordingActuator, Track,
};

const CALLERS: usize = 16;
const ROUNDS: usize = 25;

fn dispatcher() -> (Arc<CommandDispatcher>, ActuatorTrace) {
    let actuator = RecordingActuator::new();
    let trace = actuator.trace();
    let controller = DriveController::new(Box::new(actuator)).unwrap();
    trace.clear();
    (
        Arc::new(CommandDispatcher::new(controller, SpeedLimits::default())),
        trace,
    )
}

/// Split a write trace into per-command blocks of (left, right) signed outputs
fn blocks(writes: &[ActuatorCall]) -> Vec<(f32, f32)> {
    assert_eq!(writes.len() % 4, 0, "trace has a partial command");

    writes
        .chunks(4)
        .map(|chunk| match chunk {
            [
                ActuatorCall::Direction(Track::Left, ld),
                ActuatorCall::Duty(Track::Left, lduty),
                ActuatorCall::Direction(Track::Right, rd),
                ActuatorCall::Duty(Track::Right, rduty),
            ] => (signed(*ld, *lduty), signed(*rd, *rduty)),
            _ => panic!("interleaved writes: {:?}", chunk),
        })
        .collect()
}

fn signed(direction: Direction, duty: f32) -> f32 {
    match direction {
        Direction::Forward => duty,
        Direction::Backward => -duty,
        Direction::Brake => {
            assert_eq!(duty, 0.0);
            0.0
        }
    }
}

#[test]
fn composite_commands_are_never_interleaved() {
    let (dispatcher, trace) = dispatcher();
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                // Distinct speed per caller so blocks can be told apart
                let speed = (i + 1) as i32 * 5;
                let action = if i % 2 == 0 { "forward" } else { "backward-left" };
                for _ in 0..ROUNDS {
                    dispatcher.dispatch(action, speed).unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let blocks = blocks(&trace.writes());
    assert_eq!(blocks.len(), CALLERS * ROUNDS);

    for (left, right) in blocks {
        if right > 0.0 {
            // forward: both tracks equal
            assert_eq!(left, right);
        } else {
            // backward-left: inner track at the arc fraction of the outer
            assert!(
                (left - right * ARC_FACTOR).abs() < 1e-3,
                "mixed block left={} right={}",
                left,
                right
            );
        }
    }
}

#[test]
fn concurrent_forward_and_stop_never_mix() {
    for _ in 0..50 {
        let (dispatcher, trace) = dispatcher();
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [("forward", 50), ("stop", 0)]
            .into_iter()
            .map(|(action, speed)| {
                let dispatcher = Arc::clone(&dispatcher);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    dispatcher.dispatch(action, speed).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let blocks = blocks(&trace.writes());
        assert_eq!(blocks.len(), 2);
        let last = blocks[1];
        assert!(last == (50.0, 50.0) || last == (0.0, 0.0), "mixed final state {:?}", last);
    }
}

#[test]
fn multiplier_updates_share_the_lock() {
    let (dispatcher, trace) = dispatcher();

    let writer = {
        let dispatcher = Arc::clone(&dispatcher);
        thread::spawn(move || {
            for _ in 0..200 {
                dispatcher.dispatch("forward", 80).unwrap();
            }
        })
    };
    let calibrator = {
        let dispatcher = Arc::clone(&dispatcher);
        thread::spawn(move || {
            for i in 0..200 {
                let m = if i % 2 == 0 { 0.5 } else { 1.0 };
                let result = dispatcher.set_multipliers(Some(m), Some(m));
                assert_eq!(result.left, m);
            }
        })
    };
    writer.join().unwrap();
    calibrator.join().unwrap();

    // Both tracks of a command always see the same multiplier
    for (left, right) in blocks(&trace.writes()) {
        assert_eq!(left, right);
        assert!(left == 40.0 || left == 80.0);
    }
}

#[test]
fn unknown_action_from_many_callers_touches_nothing() {
    let (dispatcher, trace) = dispatcher();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || dispatcher.dispatch("spin", 50).is_err())
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap());
    }
    assert!(trace.calls().is_empty());
}
