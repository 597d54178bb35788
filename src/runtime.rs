// Zenoh front for the command dispatcher
//
// Each subscriber feeds one long-lived blocking worker, so requests on a topic
// run in arrival order while the control and calibration lanes still race for
// the dispatch lock. Replies come back over a channel and are published from
// the main loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::{
    LOOP_HZ, STATUS_PERIOD, TOPIC_CMD_CONTROL, TOPIC_CMD_MULTIPLIERS, TOPIC_STATE_CONTROL,
    TOPIC_STATE_MULTIPLIERS, TOPIC_STATUS,
};
use crate::dispatch::CommandDispatcher;
use crate::messages::{ControlResponse, MultiplierResponse};

/// Reply produced by a worker, waiting to be published
#[derive(Debug)]
enum Reply {
    Control(ControlResponse),
    Multipliers(MultiplierResponse),
}

/// Resolves when the process is asked to stop (Ctrl-C or SIGTERM)
pub(crate) async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Start a worker that runs `handle` on each payload, strictly in send order
fn spawn_lane<F>(mut handle: F) -> (mpsc::UnboundedSender<Vec<u8>>, JoinHandle<()>)
where
    F: FnMut(&[u8]) + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let worker = tokio::task::spawn_blocking(move || {
        while let Some(payload) = rx.blocking_recv() {
            handle(&payload);
        }
    });
    (tx, worker)
}

fn control_lane(
    dispatcher: &Arc<CommandDispatcher>,
    replies: mpsc::UnboundedSender<Reply>,
) -> (mpsc::UnboundedSender<Vec<u8>>, JoinHandle<()>) {
    let dispatcher = Arc::clone(dispatcher);
    spawn_lane(move |payload| {
        let _ = replies.send(Reply::Control(dispatcher.handle_control_payload(payload)));
    })
}

fn multiplier_lane(
    dispatcher: &Arc<CommandDispatcher>,
    replies: mpsc::UnboundedSender<Reply>,
) -> (mpsc::UnboundedSender<Vec<u8>>, JoinHandle<()>) {
    let dispatcher = Arc::clone(dispatcher);
    spawn_lane(move |payload| {
        let _ = replies.send(Reply::Multipliers(
            dispatcher.handle_multiplier_payload(payload),
        ));
    })
}

pub async fn run(
    dispatcher: Arc<CommandDispatcher>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let result = serve(&dispatcher).await;

    // Brake and release the hardware no matter how serving ended
    if let Err(e) = dispatcher.shutdown() {
        error!("Shutdown failed: {}", e);
    }
    result
}

async fn serve(
    dispatcher: &Arc<CommandDispatcher>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_control = session.declare_subscriber(TOPIC_CMD_CONTROL).await?;
    let sub_multipliers = session.declare_subscriber(TOPIC_CMD_MULTIPLIERS).await?;
    let pub_control = session.declare_publisher(TOPIC_STATE_CONTROL).await?;
    let pub_multipliers = session.declare_publisher(TOPIC_STATE_MULTIPLIERS).await?;
    let pub_status = session.declare_publisher(TOPIC_STATUS).await?;

    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Reply>();
    let (control_tx, control_worker) = control_lane(dispatcher, reply_tx.clone());
    let (multiplier_tx, multiplier_worker) = multiplier_lane(dispatcher, reply_tx);
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
    let mut status_tick = interval(STATUS_PERIOD);
    let mut stop = std::pin::pin!(shutdown_signal());

    info!("Runtime started: {}Hz loop", LOOP_HZ);
    info!("Subscribed to: {}, {}", TOPIC_CMD_CONTROL, TOPIC_CMD_MULTIPLIERS);
    info!(
        "Publishing to: {}, {}, {}",
        TOPIC_STATE_CONTROL, TOPIC_STATE_MULTIPLIERS, TOPIC_STATUS
    );

    loop {
        tokio::select! {
            _ = &mut stop => {
                info!("Shutting down...");
                break;
            }
            _ = status_tick.tick() => {
                let status_json = serde_json::to_string(&dispatcher.status())?;
                pub_status.put(status_json).await?;
                continue;
            }
            _ = tick.tick() => {}
        }

        // 1. Queue pending requests on their topic's worker
        while let Ok(Some(sample)) = sub_control.try_recv() {
            let _ = control_tx.send(sample.payload().to_bytes().into_owned());
        }
        while let Ok(Some(sample)) = sub_multipliers.try_recv() {
            let _ = multiplier_tx.send(sample.payload().to_bytes().into_owned());
        }

        // 2. Publish whatever replies are ready
        while let Ok(reply) = reply_rx.try_recv() {
            match reply {
                Reply::Control(resp) => {
                    pub_control.put(serde_json::to_string(&resp)?).await?;
                }
                Reply::Multipliers(resp) => {
                    pub_multipliers.put(serde_json::to_string(&resp)?).await?;
                }
            }
        }
    }

    // Let queued requests finish before the hardware is released
    drop(control_tx);
    drop(multiplier_tx);
    for worker in [control_worker, multiplier_worker] {
        if let Err(e) = worker.await {
            warn!("Request worker ended abnormally: {}", e);
        }
    }

    Ok(())
}
