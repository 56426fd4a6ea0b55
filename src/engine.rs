// Host loop for the session controller
//
// The engine task is the single tick thread: it owns the controller, ticks it
// on a fixed interval and runs queued jobs between ticks. Every producer
// (HTTP handlers, CLI) reaches the controller through an `EngineHandle`, so
// event recording and ticks never interleave.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::session::{SessionController, SessionState};

type Job = Box<dyn FnOnce(&mut SessionController) + Send>;

/// Cloneable handle for sending work to the engine task
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Job>,
}

impl EngineHandle {
    /// Run `f` against the controller on the engine task and return its result
    pub async fn call<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut SessionController) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |controller| {
            // The caller may have given up waiting
            let _ = reply_tx.send(f(controller));
        });

        self.tx
            .send(job)
            .await
            .map_err(|_| anyhow!("Engine is not running"))?;
        reply_rx.await.context("Engine dropped the request")
    }
}

pub struct Engine;

impl Engine {
    /// Spawn the engine task
    ///
    /// The task runs until every handle is dropped, then stops any active
    /// recording (saving it) or playback and returns the controller.
    pub fn spawn(
        controller: SessionController,
        tick_interval: Duration,
    ) -> (EngineHandle, JoinHandle<SessionController>) {
        let (tx, rx) = mpsc::channel(100);
        let task = tokio::spawn(run(controller, tick_interval, rx));
        (EngineHandle { tx }, task)
    }
}

async fn run(
    mut controller: SessionController,
    tick_interval: Duration,
    mut rx: mpsc::Receiver<Job>,
) -> SessionController {
    info!("Engine started ({}ms ticks)", tick_interval.as_millis());

    let mut interval = time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            now = interval.tick() => {
                let delta = now.saturating_duration_since(last_tick);
                last_tick = now;
                if let Err(e) = controller.tick(delta) {
                    error!("Tick failed: {}", e);
                }
            }
            job = rx.recv() => match job {
                Some(job) => job(&mut controller),
                None => break,
            },
        }
    }

    match controller.state() {
        SessionState::Recording => {
            info!("Engine shutting down, saving active recording");
            if let Err(e) = controller.stop_recording() {
                error!("Failed to save recording on shutdown: {}", e);
            }
        }
        SessionState::Playing => {
            if let Err(e) = controller.stop_playback() {
                error!("Failed to stop playback on shutdown: {}", e);
            }
        }
        SessionState::Idle | SessionState::Stopped => {}
    }

    info!("Engine stopped");
    controller
}
