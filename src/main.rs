use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use session_recorder::config::DEFAULT_CONFIG_PATH;
use session_recorder::{
    create_router, AppState, Config, Engine, EventKind, EventPayload, FsSessionStore, LogTrigger,
    OutputBus, SessionController, SessionState, SessionStore, ToneCaptureDevice,
};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::info;
use tracing_subscriber::EnvFilter;

const TONE_DEVICE: &str = "tone-generator";

#[derive(Parser)]
#[command(name = "session-recorder", about = "Record and replay audio sessions with event timelines")]
struct Cli {
    /// Config file (extension optional)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP control API
    Serve,
    /// Record a session from the tone generator
    Record {
        /// Seconds to record (capped by max_recording_secs)
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,
        /// Record a drum hit every N seconds
        #[arg(long)]
        hit_every: Option<f64>,
    },
    /// Load a stored session and replay it
    Replay { id: String },
    /// List stored sessions
    List,
    /// Show a stored session's format, length and events
    Info { id: String },
    /// Delete a stored session
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;
    info!("Loaded config: {}", cfg.service.name);
    info!("Sessions directory: {}", cfg.storage.sessions_path.display());

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Record { seconds, hit_every } => record(cfg, seconds, hit_every).await,
        Command::Replay { id } => replay(cfg, &id).await,
        Command::List => {
            let store = FsSessionStore::new(&cfg.storage.sessions_path);
            for id in store.list()? {
                println!("{}", id);
            }
            Ok(())
        }
        Command::Info { id } => info_command(cfg, &id),
        Command::Delete { id } => {
            FsSessionStore::new(&cfg.storage.sessions_path).delete(&id)?;
            println!("Deleted {}", id);
            Ok(())
        }
    }
}

fn build_controller(cfg: &Config) -> SessionController {
    SessionController::new(
        cfg.recorder.clone(),
        Box::new(ToneCaptureDevice::new(TONE_DEVICE, 440.0, 0.2)),
        Box::new(OutputBus::new(cfg.recorder.format())),
        Box::new(LogTrigger),
        Box::new(FsSessionStore::new(&cfg.storage.sessions_path)),
    )
}

async fn serve(cfg: Config) -> Result<()> {
    let (engine, task) = Engine::spawn(build_controller(&cfg), cfg.service.tick_interval());
    let app = create_router(AppState::new(engine));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("HTTP server failed")?;

    // The router (and its engine handle) is gone, so the engine winds down
    task.await.context("Engine task panicked")?;
    Ok(())
}

async fn record(cfg: Config, seconds: f64, hit_every: Option<f64>) -> Result<()> {
    let mut controller = build_controller(&cfg);
    let id = controller.start_recording()?;
    println!("Recording {} for {:.1}s (Ctrl-C to stop early)", id, seconds);

    let mut next_hit = hit_every.filter(|every| *every > 0.0).map(|_| 0.0);
    let result = drive(&cfg, &mut controller, |controller| {
        let elapsed = controller
            .session()
            .map(|s| s.elapsed().as_secs_f64())
            .unwrap_or(0.0);

        if let (Some(at), Some(every)) = (next_hit.as_mut(), hit_every) {
            if elapsed >= *at {
                controller.record(EventKind::DrumHit, EventPayload::new("kick", 0.8));
                *at += every;
            }
        }
        elapsed < seconds
    })
    .await;

    if controller.state() == SessionState::Recording {
        controller.stop_recording()?;
    }
    result?;

    let stats = controller.stats();
    println!(
        "Saved {}: {:.2}s of audio, {} events",
        id, stats.recorded_secs, stats.event_count
    );
    Ok(())
}

async fn replay(cfg: Config, id: &str) -> Result<()> {
    let mut controller = build_controller(&cfg);
    controller.load_recording(id)?;
    controller.play_recording()?;
    println!("Replaying {} (Ctrl-C to stop)", id);

    drive(&cfg, &mut controller, |_| true).await?;
    if controller.state() == SessionState::Playing {
        controller.stop_playback()?;
    }
    Ok(())
}

/// Tick the controller until it leaves its active state, `keep_going`
/// returns false, or Ctrl-C is pressed
async fn drive<F>(cfg: &Config, controller: &mut SessionController, mut keep_going: F) -> Result<()>
where
    F: FnMut(&mut SessionController) -> bool,
{
    let active = controller.state();
    let mut interval = time::interval(cfg.service.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while controller.state() == active && keep_going(controller) {
        tokio::select! {
            now = interval.tick() => {
                let delta: Duration = now.saturating_duration_since(last_tick);
                last_tick = now;
                controller.tick(delta)?;
            }
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }
    Ok(())
}

fn info_command(cfg: Config, id: &str) -> Result<()> {
    let mut controller = build_controller(&cfg);
    controller.load_recording(id)?;
    let Some(session) = controller.session() else {
        return Ok(());
    };

    let format = session.format();
    println!("Session:  {}", session.id());
    println!(
        "Format:   {}Hz, {} channel(s), {}-bit PCM",
        format.sample_rate, format.channels, format.bits_per_sample
    );
    println!("Length:   {:.2}s", session.samples().duration_secs());
    println!("Events:   {}", session.timeline().len());
    for event in session.timeline().sorted() {
        println!(
            "  {:>8.3}s  {:?}  {} ({:.2}){}",
            event.timestamp,
            event.kind,
            event.payload.identifier,
            event.payload.intensity,
            event
                .payload
                .sample
                .map(|s| format!(" [{}]", s))
                .unwrap_or_default()
        );
    }
    Ok(())
}
