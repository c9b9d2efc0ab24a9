//! Headless presentation replay tool
//!
//! Loads a script (or the built-in demo), prints its table of contents,
//! jumps to a position and plays from there against a simulated media
//! clock, logging every display call.

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam::channel::Receiver;
use pv_core::{EngineConfig, JumpOutcome, MediaTime, Notification, PresenterSession};
use pv_data::{spawn_load_async, JsonlSource, LoadOptions, ScriptSource, VecSource};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod console;
mod demo;
mod media;

use console::ConsoleSink;
use media::SimulatedMediaClock;

/// Replay a recorded presentation without a display
#[derive(Parser, Debug)]
#[command(name = "pvreplay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON-lines script to load (default: built-in demo)
    #[arg(long, short = 's')]
    script: Option<PathBuf>,

    /// Engine configuration as JSON
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Position to jump to before playing, in seconds
    #[arg(long, short = 'j', default_value = "0")]
    jump: f64,

    /// Seconds of media to play after the jump
    #[arg(long, short = 'p', default_value = "0")]
    play: f64,

    /// Slide image base URL, overriding the script
    #[arg(long)]
    base_url: Option<String>,

    /// Slide image extension, overriding the script
    #[arg(long)]
    extension: Option<String>,

    /// Do not build a table of contents
    #[arg(long)]
    no_toc: bool,

    /// Write the demo script to this file and exit
    #[arg(long)]
    write_demo: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if let Some(path) = &args.write_demo {
        write_demo(path)?;
        info!("Demo script written to {}", path.display());
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => read_config(path)?,
        None => EngineConfig::default(),
    };

    let sink = Arc::new(ConsoleSink::new());
    let (session, notifications) = PresenterSession::new(config, sink.clone())?;
    let session = Arc::new(session);
    let logger = spawn_notification_logger(notifications)?;

    let options = LoadOptions {
        base_url: args.base_url.clone(),
        extension: args.extension.clone(),
        no_auto_toc: args.no_toc,
        ..LoadOptions::default()
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let script = args.script.clone();
    let loaded = runtime.block_on(spawn_load_async(session.clone(), options, move || open_source(script)));
    match &loaded {
        Ok(report) => {
            if let Some(version) = &report.preferred_viewer_version {
                info!("Script prefers viewer version {}", version);
            }
        }
        Err(e) => warn!("Running without presentation data: {}", e),
    }

    print_toc(&session);

    let to = MediaTime::from_secs_f64(args.jump.max(0.0));
    match session.jump(MediaTime::ZERO, to)? {
        JumpOutcome::Unloaded => warn!("Nothing to jump to at {}", to),
        JumpOutcome::Replayed {
            direction, replayed, ..
        } => info!("Jumped {:?} to {}, replaying {} records", direction, to, replayed),
    }
    session.wait_idle(Duration::from_secs(5));

    if args.play > 0.0 {
        let end = session
            .timeline()
            .and_then(|timeline| timeline.log().end_time())
            .unwrap_or(to);
        let play_until = to + Duration::from_secs_f64(args.play);
        let media = Arc::new(SimulatedMediaClock::new(to, if end > play_until { play_until } else { end }));

        session.start_clock(media.clone())?;
        media.play();
        std::thread::sleep(Duration::from_secs_f64(args.play));
        media.pause();
        session.stop_clock();
        session.wait_idle(Duration::from_secs(5));
        info!("Played to {}", session.position());
    }

    info!("{} display updates applied", sink.applied());
    session.shutdown();
    drop(session);
    if logger.join().is_err() {
        error!("Notification logger panicked");
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<EngineConfig> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: EngineConfig =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn open_source(script: Option<PathBuf>) -> pv_data::DataResult<Box<dyn ScriptSource>> {
    match script {
        Some(path) => Ok(Box::new(JsonlSource::open(path)?)),
        None => {
            let items = demo::demo_script().map_err(|e| pv_data::DataError::Source(e.to_string()))?;
            Ok(Box::new(VecSource::new("demo", items)))
        }
    }
}

fn write_demo(path: &Path) -> Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    for item in demo::demo_script()? {
        serde_json::to_writer(&mut file, &item)?;
        writeln!(file)?;
    }
    file.flush()?;
    Ok(())
}

fn print_toc(session: &PresenterSession) {
    let Some(timeline) = session.timeline() else {
        return;
    };
    match timeline.toc() {
        Some(toc) => {
            println!("Table of contents:");
            for entry in toc.entries() {
                println!("  {}", entry.text());
            }
        }
        None => println!("No table of contents"),
    }
}

/// Log notifications until every sender is gone
fn spawn_notification_logger(notifications: Receiver<Notification>) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("pv-notifications".to_string())
        .spawn(move || {
            for notification in notifications.iter() {
                match notification {
                    Notification::LoadProgress(percent) => debug!("load {}%", percent),
                    other => info!("notification: {:?}", other),
                }
            }
        })
}
