//! Soundscape - plays a mix of ambient sounds from the command line.
//!
//! The engine is single-threaded, so everything runs on a current-thread
//! tokio runtime: the loop sleeps until the next scheduler deadline, dispatches
//! due tasks and exits on Ctrl+C after fading everything out.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use soundscape_core::playback::{AudioSink, PlaybackStrategyFactory};
use soundscape_core::prelude::*;

mod cast_log;

use cast_log::LoggingCastChannel;

/// Upper bound on a single sleep when nothing is scheduled.
const IDLE_WAIT: Duration = Duration::from_secs(1);

/// Command-line arguments for soundscape
#[derive(Parser, Debug)]
#[command(name = "soundscape")]
#[command(about = "Mix ambient sound loops and bursts")]
#[command(version)]
struct Args {
    /// Sound ids to play
    sounds: Vec<String>,

    /// Settings file
    #[arg(short, long, default_value = "soundscape.yaml", env = "SOUNDSCAPE_SETTINGS")]
    settings: PathBuf,

    /// Play a preset saved as JSON
    #[arg(short, long, conflicts_with_all = ["random", "sounds"])]
    preset: Option<PathBuf>,

    /// Play a random mix
    #[arg(short, long, conflicts_with = "sounds")]
    random: bool,

    /// Only pick sounds with this tag for a random mix
    #[arg(short, long, requires = "random")]
    tag: Option<String>,

    /// Save the mix as a preset JSON file on exit
    #[arg(long)]
    save: Option<PathBuf>,

    /// Send cast receiver messages to the log instead of playing locally
    #[arg(long)]
    cast_log: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = load_settings(&args.settings)
        .with_context(|| format!("Failed to load settings from {}", args.settings.display()))?;
    init_tracing(&settings.log_level)?;

    let catalog = CatalogLoader::new_with_dirs(settings.catalog_dirs.clone())
        .load_all()
        .context("Failed to load sound catalog")?;
    if catalog.is_empty() {
        bail!("No sounds found in {:?}", settings.catalog_dirs);
    }
    let catalog = Rc::new(catalog);

    let scheduler = Scheduler::with_system_clock();
    let factory: Rc<dyn PlaybackStrategyFactory> = if args.cast_log {
        Rc::new(CastPlaybackStrategyFactory::new(
            Rc::new(LoggingCastChannel),
            settings.cast_namespace.clone(),
        ))
    } else {
        Rc::new(LocalPlaybackStrategyFactory::new(
            open_output(),
            scheduler.clone(),
            settings.assets_dir.clone(),
        ))
    };

    let mut manager = PlaybackManager::new(
        Rc::clone(&catalog),
        factory,
        Box::new(DesktopFocus),
        scheduler.clone(),
    );
    manager.add_listener(Box::new(log_update));

    if let Some(preset) = initial_preset(&args, &settings, &catalog)? {
        info!("Starting preset with {} sounds", preset.player_states().len());
        manager.play_preset(&preset).context("Failed to play preset")?;
    } else {
        for id in &args.sounds {
            manager
                .play(Some(id))
                .with_context(|| format!("Failed to play '{}'", id))?;
        }
    }

    if manager.state() == PlaybackState::Stopped {
        warn!("Nothing to play");
        return Ok(());
    }

    run(&mut manager, &scheduler).await?;

    if let Some(path) = &args.save {
        save_preset(&manager, path)?;
    }

    manager.stop(None)?;
    drain(&mut manager, &scheduler).await;
    info!("Shutdown complete");
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    let directive = level
        .parse()
        .with_context(|| format!("Invalid log level '{}'", level))?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive));
    tracing_subscriber::registry().with(fmt_layer).init();
    Ok(())
}

/// Opens the default audio device, or renders nothing when there is none.
fn open_output() -> Rc<dyn AudioSink> {
    match KiraOutput::new() {
        Ok(output) => Rc::new(output),
        Err(e) => {
            warn!("{}; continuing without audio output", e);
            Rc::new(SilentOutput)
        }
    }
}

fn initial_preset(args: &Args, settings: &Settings, catalog: &Catalog) -> Result<Option<Preset>> {
    if let Some(path) = &args.preset {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read preset {}", path.display()))?;
        return Ok(Some(Preset::from_json(&json)?));
    }
    if args.random {
        let preset = Preset::random(
            catalog,
            args.tag.as_deref(),
            settings.random_intensity.as_range(),
            &mut rand::thread_rng(),
        );
        return Ok(Some(preset));
    }
    Ok(None)
}

fn log_update(update: &PlaybackUpdate) {
    let players = serde_json::to_string(&update.players).unwrap_or_default();
    info!("{:?}: {}", update.state, players);
}

fn save_preset(manager: &PlaybackManager, path: &Path) -> Result<()> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let preset = Preset::from_players(name, manager.players());
    fs::write(path, preset.to_json()?)
        .with_context(|| format!("Failed to write preset {}", path.display()))?;
    info!("Saved preset to {}", path.display());
    Ok(())
}

fn time_until_next(manager: &PlaybackManager, scheduler: &Scheduler) -> Duration {
    manager
        .next_deadline()
        .map(|due| due.saturating_sub(scheduler.now()))
        .unwrap_or(IDLE_WAIT)
        .min(IDLE_WAIT)
}

/// Dispatches scheduler tasks until Ctrl+C.
async fn run(manager: &mut PlaybackManager, scheduler: &Scheduler) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        manager.run_pending();
        let wait = time_until_next(manager, scheduler);
        tokio::select! {
            result = &mut shutdown => {
                result.context("Failed to listen for Ctrl+C")?;
                info!("Received Ctrl+C, fading out");
                return Ok(());
            }
            _ = tokio::time::sleep(wait) => {}
        }
    }
}

/// Keeps fades running until every stopped sound has been released.
async fn drain(manager: &mut PlaybackManager, scheduler: &Scheduler) {
    while manager.is_releasing() {
        tokio::time::sleep(time_until_next(manager, scheduler)).await;
        manager.run_pending();
    }
}
