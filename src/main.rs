// src/main.rs - Headless game runner
use anyhow::{Context, Result};
use clap::Parser;
use pick_kick::app::{EstimatorChoice, GameSession, SessionOptions, SourceChoice};
use pick_kick::config::AppConfig;
use pick_kick::coords::SurfaceSize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Pinch to pick, kick to bomb", long_about = None)]
struct Args {
    /// JSON config file (missing file = defaults)
    #[arg(short, long, default_value = "pick_kick.json")]
    config: PathBuf,

    /// Stop after this many captured frames
    #[arg(short, long)]
    frames: Option<u64>,

    /// Capture rate override
    #[arg(long)]
    fps: Option<f64>,

    /// Game surface width in pixels
    #[arg(long)]
    width: Option<f64>,

    /// Game surface height in pixels
    #[arg(long)]
    height: Option<f64>,

    /// Replay recorded pose observations instead of simulating them
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Read frames from a directory of images
    #[arg(long)]
    images: Option<PathBuf>,

    /// Capture from the camera
    #[cfg(feature = "camera")]
    #[arg(long, default_value_t = false)]
    camera: bool,

    /// Seed for target placement
    #[arg(long)]
    seed: Option<u64>,

    /// Skip writing session.csv / summary.json
    #[arg(long, default_value_t = false)]
    no_export: bool,

    /// Debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }
}

fn source_choice(args: &Args) -> SourceChoice {
    #[cfg(feature = "camera")]
    if args.camera {
        return SourceChoice::Camera;
    }

    match &args.images {
        Some(dir) => SourceChoice::Images {
            dir: dir.clone(),
            looping: false,
        },
        None => SourceChoice::Synthetic,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = AppConfig::load_or_default(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(fps) = args.fps {
        config.capture.fps = fps;
        config.simulation.fps = fps;
    }
    if args.width.is_some() || args.height.is_some() {
        let surface = config.game.surface;
        config.game.surface = SurfaceSize::new(
            args.width.unwrap_or(surface.width),
            args.height.unwrap_or(surface.height),
        );
    }
    config.validate()?;

    let estimator = match &args.replay {
        Some(path) => EstimatorChoice::Replay {
            path: path.clone(),
            looping: false,
        },
        None => EstimatorChoice::Simulated,
    }
    .build(&config)?;

    let options = SessionOptions {
        max_frames: args.frames,
        seed: args.seed,
        export: config.output.export_session && !args.no_export,
        session_name: None,
    };

    let session = GameSession::new(config, &options);
    let outcome = session.run(source_choice(&args), estimator, options).await?;

    let summary = &outcome.summary;
    info!(
        "Session {} finished: {} frames, {} picks, {} kicks, {} estimator failures",
        summary.session_name,
        summary.frames,
        summary.scores.picks,
        summary.scores.kicks,
        summary.estimator_failures
    );
    if let Some(dir) = &outcome.export_dir {
        println!("Session written to {}", dir.display());
    }
    println!("Picks: {}  Kicks: {}", summary.scores.picks, summary.scores.kicks);

    Ok(())
}
