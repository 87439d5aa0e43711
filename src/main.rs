use clap::Parser;
use log::info;
use std::path::PathBuf;

use roiwatch::config::{EnvFileStore, GENERAL_CONFIG_FILE, GEOMETRY_FILE, Settings};
use roiwatch::io::{
    DirectorySource, FrameSource, ImageDirSink, KeySource, LogSink, RenderSink, ScriptedKeys,
    StdinKeys, ThreadedSource,
};
use roiwatch::{FramePipeline, Monitor};

#[derive(Parser)]
#[command(name = "roiwatch")]
#[command(about = "Detect and count motion inside a resizable region of a video feed")]
struct Cli {
    /// Directory of frames to process, in file name order
    #[arg(long, value_name = "DIR")]
    frames: PathBuf,

    /// General configuration file (key bindings, tuning)
    #[arg(long, value_name = "FILE", default_value = GENERAL_CONFIG_FILE)]
    config: PathBuf,

    /// ROI geometry file, rewritten after every frame
    #[arg(long, value_name = "FILE", default_value = GEOMETRY_FILE)]
    geometry: PathBuf,

    /// Scripted key presses, one per frame ('.' = none, '\e' = ESC)
    #[arg(long, value_name = "SCRIPT", conflicts_with = "stdin_keys")]
    keys: Option<String>,

    /// Read key presses from stdin
    #[arg(long)]
    stdin_keys: bool,

    /// Decode frames on a separate thread
    #[arg(long)]
    threaded: bool,

    /// Write annotated frames and masks to this directory
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Save per-frame intermediate stages to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let settings = Settings::load(&args.config, &args.geometry);
    info!(
        "ROI {}x{} offset ({}, {})",
        settings.geometry.width,
        settings.geometry.height,
        settings.geometry.x_offset,
        settings.geometry.y_offset
    );

    let mut pipeline = FramePipeline::from_settings(&settings).with_verbose(args.verbose);
    if let Some(debug_dir) = args.debug_out {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let directory = DirectorySource::new(&args.frames)?;
    let source: Box<dyn FrameSource> = if args.threaded {
        Box::new(ThreadedSource::spawn(directory))
    } else {
        Box::new(directory)
    };

    let keys: Box<dyn KeySource> = if args.stdin_keys {
        Box::new(StdinKeys::spawn())
    } else {
        let script = args.keys.as_deref().unwrap_or_default();
        Box::new(ScriptedKeys::parse(script).with_pacing(true))
    };

    let sink: Box<dyn RenderSink> = match args.out {
        Some(dir) => Box::new(ImageDirSink::new(dir)?),
        None => Box::new(LogSink::new()),
    };

    let store = Box::new(EnvFileStore::new(&args.geometry));

    let mut monitor = Monitor::new(&settings, pipeline, source, keys, sink, store);
    let summary = monitor.run()?;

    let geometry = monitor.state().geometry;
    println!("\n=== Motion Monitor ===");
    println!("Frames processed: {}", summary.frames);
    println!("Stopped: {:?}", summary.reason);
    println!("Final ROI: {}x{}", geometry.width, geometry.height);

    Ok(())
}
