//! driver_watch - live driver monitoring
//!
//! This binary:
//! 1. Loads configuration (file from DRIVER_WATCH_CONFIG or --config, then env overrides)
//! 2. Opens the cabin camera and the configured detector
//! 3. Runs the monitoring loop until Ctrl-C, the frame limit or a camera failure
//! 4. Prints a per-condition alert summary

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use driver_watch::config::MonitorConfig;
use driver_watch::detect::build_backend;
use driver_watch::ingest::open_source;
use driver_watch::present::{AudioCue, ConsoleSink, FanoutSink, PresentationSink};
use driver_watch::ui::Ui;
use driver_watch::{Condition, Monitor, MonitorControl, RunSummary};

#[derive(Parser, Debug)]
#[command(
    name = "driver_watch",
    about = "Watch a cabin camera for drowsiness, missing seatbelt, smoking and phone use"
)]
struct Args {
    /// Config file (JSON or TOML). Overrides DRIVER_WATCH_CONFIG.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(long, value_name = "N")]
    frames: Option<u64>,

    /// Disable the audio cue.
    #[arg(long)]
    no_sound: bool,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let mut cfg = {
        let _stage = ui.stage("Load configuration");
        match args.config.as_deref() {
            Some(path) => MonitorConfig::load_from(Some(path))?,
            None => MonitorConfig::load()?,
        }
    };
    if args.frames.is_some() {
        cfg.source.max_frames = args.frames;
    }
    if args.no_sound {
        cfg.alerts.sound_path = None;
    }

    let source = {
        let _stage = ui.stage("Open camera");
        let mut source = open_source(&cfg.source)?;
        source.connect().context("connect frame source")?;
        source
    };
    let detector = {
        let _stage = ui.stage("Load detector");
        let mut detector = build_backend(&cfg.detector)?;
        detector.warm_up()?;
        detector
    };

    let sink = build_sink(&cfg, &ui)?;
    let control = MonitorControl::new();
    let handler_control = control.clone();
    ctrlc::set_handler(move || {
        handler_control.stop();
    })
    .context("error setting Ctrl-C handler")?;

    log::info!(
        "driver_watch running: source={} detector={} fps={}",
        cfg.source.url,
        cfg.detector.backend,
        cfg.source.target_fps
    );
    for rule in cfg.rules.iter() {
        log::info!(
            "rule {}: {:?} {} for more than {:?}",
            rule.condition,
            rule.condition.direction(),
            rule.threshold,
            rule.persist
        );
    }
    log::info!("press Ctrl-C to stop");

    let mut monitor = Monitor::new(source, detector, sink, cfg.rules)
        .with_max_frames(cfg.source.max_frames)
        .with_pacing(pacing_fps(&cfg));
    control.start();
    let summary = monitor.run(&control)?;

    print_summary(&summary);
    Ok(())
}

fn build_sink(cfg: &MonitorConfig, ui: &Ui) -> Result<Box<dyn PresentationSink>> {
    let audio = AudioCue::from_settings(&cfg.alerts);
    if audio.is_none() {
        log::info!("audio cue disabled");
    }
    let sink = FanoutSink::new().with(Box::new(ConsoleSink::new(ui.status_line(), audio)));

    #[cfg(feature = "preview")]
    let sink = match &cfg.preview_path {
        Some(path) => {
            log::info!("writing live preview to {}", path.display());
            sink.with(Box::new(driver_watch::present::PreviewSink::new(path)))
        }
        None => sink,
    };
    #[cfg(not(feature = "preview"))]
    if let Some(path) = &cfg.preview_path {
        log::warn!(
            "preview_path {} ignored: built without the preview feature",
            path.display()
        );
    }

    Ok(Box::new(sink))
}

/// Only the synthetic source needs pacing; a camera blocks until its next frame.
fn pacing_fps(cfg: &MonitorConfig) -> Option<u32> {
    cfg.source
        .url
        .starts_with("stub://")
        .then_some(cfg.source.target_fps)
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("driver_watch: stopped ({:?})", summary.stop_reason);
    println!(
        "  frames: {} in {:.1}s",
        summary.frames,
        summary.elapsed.as_secs_f64()
    );
    for condition in Condition::ALL {
        println!(
            "  {:<12} {} alert(s)",
            condition.name(),
            summary.alerts_for(condition)
        );
    }
}
