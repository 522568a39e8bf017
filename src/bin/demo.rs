//! demo - deterministic replay of a driving scenario
//!
//! Runs the full monitoring loop against the synthetic camera with a scripted
//! detector and a fixed-step clock, so the same scenario always raises the
//! same alerts on the same frames.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use driver_watch::config::SourceSettings;
use driver_watch::detect::ScriptedBackend;
use driver_watch::{
    Condition, ConditionRules, Detection, FixedStepClock, Frame, FrameReport, Monitor,
    MonitorControl, PresentationSink, SyntheticSource,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Detection script (JSON). Defaults to the built-in scenario.
    #[arg(long, value_name = "PATH")]
    script: Option<PathBuf>,
    /// Simulated frames per second.
    #[arg(long, default_value_t = 10)]
    fps: u32,
}

/// Prints every fresh alert with its simulated timestamp.
struct EdgePrinter {
    fps: u32,
}

impl PresentationSink for EdgePrinter {
    fn present(
        &mut self,
        _frame: &Frame,
        _detections: &[Detection],
        report: &FrameReport,
    ) -> Result<()> {
        let t = report.frame_index as f64 / self.fps as f64;
        for condition in &report.alerts.raised {
            println!(
                "[{:>6.1}s] frame {:>4}: {}",
                t,
                report.frame_index,
                condition.alert_text()
            );
        }
        Ok(())
    }

    fn show_message(&mut self, message: &str) {
        println!("{}", message);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if args.fps == 0 {
        return Err(anyhow!("fps must be >= 1"));
    }

    let detector = match &args.script {
        Some(path) => {
            stage(&format!("load script {}", path.display()));
            ScriptedBackend::from_path(path)?
        }
        None => {
            stage("build built-in scenario");
            ScriptedBackend::new(builtin_scenario(args.fps))
        }
    };
    let total_frames = detector.remaining() as u64;

    let source = SyntheticSource::new(SourceSettings {
        url: "stub://demo".to_string(),
        target_fps: args.fps,
        width: 320,
        height: 240,
        max_frames: None,
    });

    stage(&format!(
        "replay {} frames at {} fps ({:.1}s simulated)",
        total_frames,
        args.fps,
        total_frames as f64 / args.fps as f64
    ));
    let mut monitor = Monitor::new(
        Box::new(source),
        Box::new(detector),
        Box::new(EdgePrinter { fps: args.fps }),
        ConditionRules::default(),
    )
    .with_clock(Box::new(FixedStepClock::from_fps(args.fps)))
    .with_max_frames(Some(total_frames));
    monitor.prepare()?;

    let control = MonitorControl::new();
    control.start();
    let summary = monitor.run(&control)?;

    println!();
    println!(
        "demo: {} frames, {} alert(s) ({:?})",
        summary.frames,
        summary.total_alerts(),
        summary.stop_reason
    );
    for condition in Condition::ALL {
        println!(
            "  {:<12} {}",
            condition.name(),
            summary.alerts_for(condition)
        );
    }
    Ok(())
}

/// A half-minute drive: each unsafe episode outlasts its persistence period,
/// separated by stretches of normal driving.
fn builtin_scenario(fps: u32) -> Vec<Vec<Detection>> {
    let belt = || Detection::new("seatbelt", 0.92);
    let segments: Vec<(f64, Vec<Detection>)> = vec![
        (3.0, vec![belt()]),
        (7.0, vec![belt(), Detection::new("closed eyes", 0.6)]),
        (2.0, vec![belt()]),
        (4.5, vec![belt(), Detection::new("cell phone", 0.8)]),
        (1.0, vec![belt()]),
        (7.0, vec![Detection::new("seatbelt", 0.2)]),
        (2.0, vec![belt()]),
        (4.5, vec![belt(), Detection::new("cigarette", 0.7)]),
        (2.0, vec![belt()]),
    ];

    let mut frames = Vec::new();
    for (seconds, detections) in segments {
        let count = (seconds * fps as f64).round() as usize;
        frames.extend(std::iter::repeat(detections).take(count));
    }
    frames
}

fn stage(msg: &str) {
    eprintln!("demo: {}", msg);
}
