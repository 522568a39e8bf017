//! The monitoring loop.
//!
//! One iteration per frame, run to completion before the next frame is
//! pulled:
//!
//! 1. Check the run flag (the only state touched from outside the loop)
//! 2. Capture a frame; no frame ends the session
//! 3. Run the detector
//! 4. Step the session (score, debounce) with the current clock reading
//! 5. Hand frame, detections and report to the presentation sink
//!
//! Stopping takes effect at the next iteration boundary; an in-flight
//! detector call is never interrupted.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::condition::{Condition, ConditionRules};
use crate::detect::DetectorBackend;
use crate::ingest::FrameSource;
use crate::present::PresentationSink;
use crate::session::{Clock, MonitoringSession, SystemClock};

const FRAME_FAILURE_MESSAGE: &str = "Failed to grab frame";
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Shared start/stop flag. Clones refer to the same flag.
#[derive(Clone, Debug, Default)]
pub struct MonitorControl {
    running: Arc<AtomicBool>,
}

impl MonitorControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Flip the flag; returns the new state.
    pub fn toggle(&self) -> bool {
        !self.running.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The run flag was cleared.
    Stopped,
    /// The frame limit was reached.
    FrameLimit,
    /// The source delivered no frame (or failed to capture one).
    FrameUnavailable,
}

/// Outcome of one monitoring session.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub frames: u64,
    pub alerts: BTreeMap<Condition, u64>,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn alerts_for(&self, condition: Condition) -> u64 {
        self.alerts.get(&condition).copied().unwrap_or(0)
    }

    pub fn total_alerts(&self) -> u64 {
        self.alerts.values().sum()
    }
}

/// Wires a frame source, detector and presentation sink into a session loop.
pub struct Monitor {
    source: Box<dyn FrameSource>,
    detector: Box<dyn DetectorBackend>,
    sink: Box<dyn PresentationSink>,
    clock: Box<dyn Clock>,
    rules: ConditionRules,
    max_frames: Option<u64>,
    pacing: Option<Duration>,
}

impl Monitor {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn DetectorBackend>,
        sink: Box<dyn PresentationSink>,
        rules: ConditionRules,
    ) -> Self {
        Self {
            source,
            detector,
            sink,
            clock: Box::new(SystemClock),
            rules,
            max_frames: None,
            pacing: None,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Stop cleanly after this many frames.
    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Minimum wall time per iteration, for sources that do not block.
    pub fn with_pacing(mut self, target_fps: Option<u32>) -> Self {
        self.pacing = target_fps
            .filter(|fps| *fps > 0)
            .map(|fps| Duration::from_secs_f64(1.0 / fps as f64));
        self
    }

    /// Connect the source and warm up the detector.
    pub fn prepare(&mut self) -> Result<()> {
        self.source.connect().context("connect frame source")?;
        self.detector
            .warm_up()
            .with_context(|| format!("warm up {} detector", self.detector.name()))?;
        Ok(())
    }

    /// Run one session until the flag clears, the frame limit is reached or
    /// the source stops delivering frames. Session state is discarded on
    /// return; the next call starts from zero.
    pub fn run(&mut self, control: &MonitorControl) -> Result<RunSummary> {
        let started = Instant::now();
        let mut session = MonitoringSession::start(self.rules, self.clock.now());
        let mut alerts: BTreeMap<Condition, u64> = BTreeMap::new();
        let mut last_health_log = Instant::now();

        log::info!(
            "monitoring started: source={} detector={}",
            self.source.stats().url,
            self.detector.name()
        );

        let stop_reason = loop {
            if !control.is_running() {
                break StopReason::Stopped;
            }
            if self.max_frames.is_some_and(|max| session.frames() >= max) {
                break StopReason::FrameLimit;
            }
            let iteration_start = Instant::now();

            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::error!("frame source returned no frame; ending session");
                    self.sink.show_message(FRAME_FAILURE_MESSAGE);
                    break StopReason::FrameUnavailable;
                }
                Err(err) => {
                    log::error!("frame capture failed: {:#}; ending session", err);
                    self.sink.show_message(FRAME_FAILURE_MESSAGE);
                    break StopReason::FrameUnavailable;
                }
            };

            let detections = self
                .detector
                .detect(&frame)
                .with_context(|| format!("{} detector failed", self.detector.name()))?;

            let report = session.step(&detections, self.clock.now());
            for condition in &report.alerts.raised {
                *alerts.entry(*condition).or_insert(0) += 1;
            }

            self.sink.present(&frame, &detections, &report)?;

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = self.source.stats();
                log::info!(
                    "source health={} frames={} url={}",
                    self.source.is_healthy(),
                    stats.frames_captured,
                    stats.url
                );
                last_health_log = Instant::now();
            }

            if let Some(pacing) = self.pacing {
                let spent = iteration_start.elapsed();
                if spent < pacing {
                    std::thread::sleep(pacing - spent);
                }
            }
        };

        let summary = RunSummary {
            frames: session.frames(),
            alerts,
            stop_reason,
            elapsed: started.elapsed(),
        };
        log::info!(
            "monitoring stopped ({:?}) after {} frames, {} alerts",
            summary.stop_reason,
            summary.frames,
            summary.total_alerts()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceSettings;
    use crate::detect::{Detection, ScriptedBackend, StubBackend};
    use crate::frame::Frame;
    use crate::ingest::{SourceStats, SyntheticSource};
    use crate::session::{FixedStepClock, FrameReport};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorded {
        frames: Vec<FrameReport>,
        messages: Vec<String>,
    }

    /// Sink that records into shared state and can clear the run flag.
    struct RecordingSink {
        recorded: Arc<Mutex<Recorded>>,
        stop_after: Option<(u64, MonitorControl)>,
    }

    impl PresentationSink for RecordingSink {
        fn present(
            &mut self,
            _frame: &Frame,
            _detections: &[Detection],
            report: &FrameReport,
        ) -> Result<()> {
            self.recorded.lock().unwrap().frames.push(report.clone());
            if let Some((after, control)) = &self.stop_after {
                if report.frame_index >= *after {
                    control.stop();
                }
            }
            Ok(())
        }

        fn show_message(&mut self, message: &str) {
            self.recorded.lock().unwrap().messages.push(message.to_string());
        }
    }

    struct FailingSource;

    impl FrameSource for FailingSource {
        fn connect(&mut self) -> Result<()> {
            Ok(())
        }

        fn next_frame(&mut self) -> Result<Option<Frame>> {
            anyhow::bail!("device unplugged")
        }

        fn is_healthy(&self) -> bool {
            false
        }

        fn stats(&self) -> SourceStats {
            SourceStats {
                frames_captured: 0,
                url: "failing".to_string(),
            }
        }
    }

    fn stub_source(max_frames: Option<u64>) -> Box<dyn FrameSource> {
        Box::new(SyntheticSource::new(SourceSettings {
            url: "stub://test".to_string(),
            target_fps: 10,
            width: 8,
            height: 8,
            max_frames,
        }))
    }

    fn recording_sink(
        stop_after: Option<(u64, MonitorControl)>,
    ) -> (Box<dyn PresentationSink>, Arc<Mutex<Recorded>>) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let sink = RecordingSink {
            recorded: recorded.clone(),
            stop_after,
        };
        (Box::new(sink), recorded)
    }

    fn one_second_clock() -> Box<dyn Clock> {
        Box::new(FixedStepClock::new(Duration::from_secs(1)))
    }

    #[test]
    fn control_toggle_flips_flag() {
        let control = MonitorControl::new();
        assert!(!control.is_running());
        assert!(control.toggle());
        assert!(control.clone().is_running());
        assert!(!control.toggle());
        control.start();
        control.stop();
        assert!(!control.is_running());
    }

    #[test]
    fn cleared_flag_runs_no_frames() -> Result<()> {
        let (sink, recorded) = recording_sink(None);
        let mut monitor = Monitor::new(
            stub_source(None),
            Box::new(StubBackend::new()),
            sink,
            ConditionRules::default(),
        );
        let summary = monitor.run(&MonitorControl::new())?;

        assert_eq!(summary.stop_reason, StopReason::Stopped);
        assert_eq!(summary.frames, 0);
        assert!(recorded.lock().unwrap().frames.is_empty());
        Ok(())
    }

    #[test]
    fn stop_takes_effect_at_next_iteration() -> Result<()> {
        let control = MonitorControl::new();
        control.start();
        let (sink, recorded) = recording_sink(Some((3, control.clone())));
        let mut monitor = Monitor::new(
            stub_source(None),
            Box::new(StubBackend::new()),
            sink,
            ConditionRules::default(),
        )
        .with_clock(one_second_clock());
        monitor.prepare()?;
        let summary = monitor.run(&control)?;

        assert_eq!(summary.stop_reason, StopReason::Stopped);
        assert_eq!(summary.frames, 3);
        assert_eq!(recorded.lock().unwrap().frames.len(), 3);
        Ok(())
    }

    #[test]
    fn missing_frame_ends_session_with_message() -> Result<()> {
        let control = MonitorControl::new();
        control.start();
        let (sink, recorded) = recording_sink(None);
        let mut monitor = Monitor::new(
            stub_source(Some(2)),
            Box::new(StubBackend::new()),
            sink,
            ConditionRules::default(),
        )
        .with_clock(one_second_clock());
        let summary = monitor.run(&control)?;

        assert_eq!(summary.stop_reason, StopReason::FrameUnavailable);
        assert_eq!(summary.frames, 2);
        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.messages, vec!["Failed to grab frame".to_string()]);
        assert_eq!(recorded.frames.len(), 2);
        Ok(())
    }

    #[test]
    fn capture_error_is_treated_as_missing_frame() -> Result<()> {
        let control = MonitorControl::new();
        control.start();
        let (sink, recorded) = recording_sink(None);
        let mut monitor = Monitor::new(
            Box::new(FailingSource),
            Box::new(StubBackend::new()),
            sink,
            ConditionRules::default(),
        );
        let summary = monitor.run(&control)?;

        assert_eq!(summary.stop_reason, StopReason::FrameUnavailable);
        assert_eq!(summary.frames, 0);
        assert_eq!(recorded.lock().unwrap().messages.len(), 1);
        Ok(())
    }

    #[test]
    fn counts_alerts_per_condition() -> Result<()> {
        let control = MonitorControl::new();
        control.start();
        let smoking = vec![
            Detection::new("cigarette", 0.8),
            Detection::new("seatbelt", 0.9),
        ];
        let mut script = vec![smoking.clone(); 5];
        script.push(vec![Detection::new("seatbelt", 0.9)]);
        script.extend(vec![smoking; 4]);
        let (sink, recorded) = recording_sink(None);
        let mut monitor = Monitor::new(
            stub_source(None),
            Box::new(ScriptedBackend::new(script)),
            sink,
            ConditionRules::default(),
        )
        .with_clock(one_second_clock())
        .with_max_frames(Some(10));
        let summary = monitor.run(&control)?;

        assert_eq!(summary.stop_reason, StopReason::FrameLimit);
        assert_eq!(summary.frames, 10);
        assert_eq!(summary.alerts_for(Condition::Smoking), 2);
        assert_eq!(summary.alerts_for(Condition::NoSeatbelt), 0);
        assert_eq!(summary.total_alerts(), 2);

        let recorded = recorded.lock().unwrap();
        let cue_frames: Vec<u64> = recorded
            .frames
            .iter()
            .filter(|r| r.alerts.should_cue())
            .map(|r| r.frame_index)
            .collect();
        assert_eq!(cue_frames, vec![4, 10]);
        Ok(())
    }
}
