//! Monitoring session state.
//!
//! A `MonitoringSession` owns the alert engine and the previous frame
//! timestamp. It is created when monitoring starts and dropped when it stops,
//! so every start begins with all timers at zero.

use std::time::{Duration, Instant};

use crate::condition::ConditionRules;
use crate::detect::Detection;
use crate::engine::{AlertEngine, FrameAlerts};
use crate::score::ConditionScores;

/// Source of "now" for delta-time computation.
pub trait Clock {
    fn now(&mut self) -> Instant;
}

/// Wall clock (monotonic).
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&mut self) -> Instant {
        Instant::now()
    }
}

/// Clock that advances by a fixed step on every read after the first.
///
/// Used for deterministic replays: with a step of `1/fps` every frame sees
/// the same delta regardless of how long detection actually took.
#[derive(Clone, Debug)]
pub struct FixedStepClock {
    current: Instant,
    step: Duration,
    started: bool,
}

impl FixedStepClock {
    pub fn new(step: Duration) -> Self {
        Self {
            current: Instant::now(),
            step,
            started: false,
        }
    }

    pub fn from_fps(fps: u32) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / fps.max(1) as f64))
    }
}

impl Clock for FixedStepClock {
    fn now(&mut self) -> Instant {
        if self.started {
            self.current += self.step;
        } else {
            self.started = true;
        }
        self.current
    }
}

/// Result of stepping the session by one frame.
#[derive(Clone, Debug)]
pub struct FrameReport {
    /// 1-based index of the frame within this session.
    pub frame_index: u64,
    /// Delta since the previous frame (or session start).
    pub dt: Duration,
    pub scores: ConditionScores,
    pub alerts: FrameAlerts,
}

pub struct MonitoringSession {
    engine: AlertEngine,
    prev: Instant,
    frames: u64,
}

impl MonitoringSession {
    /// Start a session at `now`. The first frame's delta is measured from here.
    pub fn start(rules: ConditionRules, now: Instant) -> Self {
        Self {
            engine: AlertEngine::new(rules),
            prev: now,
            frames: 0,
        }
    }

    /// Score, debounce and report one frame's detections.
    pub fn step(&mut self, detections: &[Detection], now: Instant) -> FrameReport {
        let scores = ConditionScores::from_detections(detections);
        let dt = now.saturating_duration_since(self.prev);
        self.prev = now;
        self.step_scores(scores, dt)
    }

    /// Advance with precomputed scores and an explicit delta.
    pub fn step_scores(&mut self, scores: ConditionScores, dt: Duration) -> FrameReport {
        self.frames += 1;
        let alerts = self.engine.advance(&scores, dt);
        FrameReport {
            frame_index: self.frames,
            dt,
            scores,
            alerts,
        }
    }

    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}
