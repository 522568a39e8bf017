//! Debounce/alert engine.
//!
//! One persistence timer per condition, all advanced in lockstep by the same
//! per-frame delta:
//!
//! ```text
//! Inactive (d == 0) -> Accumulating (0 < d <= persist) -> Alerting (d > persist)
//! ```
//!
//! A frame where the activation rule fails snaps the timer back to zero.
//! Entering `Alerting` raises exactly one alert; staying there raises none.
//! The engine has no side effects: callers get the rising edges and the
//! currently alerting conditions back from `advance`.

use std::time::Duration;

use crate::condition::{Condition, ConditionRule, ConditionRules};
use crate::score::ConditionScores;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Inactive,
    Accumulating,
    Alerting,
}

/// Persistence timer for a single condition.
#[derive(Clone, Debug)]
pub struct ConditionTimer {
    rule: ConditionRule,
    duration: Duration,
    signaled: bool,
}

impl ConditionTimer {
    pub fn new(rule: ConditionRule) -> Self {
        Self {
            rule,
            duration: Duration::ZERO,
            signaled: false,
        }
    }

    pub fn rule(&self) -> &ConditionRule {
        &self.rule
    }

    /// Continuous time the condition has been active.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// True while the current over-threshold episode has been signaled.
    pub fn signaled(&self) -> bool {
        self.signaled
    }

    pub fn state(&self) -> TimerState {
        if self.duration.is_zero() {
            TimerState::Inactive
        } else if self.duration > self.rule.persist {
            TimerState::Alerting
        } else {
            TimerState::Accumulating
        }
    }

    /// Advance by one frame. Returns true on the rising edge into `Alerting`.
    pub fn advance(&mut self, score: f32, dt: Duration) -> bool {
        if self.rule.is_active(score) {
            self.duration = self.duration.saturating_add(dt);
        } else {
            self.duration = Duration::ZERO;
        }

        if self.duration > self.rule.persist {
            if self.signaled {
                false
            } else {
                self.signaled = true;
                true
            }
        } else {
            self.signaled = false;
            false
        }
    }

    pub fn reset(&mut self) {
        self.duration = Duration::ZERO;
        self.signaled = false;
    }
}

/// What the engine decided for one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameAlerts {
    /// Conditions that entered `Alerting` on this frame.
    pub raised: Vec<Condition>,
    /// Conditions in `Alerting` after this frame (includes `raised`).
    pub alerting: Vec<Condition>,
}

impl FrameAlerts {
    /// Start a new audio cue this frame.
    pub fn should_cue(&self) -> bool {
        !self.raised.is_empty()
    }

    /// Alert strings for the conditions currently alerting.
    pub fn alert_texts(&self) -> Vec<&'static str> {
        self.alerting.iter().map(|c| c.alert_text()).collect()
    }
}

/// Four condition timers driven by a shared frame clock.
#[derive(Clone, Debug)]
pub struct AlertEngine {
    timers: [ConditionTimer; 4],
}

impl AlertEngine {
    pub fn new(rules: ConditionRules) -> Self {
        Self {
            timers: Condition::ALL.map(|c| ConditionTimer::new(*rules.get(c))),
        }
    }

    pub fn timer(&self, condition: Condition) -> &ConditionTimer {
        &self.timers[condition.index()]
    }

    /// Advance every timer by `dt` using this frame's scores.
    pub fn advance(&mut self, scores: &ConditionScores, dt: Duration) -> FrameAlerts {
        let mut alerts = FrameAlerts::default();
        for condition in Condition::ALL {
            let timer = &mut self.timers[condition.index()];
            if timer.advance(scores.get(condition), dt) {
                alerts.raised.push(condition);
            }
            if timer.state() == TimerState::Alerting {
                alerts.alerting.push(condition);
            }
        }
        alerts
    }

    pub fn reset(&mut self) {
        for timer in &mut self.timers {
            timer.reset();
        }
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(ConditionRules::default())
    }
}
