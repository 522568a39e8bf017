//! Monitored risk conditions and their activation rules.
//!
//! Each condition owns a label keyword (matched against detector labels), an
//! activation rule and a persistence threshold. Activation directions differ
//! per condition:
//!
//! - eyes-closed, smoking and phone-use are presence detections and activate
//!   when the score is ABOVE their threshold.
//! - no-seatbelt is the absence of a positive "seatbelt" detection and
//!   activates when the seatbelt score is BELOW its threshold.
//!
//! The comparison values are configurable; the directions are not.

use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, Result};

/// Default score floor for eyes-closed and phone-use activation.
pub const DEFAULT_PRESENCE_FLOOR: f32 = 0.1;
/// Default comparison value for the seatbelt and smoking rules.
pub const DEFAULT_SEATBELT_SMOKING_THRESHOLD: f32 = 0.5;

pub const DEFAULT_EYES_PERSIST_SECS: f64 = 5.0;
pub const DEFAULT_SEATBELT_PERSIST_SECS: f64 = 5.0;
pub const DEFAULT_SMOKING_PERSIST_SECS: f64 = 3.0;
pub const DEFAULT_PHONE_PERSIST_SECS: f64 = 3.0;

/// One of the four monitored risk behaviors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Condition {
    EyesClosed,
    NoSeatbelt,
    Smoking,
    PhoneUse,
}

impl Condition {
    /// All conditions in scoring order. Label matching tries keywords in this
    /// order and stops at the first hit.
    pub const ALL: [Condition; 4] = [
        Condition::EyesClosed,
        Condition::NoSeatbelt,
        Condition::Smoking,
        Condition::PhoneUse,
    ];

    pub fn index(self) -> usize {
        match self {
            Condition::EyesClosed => 0,
            Condition::NoSeatbelt => 1,
            Condition::Smoking => 2,
            Condition::PhoneUse => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Condition::EyesClosed => "eyes_closed",
            Condition::NoSeatbelt => "no_seatbelt",
            Condition::Smoking => "smoking",
            Condition::PhoneUse => "phone_use",
        }
    }

    /// Lowercase keyword a detector label must contain to feed this condition.
    pub fn label_keyword(self) -> &'static str {
        match self {
            Condition::EyesClosed => "closed eyes",
            Condition::NoSeatbelt => "seatbelt",
            Condition::Smoking => "cigarette",
            Condition::PhoneUse => "phone",
        }
    }

    /// Human-readable alert shown while the condition is alerting.
    pub fn alert_text(self) -> &'static str {
        match self {
            Condition::EyesClosed => "Drowsy Driver Detected!",
            Condition::NoSeatbelt => "Seatbelt Not Detected!",
            Condition::Smoking => "Smoking Detected!",
            Condition::PhoneUse => "Phone Usage Detected!",
        }
    }

    /// Comparison direction for this condition. Fixed, not configurable.
    pub fn direction(self) -> Direction {
        match self {
            Condition::NoSeatbelt => Direction::Below,
            Condition::EyesClosed | Condition::Smoking | Condition::PhoneUse => Direction::Above,
        }
    }

    /// Map a detector label to the condition it feeds, if any.
    pub fn for_label(label: &str) -> Option<Condition> {
        let label = label.to_lowercase();
        Condition::ALL
            .into_iter()
            .find(|condition| label.contains(condition.label_keyword()))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Active when `score > threshold`.
    Above,
    /// Active when `score < threshold`.
    Below,
}

/// Activation predicate plus persistence threshold for one condition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConditionRule {
    pub condition: Condition,
    pub threshold: f32,
    pub persist: Duration,
}

impl ConditionRule {
    pub fn new(condition: Condition, threshold: f32, persist: Duration) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!(
                "{} threshold must be within 0..=1 (got {})",
                condition,
                threshold
            ));
        }
        if persist.is_zero() {
            return Err(anyhow!("{} persistence must be greater than zero", condition));
        }
        Ok(Self {
            condition,
            threshold,
            persist,
        })
    }

    pub fn default_for(condition: Condition) -> Self {
        let (threshold, secs) = match condition {
            Condition::EyesClosed => (DEFAULT_PRESENCE_FLOOR, DEFAULT_EYES_PERSIST_SECS),
            Condition::NoSeatbelt => (
                DEFAULT_SEATBELT_SMOKING_THRESHOLD,
                DEFAULT_SEATBELT_PERSIST_SECS,
            ),
            Condition::Smoking => (
                DEFAULT_SEATBELT_SMOKING_THRESHOLD,
                DEFAULT_SMOKING_PERSIST_SECS,
            ),
            Condition::PhoneUse => (DEFAULT_PRESENCE_FLOOR, DEFAULT_PHONE_PERSIST_SECS),
        };
        Self {
            condition,
            threshold,
            persist: Duration::from_secs_f64(secs),
        }
    }

    /// Whether a frame's score counts as the risk being present.
    pub fn is_active(&self, score: f32) -> bool {
        match self.condition.direction() {
            Direction::Above => score > self.threshold,
            Direction::Below => score < self.threshold,
        }
    }
}

/// Rules for all four conditions, indexed by `Condition::index`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConditionRules {
    rules: [ConditionRule; 4],
}

impl ConditionRules {
    pub fn get(&self, condition: Condition) -> &ConditionRule {
        &self.rules[condition.index()]
    }

    pub fn set(&mut self, rule: ConditionRule) {
        self.rules[rule.condition.index()] = rule;
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConditionRule> {
        self.rules.iter()
    }
}

impl Default for ConditionRules {
    fn default() -> Self {
        Self {
            rules: Condition::ALL.map(ConditionRule::default_for),
        }
    }
}
