//! Condition scorer: reduce a frame's detections to one score per condition.

use crate::condition::Condition;
use crate::detect::Detection;

/// Per-condition confidence for one frame, each in 0..=1.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConditionScores {
    scores: [f32; 4],
}

impl ConditionScores {
    /// Max confidence among detections whose label maps to each condition.
    /// Conditions with no matching detection score 0.0.
    pub fn from_detections(detections: &[Detection]) -> Self {
        let mut scores = Self::default();
        for det in detections {
            if let Some(condition) = Condition::for_label(&det.label) {
                let slot = &mut scores.scores[condition.index()];
                *slot = slot.max(det.confidence);
            }
        }
        scores
    }

    pub fn get(&self, condition: Condition) -> f32 {
        self.scores[condition.index()]
    }

    pub fn set(&mut self, condition: Condition, score: f32) {
        self.scores[condition.index()] = score;
    }

    pub fn with(mut self, condition: Condition, score: f32) -> Self {
        self.set(condition, score);
        self
    }
}
