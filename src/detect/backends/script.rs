use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Recorded detections, one entry per frame.
///
/// ```json
/// { "repeat": false,
///   "frames": [[{"label": "closed eyes", "confidence": 0.2}], []] }
/// ```
#[derive(Debug, Deserialize)]
pub struct DetectionScript {
    #[serde(default)]
    pub repeat: bool,
    pub frames: Vec<Vec<Detection>>,
}

/// Backend that replays a detection script frame by frame.
///
/// Frame contents are ignored. Once the script is exhausted every frame has
/// no detections, unless `repeat` is set.
pub struct ScriptedBackend {
    script: Vec<Vec<Detection>>,
    pending: VecDeque<Vec<Detection>>,
    repeat: bool,
}

impl ScriptedBackend {
    pub fn new(frames: Vec<Vec<Detection>>) -> Self {
        Self {
            pending: frames.iter().cloned().collect(),
            script: frames,
            repeat: false,
        }
    }

    pub fn repeating(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn from_script(script: DetectionScript) -> Self {
        Self::new(script.frames).repeating(script.repeat)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read detection script {}", path.display()))?;
        let script: DetectionScript = serde_json::from_str(&raw)
            .with_context(|| format!("invalid detection script {}", path.display()))?;
        log::info!(
            "ScriptedBackend: loaded {} frames from {}",
            script.frames.len(),
            path.display()
        );
        Ok(Self::from_script(script))
    }

    /// Frames left before the script runs dry (or restarts).
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "script"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        if self.pending.is_empty() && self.repeat {
            self.pending.extend(self.script.iter().cloned());
        }
        Ok(self.pending.pop_front().unwrap_or_default())
    }
}
