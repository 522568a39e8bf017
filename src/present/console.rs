use anyhow::Result;

use super::{AudioCue, PresentationSink};
use crate::detect::Detection;
use crate::frame::Frame;
use crate::session::FrameReport;
use crate::ui::StatusLine;

/// Terminal sink: status line for the alert state plus the audio cue.
pub struct ConsoleSink {
    status: StatusLine,
    audio: Option<AudioCue>,
    cues_started: u64,
}

impl ConsoleSink {
    pub fn new(status: StatusLine, audio: Option<AudioCue>) -> Self {
        Self {
            status,
            audio,
            cues_started: 0,
        }
    }

    /// Number of frames on which an audio cue was requested.
    pub fn cues_started(&self) -> u64 {
        self.cues_started
    }
}

impl PresentationSink for ConsoleSink {
    fn present(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
        report: &FrameReport,
    ) -> Result<()> {
        log::debug!(
            "frame {} dt={:?} latency={:?} detections={}",
            report.frame_index,
            report.dt,
            frame.captured_at().elapsed(),
            detections.len()
        );
        for condition in &report.alerts.raised {
            log::warn!("alert: {} (frame {})", condition, report.frame_index);
        }

        self.status.update(&report.alerts.alert_texts());

        if report.alerts.should_cue() {
            self.cues_started += 1;
            if let Some(audio) = &self.audio {
                audio.play();
            }
        }
        Ok(())
    }

    fn show_message(&mut self, message: &str) {
        self.status.message(message);
    }
}
