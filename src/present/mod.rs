//! Presentation sinks.
//!
//! The monitoring loop hands every processed frame to a `PresentationSink`:
//! the frame and its detections for display, plus the session's report for
//! the frame. Sinks render the current alert state (every frame) and start
//! an audio cue only when a condition has just entered alerting.

mod audio;
mod console;
#[cfg(feature = "preview")]
mod preview;

use anyhow::Result;

use crate::detect::Detection;
use crate::frame::Frame;
use crate::session::FrameReport;

pub use audio::AudioCue;
pub use console::ConsoleSink;
#[cfg(feature = "preview")]
pub use preview::PreviewSink;

pub trait PresentationSink {
    /// Render one processed frame.
    fn present(&mut self, frame: &Frame, detections: &[Detection], report: &FrameReport)
        -> Result<()>;

    /// Show a one-off message, e.g. when the camera stops delivering frames.
    fn show_message(&mut self, message: &str);
}

/// Forwards every call to each inner sink in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn PresentationSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Box<dyn PresentationSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl PresentationSink for FanoutSink {
    fn present(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
        report: &FrameReport,
    ) -> Result<()> {
        for sink in &mut self.sinks {
            sink.present(frame, detections, report)?;
        }
        Ok(())
    }

    fn show_message(&mut self, message: &str) {
        for sink in &mut self.sinks {
            sink.show_message(message);
        }
    }
}
