use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend maps one frame to an ordered list of labeled detections. The
/// label taxonomy is fixed by the model; mapping labels to monitored
/// conditions happens later in the scorer.
///
/// Backends run on the monitoring loop thread and must not retain the frame
/// beyond the `detect` call.
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
