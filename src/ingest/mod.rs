//! Frame ingestion sources.
//!
//! - Synthetic source for `stub://` URLs (testing, demos)
//! - USB/V4L2 devices (feature: ingest-v4l2)
//!
//! Sources hand frames over one at a time, on demand, from the monitoring
//! loop thread. `Ok(None)` from `next_frame` means the device returned no
//! frame; the monitoring session treats that as fatal and stops.

mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::Result;

use crate::config::SourceSettings;
use crate::frame::Frame;

pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Source;

/// Anything that yields frames on demand.
pub trait FrameSource {
    /// Open the device. Called once before the first frame.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame, or `None` when the device delivered nothing.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Check if the source is healthy.
    fn is_healthy(&self) -> bool;

    /// Get frame statistics.
    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub url: String,
}

/// Open the configured source. `stub://` URLs get the synthetic source,
/// anything else is treated as a V4L2 device path.
pub fn open_source(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    if settings.url.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(settings.clone())));
    }
    #[cfg(feature = "ingest-v4l2")]
    {
        Ok(Box::new(V4l2Source::new(settings.clone())?))
    }
    #[cfg(not(feature = "ingest-v4l2"))]
    {
        anyhow::bail!(
            "camera device {} requires the ingest-v4l2 feature",
            settings.url
        )
    }
}
