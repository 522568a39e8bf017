use anyhow::Result;
use rand::Rng;

use super::{FrameSource, SourceStats};
use crate::config::SourceSettings;
use crate::frame::{packed_len, Frame};

/// Synthetic camera for `stub://` URLs.
///
/// Produces a drifting gradient with a little per-frame noise. With
/// `max_frames` set, the source stops delivering frames after that many,
/// which is how a camera unplug looks to the monitoring loop.
pub struct SyntheticSource {
    settings: SourceSettings,
    frame_count: u64,
    /// Simulated scene state, shifts every 50 frames.
    scene_state: u8,
    exhausted: bool,
}

impl SyntheticSource {
    pub fn new(settings: SourceSettings) -> Self {
        Self {
            settings,
            frame_count: 0,
            scene_state: 0,
            exhausted: false,
        }
    }

    fn generate_pixels(&mut self) -> Result<Vec<u8>> {
        let pixel_count = packed_len(self.settings.width, self.settings.height)?;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let noise: u64 = rand::thread_rng().gen_range(0..4);
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel =
                ((i as u64 + self.frame_count + self.scene_state as u64 + noise) % 256) as u8;
        }
        Ok(pixels)
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.settings.url,
            self.settings.width,
            self.settings.height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if let Some(max) = self.settings.max_frames {
            if self.frame_count >= max {
                self.exhausted = true;
                return Ok(None);
            }
        }
        self.frame_count += 1;
        let pixels = self.generate_pixels()?;
        let frame = Frame::from_bgr(
            pixels,
            self.settings.width,
            self.settings.height,
            self.frame_count,
        )?;
        Ok(Some(frame))
    }

    fn is_healthy(&self) -> bool {
        !self.exhausted
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.settings.url.clone(),
        }
    }
}
