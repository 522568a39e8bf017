//! V4L2 camera source.
//!
//! Opens a local device node (e.g. /dev/video0), negotiates a packed BGR24
//! format (falling back to RGB24 with conversion) and captures frames
//! through a memory-mapped buffer stream.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;
use std::time::{Duration, Instant};

use super::{FrameSource, SourceStats};
use crate::config::SourceSettings;
use crate::frame::{Frame, PixelFormat};

pub struct V4l2Source {
    settings: SourceSettings,
    state: Option<DeviceState>,
    format: PixelFormat,
    frame_count: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
    active_width: u32,
    active_height: u32,
    /// Bytes between row starts as reported by the driver.
    active_stride: usize,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Source {
    pub fn new(settings: SourceSettings) -> Result<Self> {
        Ok(Self {
            active_width: settings.width,
            active_height: settings.height,
            active_stride: settings.width as usize * 3,
            settings,
            state: None,
            format: PixelFormat::Bgr24,
            frame_count: 0,
            last_frame_at: None,
            last_error: None,
        })
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.settings.target_fps == 0 {
            2_000
        } else {
            (1000 / self.settings.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }
}

impl FrameSource for V4l2Source {
    fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let device_path = &self.settings.url;
        let mut device = v4l::Device::with_path(device_path)
            .with_context(|| format!("open v4l2 device {}", device_path))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.settings.width;
        format.height = self.settings.height;
        format.fourcc = v4l::FourCC::new(b"BGR3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Source: failed to set format on {}: {}",
                    device_path,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        self.format = match &format.fourcc.repr {
            b"BGR3" => PixelFormat::Bgr24,
            b"RGB3" => PixelFormat::Rgb24,
            other => {
                return Err(anyhow!(
                    "v4l2 device {} negotiated unsupported format {}",
                    device_path,
                    String::from_utf8_lossy(other)
                ))
            }
        };

        if self.settings.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.settings.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!("V4l2Source: failed to set fps on {}: {}", device_path, err);
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.active_stride = if format.stride == 0 {
            format.width as usize * 3
        } else {
            format.stride as usize
        };
        self.last_error = None;

        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);

        log::info!(
            "V4l2Source: connected to {} ({}x{}, stride {}, {:?})",
            self.settings.url,
            self.active_width,
            self.active_height,
            self.active_stride,
            self.format
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("v4l2 device not connected")?;
        let (buf, meta) = state
            .with_mut(|fields| fields.stream.next())
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                anyhow::Error::new(err).context("capture v4l2 frame")
            })?;

        let used = (meta.bytesused as usize).min(buf.len());
        if used == 0 {
            self.last_error = Some("empty v4l2 buffer".to_string());
            return Ok(None);
        }

        self.frame_count += 1;
        self.last_frame_at = Some(Instant::now());

        let frame = Frame::from_strided(
            &buf[..used],
            self.active_width,
            self.active_height,
            self.active_stride,
            self.format,
            self.frame_count,
        )?;
        Ok(Some(frame))
    }

    fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        let Some(last_frame_at) = self.last_frame_at else {
            return true;
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.settings.url.clone(),
        }
    }
}
