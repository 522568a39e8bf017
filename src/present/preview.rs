use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};

use super::PresentationSink;
use crate::condition::Condition;
use crate::detect::{BoundingBox, Detection};
use crate::frame::Frame;
use crate::session::FrameReport;

const BOX_NORMAL: Rgb<u8> = Rgb([0, 200, 0]);
const BOX_ALERT: Rgb<u8> = Rgb([230, 0, 0]);
const BOX_THICKNESS: u32 = 2;

/// Writes the latest frame, with detection boxes drawn, to a JPEG file.
///
/// The file is overwritten on every frame; it is a live view for an external
/// image viewer, not a recording. Boxes whose label feeds a condition that
/// is currently alerting are drawn red, all others green.
pub struct PreviewSink {
    path: PathBuf,
}

impl PreviewSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn annotate(
        frame: &Frame,
        detections: &[Detection],
        alerting: &[Condition],
    ) -> Result<RgbImage> {
        let mut img = RgbImage::from_raw(frame.width(), frame.height(), frame.to_rgb())
            .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;
        for det in detections {
            let color = match Condition::for_label(&det.label) {
                Some(condition) if alerting.contains(&condition) => BOX_ALERT,
                _ => BOX_NORMAL,
            };
            draw_box(&mut img, det.bbox, color);
        }
        Ok(img)
    }
}

impl PresentationSink for PreviewSink {
    fn present(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
        report: &FrameReport,
    ) -> Result<()> {
        let img = Self::annotate(frame, detections, &report.alerts.alerting)?;
        img.save(&self.path)
            .with_context(|| format!("writing preview frame to {}", self.path.display()))
    }

    fn show_message(&mut self, message: &str) {
        log::info!("preview: {}", message);
    }
}

fn draw_box(img: &mut RgbImage, bbox: BoundingBox, color: Rgb<u8>) {
    let bbox = bbox.clamp_to(img.width(), img.height());
    if bbox.w < 1.0 || bbox.h < 1.0 {
        return;
    }
    let x0 = bbox.x as u32;
    let y0 = bbox.y as u32;
    let x1 = ((bbox.x + bbox.w) as u32).min(img.width() - 1);
    let y1 = ((bbox.y + bbox.h) as u32).min(img.height() - 1);

    for t in 0..BOX_THICKNESS {
        for x in x0..=x1 {
            img.put_pixel(x, (y0 + t).min(y1), color);
            img.put_pixel(x, y1.saturating_sub(t).max(y0), color);
        }
        for y in y0..=y1 {
            img.put_pixel((x0 + t).min(x1), y, color);
            img.put_pixel(x1.saturating_sub(t).max(x0), y, color);
        }
    }
}
