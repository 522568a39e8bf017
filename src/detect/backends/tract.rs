#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{non_max_suppression, BoundingBox, Detection};
use crate::frame::Frame;

/// Leading box coordinates (cx, cy, w, h) in each prediction column.
const CXYWH_OFFSET: usize = 4;

/// Tract-based backend for YOLO-style ONNX detection models.
///
/// Expects a single `[1, 3, H, W]` RGB input in 0..1 and a
/// `[1, 4 + classes, anchors]` output. Frames of any size are resampled to
/// the model input and boxes are mapped back to frame coordinates.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    decoder: YoloDecoder,
}

/// Turns a raw `[1, 4 + classes, anchors]` head into frame-space detections.
#[derive(Clone, Debug)]
struct YoloDecoder {
    input_width: u32,
    input_height: u32,
    class_names: Vec<String>,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        width: u32,
        height: u32,
        class_names: Vec<String>,
    ) -> Result<Self> {
        if class_names.is_empty() {
            return Err(anyhow!("tract backend needs at least one class name"));
        }
        if width == 0 || height == 0 {
            return Err(anyhow!("tract backend input size must be non-zero"));
        }
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            decoder: YoloDecoder {
                input_width: width,
                input_height: height,
                class_names,
                confidence_threshold: 0.25,
                iou_threshold: 0.45,
            },
        })
    }

    /// Override the default confidence cut-off.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.decoder.confidence_threshold = threshold;
        self
    }

    /// Override the default NMS overlap threshold.
    pub fn with_iou(mut self, iou: f32) -> Self {
        self.decoder.iou_threshold = iou;
        self
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let src_w = frame.width() as usize;
        let src_h = frame.height() as usize;
        if src_w == 0 || src_h == 0 {
            return Err(anyhow!("cannot run detection on an empty frame"));
        }
        let rgb = frame.to_rgb();
        let dst_w = self.decoder.input_width as usize;
        let dst_h = self.decoder.input_height as usize;

        // Nearest-neighbour resample straight into CHW layout.
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, dst_h, dst_w), |(_, c, y, x)| {
            let sx = (x * src_w / dst_w).min(src_w - 1);
            let sy = (y * src_h / dst_h).min(src_h - 1);
            rgb[(sy * src_w + sx) * 3 + c] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }
}

impl YoloDecoder {
    fn decode(
        &self,
        preds: tract_ndarray::ArrayViewD<'_, f32>,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Vec<Detection>> {
        let shape = preds.shape();
        if shape.len() != 3 || shape[1] < CXYWH_OFFSET + 1 {
            return Err(anyhow!("unexpected model output shape {:?}", shape));
        }
        let classes = (shape[1] - CXYWH_OFFSET).min(self.class_names.len());
        let anchors = shape[2];

        let scale_x = frame_width as f32 / self.input_width as f32;
        let scale_y = frame_height as f32 / self.input_height as f32;

        let mut detections = Vec::new();
        for a in 0..anchors {
            let best = (0..classes)
                .map(|c| (c, preds[[0, CXYWH_OFFSET + c, a]]))
                .fold(None, |best: Option<(usize, f32)>, cur| match best {
                    Some(b) if b.1 >= cur.1 => Some(b),
                    _ => Some(cur),
                });
            let Some((class_id, confidence)) = best else {
                continue;
            };
            if !confidence.is_finite() || confidence < self.confidence_threshold {
                continue;
            }

            let cx = preds[[0, 0, a]] * scale_x;
            let cy = preds[[0, 1, a]] * scale_y;
            let w = preds[[0, 2, a]] * scale_x;
            let h = preds[[0, 3, a]] * scale_y;
            let bbox = BoundingBox::new(cx - w / 2.0, cy - h / 2.0, w, h)
                .clamp_to(frame_width, frame_height);

            detections.push(
                Detection::new(self.class_names[class_id].clone(), confidence).with_bbox(bbox),
            );
        }

        non_max_suppression(&mut detections, self.iou_threshold);
        Ok(detections)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let preds = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        self.decoder.decode(preds, frame.width(), frame.height())
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = Frame::blank(self.decoder.input_width, self.decoder.input_height);
        self.detect(&blank).map(|_| ())
    }
}
