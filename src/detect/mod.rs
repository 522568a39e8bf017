//! Detection adapters.
//!
//! Backends turn a `Frame` into labeled detections. `build_backend` picks one
//! from configuration:
//! - `stub`: no detections
//! - `script`: replays recorded per-frame detections from a JSON file
//! - `tract`: YOLO-style ONNX model (feature: backend-tract)

mod backend;
mod backends;
mod result;

use anyhow::{anyhow, Result};

use crate::config::DetectorSettings;

pub use backend::DetectorBackend;
pub use backends::{ScriptedBackend, StubBackend};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::{non_max_suppression, BoundingBox, Detection};

pub const BACKEND_NAMES: &[&str] = &["stub", "script", "tract"];

/// Construct the configured detector backend.
pub fn build_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    match settings.backend.as_str() {
        "stub" => Ok(Box::new(StubBackend::new())),
        "script" => {
            let path = settings
                .script_path
                .as_ref()
                .ok_or_else(|| anyhow!("script backend requires detector.script_path"))?;
            Ok(Box::new(ScriptedBackend::from_path(path)?))
        }
        "tract" => build_tract(settings),
        other => Err(anyhow!("unknown detector backend '{}'", other)),
    }
}

#[cfg(feature = "backend-tract")]
fn build_tract(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    let path = settings
        .model_path
        .as_ref()
        .ok_or_else(|| anyhow!("tract backend requires detector.model_path"))?;
    let backend = TractBackend::new(
        path,
        settings.input_width,
        settings.input_height,
        settings.class_names.clone(),
    )?
    .with_threshold(settings.confidence)
    .with_iou(settings.iou);
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn build_tract(_settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!("tract backend requires the backend-tract feature"))
}
