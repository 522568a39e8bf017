use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::condition::{Condition, ConditionRule, ConditionRules};
use crate::detect::BACKEND_NAMES;

const DEFAULT_SOURCE_URL: &str = "stub://cabin_camera";
const DEFAULT_TARGET_FPS: u32 = 10;
const DEFAULT_WIDTH: u32 = 960;
const DEFAULT_HEIGHT: u32 = 540;
const DEFAULT_DETECTOR: &str = "stub";
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_DETECTOR_CONFIDENCE: f32 = 0.25;
const DEFAULT_DETECTOR_IOU: f32 = 0.45;
const DEFAULT_SOUND_PATH: &str = "assets/emergency-alarm.wav";
const DEFAULT_PLAYER: &str = "aplay";

#[derive(Debug, Deserialize, Default)]
struct MonitorConfigFile {
    source: Option<SourceConfigFile>,
    detector: Option<DetectorConfigFile>,
    conditions: Option<ConditionsConfigFile>,
    alerts: Option<AlertsConfigFile>,
    preview: Option<PreviewConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    max_frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    script_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    confidence: Option<f32>,
    iou: Option<f32>,
    class_names: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct ConditionsConfigFile {
    eyes_closed: Option<RuleConfigFile>,
    no_seatbelt: Option<RuleConfigFile>,
    smoking: Option<RuleConfigFile>,
    phone_use: Option<RuleConfigFile>,
}

#[derive(Debug, Deserialize, Default, Clone, Copy)]
struct RuleConfigFile {
    threshold: Option<f32>,
    persist_secs: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertsConfigFile {
    sound_path: Option<PathBuf>,
    player: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct PreviewConfigFile {
    path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub source: SourceSettings,
    pub detector: DetectorSettings,
    pub rules: ConditionRules,
    pub alerts: AlertSettings,
    /// Where the preview sink writes the latest annotated frame, if enabled.
    pub preview_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// `stub://name` for the synthetic source, otherwise a device path.
    pub url: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
    /// Stop delivering frames after this many (synthetic source only).
    pub max_frames: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub script_path: Option<PathBuf>,
    pub input_width: u32,
    pub input_height: u32,
    pub confidence: f32,
    /// Overlap above which a weaker box of the same class is suppressed.
    pub iou: f32,
    pub class_names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AlertSettings {
    /// Alarm clip played on each rising edge. Missing files are skipped.
    pub sound_path: Option<PathBuf>,
    /// Command used to play the clip; receives the path as its only argument.
    pub player: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            target_fps: DEFAULT_TARGET_FPS,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            max_frames: None,
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_DETECTOR.to_string(),
            model_path: None,
            script_path: None,
            input_width: DEFAULT_INPUT_SIZE,
            input_height: DEFAULT_INPUT_SIZE,
            confidence: DEFAULT_DETECTOR_CONFIDENCE,
            iou: DEFAULT_DETECTOR_IOU,
            class_names: Vec::new(),
        }
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            sound_path: Some(PathBuf::from(DEFAULT_SOUND_PATH)),
            player: DEFAULT_PLAYER.to_string(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            source: SourceSettings::default(),
            detector: DetectorSettings::default(),
            rules: ConditionRules::default(),
            alerts: AlertSettings::default(),
            preview_path: None,
        }
    }
}

impl MonitorConfig {
    /// Load from `$DRIVER_WATCH_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DRIVER_WATCH_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Load from an explicit file (JSON, or TOML by extension), then apply
    /// env overrides and validate.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MonitorConfigFile) -> Result<Self> {
        let defaults = Self::default();

        let source_file = file.source.unwrap_or_default();
        let source = SourceSettings {
            url: source_file.url.unwrap_or(defaults.source.url),
            target_fps: source_file.target_fps.unwrap_or(defaults.source.target_fps),
            width: source_file.width.unwrap_or(defaults.source.width),
            height: source_file.height.unwrap_or(defaults.source.height),
            max_frames: source_file.max_frames,
        };

        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            backend: detector_file.backend.unwrap_or(defaults.detector.backend),
            model_path: detector_file.model_path,
            script_path: detector_file.script_path,
            input_width: detector_file
                .input_width
                .unwrap_or(defaults.detector.input_width),
            input_height: detector_file
                .input_height
                .unwrap_or(defaults.detector.input_height),
            confidence: detector_file
                .confidence
                .unwrap_or(defaults.detector.confidence),
            iou: detector_file.iou.unwrap_or(defaults.detector.iou),
            class_names: detector_file.class_names.unwrap_or_default(),
        };

        let conditions = file.conditions.unwrap_or_default();
        let mut rules = defaults.rules;
        for (condition, overrides) in [
            (Condition::EyesClosed, conditions.eyes_closed),
            (Condition::NoSeatbelt, conditions.no_seatbelt),
            (Condition::Smoking, conditions.smoking),
            (Condition::PhoneUse, conditions.phone_use),
        ] {
            let Some(overrides) = overrides else {
                continue;
            };
            let base = *rules.get(condition);
            let persist = match overrides.persist_secs {
                Some(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f64(secs),
                Some(secs) => {
                    return Err(anyhow!(
                        "conditions.{}.persist_secs must be a positive number (got {})",
                        condition,
                        secs
                    ))
                }
                None => base.persist,
            };
            rules.set(ConditionRule::new(
                condition,
                overrides.threshold.unwrap_or(base.threshold),
                persist,
            )?);
        }

        let alerts_file = file.alerts.unwrap_or_default();
        let alerts = AlertSettings {
            sound_path: alerts_file.sound_path.or(defaults.alerts.sound_path),
            player: alerts_file.player.unwrap_or(defaults.alerts.player),
        };

        Ok(Self {
            source,
            detector,
            rules,
            alerts,
            preview_path: file.preview.and_then(|preview| preview.path),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("DRIVER_WATCH_SOURCE") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Ok(fps) = std::env::var("DRIVER_WATCH_TARGET_FPS") {
            self.source.target_fps = fps
                .trim()
                .parse()
                .map_err(|_| anyhow!("DRIVER_WATCH_TARGET_FPS must be an integer"))?;
        }
        if let Ok(backend) = std::env::var("DRIVER_WATCH_DETECTOR") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend.trim().to_lowercase();
            }
        }
        if let Ok(path) = std::env::var("DRIVER_WATCH_MODEL") {
            if !path.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(path) = std::env::var("DRIVER_WATCH_SCRIPT") {
            if !path.trim().is_empty() {
                self.detector.script_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(path) = std::env::var("DRIVER_WATCH_ALERT_SOUND") {
            self.alerts.sound_path = if path.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.source.url.trim().is_empty() {
            return Err(anyhow!("source.url must not be empty"));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("source.target_fps must be >= 1"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source width and height must be greater than zero"));
        }

        self.detector.backend = self.detector.backend.to_lowercase();
        if !BACKEND_NAMES.contains(&self.detector.backend.as_str()) {
            return Err(anyhow!(
                "unknown detector backend '{}' (expected one of {})",
                self.detector.backend,
                BACKEND_NAMES.join(", ")
            ));
        }
        if !(0.0..=1.0).contains(&self.detector.confidence) {
            return Err(anyhow!("detector.confidence must be within 0..=1"));
        }
        if !(0.0..=1.0).contains(&self.detector.iou) {
            return Err(anyhow!("detector.iou must be within 0..=1"));
        }
        match self.detector.backend.as_str() {
            "script" if self.detector.script_path.is_none() => {
                return Err(anyhow!("script backend requires detector.script_path"));
            }
            "tract" => {
                if self.detector.model_path.is_none() {
                    return Err(anyhow!("tract backend requires detector.model_path"));
                }
                if self.detector.class_names.is_empty() {
                    return Err(anyhow!("tract backend requires detector.class_names"));
                }
                if self.detector.input_width == 0 || self.detector.input_height == 0 {
                    return Err(anyhow!("detector input size must be greater than zero"));
                }
            }
            _ => {}
        }
        if self.alerts.player.trim().is_empty() {
            return Err(anyhow!("alerts.player must not be empty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<MonitorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let cfg = MonitorConfig::from_file(MonitorConfigFile::default()).unwrap();
        assert_eq!(cfg.source.width, 960);
        assert_eq!(cfg.source.url, DEFAULT_SOURCE_URL);
        assert_eq!(cfg.detector.backend, "stub");
        assert_eq!(cfg.detector.iou, 0.45);
        assert_eq!(cfg.rules, ConditionRules::default());
        assert_eq!(cfg.preview_path, None);
    }

    #[test]
    fn partial_rule_override_keeps_other_fields() {
        let file: MonitorConfigFile = serde_json::from_str(
            r#"{"conditions": {"no_seatbelt": {"threshold": 0.4}, "smoking": {"persist_secs": 1.5}}}"#,
        )
        .unwrap();
        let cfg = MonitorConfig::from_file(file).unwrap();

        let seatbelt = cfg.rules.get(Condition::NoSeatbelt);
        assert_eq!(seatbelt.threshold, 0.4);
        assert_eq!(seatbelt.persist, Duration::from_secs(5));
        let smoking = cfg.rules.get(Condition::Smoking);
        assert_eq!(smoking.threshold, 0.5);
        assert_eq!(smoking.persist, Duration::from_millis(1500));
    }

    #[test]
    fn rejects_invalid_rule_values() {
        let file: MonitorConfigFile =
            serde_json::from_str(r#"{"conditions": {"phone_use": {"persist_secs": 0}}}"#).unwrap();
        assert!(MonitorConfig::from_file(file).is_err());

        let file: MonitorConfigFile =
            serde_json::from_str(r#"{"conditions": {"eyes_closed": {"threshold": 2.0}}}"#)
                .unwrap();
        assert!(MonitorConfig::from_file(file).is_err());
    }

    #[test]
    fn validate_requires_backend_inputs() {
        let mut cfg = MonitorConfig::default();
        cfg.detector.backend = "script".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = MonitorConfig::default();
        cfg.detector.backend = "tract".to_string();
        cfg.detector.model_path = Some(PathBuf::from("model.onnx"));
        assert!(cfg.validate().is_err());
        cfg.detector.class_names = vec!["closed eyes".to_string()];
        assert!(cfg.validate().is_ok());

        let mut cfg = MonitorConfig::default();
        cfg.detector.backend = "yolo".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = MonitorConfig::default();
        cfg.detector.iou = 1.5;
        assert!(cfg.validate().is_err());
    }
}
