use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use driver_watch::config::MonitorConfig;
use driver_watch::Condition;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "DRIVER_WATCH_CONFIG",
        "DRIVER_WATCH_SOURCE",
        "DRIVER_WATCH_DETECTOR",
        "DRIVER_WATCH_MODEL",
        "DRIVER_WATCH_SCRIPT",
        "DRIVER_WATCH_ALERT_SOUND",
        "DRIVER_WATCH_TARGET_FPS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let script_path = file.path().with_extension("script.json");
    let json = format!(
        r#"{{
            "source": {{
                "url": "/dev/video2",
                "target_fps": 15,
                "width": 1280,
                "height": 720
            }},
            "detector": {{
                "backend": "script",
                "script_path": "{}"
            }},
            "conditions": {{
                "eyes_closed": {{ "persist_secs": 4.0 }},
                "no_seatbelt": {{ "threshold": 0.6 }}
            }},
            "alerts": {{
                "sound_path": "/opt/sounds/alarm.wav",
                "player": "paplay"
            }}
        }}"#,
        script_path.display()
    );
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("DRIVER_WATCH_CONFIG", file.path());
    std::env::set_var("DRIVER_WATCH_SOURCE", "/dev/video0");
    std::env::set_var("DRIVER_WATCH_TARGET_FPS", "20");

    let cfg = MonitorConfig::load().expect("load config");

    assert_eq!(cfg.source.url, "/dev/video0");
    assert_eq!(cfg.source.target_fps, 20);
    assert_eq!(cfg.source.width, 1280);
    assert_eq!(cfg.source.height, 720);
    assert_eq!(cfg.detector.backend, "script");
    assert_eq!(cfg.detector.script_path, Some(script_path));

    let eyes = cfg.rules.get(Condition::EyesClosed);
    assert_eq!(eyes.threshold, 0.1);
    assert_eq!(eyes.persist, Duration::from_secs(4));
    let seatbelt = cfg.rules.get(Condition::NoSeatbelt);
    assert_eq!(seatbelt.threshold, 0.6);
    assert_eq!(seatbelt.persist, Duration::from_secs(5));
    assert_eq!(cfg.rules.get(Condition::PhoneUse).persist, Duration::from_secs(3));

    assert_eq!(
        cfg.alerts.sound_path,
        Some(PathBuf::from("/opt/sounds/alarm.wav"))
    );
    assert_eq!(cfg.alerts.player, "paplay");

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
[source]
url = "stub://bench"
max_frames = 300

[conditions.smoking]
threshold = 0.7
persist_secs = 2.5

[preview]
path = "/tmp/driver_watch_preview.jpg"
"#;
    file.write_all(toml.as_bytes()).expect("write config");

    let cfg = MonitorConfig::load_from(Some(file.path())).expect("load config");

    assert_eq!(cfg.source.url, "stub://bench");
    assert_eq!(cfg.source.max_frames, Some(300));
    assert_eq!(cfg.source.target_fps, 10);
    let smoking = cfg.rules.get(Condition::Smoking);
    assert_eq!(smoking.threshold, 0.7);
    assert_eq!(smoking.persist, Duration::from_millis(2500));
    assert_eq!(
        cfg.preview_path,
        Some(PathBuf::from("/tmp/driver_watch_preview.jpg"))
    );

    clear_env();
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = MonitorConfig::load().expect("load defaults");

    assert_eq!(cfg.source.url, "stub://cabin_camera");
    assert_eq!(cfg.source.target_fps, 10);
    assert_eq!(cfg.detector.backend, "stub");
    assert_eq!(cfg.rules.get(Condition::NoSeatbelt).threshold, 0.5);
    assert_eq!(cfg.rules.get(Condition::EyesClosed).persist, Duration::from_secs(5));
    assert_eq!(
        cfg.alerts.sound_path,
        Some(PathBuf::from("assets/emergency-alarm.wav"))
    );
}

#[test]
fn empty_alert_sound_env_disables_audio() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("DRIVER_WATCH_ALERT_SOUND", "");
    let cfg = MonitorConfig::load().expect("load config");
    assert_eq!(cfg.alerts.sound_path, None);

    clear_env();
}

#[test]
fn rejects_invalid_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("DRIVER_WATCH_TARGET_FPS", "fast");
    assert!(MonitorConfig::load().is_err());

    std::env::set_var("DRIVER_WATCH_TARGET_FPS", "0");
    assert!(MonitorConfig::load().is_err());

    clear_env();
    std::env::set_var("DRIVER_WATCH_DETECTOR", "tract");
    assert!(MonitorConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_malformed_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(b"{ \"source\": { \"target_fps\": \"ten\" } }")
        .expect("write config");

    assert!(MonitorConfig::load_from(Some(file.path())).is_err());

    clear_env();
}
