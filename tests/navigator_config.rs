use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use navigator_kernel::config::NavigatorConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "NAVIGATOR_CONFIG",
        "NAVIGATOR_MODEL_PATH",
        "NAVIGATOR_LABELS_PATH",
        "NAVIGATOR_USE_GPU",
        "NAVIGATOR_CONFIDENCE",
        "NAVIGATOR_IOU",
        "NAVIGATOR_OBJECT_COOLDOWN_MS",
        "NAVIGATOR_SPEECH_COOLDOWN_MS",
        "NAVIGATOR_LOCALE",
        "NAVIGATOR_LOCALE_DIR",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "model": {
            "path": "models/yolo.onnx",
            "labels_path": "models/labels.txt",
            "use_gpu": false
        },
        "detection": {
            "confidence_threshold": 0.45,
            "iou_threshold": 0.6
        },
        "depth": {
            "width": 320,
            "height": 240
        },
        "voice": {
            "object_cooldown_ms": 8000,
            "speech_cooldown_ms": 1500,
            "locale": "cs",
            "locale_dir": "assets/i18n",
            "sound_enabled": false
        },
        "spatial": {
            "low": 0.3,
            "high": 0.7
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("NAVIGATOR_CONFIG", file.path());
    std::env::set_var("NAVIGATOR_CONFIDENCE", "0.5");
    std::env::set_var("NAVIGATOR_LOCALE", "EN");
    std::env::set_var("NAVIGATOR_USE_GPU", "true");

    let cfg = NavigatorConfig::load().expect("load config");

    assert_eq!(cfg.model.path, PathBuf::from("models/yolo.onnx"));
    assert_eq!(cfg.model.labels_path, PathBuf::from("models/labels.txt"));
    assert!(cfg.model.use_gpu);
    assert_eq!(cfg.detection.confidence_threshold, 0.5);
    assert_eq!(cfg.detection.iou_threshold, 0.6);
    assert_eq!(cfg.depth.width, 320);
    assert_eq!(cfg.depth.height, 240);
    assert_eq!(cfg.voice.object_cooldown_ms, 8000);
    assert_eq!(cfg.voice.speech_cooldown_ms, 1500);
    assert_eq!(cfg.voice.locale, "en");
    assert_eq!(cfg.voice.locale_dir, PathBuf::from("assets/i18n"));
    assert!(!cfg.voice.sound_enabled);
    assert_eq!(cfg.bounds.low, 0.3);
    assert_eq!(cfg.bounds.high, 0.7);

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r#"
[detection]
confidence_threshold = 0.35

[voice]
object_cooldown_ms = 4000
"#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    let cfg = NavigatorConfig::from_path(file.path()).expect("load config");
    assert_eq!(cfg.detection.confidence_threshold, 0.35);
    assert_eq!(cfg.detection.iou_threshold, 0.5);
    assert_eq!(cfg.voice.object_cooldown_ms, 4000);
    assert_eq!(cfg.voice.speech_cooldown_ms, 2000);
}

#[test]
fn defaults_apply_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = NavigatorConfig::load().expect("load config");
    assert_eq!(cfg.detection.confidence_threshold, 0.3);
    assert_eq!(cfg.voice.object_cooldown_ms, 5000);
    assert_eq!(cfg.bounds.low, 0.33);
    assert_eq!(cfg.bounds.high, 0.66);
}

#[test]
fn invalid_env_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("NAVIGATOR_OBJECT_COOLDOWN_MS", "soon");
    assert!(NavigatorConfig::load().is_err());
    clear_env();

    std::env::set_var("NAVIGATOR_IOU", "2.0");
    assert!(NavigatorConfig::load().is_err());
    clear_env();
}
