use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::depth::{DEFAULT_DEPTH_HEIGHT, DEFAULT_DEPTH_WIDTH};
use crate::detect::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD};
use crate::spatial::BucketBounds;
use crate::voice::locale::DEFAULT_LOCALE;
use crate::voice::{DEFAULT_OBJECT_COOLDOWN_MS, DEFAULT_SPEECH_COOLDOWN_MS};

const DEFAULT_MODEL_PATH: &str = "prod_model.onnx";
const DEFAULT_LABELS_PATH: &str = "labels.txt";
const DEFAULT_LOCALE_DIR: &str = "assets";
const DEFAULT_INPUT_SIZE: u32 = 640;

#[derive(Debug, Deserialize, Default)]
struct NavigatorConfigFile {
    model: Option<ModelConfigFile>,
    detection: Option<DetectionConfigFile>,
    depth: Option<DepthConfigFile>,
    voice: Option<VoiceConfigFile>,
    spatial: Option<SpatialConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    labels_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    use_gpu: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct DepthConfigFile {
    width: Option<usize>,
    height: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct VoiceConfigFile {
    object_cooldown_ms: Option<u64>,
    speech_cooldown_ms: Option<u64>,
    locale: Option<String>,
    locale_dir: Option<PathBuf>,
    sound_enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct SpatialConfigFile {
    low: Option<f32>,
    high: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    pub model: ModelSettings,
    pub detection: DetectionSettings,
    pub depth: DepthSettings,
    pub voice: VoiceSettings,
    pub bounds: BucketBounds,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub path: PathBuf,
    pub labels_path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    pub use_gpu: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionSettings {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthSettings {
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone)]
pub struct VoiceSettings {
    pub object_cooldown_ms: u64,
    pub speech_cooldown_ms: u64,
    pub locale: String,
    pub locale_dir: PathBuf,
    pub sound_enabled: bool,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        // An empty file section falls back to defaults for every field.
        Self::from_file(NavigatorConfigFile::default())
    }
}

impl NavigatorConfig {
    /// Load from `NAVIGATOR_CONFIG` (TOML or JSON) if set, then apply
    /// `NAVIGATOR_*` environment overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("NAVIGATOR_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a specific file without consulting the environment.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: NavigatorConfigFile) -> Self {
        let model = file.model.unwrap_or_default();
        let detection = file.detection.unwrap_or_default();
        let depth = file.depth.unwrap_or_default();
        let voice = file.voice.unwrap_or_default();
        let spatial = file.spatial.unwrap_or_default();
        let default_bounds = BucketBounds::default();

        Self {
            model: ModelSettings {
                path: model
                    .path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
                labels_path: model
                    .labels_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_LABELS_PATH)),
                input_width: model.input_width.unwrap_or(DEFAULT_INPUT_SIZE),
                input_height: model.input_height.unwrap_or(DEFAULT_INPUT_SIZE),
                use_gpu: model.use_gpu.unwrap_or(true),
            },
            detection: DetectionSettings {
                confidence_threshold: detection
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
                iou_threshold: detection.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD),
            },
            depth: DepthSettings {
                width: depth.width.unwrap_or(DEFAULT_DEPTH_WIDTH),
                height: depth.height.unwrap_or(DEFAULT_DEPTH_HEIGHT),
            },
            voice: VoiceSettings {
                object_cooldown_ms: voice
                    .object_cooldown_ms
                    .unwrap_or(DEFAULT_OBJECT_COOLDOWN_MS),
                speech_cooldown_ms: voice
                    .speech_cooldown_ms
                    .unwrap_or(DEFAULT_SPEECH_COOLDOWN_MS),
                locale: voice.locale.unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
                locale_dir: voice
                    .locale_dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCALE_DIR)),
                sound_enabled: voice.sound_enabled.unwrap_or(true),
            },
            bounds: BucketBounds {
                low: spatial.low.unwrap_or(default_bounds.low),
                high: spatial.high.unwrap_or(default_bounds.high),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(path) = env_nonempty("NAVIGATOR_MODEL_PATH") {
            self.model.path = PathBuf::from(path);
        }
        if let Some(path) = env_nonempty("NAVIGATOR_LABELS_PATH") {
            self.model.labels_path = PathBuf::from(path);
        }
        if let Some(value) = env_nonempty("NAVIGATOR_USE_GPU") {
            self.model.use_gpu = parse_bool("NAVIGATOR_USE_GPU", &value)?;
        }
        if let Some(value) = env_nonempty("NAVIGATOR_CONFIDENCE") {
            self.detection.confidence_threshold = value
                .parse()
                .map_err(|_| anyhow!("NAVIGATOR_CONFIDENCE must be a number"))?;
        }
        if let Some(value) = env_nonempty("NAVIGATOR_IOU") {
            self.detection.iou_threshold = value
                .parse()
                .map_err(|_| anyhow!("NAVIGATOR_IOU must be a number"))?;
        }
        if let Some(value) = env_nonempty("NAVIGATOR_OBJECT_COOLDOWN_MS") {
            self.voice.object_cooldown_ms = value.parse().map_err(|_| {
                anyhow!("NAVIGATOR_OBJECT_COOLDOWN_MS must be an integer number of milliseconds")
            })?;
        }
        if let Some(value) = env_nonempty("NAVIGATOR_SPEECH_COOLDOWN_MS") {
            self.voice.speech_cooldown_ms = value.parse().map_err(|_| {
                anyhow!("NAVIGATOR_SPEECH_COOLDOWN_MS must be an integer number of milliseconds")
            })?;
        }
        if let Some(locale) = env_nonempty("NAVIGATOR_LOCALE") {
            self.voice.locale = locale;
        }
        if let Some(dir) = env_nonempty("NAVIGATOR_LOCALE_DIR") {
            self.voice.locale_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.detection.confidence_threshold) {
            return Err(anyhow!("confidence threshold must be within [0, 1]"));
        }
        if !unit.contains(&self.detection.iou_threshold) {
            return Err(anyhow!("IoU threshold must be within [0, 1]"));
        }
        let BucketBounds { low, high } = self.bounds;
        if !(unit.contains(&low) && unit.contains(&high) && low < high) {
            return Err(anyhow!(
                "spatial bounds must satisfy 0 <= low < high <= 1 (got {} / {})",
                low,
                high
            ));
        }
        if self.depth.width == 0 || self.depth.height == 0 {
            return Err(anyhow!("depth dimensions must be greater than zero"));
        }
        if self.model.input_width == 0 || self.model.input_height == 0 {
            return Err(anyhow!("model input dimensions must be greater than zero"));
        }
        self.voice.locale = self.voice.locale.trim().to_lowercase();
        if self.voice.locale.is_empty() {
            return Err(anyhow!("locale must not be empty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<NavigatorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("{} must be a boolean", key)),
    }
}
