//! Configuration management for the gaze proctoring application

use crate::constants::{
    ALERT_DEBOUNCE_SECS, CASCADE_FILE_NAME, CASCADE_MIN_FACE_SIZE, CASCADE_MIN_NEIGHBORS,
    CASCADE_SCALE_FACTOR, CHEAT_DURATION_THRESHOLD_SECS, DEFAULT_HISTORY_LIMIT, DEFAULT_MODEL_PATH,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_READ_RETRY_MS, MAX_ATTENTION_SECS, DEFAULT_SKIP_FRAMES, FACE_MARGIN, FULL_HD_SCREEN,
    MAE_METRIC_ALIAS, MODEL_INPUT_SIZE, WEBCAM_SCREEN,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gaze model configuration
    pub model: ModelConfig,

    /// Face cascade configuration
    pub detector: DetectorConfig,

    /// Target screen resolution for gaze coordinates
    pub screen: ScreenConfig,

    /// Video capture configuration
    pub capture: CaptureConfig,

    /// Per-frame processing configuration
    pub processing: ProcessingConfig,

    /// Attention state machine configuration
    pub attention: AttentionConfig,
}

/// Gaze model artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX gaze regression model
    pub path: PathBuf,

    /// Metric aliases the model was serialized with
    pub custom_metrics: Vec<String>,
}

/// Haar cascade parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Cascade definition file name
    pub cascade_file: String,

    /// Directories searched for the cascade before the relative fallback.
    /// When empty, the OpenCV data directory and common install paths are used.
    pub search_dirs: Vec<PathBuf>,

    /// Image pyramid scale step
    pub scale_factor: f64,

    /// Neighbor votes needed to keep a candidate
    pub min_neighbors: i32,

    /// Minimum face side in pixels
    pub min_face_size: i32,
}

/// Screen resolution that gaze coordinates are mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Target width in pixels
    pub width: i32,

    /// Target height in pixels
    pub height: i32,
}

/// Video capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera index used when no video file is given
    pub camera_index: i32,

    /// Requested capture width
    pub frame_width: i32,

    /// Requested capture height
    pub frame_height: i32,

    /// Mirror frames horizontally before processing
    pub mirror: bool,

    /// Backoff before retrying a failed read, in milliseconds
    pub read_retry_ms: u64,
}

/// Per-frame processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Run inference on every Nth frame only
    pub skip_frames: u32,

    /// Margin added around the face box, in pixels
    pub face_margin: i32,

    /// Side of the square model input
    pub input_size: i32,

    /// Resize incoming frames to the screen resolution before processing
    pub resize_to_screen: bool,
}

/// Attention state machine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    /// Continuous deviation before an alert, in seconds
    pub cheat_threshold_secs: f64,

    /// Minimum gap between two logged alerts, in seconds
    pub debounce_secs: f64,

    /// Status polling cadence in milliseconds
    pub poll_interval_ms: u64,

    /// Maximum number of alerts kept in the history
    pub history_limit: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
            custom_metrics: vec![MAE_METRIC_ALIAS.to_string()],
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            cascade_file: CASCADE_FILE_NAME.to_string(),
            search_dirs: Vec::new(),
            scale_factor: CASCADE_SCALE_FACTOR,
            min_neighbors: CASCADE_MIN_NEIGHBORS,
            min_face_size: CASCADE_MIN_FACE_SIZE,
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self::webcam()
    }
}

impl ScreenConfig {
    /// 640x480 webcam-sized profile
    #[must_use]
    pub const fn webcam() -> Self {
        Self {
            width: WEBCAM_SCREEN.0,
            height: WEBCAM_SCREEN.1,
        }
    }

    /// 1920x1080 desktop profile
    #[must_use]
    pub const fn full_hd() -> Self {
        Self {
            width: FULL_HD_SCREEN.0,
            height: FULL_HD_SCREEN.1,
        }
    }

    /// Look up a named screen profile
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unknown profile name
    pub fn from_profile(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "webcam" | "640x480" => Ok(Self::webcam()),
            "fullhd" | "full_hd" | "1920x1080" => Ok(Self::full_hd()),
            _ => Err(Error::ConfigError(format!("Unknown screen profile: {name}"))),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            frame_width: WEBCAM_SCREEN.0,
            frame_height: WEBCAM_SCREEN.1,
            mirror: true,
            read_retry_ms: DEFAULT_READ_RETRY_MS,
        }
    }
}

impl CaptureConfig {
    /// Backoff as a `Duration`
    #[must_use]
    pub fn read_retry(&self) -> Duration {
        Duration::from_millis(self.read_retry_ms)
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            skip_frames: DEFAULT_SKIP_FRAMES,
            face_margin: FACE_MARGIN,
            input_size: MODEL_INPUT_SIZE,
            resize_to_screen: true,
        }
    }
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            cheat_threshold_secs: CHEAT_DURATION_THRESHOLD_SECS,
            debounce_secs: ALERT_DEBOUNCE_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl AttentionConfig {
    /// Polling cadence as a `Duration`
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the text is not valid configuration
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Serialize configuration to YAML text
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if serialization fails
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))
    }

    /// Validate configuration values.
    ///
    /// Artifact paths are not checked here: a missing model or cascade disables
    /// inference at startup instead of refusing to run.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.screen.width <= 0 || self.screen.height <= 0 {
            return Err(Error::ConfigError(format!(
                "Screen size must be positive, got {}x{}",
                self.screen.width, self.screen.height
            )));
        }

        if self.detector.scale_factor <= 1.0 {
            return Err(Error::ConfigError(
                "Cascade scale factor must be greater than 1.0".to_string(),
            ));
        }
        if self.detector.min_neighbors < 0 {
            return Err(Error::ConfigError(
                "Cascade min neighbors must not be negative".to_string(),
            ));
        }
        if self.detector.min_face_size <= 0 {
            return Err(Error::ConfigError("Minimum face size must be positive".to_string()));
        }

        if self.processing.skip_frames == 0 {
            return Err(Error::ConfigError(
                "Skip frames must be greater than 0".to_string(),
            ));
        }
        if self.processing.face_margin < 0 {
            return Err(Error::ConfigError("Face margin must not be negative".to_string()));
        }
        if self.processing.input_size <= 0 {
            return Err(Error::ConfigError("Model input size must be positive".to_string()));
        }

        if !(0.0..=MAX_ATTENTION_SECS).contains(&self.attention.cheat_threshold_secs) {
            return Err(Error::ConfigError(format!(
                "Cheat threshold must be between 0 and {MAX_ATTENTION_SECS} seconds"
            )));
        }
        if !(0.0..=MAX_ATTENTION_SECS).contains(&self.attention.debounce_secs) {
            return Err(Error::ConfigError(format!(
                "Alert debounce must be between 0 and {MAX_ATTENTION_SECS} seconds"
            )));
        }
        if self.attention.poll_interval_ms == 0 {
            return Err(Error::ConfigError("Poll interval must be greater than 0".to_string()));
        }
        if self.attention.history_limit == 0 {
            return Err(Error::ConfigError("History limit must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Gaze Proctor Configuration

# Gaze regression model
model:
  path: "models/mobilenet_gaze_tl_best.onnx"
  custom_metrics: ["mae"]

# Haar cascade face detector
detector:
  cascade_file: "haarcascade_frontalface_default.xml"
  search_dirs: []
  scale_factor: 1.1
  min_neighbors: 5
  min_face_size: 30

# Resolution gaze coordinates are mapped to
screen:
  width: 640
  height: 480

# Video capture
capture:
  camera_index: 0
  frame_width: 640
  frame_height: 480
  mirror: true
  read_retry_ms: 100

# Per-frame processing
processing:
  skip_frames: 5
  face_margin: 30
  input_size: 224
  resize_to_screen: true

# Attention monitoring
attention:
  cheat_threshold_secs: 3.0
  debounce_secs: 5.0
  poll_interval_ms: 100
  history_limit: 500
"#;
