//! Constants used throughout the application

/// Side length of the square face crop fed to the gaze model
pub const MODEL_INPUT_SIZE: i32 = 224;

/// Number of color channels in frames and model input
pub const MODEL_INPUT_CHANNELS: usize = 3;

/// Pixel value scale applied before inference
pub const PIXEL_SCALE: f64 = 1.0 / 255.0;

/// Margin in pixels added on every side of the detected face box
pub const FACE_MARGIN: i32 = 30;

/// Haar cascade file for frontal faces
pub const CASCADE_FILE_NAME: &str = "haarcascade_frontalface_default.xml";

/// Cascade detector parameters
pub const CASCADE_SCALE_FACTOR: f64 = 1.1;
pub const CASCADE_MIN_NEIGHBORS: i32 = 5;
pub const CASCADE_MIN_FACE_SIZE: i32 = 30;

/// Default ONNX gaze model location
pub const DEFAULT_MODEL_PATH: &str = "models/mobilenet_gaze_tl_best.onnx";

/// Metric alias the gaze model was serialized with
pub const MAE_METRIC_ALIAS: &str = "mae";

/// Continuous deviation needed before an alert, in seconds
pub const CHEAT_DURATION_THRESHOLD_SECS: f64 = 3.0;

/// Minimum gap between two logged alerts, in seconds
pub const ALERT_DEBOUNCE_SECS: f64 = 5.0;

/// Label recorded for continuous deviation alerts
pub const DEVIATION_EVENT_LABEL: &str = "Continuous gaze deviation";

/// Upper bound for configured attention durations (one day)
pub const MAX_ATTENTION_SECS: f64 = 86_400.0;

/// Maximum number of alerts retained in the session history
pub const DEFAULT_HISTORY_LIMIT: usize = 500;

/// Status polling cadence in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Run inference on every Nth frame
pub const DEFAULT_SKIP_FRAMES: u32 = 5;

/// Backoff before retrying a failed frame read, in milliseconds
pub const DEFAULT_READ_RETRY_MS: u64 = 100;

/// Frames buffered between the capture and worker threads
pub const FRAME_CHANNEL_CAPACITY: usize = 2;

/// Screen profiles
pub const WEBCAM_SCREEN: (i32, i32) = (640, 480);
pub const FULL_HD_SCREEN: (i32, i32) = (1920, 1080);

/// Overlay marker radius in pixels
pub const GAZE_MARKER_RADIUS: i32 = 15;
