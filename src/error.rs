//! Error types for the gaze proctoring library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// `ONNX` Runtime inference failed
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::OrtError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The gaze model artifact could not be loaded
    #[error("Model load failure: {0}")]
    ModelLoad(String),

    /// The face cascade could not be resolved or loaded
    #[error("Detector load failure: {0}")]
    DetectorLoad(String),

    /// No face was found in the frame
    #[error("No face detected")]
    NoFaceDetected,

    /// The margin-expanded face box has zero area after clamping
    #[error("Degenerate face crop: {0}")]
    DegenerateCrop(String),

    /// The capture device could not be opened
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A frame could not be read from an open device
    #[error("Frame read failure: {0}")]
    FrameRead(String),

    /// Unclassified failure inside per-frame processing
    #[error("Processing error: {0}")]
    Processing(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model output processing error
    #[error("Model output error: {0}")]
    ModelOutput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Whether the error disables the session until the operator restarts it.
    ///
    /// Resource acquisition failures (model, detector, camera) are terminal; every
    /// per-frame error is not.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ModelLoad(_) | Self::DetectorLoad(_) | Self::DeviceUnavailable(_)
        )
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        assert!(Error::ModelLoad("missing".into()).is_terminal());
        assert!(Error::DetectorLoad("missing".into()).is_terminal());
        assert!(Error::DeviceUnavailable("camera 0".into()).is_terminal());

        assert!(!Error::NoFaceDetected.is_terminal());
        assert!(!Error::DegenerateCrop("0x0".into()).is_terminal());
        assert!(!Error::FrameRead("timeout".into()).is_terminal());
        assert!(!Error::Processing("boom".into()).is_terminal());
    }

    #[test]
    fn test_display_includes_context() {
        let err = Error::DeviceUnavailable("camera 2".into());
        assert_eq!(err.to_string(), "Capture device unavailable: camera 2");
    }
}
