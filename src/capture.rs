//! Video acquisition with guaranteed device release.

use crate::config::CaptureConfig;
use crate::{Error, Result};
use log::{info, warn};
use opencv::core::{self as cv_core, Mat, Size};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH};

/// Video source type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(String),
}

impl VideoSource {
    /// Whether the source ends, so a failed read means end of stream
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

/// Result of one read attempt
#[derive(Debug)]
pub enum FrameRead {
    /// A frame, already mirrored if configured
    Frame(Mat),
    /// Transient failure; retry after the backoff
    Retry,
    /// The file source is exhausted
    EndOfStream,
}

/// Anything that yields frames to the application loops
pub trait FrameSource: Send {
    /// Read the next frame
    ///
    /// # Errors
    ///
    /// Returns a transient error; callers retry after the backoff
    fn read(&mut self) -> Result<FrameRead>;
}

/// An open capture device, released when dropped
pub struct CaptureSource {
    capture: VideoCapture,
    source: VideoSource,
    mirror: bool,
}

impl CaptureSource {
    /// Open a camera or video file
    ///
    /// # Errors
    ///
    /// Returns `DeviceUnavailable` if the source cannot be opened
    pub fn open(source: &VideoSource, config: &CaptureConfig) -> Result<Self> {
        let capture = match source {
            VideoSource::Camera(index) => {
                info!("Opening camera {index}");
                let mut cap = VideoCapture::new(*index, videoio::CAP_ANY)
                    .map_err(|e| Error::DeviceUnavailable(format!("camera {index}: {e}")))?;
                if cap.is_opened().unwrap_or(false) {
                    cap.set(CAP_PROP_FRAME_WIDTH, f64::from(config.frame_width))?;
                    cap.set(CAP_PROP_FRAME_HEIGHT, f64::from(config.frame_height))?;
                    // Latest frame only, for low latency
                    cap.set(CAP_PROP_BUFFERSIZE, 1.0)?;
                }
                cap
            }
            VideoSource::File(path) => {
                info!("Opening video file: {path}");
                VideoCapture::from_file(path, videoio::CAP_ANY)
                    .map_err(|e| Error::DeviceUnavailable(format!("{path}: {e}")))?
            }
        };

        if !capture.is_opened()? {
            return Err(Error::DeviceUnavailable(match source {
                VideoSource::Camera(index) => {
                    format!("camera {index} could not be opened, it may be in use")
                }
                VideoSource::File(path) => format!("video file {path} could not be opened"),
            }));
        }

        Ok(Self {
            capture,
            source: source.clone(),
            mirror: config.mirror,
        })
    }

    /// Source this capture was opened from
    #[must_use]
    pub const fn source(&self) -> &VideoSource {
        &self.source
    }

    /// Read the next frame.
    ///
    /// An empty read from a camera is transient; from a file it ends the stream.
    ///
    /// # Errors
    ///
    /// Returns `FrameRead` if the backend fails the read, or an `OpenCV` error if
    /// mirroring fails. Both are transient; callers retry after the backoff.
    pub fn read(&mut self) -> Result<FrameRead> {
        let mut frame = Mat::default();
        let grabbed = self
            .capture
            .read(&mut frame)
            .map_err(|e| Error::FrameRead(format!("{:?}: {e}", self.source)))?;

        if !grabbed || frame.empty() {
            return Ok(if self.source.is_finite() {
                FrameRead::EndOfStream
            } else {
                FrameRead::Retry
            });
        }

        if self.mirror {
            frame = mirror(&frame)?;
        }
        Ok(FrameRead::Frame(frame))
    }
}

impl FrameSource for CaptureSource {
    fn read(&mut self) -> Result<FrameRead> {
        CaptureSource::read(self)
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        match self.capture.release() {
            Ok(()) => info!("Capture source {:?} released", self.source),
            Err(e) => warn!("Failed to release capture source {:?}: {e}", self.source),
        }
    }
}

/// Flip a frame horizontally
///
/// # Errors
///
/// Returns an `OpenCV` error if the flip fails
pub fn mirror(frame: &Mat) -> Result<Mat> {
    let mut flipped = Mat::default();
    cv_core::flip(frame, &mut flipped, 1)?;
    Ok(flipped)
}

/// Resize a frame to exactly `width` x `height`
///
/// # Errors
///
/// Returns an `OpenCV` error if the resize fails
pub fn resize_frame(frame: &Mat, width: i32, height: i32) -> Result<Mat> {
    if frame.cols() == width && frame.rows() == height {
        return Ok(frame.try_clone()?);
    }
    let mut resized = Mat::default();
    imgproc::resize(
        frame,
        &mut resized,
        Size::new(width, height),
        0.0,
        0.0,
        InterpolationFlags::INTER_LINEAR as i32,
    )?;
    Ok(resized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Rect, Scalar, Vec3b, CV_8UC3};

    #[test]
    fn test_mirror_flips_columns() {
        let mut frame = Mat::new_rows_cols_with_default(4, 6, CV_8UC3, Scalar::all(0.0)).unwrap();
        imgproc::rectangle(
            &mut frame,
            Rect::new(0, 0, 1, 4),
            Scalar::new(255.0, 255.0, 255.0, 0.0),
            -1,
            imgproc::LINE_8,
            0,
        )
        .unwrap();

        let flipped = mirror(&frame).unwrap();
        assert_eq!(flipped.at_2d::<Vec3b>(0, 5).unwrap()[0], 255);
        assert_eq!(flipped.at_2d::<Vec3b>(0, 0).unwrap()[0], 0);
    }

    #[test]
    fn test_resize_frame() {
        let frame = Mat::new_rows_cols_with_default(720, 1280, CV_8UC3, Scalar::all(5.0)).unwrap();
        let resized = resize_frame(&frame, 640, 480).unwrap();
        assert_eq!((resized.cols(), resized.rows()), (640, 480));
    }

    #[test]
    fn test_missing_video_file_unavailable() {
        let source = VideoSource::File("no_such_video_for_tests.mp4".to_string());
        let result = CaptureSource::open(&source, &CaptureConfig::default());
        assert!(matches!(result, Err(Error::DeviceUnavailable(_))));
    }

    #[test]
    fn test_source_finiteness() {
        assert!(VideoSource::File("a.mp4".into()).is_finite());
        assert!(!VideoSource::Camera(0).is_finite());
    }
}
