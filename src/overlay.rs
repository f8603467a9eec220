//! Frame overlays for the gaze marker and the attention status banner.

use crate::attention::AttentionStatus;
use crate::constants::GAZE_MARKER_RADIUS;
use crate::gaze_processor::GazePoint;
use crate::Result;
use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8};
use opencv::prelude::*;

/// Marker and label color (BGR red)
const GAZE_COLOR: (f64, f64, f64) = (0.0, 0.0, 255.0);

fn bgr(color: (f64, f64, f64)) -> Scalar {
    Scalar::new(color.0, color.1, color.2, 0.0)
}

/// Return a copy of `frame` with a filled marker at the gaze point and its
/// coordinates printed in the top-left corner.
///
/// With no gaze the copy is left untouched.
///
/// # Errors
///
/// Returns an `OpenCV` error if copying or drawing fails
pub fn draw_gaze(frame: &Mat, gaze: Option<GazePoint>) -> Result<Mat> {
    let mut output = frame.try_clone()?;

    if let Some(point) = gaze {
        imgproc::circle(
            &mut output,
            Point::new(point.x, point.y),
            GAZE_MARKER_RADIUS,
            bgr(GAZE_COLOR),
            -1,
            LINE_8,
            0,
        )?;
        imgproc::put_text(
            &mut output,
            &format!("Gaze: {point}"),
            Point::new(50, 50),
            FONT_HERSHEY_SIMPLEX,
            0.7,
            bgr(GAZE_COLOR),
            2,
            LINE_8,
            false,
        )?;
    }

    Ok(output)
}

/// Banner color for a status
#[must_use]
pub fn status_color(status: AttentionStatus) -> Scalar {
    match status {
        AttentionStatus::Ok => bgr((0.0, 200.0, 0.0)),
        AttentionStatus::Cheating | AttentionStatus::Error => bgr((0.0, 0.0, 255.0)),
        AttentionStatus::Instruction => bgr((0.0, 200.0, 255.0)),
        AttentionStatus::Waiting => bgr((200.0, 200.0, 200.0)),
    }
}

/// Draw a status line along the bottom edge of the frame
///
/// # Errors
///
/// Returns an `OpenCV` error if drawing fails
pub fn draw_status(frame: &mut Mat, status: AttentionStatus, text: &str) -> Result<()> {
    let origin = Point::new(10, (frame.rows() - 15).max(20));
    imgproc::put_text(
        frame,
        &format!("[{}] {text}", status.label()),
        origin,
        FONT_HERSHEY_SIMPLEX,
        0.6,
        status_color(status),
        2,
        LINE_8,
        false,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Vec3b, CV_8UC3};

    #[test]
    fn test_marker_drawn_at_point() {
        let frame = Mat::new_rows_cols_with_default(480, 640, CV_8UC3, Scalar::all(0.0)).unwrap();
        let output = draw_gaze(&frame, Some(GazePoint::new(320, 240))).unwrap();

        let center = *output.at_2d::<Vec3b>(240, 320).unwrap();
        assert_eq!((center[0], center[1], center[2]), (0, 0, 255));

        // Input is untouched
        let original = *frame.at_2d::<Vec3b>(240, 320).unwrap();
        assert_eq!((original[0], original[1], original[2]), (0, 0, 0));
    }

    #[test]
    fn test_off_screen_marker_does_not_fail() {
        let frame = Mat::new_rows_cols_with_default(120, 160, CV_8UC3, Scalar::all(0.0)).unwrap();
        assert!(draw_gaze(&frame, Some(GazePoint::new(5000, -300))).is_ok());
    }

    #[test]
    fn test_status_banner() {
        let mut frame = Mat::new_rows_cols_with_default(120, 160, CV_8UC3, Scalar::all(0.0)).unwrap();
        draw_status(&mut frame, AttentionStatus::Ok, "looking").unwrap();
        assert_eq!(frame.rows(), 120);
    }
}
