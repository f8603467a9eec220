//! Face crop normalization into the gaze model input tensor.

use crate::constants::{MODEL_INPUT_CHANNELS, PIXEL_SCALE};
use crate::utils::safe_cast::i32_to_usize;
use crate::{Error, Result};
use ndarray::Array4;
use opencv::core::{Mat, Rect, Size, Vec3f, CV_32F};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;

/// Expand a face box by `margin` pixels on every side, clamped to the frame.
///
/// The result may have zero width or height when the box lies outside the
/// frame; callers treat that as a degenerate crop.
#[must_use]
pub fn expand_with_margin(bbox: Rect, margin: i32, frame_width: i32, frame_height: i32) -> Rect {
    let x_min = bbox.x.saturating_sub(margin).max(0);
    let y_min = bbox.y.saturating_sub(margin).max(0);
    let x_max = bbox
        .x
        .saturating_add(bbox.width)
        .saturating_add(margin)
        .min(frame_width);
    let y_max = bbox
        .y
        .saturating_add(bbox.height)
        .saturating_add(margin)
        .min(frame_height);

    // Boxes entirely outside the frame collapse to zero size at a valid origin
    let x_min = x_min.min(frame_width.max(0));
    let y_min = y_min.min(frame_height.max(0));

    Rect::new(x_min, y_min, (x_max - x_min).max(0), (y_max - y_min).max(0))
}

/// Turns a frame region into a `[1, size, size, 3]` tensor scaled to [0, 1]
#[derive(Debug, Clone, Copy)]
pub struct FaceNormalizer {
    margin: i32,
    input_size: i32,
}

impl FaceNormalizer {
    /// Create a normalizer with the given crop margin and square output size
    #[must_use]
    pub const fn new(margin: i32, input_size: i32) -> Self {
        Self { margin, input_size }
    }

    /// Side of the square output
    #[must_use]
    pub const fn input_size(&self) -> i32 {
        self.input_size
    }

    /// Crop region for a face box in a frame of the given size
    #[must_use]
    pub fn crop_region(&self, bbox: Rect, frame_width: i32, frame_height: i32) -> Rect {
        expand_with_margin(bbox, self.margin, frame_width, frame_height)
    }

    /// Crop, resize and scale the face into a batched NHWC tensor.
    ///
    /// Channels keep the frame's order (BGR as captured).
    ///
    /// # Errors
    ///
    /// Returns `DegenerateCrop` if the clamped crop has zero area, `InvalidInput`
    /// for frames that are not 3-channel, or an `OpenCV` error from the resize
    pub fn normalize(&self, frame: &Mat, bbox: Rect) -> Result<Array4<f32>> {
        if frame.channels() != 3 {
            return Err(Error::InvalidInput(format!(
                "Expected a 3-channel frame, got {} channels",
                frame.channels()
            )));
        }

        let region = self.crop_region(bbox, frame.cols(), frame.rows());
        if region.width <= 0 || region.height <= 0 {
            return Err(Error::DegenerateCrop(format!(
                "box {}x{} at ({}, {}) has no area inside {}x{} frame",
                bbox.width,
                bbox.height,
                bbox.x,
                bbox.y,
                frame.cols(),
                frame.rows()
            )));
        }

        let face = Mat::roi(frame, region)?.try_clone()?;

        let mut resized = Mat::default();
        imgproc::resize(
            &face,
            &mut resized,
            Size::new(self.input_size, self.input_size),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut float_image = Mat::default();
        resized.convert_to(&mut float_image, CV_32F, PIXEL_SCALE, 0.0)?;

        let size = i32_to_usize(self.input_size)?;
        let pixels = float_image.data_typed::<Vec3f>()?;
        let mut data = Vec::with_capacity(size * size * MODEL_INPUT_CHANNELS);
        for pixel in pixels {
            data.extend_from_slice(&[pixel[0], pixel[1], pixel[2]]);
        }

        Array4::from_shape_vec((1, size, size, MODEL_INPUT_CHANNELS), data)
            .map_err(|e| Error::InvalidInput(format!("Failed to create input tensor: {e}")))
    }
}
