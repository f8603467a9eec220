//! Gaze pipeline: face locator, normalizer, model and pixel mapping.
//!
//! Every per-frame failure degrades to "no gaze" so that a live video loop keeps
//! running. Load failures of the model or cascade leave the processor
//! permanently unavailable for the session; they are logged once at
//! construction.

use crate::config::{Config, ScreenConfig};
use crate::face_detection::{CascadeFaceLocator, FaceLocator};
use crate::face_normalization::FaceNormalizer;
use crate::gaze_model::{GazeModel, OnnxGazeModel};
use crate::overlay;
use crate::utils::safe_cast::f32_to_i32;
use crate::{Error, Result};
use log::{debug, error};
use opencv::core::Mat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Predicted gaze location in target screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GazePoint {
    /// Horizontal pixel
    pub x: i32,
    /// Vertical pixel
    pub y: i32,
}

impl GazePoint {
    /// Create a gaze point
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Map a normalized model output onto a screen.
    ///
    /// Values are truncated toward zero and not clamped, so outputs outside
    /// [0, 1] land outside the screen.
    ///
    /// # Errors
    ///
    /// Returns an error if a scaled coordinate is not finite or overflows `i32`
    #[allow(clippy::cast_precision_loss)] // Screen sizes are far below f32 precision limits
    pub fn from_normalized(normalized_x: f32, normalized_y: f32, screen: ScreenConfig) -> Result<Self> {
        Ok(Self {
            x: f32_to_i32(normalized_x * screen.width as f32)?,
            y: f32_to_i32(normalized_y * screen.height as f32)?,
        })
    }

    /// Whether the point lies within `[0, width] x [0, height]`
    #[must_use]
    pub fn is_on_screen(&self, screen: ScreenConfig) -> bool {
        (0..=screen.width).contains(&self.x) && (0..=screen.height).contains(&self.y)
    }
}

impl fmt::Display for GazePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Orchestrates face location, normalization, inference and pixel mapping
pub struct GazeProcessor {
    locator: Option<Box<dyn FaceLocator>>,
    model: Option<Box<dyn GazeModel>>,
    normalizer: FaceNormalizer,
    screen: ScreenConfig,
}

impl GazeProcessor {
    /// Assemble a processor from already loaded parts.
    ///
    /// A `None` locator or model makes the processor permanently unavailable.
    #[must_use]
    pub fn new(
        locator: Option<Box<dyn FaceLocator>>,
        model: Option<Box<dyn GazeModel>>,
        normalizer: FaceNormalizer,
        screen: ScreenConfig,
    ) -> Self {
        Self {
            locator,
            model,
            normalizer,
            screen,
        }
    }

    /// Load the cascade and model described by `config`.
    ///
    /// Load failures are logged here, once, and leave the processor unavailable
    /// instead of failing construction.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let model: Option<Box<dyn GazeModel>> = match OnnxGazeModel::new(&config.model) {
            Ok(model) => Some(Box::new(model)),
            Err(e) => {
                error!("Gaze model unavailable, inference disabled: {e}");
                None
            }
        };

        let locator: Option<Box<dyn FaceLocator>> = match CascadeFaceLocator::new(&config.detector) {
            Ok(locator) => Some(Box::new(locator)),
            Err(e) => {
                error!("Face detector unavailable, inference disabled: {e}");
                None
            }
        };

        let normalizer = FaceNormalizer::new(config.processing.face_margin, config.processing.input_size);
        Self::new(locator, model, normalizer, config.screen)
    }

    /// Whether both the model and the face locator loaded
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.model.is_some() && self.locator.is_some()
    }

    /// Whether the gaze model loaded
    #[must_use]
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Whether the face locator loaded
    #[must_use]
    pub fn has_locator(&self) -> bool {
        self.locator.is_some()
    }

    /// Target resolution gaze points are mapped to
    #[must_use]
    pub const fn screen_size(&self) -> ScreenConfig {
        self.screen
    }

    /// Estimate the gaze point for a frame, or `None` when it cannot be found.
    ///
    /// Never fails: errors from the detector, the crop or the model are logged at
    /// debug level and reported as no gaze.
    pub fn get_gaze_coordinates(&mut self, frame: &Mat) -> Option<GazePoint> {
        match self.try_gaze_coordinates(frame) {
            Ok(gaze) => Some(gaze),
            Err(Error::NoFaceDetected) => None,
            Err(e) => {
                debug!("Gaze estimation failed for frame: {e}");
                None
            }
        }
    }

    /// Estimate the gaze point, surfacing why none was produced
    ///
    /// # Errors
    ///
    /// Returns `NoFaceDetected` when the locator finds no face, `ModelLoad` or
    /// `DetectorLoad` when the processor is unavailable, or the crop, inference
    /// or mapping error for this frame
    pub fn try_gaze_coordinates(&mut self, frame: &Mat) -> Result<GazePoint> {
        let locator = self
            .locator
            .as_mut()
            .ok_or_else(|| Error::DetectorLoad("face locator not loaded".to_string()))?;
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| Error::ModelLoad("gaze model not loaded".to_string()))?;

        let face = locator.locate(frame)?.ok_or(Error::NoFaceDetected)?;

        let input = self.normalizer.normalize(frame, face)?;
        let (normalized_x, normalized_y) = model.predict(input)?;

        GazePoint::from_normalized(normalized_x, normalized_y, self.screen)
    }

    /// Return a copy of `frame` with the gaze marker and label drawn.
    ///
    /// The copy is pixel-identical to the input when `gaze` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an `OpenCV` error if copying or drawing fails
    pub fn draw_gaze(&self, frame: &Mat, gaze: Option<GazePoint>) -> Result<Mat> {
        overlay::draw_gaze(frame, gaze)
    }
}
