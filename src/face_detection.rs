//! Face localization with an `OpenCV` Haar cascade.
//!
//! Only the first detection returned by the cascade is kept. There is no
//! largest-face or most-central-face selection and no identity tracking across
//! frames: each frame is located independently.

use crate::config::DetectorConfig;
use crate::constants::CASCADE_FILE_NAME;
use crate::{Error, Result};
use log::{debug, info, warn};
use opencv::core::{Mat, Rect, Size, Vector};
use opencv::imgproc;
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use std::path::{Path, PathBuf};

/// Install locations checked for the bundled cascade when OpenCV cannot report one
const PLATFORM_CASCADE_DIRS: &[&str] = &[
    "/usr/share/opencv4/haarcascades",
    "/usr/local/share/opencv4/haarcascades",
    "/usr/share/opencv/haarcascades",
    "/usr/local/share/opencv/haarcascades",
    "/opt/homebrew/share/opencv4/haarcascades",
];

/// Locates at most one face per frame
pub trait FaceLocator: Send {
    /// Return the first face rectangle in frame coordinates, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying detector fails on this frame
    fn locate(&mut self, frame: &Mat) -> Result<Option<Rect>>;
}

/// Frontal face locator backed by `CascadeClassifier`
pub struct CascadeFaceLocator {
    classifier: CascadeClassifier,
    scale_factor: f64,
    min_neighbors: i32,
    min_size: Size,
}

impl CascadeFaceLocator {
    /// Resolve and load the cascade described by `config`
    ///
    /// # Errors
    ///
    /// Returns `DetectorLoad` if no cascade file resolves, or if the file does not
    /// load into a usable classifier
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        let path = resolve_cascade_path(config)?;
        Self::from_file(&path, config)
    }

    /// Load a cascade from an explicit file
    ///
    /// # Errors
    ///
    /// Returns `DetectorLoad` if the classifier cannot be built or is empty
    pub fn from_file(path: &Path, config: &DetectorConfig) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::DetectorLoad(format!("Non UTF-8 cascade path: {}", path.display())))?;

        let classifier = CascadeClassifier::new(path_str)
            .map_err(|e| Error::DetectorLoad(format!("{}: {e}", path.display())))?;
        if classifier.empty()? {
            return Err(Error::DetectorLoad(format!(
                "Cascade at {} is empty",
                path.display()
            )));
        }

        info!("Loaded face cascade from {}", path.display());
        Ok(Self {
            classifier,
            scale_factor: config.scale_factor,
            min_neighbors: config.min_neighbors,
            min_size: Size::new(config.min_face_size, config.min_face_size),
        })
    }
}

impl FaceLocator for CascadeFaceLocator {
    fn locate(&mut self, frame: &Mat) -> Result<Option<Rect>> {
        if frame.empty() {
            return Ok(None);
        }

        let gray = if frame.channels() == 1 {
            frame.try_clone()?
        } else {
            let mut gray = Mat::default();
            imgproc::cvt_color(frame, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;
            gray
        };

        let mut faces = Vector::<Rect>::new();
        self.classifier.detect_multi_scale(
            &gray,
            &mut faces,
            self.scale_factor,
            self.min_neighbors,
            0,
            self.min_size,
            Size::default(),
        )?;

        if faces.len() > 1 {
            debug!("{} faces detected, keeping the first", faces.len());
        }

        Ok(faces.iter().next())
    }
}

/// Directories searched when the configuration lists none
fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    let relative = format!("haarcascades/{CASCADE_FILE_NAME}");
    match opencv::core::find_file(&relative, false, true) {
        Ok(found) if !found.is_empty() => {
            if let Some(parent) = Path::new(&found).parent() {
                dirs.push(parent.to_path_buf());
            }
        }
        Ok(_) => {}
        Err(e) => debug!("OpenCV data lookup failed: {e}"),
    }

    dirs.extend(PLATFORM_CASCADE_DIRS.iter().map(PathBuf::from));
    dirs
}

/// Find the cascade file.
///
/// Each search directory is tried in order, then the bare file name relative to
/// the working directory.
///
/// # Errors
///
/// Returns `DetectorLoad` if no candidate exists
pub fn resolve_cascade_path(config: &DetectorConfig) -> Result<PathBuf> {
    let dirs = if config.search_dirs.is_empty() {
        default_search_dirs()
    } else {
        config.search_dirs.clone()
    };

    for dir in &dirs {
        let candidate = dir.join(&config.cascade_file);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    warn!(
        "Cascade {} not found in bundled directories, trying relative path",
        config.cascade_file
    );
    let relative = PathBuf::from(&config.cascade_file);
    if relative.is_file() {
        return Ok(relative);
    }

    Err(Error::DetectorLoad(format!(
        "Face cascade {} unavailable",
        config.cascade_file
    )))
}
