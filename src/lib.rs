//! Webcam gaze estimation and gaze-away attention monitoring.
//!
//! The estimation pipeline consists of:
//! 1. Face location with an `OpenCV` Haar cascade (first face only)
//! 2. Face crop normalization to a `[1, 224, 224, 3]` tensor
//! 3. Gaze regression with ONNX Runtime, giving a normalized screen point
//! 4. Mapping to pixel coordinates of the target screen
//!
//! An [`attention::AttentionMonitor`] turns the per-frame classification into a
//! debounced gaze-away alert with a bounded history.
//!
//! # Examples
//!
//! ```no_run
//! use gaze_proctor::{config::Config, gaze_processor::GazeProcessor};
//! use opencv::{imgcodecs, prelude::*};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let mut processor = GazeProcessor::from_config(&config);
//!
//! let frame = imgcodecs::imread("face.jpg", imgcodecs::IMREAD_COLOR)?;
//! match processor.get_gaze_coordinates(&frame) {
//!     Some(gaze) => println!("Looking at {gaze}"),
//!     None => println!("No face detected"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Attention monitoring
//!
//! ```
//! use chrono::{Duration, Utc};
//! use gaze_proctor::attention::{AttentionMonitor, AttentionStatus};
//!
//! let mut monitor = AttentionMonitor::default();
//! let start = Utc::now();
//! for step in 0..=30 {
//!     monitor.observe(AttentionStatus::Cheating, start + Duration::milliseconds(100 * step));
//! }
//! assert_eq!(monitor.history_len(), 1);
//! ```

/// Face location with a Haar cascade
pub mod face_detection;

/// Face crop normalization into model input tensors
pub mod face_normalization;

/// Gaze regression model
pub mod gaze_model;

/// Gaze pipeline orchestration and pixel mapping
pub mod gaze_processor;

/// Drawing of gaze markers and status banners
pub mod overlay;

/// Attention state machine and alert history
pub mod attention;

/// Snapshot sharing between worker and polling loop
pub mod session;

/// Camera and video file acquisition
pub mod capture;

/// Utility functions
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
