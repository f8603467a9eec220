//! Pretrained gaze regression model.
//!
//! The model maps a normalized face crop to a normalized `(x, y)` screen point.
//! Outputs are nominally in [0, 1] but are not clamped here: near the screen
//! edges the regression may extrapolate.

use crate::config::ModelConfig;
use crate::{Error, Result};
use log::info;
use ndarray::{Array4, CowArray};
use ort::{Environment, Session, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Metrics a serialized model may reference by alias
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Mean absolute error over both coordinates
    MeanAbsoluteError,
}

impl Metric {
    /// Resolve a serialized metric alias
    ///
    /// # Errors
    ///
    /// Returns `ModelLoad` for aliases this loader does not know
    pub fn from_alias(alias: &str) -> Result<Self> {
        match alias {
            "mae" | "mean_absolute_error" | "MeanAbsoluteError" => Ok(Self::MeanAbsoluteError),
            other => Err(Error::ModelLoad(format!("Unknown custom metric alias: {other}"))),
        }
    }

    /// Evaluate predictions against expected points.
    ///
    /// Returns `None` when the slices are empty or differ in length.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Sample counts are small
    pub fn compute(self, predicted: &[(f32, f32)], expected: &[(f32, f32)]) -> Option<f32> {
        if predicted.is_empty() || predicted.len() != expected.len() {
            return None;
        }

        match self {
            Self::MeanAbsoluteError => {
                let total: f32 = predicted
                    .iter()
                    .zip(expected)
                    .map(|(p, e)| (p.0 - e.0).abs() + (p.1 - e.1).abs())
                    .sum();
                Some(total / (predicted.len() * 2) as f32)
            }
        }
    }
}

/// Normalized face tensor to normalized gaze point
pub trait GazeModel: Send {
    /// Predict `(normalized_x, normalized_y)` for a `[1, H, W, 3]` input
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails or the output is malformed
    fn predict(&self, input: Array4<f32>) -> Result<(f32, f32)>;
}

/// Gaze model executed with `ONNX` Runtime in inference-only mode
pub struct OnnxGazeModel {
    session: Session,
    metrics: Vec<Metric>,
}

impl OnnxGazeModel {
    /// Load the model described by `config`.
    ///
    /// The path is resolved against the executable's directory first and the
    /// working directory second.
    ///
    /// # Errors
    ///
    /// Returns `ModelLoad` if the file is missing, a metric alias is unknown, or
    /// the ONNX session cannot be created
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let metrics = config
            .custom_metrics
            .iter()
            .map(|alias| Metric::from_alias(alias))
            .collect::<Result<Vec<_>>>()?;

        let path = resolve_model_path(&config.path)?;
        info!("Initializing gaze model with: {}", path.display());

        let session = Self::build_session(&path)
            .map_err(|e| Error::ModelLoad(format!("{}: {e}", path.display())))?;

        Ok(Self { session, metrics })
    }

    fn build_session(path: &Path) -> Result<Session> {
        let environment = Arc::new(
            Environment::builder()
                .with_name("gaze_model")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelLoad("Model has no inputs".to_string()));
        }
        if session.outputs.is_empty() {
            return Err(Error::ModelLoad("Model has no outputs".to_string()));
        }

        Ok(session)
    }

    /// Metrics resolved from the serialized aliases
    #[must_use]
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }
}

impl GazeModel for OnnxGazeModel {
    fn predict(&self, input: Array4<f32>) -> Result<(f32, f32)> {
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;

        let gaze_output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| Error::ModelOutput("No output from model".to_string()))?;

        let gaze_tensor = gaze_output.try_extract::<f32>()?;
        let gaze_view = gaze_tensor.view();
        let mut values = gaze_view.iter().copied();

        match (values.next(), values.next()) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(Error::ModelOutput(
                "Model returned fewer than two values".to_string(),
            )),
        }
    }
}

/// Locate the model file next to the executable or in the working directory
///
/// # Errors
///
/// Returns `ModelLoad` if neither location holds the file
pub fn resolve_model_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(Error::ModelLoad(format!("Model not found: {}", path.display())))
        };
    }

    let exe_relative = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(path)));
    if let Some(candidate) = exe_relative.filter(|p| p.is_file()) {
        return Ok(candidate);
    }

    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    Err(Error::ModelLoad(format!("Model not found: {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_aliases() {
        assert_eq!(Metric::from_alias("mae").unwrap(), Metric::MeanAbsoluteError);
        assert!(matches!(Metric::from_alias("rmse"), Err(Error::ModelLoad(_))));
    }

    #[test]
    fn test_mean_absolute_error() {
        let predicted = [(0.5, 0.5), (0.2, 0.8)];
        let expected = [(0.4, 0.5), (0.2, 0.6)];
        let mae = Metric::MeanAbsoluteError.compute(&predicted, &expected).unwrap();
        assert!((mae - 0.075).abs() < 1e-6);

        assert!(Metric::MeanAbsoluteError.compute(&[], &[]).is_none());
        assert!(Metric::MeanAbsoluteError.compute(&predicted, &expected[..1]).is_none());
    }

    #[test]
    fn test_missing_model_is_load_failure() {
        let config = ModelConfig {
            path: PathBuf::from("models/definitely_missing_gaze_model.onnx"),
            ..ModelConfig::default()
        };
        assert!(matches!(OnnxGazeModel::new(&config), Err(Error::ModelLoad(_))));
    }

    #[test]
    fn test_unknown_metric_rejected_before_loading() {
        let config = ModelConfig {
            custom_metrics: vec!["huber".to_string()],
            ..ModelConfig::default()
        };
        match OnnxGazeModel::new(&config) {
            Err(Error::ModelLoad(msg)) => assert!(msg.contains("huber")),
            _ => panic!("Expected ModelLoad for unknown metric"),
        }
    }
}
