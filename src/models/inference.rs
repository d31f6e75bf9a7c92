//! Single-model inference engine for calorie prediction

use crate::config::AppConfig;
use crate::models::loader::{LoadedModel, ModelBackend, ModelLoader, OnnxModel};
use anyhow::{bail, Context, Result};
use std::time::Instant;
use tracing::debug;

/// Inference engine owning the loaded model artifact
pub struct InferenceEngine {
    model: LoadedModel,
}

impl InferenceEngine {
    /// Create a new inference engine from configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        let loader = ModelLoader::with_threads(config.model.onnx_threads);
        let model = loader.load_model(&config.model.path, config.model.format)?;
        Ok(Self::from_model(model))
    }

    /// Wrap an already loaded model
    pub fn from_model(model: LoadedModel) -> Self {
        Self { model }
    }

    /// Get the loaded model name
    pub fn model_name(&self) -> &str {
        &self.model.name
    }

    /// Column names recorded in the artifact, if any
    pub fn feature_names(&self) -> &[String] {
        self.model.feature_names()
    }

    /// Run inference on one feature vector and return the first output value
    pub fn predict(&mut self, features: &[f32]) -> Result<f32> {
        if let Some(expected) = self.model.expected_features() {
            if expected != features.len() {
                bail!(
                    "Feature shape mismatch: model {} expects {} features, got {}",
                    self.model.name,
                    expected,
                    features.len()
                );
            }
        }

        let start = Instant::now();
        let prediction = match &mut self.model.backend {
            ModelBackend::Boosted(model) => model.predict(features),
            ModelBackend::Onnx(model) => run_onnx(model, features)
                .with_context(|| format!("Inference failed for model {}", self.model.name))?,
        };

        debug!(
            model = %self.model.name,
            format = ?self.model.format,
            prediction = prediction,
            inference_us = start.elapsed().as_micros() as u64,
            "Inference complete"
        );

        Ok(prediction)
    }
}

/// Run an ONNX session on a single row
fn run_onnx(model: &mut OnnxModel, features: &[f32]) -> Result<f32> {
    use ort::value::Tensor;

    // Prepare input tensor - shape [1, num_features]
    let shape = vec![1_i64, features.len() as i64];
    let input_tensor =
        Tensor::from_array((shape, features.to_vec())).context("Failed to create input tensor")?;

    let outputs = model
        .session
        .run(ort::inputs![&model.input_name => input_tensor])?;

    // Preferred output first, then any float tensor output
    if let Some(output) = outputs.get(model.output_name.as_str()) {
        if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
            if let Some(&value) = data.first() {
                return Ok(value);
            }
        }
    }

    for (name, output) in outputs.iter() {
        if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
            if let Some(&value) = data.first() {
                debug!(output = %name, "Extracted prediction from fallback output");
                return Ok(value);
            }
        }
    }

    bail!("Model produced no float tensor output")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelFormat;
    use crate::models::booster::{BoostedModel, Booster, OutputTransform, RegressionTree};

    fn engine(num_features: usize) -> InferenceEngine {
        let mut tree = RegressionTree::with_capacity(3);
        tree.push_split(4, 15.5, true, 1, 2);
        tree.push_leaf(40.0);
        tree.push_leaf(120.0);

        InferenceEngine::from_model(LoadedModel {
            name: "stump".to_string(),
            format: ModelFormat::XgboostJson,
            backend: ModelBackend::Boosted(BoostedModel {
                booster: Booster::Trees {
                    trees: vec![tree],
                    tree_weights: vec![1.0],
                },
                base_margin: 0.5,
                transform: OutputTransform::Identity,
                num_features,
                feature_names: Vec::new(),
            }),
        })
    }

    #[test]
    fn test_predict_boosted() {
        let mut engine = engine(7);
        let prediction = engine
            .predict(&[1.0, 68.0, 190.0, 94.0, 29.0, 105.0, 40.8])
            .unwrap();
        assert_eq!(prediction, 120.5);
        assert_eq!(engine.model_name(), "stump");
    }

    #[test]
    fn test_shape_mismatch_fails() {
        let mut engine = engine(8);
        let err = engine.predict(&[0.0; 7]).unwrap_err();
        assert!(err.to_string().contains("expects 8 features"));
    }

    fn onnx_engine() -> InferenceEngine {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/sum_features.onnx");
        let model = ModelLoader::new().load_model(path, ModelFormat::Onnx).unwrap();
        InferenceEngine::from_model(model)
    }

    #[test]
    fn test_predict_onnx_returns_first_output() {
        // The fixture graph is ReduceSum over a [1, 7] float input
        let mut engine = onnx_engine();
        let prediction = engine
            .predict(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0])
            .unwrap();
        assert_eq!(prediction, 28.0);
        assert_eq!(engine.model_name(), "sum_features");
    }

    #[test]
    fn test_predict_onnx_shape_mismatch_fails() {
        let mut engine = onnx_engine();
        let err = engine.predict(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(format!("{err:#}").contains("Inference failed for model sum_features"));
    }

    #[test]
    fn test_unknown_feature_count_is_not_checked() {
        let mut engine = engine(0);
        assert_eq!(engine.predict(&[0.0; 5]).unwrap(), 40.5);
    }
}
