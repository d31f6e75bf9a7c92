//! One-shot predictor: parse input, order features, load model, infer.

use crate::config::AppConfig;
use crate::feature_extractor::FeatureExtractor;
use crate::models::inference::InferenceEngine;
use crate::types::workout::WorkoutInput;
use anyhow::Result;
use tracing::{debug, warn};

/// Runs a single prediction for one workout.
pub struct Predictor {
    config: AppConfig,
    extractor: FeatureExtractor,
}

impl Predictor {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            extractor: FeatureExtractor::new(),
        }
    }

    /// Predict calories for a workout given as a JSON object string.
    ///
    /// The input is parsed and ordered before the model is touched, so a
    /// malformed argument fails without reading the artifact.
    pub fn predict_json(&self, raw: &str) -> Result<f32> {
        let workout = WorkoutInput::from_json(raw)?;
        let features = self.extractor.extract(&workout);
        debug!(features = ?features, "Feature vector built");

        let mut engine = InferenceEngine::new(&self.config)?;
        self.check_feature_names(&engine);

        engine.predict(&features)
    }

    /// Warn when the artifact records column names in a different order.
    fn check_feature_names(&self, engine: &InferenceEngine) {
        let recorded = engine.feature_names();
        if recorded.is_empty() {
            return;
        }

        let expected = self.extractor.feature_names();
        if recorded.len() != expected.len() || recorded.iter().zip(expected).any(|(a, b)| a != b) {
            warn!(
                model = %engine.model_name(),
                recorded = ?recorded,
                expected = ?expected,
                "Model feature names differ from input column order"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_input_fails_before_model_load() {
        let mut config = AppConfig::default();
        config.model.path = "definitely/not/here.json".into();
        let predictor = Predictor::new(config);

        let err = predictor.predict_json(r#"{"Gender": 1,"#).unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("parse workout input"));
        assert!(!chain.contains("not/here"));
    }

    #[test]
    fn test_missing_model_fails() {
        let mut config = AppConfig::default();
        config.model.path = "definitely/not/here.json".into();
        let predictor = Predictor::new(config);

        let raw = r#"{"Gender":1,"Age":68,"Height":190,"Weight":94,"Duration":29,"Heart_Rate":105,"Body_Temp":40.8}"#;
        let err = predictor.predict_json(raw).unwrap_err();
        assert!(format!("{err:#}").contains("not/here"));
    }
}
