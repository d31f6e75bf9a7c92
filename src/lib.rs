//! Calorie Predictor Library
//!
//! Loads a pre-trained gradient boosted regressor and predicts the calories
//! burned during a workout from seven numeric features.

pub mod config;
pub mod feature_extractor;
pub mod models;
pub mod predictor;
pub mod types;

pub use config::AppConfig;
pub use feature_extractor::FeatureExtractor;
pub use models::inference::InferenceEngine;
pub use predictor::Predictor;
pub use types::workout::WorkoutInput;
