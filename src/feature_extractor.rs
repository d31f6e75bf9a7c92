//! Feature extraction for calorie model inference.
//!
//! Features are emitted in the exact column order the regressor was trained
//! with. The model consumes them positionally, so this order is the contract.

use crate::types::workout::WorkoutInput;

/// Column names in model input order.
const FEATURE_NAMES: [&str; 7] = [
    "Gender",
    "Age",
    "Height",
    "Weight",
    "Duration",
    "Heart_Rate",
    "Body_Temp",
];

/// Feature extractor that transforms a workout into the model input row.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract the feature vector from a workout.
    pub fn extract(&self, workout: &WorkoutInput) -> Vec<f32> {
        vec![
            workout.gender as f32,
            workout.age as f32,
            workout.height as f32,
            workout.weight as f32,
            workout.duration as f32,
            workout.heart_rate as f32,
            workout.body_temp as f32,
        ]
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_NAMES.len()
    }

    /// Get feature names (matching model column order).
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
