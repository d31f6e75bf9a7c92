//! Workout record parsed from the command-line argument

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One workout session to be scored by the calorie model.
///
/// Field names follow the column names the model was trained on. Every key is
/// required and must hold a JSON number; unknown keys are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkoutInput {
    /// Gender code (1 = male, 0 = female)
    #[serde(rename = "Gender")]
    pub gender: f64,

    /// Age in years
    #[serde(rename = "Age")]
    pub age: f64,

    /// Height in centimetres
    #[serde(rename = "Height")]
    pub height: f64,

    /// Weight in kilograms
    #[serde(rename = "Weight")]
    pub weight: f64,

    /// Session duration in minutes
    #[serde(rename = "Duration")]
    pub duration: f64,

    /// Average heart rate in beats per minute
    #[serde(rename = "Heart_Rate")]
    pub heart_rate: f64,

    /// Body temperature in degrees Celsius
    #[serde(rename = "Body_Temp")]
    pub body_temp: f64,
}

impl WorkoutInput {
    /// Parse a workout from its JSON object encoding.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(raw).context("Failed to parse workout input JSON")?;

        // serde accepts a positional array for structs; only keyed objects are valid here
        if !value.is_object() {
            bail!("Workout input must be a JSON object, got: {}", value);
        }

        serde_json::from_value(value).context("Invalid workout input")
    }
}
