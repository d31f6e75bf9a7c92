//! Type definitions for the calorie predictor

pub mod workout;

pub use workout::WorkoutInput;
