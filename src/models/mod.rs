//! ML model loading and inference components

pub mod booster;
pub mod inference;
pub mod loader;
pub mod xgboost;

pub use booster::BoostedModel;
pub use inference::InferenceEngine;
pub use loader::ModelLoader;
