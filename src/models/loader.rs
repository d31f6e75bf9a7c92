//! Model artifact loader (ONNX and XGBoost JSON)

use crate::config::ModelFormat;
use crate::models::booster::BoostedModel;
use crate::models::xgboost::XgbModel;
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::{debug, info};

/// ONNX Runtime session with resolved tensor names
pub struct OnnxModel {
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    /// Output name carrying the prediction
    pub output_name: String,
}

/// Backend evaluating a loaded artifact
pub enum ModelBackend {
    Onnx(OnnxModel),
    Boosted(BoostedModel),
}

/// Loaded model with metadata
pub struct LoadedModel {
    /// Model name (file stem of the artifact)
    pub name: String,
    /// Resolved artifact format
    pub format: ModelFormat,
    pub backend: ModelBackend,
}

impl LoadedModel {
    /// Number of input columns the artifact declares, if it records one
    pub fn expected_features(&self) -> Option<usize> {
        match &self.backend {
            ModelBackend::Boosted(model) if model.num_features > 0 => Some(model.num_features),
            _ => None,
        }
    }

    /// Column names recorded at training time (empty when unknown)
    pub fn feature_names(&self) -> &[String] {
        match &self.backend {
            ModelBackend::Boosted(model) => &model.feature_names,
            ModelBackend::Onnx(_) => &[],
        }
    }
}

/// Loader for model artifacts
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of ONNX threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load a model artifact, resolving `ModelFormat::Auto` from the extension
    pub fn load_model<P: AsRef<Path>>(&self, path: P, format: ModelFormat) -> Result<LoadedModel> {
        let path = path.as_ref();
        let format = format.resolve(path);
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        info!(model = %name, path = %path.display(), format = ?format, "Loading model");

        let backend = match format {
            ModelFormat::Onnx => ModelBackend::Onnx(self.load_onnx(path, &name)?),
            ModelFormat::XgboostJson | ModelFormat::Auto => {
                ModelBackend::Boosted(self.load_xgboost(path, &name)?)
            }
        };

        Ok(LoadedModel {
            name,
            format,
            backend,
        })
    }

    /// Load an XGBoost JSON document and convert it to the native representation
    fn load_xgboost(&self, path: &Path, name: &str) -> Result<BoostedModel> {
        let document = XgbModel::from_file(path)
            .with_context(|| format!("Failed to load model from {:?}", path))?;

        let [major, minor, patch] = document.version;
        let version = format!("{major}.{minor}.{patch}");
        let model = document
            .to_model()
            .with_context(|| format!("Failed to convert XGBoost model {:?}", path))?;

        info!(
            model = %name,
            xgboost_version = %version,
            trees = model.num_trees(),
            features = model.num_features,
            transform = ?model.transform,
            "Model loaded successfully"
        );

        Ok(model)
    }

    /// Load a single ONNX model from file
    fn load_onnx(&self, path: &Path, name: &str) -> Result<OnnxModel> {
        // Initialize ONNX Runtime
        ort::init().commit()?;
        debug!(onnx_threads = self.onnx_threads, "ONNX Runtime initialized");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {:?}", path))?;

        // Get input/output names
        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| {
                o.name.contains("variable") || o.name.contains("output") || o.name.contains("predict")
            })
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "variable".to_string());

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            threads = self.onnx_threads,
            "Model loaded successfully"
        );

        Ok(OnnxModel {
            session,
            input_name,
            output_name,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const STUMP_MODEL: &str = r#"{
        "version": [2, 0, 3],
        "learner": {
            "feature_names": ["Gender", "Age", "Height", "Weight", "Duration", "Heart_Rate", "Body_Temp"],
            "gradient_booster": {
                "name": "gbtree",
                "model": {
                    "trees": [{
                        "tree_param": {"num_nodes": "3", "size_leaf_vector": "1"},
                        "left_children": [1, -1, -1],
                        "right_children": [2, -1, -1],
                        "split_indices": [4, 0, 0],
                        "split_conditions": [15.5, 40.0, 120.0],
                        "default_left": [1, 0, 0]
                    }]
                }
            },
            "learner_model_param": {"base_score": "5E-1", "num_class": "0", "num_feature": "7"},
            "objective": {"name": "reg:squarederror"}
        }
    }"#;

    #[test]
    fn test_load_xgboost_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calories.json");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(STUMP_MODEL.as_bytes())
            .unwrap();

        let model = ModelLoader::new().load_model(&path, ModelFormat::Auto).unwrap();
        assert_eq!(model.name, "calories");
        assert_eq!(model.format, ModelFormat::XgboostJson);
        assert_eq!(model.expected_features(), Some(7));
        assert_eq!(model.feature_names()[4], "Duration");
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ModelLoader::new().load_model(dir.path().join("absent.json"), ModelFormat::Auto);
        let err = result.err().unwrap();
        assert!(format!("{err:#}").contains("absent.json"));
    }

    #[test]
    fn test_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        std::fs::write(&path, b"\x00\x01 not a model").unwrap();
        assert!(ModelLoader::new().load_model(&path, ModelFormat::XgboostJson).is_err());
    }

    fn onnx_fixture() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sum_features.onnx")
    }

    #[test]
    fn test_load_onnx_resolves_tensor_names() {
        let model = ModelLoader::new().load_model(onnx_fixture(), ModelFormat::Auto).unwrap();
        assert_eq!(model.name, "sum_features");
        assert_eq!(model.format, ModelFormat::Onnx);
        assert_eq!(model.expected_features(), None);
        assert!(model.feature_names().is_empty());

        match &model.backend {
            ModelBackend::Onnx(onnx) => {
                assert_eq!(onnx.input_name, "float_input");
                assert_eq!(onnx.output_name, "variable");
            }
            ModelBackend::Boosted(_) => panic!("expected ONNX backend"),
        }
    }

    #[test]
    fn test_missing_onnx_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ModelLoader::new().load_model(dir.path().join("absent.onnx"), ModelFormat::Onnx);
        let err = result.err().unwrap();
        assert!(format!("{err:#}").contains("absent.onnx"));
    }

    #[test]
    fn test_corrupt_onnx_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.onnx");
        std::fs::write(&path, b"\x08\x07 definitely not a graph").unwrap();
        let result = ModelLoader::new().load_model(&path, ModelFormat::Onnx);
        let err = result.err().unwrap();
        assert!(format!("{err:#}").contains("corrupt.onnx"));
    }
}
