//! ONNX Runtime backbone.
//!
//! Uses ONNX Runtime with automatic execution provider selection:
//! - CUDA on Linux with NVIDIA GPU (when `cuda` feature enabled)
//! - CoreML on macOS
//! - CPU fallback on all platforms

use std::path::Path;
use std::sync::Mutex;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use super::backbone::{EmotionBackbone, ModelInput};
use crate::error::{MediaError, MediaResult};

/// Classifier network exported to ONNX.
///
/// The session is locked only for the duration of `run`.
pub struct OrtBackbone {
    session: Mutex<Session>,
    name: String,
}

impl OrtBackbone {
    /// Load a model file.
    pub fn load(model_path: &Path, intra_threads: usize) -> MediaResult<Self> {
        if !model_path.exists() {
            return Err(MediaError::model_not_found(model_path));
        }

        let session = create_session(model_path, intra_threads)?;
        let name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        info!(
            model_path = %model_path.display(),
            intra_threads,
            "Emotion classifier loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            name,
        })
    }
}

impl EmotionBackbone for OrtBackbone {
    fn forward(&self, input: &ModelInput) -> MediaResult<Vec<f32>> {
        let tensor = Tensor::from_array((input.shape.clone(), input.data.clone().into_boxed_slice()))
            .map(Value::<ort::value::DynValueTypeMarker>::from)
            .map_err(|e| MediaError::internal(format!("Failed to create tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::internal("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| MediaError::internal(format!("ONNX inference failed: {}", e)))?;

        let output = outputs
            .iter()
            .next()
            .ok_or_else(|| MediaError::internal("Model produced no outputs"))?;

        let scores = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::internal(format!("Failed to extract tensor: {}", e)))?;

        Ok(scores.1.iter().copied().collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Create ONNX Runtime session with automatic execution provider selection.
fn create_session(model_path: &Path, intra_threads: usize) -> MediaResult<Session> {
    let model_bytes = std::fs::read(model_path)?;

    let builder = Session::builder()
        .map_err(|e| MediaError::model_load(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::model_load(format!("Failed to set optimization level: {}", e)))?
        .with_intra_threads(intra_threads.max(1))
        .map_err(|e| MediaError::model_load(format!("Failed to set thread count: {}", e)))?;

    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider for emotion classifier");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, trying alternatives");
    }

    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!("Using CoreML execution provider for emotion classifier");
                return Ok(session);
            }
        }
        debug!("CoreML execution provider not available, using CPU");
    }

    debug!("Using CPU execution provider for emotion classifier");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| MediaError::model_load(format!("Failed to load ONNX model: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_model_is_not_found() {
        let err = OrtBackbone::load(Path::new("/nonexistent/model.onnx"), 1)
            .err()
            .unwrap();
        assert!(matches!(err, MediaError::ModelNotFound(_)));
    }

    #[test]
    fn test_corrupt_model_fails_to_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not an onnx graph").unwrap();
        assert!(OrtBackbone::load(file.path(), 1).is_err());
    }
}
