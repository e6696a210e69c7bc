//! ONNX Runtime session construction.

use crate::config::InferenceDevice;
use crate::error::{Error, Result};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load an ONNX model and select an execution provider for `device`.
///
/// `Auto` tries CUDA and silently falls back to CPU; `Gpu` warns on
/// fallback; `Cpu` never registers a GPU provider.
pub fn build_session(model_path: &Path, device: InferenceDevice) -> Result<Session> {
    if !model_path.is_file() {
        return Err(Error::ModelFileNotFound {
            path: model_path.to_path_buf(),
        });
    }

    let load_error = |reason: String| Error::ModelLoad {
        path: model_path.to_path_buf(),
        reason,
    };

    let model_bytes = std::fs::read(model_path)?;

    let base_builder = || {
        Session::builder()
            .map_err(|e| load_error(format!("failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_error(format!("failed to set optimization level: {e}")))
    };

    if device != InferenceDevice::Cpu {
        if let Ok(mut cuda_builder) = base_builder()?
            .with_execution_providers([CUDAExecutionProvider::default().build().error_on_failure()])
            && let Ok(session) = cuda_builder.commit_from_memory(&model_bytes)
        {
            info!("Using CUDA execution provider for {}", model_path.display());
            return Ok(session);
        }

        if device == InferenceDevice::Gpu {
            warn!("GPU requested but CUDA is not available, using CPU");
        } else {
            debug!("CUDA not available, using CPU");
        }
    }

    info!("Using CPU execution provider for {}", model_path.display());
    base_builder()?
        .commit_from_memory(&model_bytes)
        .map_err(|e| load_error(e.to_string()))
}
