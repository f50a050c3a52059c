//! Model types
//!
//! Defines model profile and status structures.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Static descriptor of a selectable inference model. Immutable; owned by
/// the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    /// Display name of the model
    pub name: String,
    /// GGUF weight file name, resolved against the models directory
    pub model_file: String,
    /// Context window size in tokens (prompt + response)
    pub context_length: u32,
    /// Declared memory footprint when loaded. Accounting uses this
    /// estimate rather than measured resident memory.
    pub memory_requirement_bytes: u64,
    /// Default sampling temperature
    pub temperature: f32,
    /// Default nucleus sampling parameter
    pub top_p: f32,
    /// Number of layers to offload to GPU (0 = CPU only)
    pub gpu_offload_layers: u32,
}

impl ModelProfile {
    /// Absolute path of the weight file under `models_dir`.
    pub fn weight_path(&self, models_dir: &Path) -> PathBuf {
        models_dir.join(&self.model_file)
    }
}

/// Per-model status as reported by `list_models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub name: String,
    /// Path to the weight file
    pub path: PathBuf,
    /// Whether the weight file is present on disk
    pub exists: bool,
    /// Weight file size in bytes (0 if absent)
    pub size_bytes: u64,
    /// Whether the model is currently loaded
    pub loaded: bool,
    pub profile: ModelProfile,
}
