//! Model registry
//!
//! Static catalog of the model profiles this assistant can run. Profiles
//! carry the declared memory footprint used for budget accounting and the
//! sampling defaults used when a request leaves them unspecified.

use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::types::ModelProfile;

const GIB: u64 = 1024 * 1024 * 1024;

/// Built-in catalog. Coding models get lower temperatures.
static BUILTIN_PROFILES: Lazy<Vec<ModelProfile>> = Lazy::new(|| {
    vec![
        ModelProfile {
            name: "phi-3.5-mini".into(),
            model_file: "phi-3.5-mini-instruct-q4_k_m.gguf".into(),
            context_length: 131072,
            memory_requirement_bytes: 8 * GIB,
            temperature: 0.7,
            top_p: 0.9,
            gpu_offload_layers: 32,
        },
        ModelProfile {
            name: "qwen2.5-coder-7b".into(),
            model_file: "qwen2.5-coder-7b-instruct-q4_k_m.gguf".into(),
            context_length: 32768,
            memory_requirement_bytes: 16 * GIB,
            temperature: 0.3,
            top_p: 0.95,
            gpu_offload_layers: 40,
        },
        ModelProfile {
            name: "deepseek-coder-33b".into(),
            model_file: "deepseek-coder-33b-instruct-q4_k_m.gguf".into(),
            context_length: 16384,
            memory_requirement_bytes: 32 * GIB,
            temperature: 0.2,
            top_p: 0.95,
            gpu_offload_layers: 60,
        },
    ]
});

/// Immutable catalog of selectable models.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    profiles: Vec<ModelProfile>,
}

impl ModelRegistry {
    /// Registry with the built-in catalog.
    pub fn builtin() -> Self {
        Self {
            profiles: BUILTIN_PROFILES.clone(),
        }
    }

    /// Registry with an explicit set of profiles (tests, custom installs).
    pub fn with_profiles(profiles: Vec<ModelProfile>) -> Self {
        Self { profiles }
    }

    /// Look up a profile by name.
    pub fn get(&self, name: &str) -> Result<&ModelProfile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::NotFound(format!("model {name}")))
    }

    pub fn profiles(&self) -> &[ModelProfile] {
        &self.profiles
    }
}
