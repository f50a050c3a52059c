//! Inference engine seam
//!
//! The neural computation itself lives behind these traits. The manager
//! only needs two capabilities: instantiate a model from a weight file,
//! and stream generated text fragments from a loaded instance.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::ModelProfile;

/// Sampling and length parameters for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature; `None` uses the model profile's default
    pub temperature: Option<f32>,
    /// Nucleus sampling parameter; `None` uses the model profile's default
    pub top_p: Option<f32>,
    /// Stop sequences that terminate generation
    pub stop: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: None,
            top_p: None,
            stop: vec!["</s>".into(), "<|endoftext|>".into(), "\n\n".into()],
        }
    }
}

/// Factory for loaded model instances.
///
/// Implementations own whatever blocking work instantiation requires
/// (e.g. running llama.cpp loads on a blocking thread).
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Instantiate `profile` from its weight file. Failures map to
    /// `Error::EngineFailure`.
    async fn load(&self, profile: &ModelProfile, weight_path: &Path)
        -> Result<Arc<dyn ModelRuntime>>;
}

/// One loaded model instance capable of generating tokens.
///
/// Dropping the last `Arc` releases the instance's resources.
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Generate text for `prompt`, pushing fragments into `tx` as they are
    /// produced. Implementations must stop promptly once the receiver is
    /// dropped (a failed send) so an abandoned stream never leaks work.
    async fn generate(
        &self,
        prompt: &str,
        params: GenerationParams,
        tx: mpsc::Sender<String>,
    ) -> Result<()>;
}
