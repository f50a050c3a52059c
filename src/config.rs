//! Application settings
//!
//! Manages persistence and validation of runtime configuration: directories,
//! memory ceiling, context limits, and cache sizing.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default memory ceiling for loaded models: 16 GiB.
const DEFAULT_MAX_MEMORY_BYTES: u64 = 16 * 1024 * 1024 * 1024;

/// Runtime configuration for the assistant core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory where model weight files (.gguf) are stored
    pub models_dir: PathBuf,
    /// Directory for conversation records and other persistent state
    pub data_dir: PathBuf,
    /// Generation fallback when no model is requested and none is loaded;
    /// handed to the lifecycle manager at construction
    pub default_model: String,
    /// Memory ceiling for the sum of all loaded models
    pub max_memory_bytes: u64,
    /// Upper bound on any model's effective context window
    pub max_context_length: u32,
    /// Hard cap on tokens generated per request
    pub max_tokens_per_request: u32,
    /// Context tokens reserved for the response when building prompts
    pub reserved_response_tokens: u32,
    /// Capacity of the in-memory conversation cache
    pub max_active_conversations: usize,
    /// CPU threads for inference (0 = auto); consumed by the engine
    /// implementation behind the inference seam
    #[serde(default)]
    pub cpu_threads: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let base = directories::ProjectDirs::from("", "", "codeassist")
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("./data"));

        Self {
            models_dir: base.join("models"),
            data_dir: base,
            default_model: "phi-3.5-mini".to_string(),
            max_memory_bytes: DEFAULT_MAX_MEMORY_BYTES,
            max_context_length: 8192,
            max_tokens_per_request: 4096,
            reserved_response_tokens: 1000,
            max_active_conversations: 100,
            cpu_threads: 0,
        }
    }
}

impl Settings {
    /// Clamp values into acceptable ranges.
    pub fn validate(&mut self) {
        if self.max_memory_bytes == 0 {
            self.max_memory_bytes = DEFAULT_MAX_MEMORY_BYTES;
        }

        self.max_context_length = self.max_context_length.clamp(2048, 131072);
        self.max_tokens_per_request = self
            .max_tokens_per_request
            .clamp(1, self.max_context_length);

        // The reserve must leave room for at least one history message.
        if self.reserved_response_tokens >= self.max_context_length {
            self.reserved_response_tokens = self.max_context_length / 8;
        }

        if self.max_active_conversations == 0 {
            self.max_active_conversations = 100;
        }

        if self.default_model.trim().is_empty() {
            self.default_model = "phi-3.5-mini".to_string();
        }
    }

    /// Load settings from `path`, falling back to defaults if the file does
    /// not exist or is corrupted.
    pub fn load(path: &PathBuf) -> Self {
        match Self::load_internal(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to load settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    fn load_internal(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            tracing::info!("Settings file not found, using defaults");
            return Ok(Self::default());
        }

        let json = fs::read_to_string(path)?;
        let mut settings: Settings = serde_json::from_str(&json)?;
        settings.validate();

        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to `path`, creating parent directories as needed.
    pub fn save(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;

        tracing::debug!("Saved settings to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.default_model, "phi-3.5-mini");
        assert_eq!(settings.max_context_length, 8192);
        assert_eq!(settings.reserved_response_tokens, 1000);
        assert_eq!(settings.max_active_conversations, 100);
    }

    #[test]
    fn test_validation_clamps_values() {
        let mut settings = Settings::default();

        settings.max_context_length = 100;
        settings.validate();
        assert_eq!(settings.max_context_length, 2048);

        settings.max_tokens_per_request = 1_000_000;
        settings.validate();
        assert_eq!(settings.max_tokens_per_request, settings.max_context_length);

        settings.reserved_response_tokens = settings.max_context_length + 1;
        settings.validate();
        assert!(settings.reserved_response_tokens < settings.max_context_length);

        settings.max_active_conversations = 0;
        settings.validate();
        assert_eq!(settings.max_active_conversations, 100);
    }

    #[test]
    fn test_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.default_model = "qwen2.5-coder-7b".to_string();
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path);
        assert_eq!(loaded.default_model, "qwen2.5-coder-7b");
        assert_eq!(loaded.max_memory_bytes, settings.max_memory_bytes);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let loaded = Settings::load(&PathBuf::from("/nonexistent/settings.json"));
        assert_eq!(loaded.default_model, "phi-3.5-mini");
    }
}
