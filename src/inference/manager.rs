//! Model lifecycle manager
//!
//! Orchestrates load/unload/switch across loaded models under the memory
//! budget, holds the single "current model" pointer, and turns generation
//! requests into fragment streams.
//!
//! Mutations of the loaded set and the current pointer happen under one
//! state lock held only for bookkeeping; a separate gate serializes
//! load/eviction sequences so an in-flight engine load never blocks
//! dispatch to already-loaded models.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{Error, Result};
use crate::inference::budget::ResourceBudget;
use crate::inference::engine::{GenerationParams, InferenceEngine, ModelRuntime};
use crate::inference::registry::ModelRegistry;
use crate::types::{ModelProfile, ModelStatus};

/// Channel depth for generation fragment streams.
const STREAM_BUFFER: usize = 32;

/// One loaded model instance with its budget bookkeeping.
///
/// The runtime is reference-counted: evicting a model mid-generation only
/// removes it from the loaded set, and the engine instance is released
/// when the last in-flight generation drops its handle.
struct LoadedModel {
    profile: ModelProfile,
    runtime: Arc<dyn ModelRuntime>,
    memory_usage_bytes: u64,
    last_used: Instant,
}

struct ManagerState {
    loaded: HashMap<String, LoadedModel>,
    current: Option<String>,
    budget: ResourceBudget,
}

/// Information about a loaded model, as reported by `get_model_info`.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedModelInfo {
    pub name: String,
    pub path: PathBuf,
    pub memory_usage_bytes: u64,
    pub profile: ModelProfile,
}

/// Memory ledger snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryLedger {
    pub max_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
}

/// Snapshot of the manager for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub memory: MemoryLedger,
    pub loaded: Vec<String>,
    pub current: Option<String>,
    pub count: usize,
}

/// Loads, unloads, and switches models under a fixed memory ceiling.
pub struct ModelLifecycleManager {
    engine: Arc<dyn InferenceEngine>,
    registry: ModelRegistry,
    models_dir: PathBuf,
    max_tokens_per_request: u32,
    /// Fallback target when a generation request names no model and none
    /// is current.
    default_model: Option<String>,
    state: Mutex<ManagerState>,
    /// Serializes load/eviction sequences without holding `state` across
    /// the engine load itself.
    load_gate: Mutex<()>,
}

impl ModelLifecycleManager {
    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        registry: ModelRegistry,
        models_dir: PathBuf,
        max_memory_bytes: u64,
        max_tokens_per_request: u32,
        default_model: Option<String>,
    ) -> Self {
        tracing::info!(
            models_dir = %models_dir.display(),
            max_memory_bytes,
            "model lifecycle manager initialized"
        );
        Self {
            engine,
            registry,
            models_dir,
            max_tokens_per_request,
            default_model,
            state: Mutex::new(ManagerState {
                loaded: HashMap::new(),
                current: None,
                budget: ResourceBudget::new(max_memory_bytes),
            }),
            load_gate: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Per-model status for every profile in the registry. Pure read.
    pub async fn list_models(&self) -> Vec<ModelStatus> {
        let st = self.state.lock().await;
        self.registry
            .profiles()
            .iter()
            .map(|profile| {
                let path = profile.weight_path(&self.models_dir);
                let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                ModelStatus {
                    name: profile.name.clone(),
                    exists: path.exists(),
                    size_bytes,
                    loaded: st.loaded.contains_key(&profile.name),
                    path,
                    profile: profile.clone(),
                }
            })
            .collect()
    }

    /// Load `name` and make it current. Idempotent for already-loaded
    /// models. Evicts least-recently-used models as needed to fit the
    /// memory ceiling.
    pub async fn load(&self, name: &str) -> Result<bool> {
        let profile = self.registry.get(name)?.clone();

        // At most one load/eviction sequence runs at a time. The state
        // lock is only taken for the brief bookkeeping steps, so dispatch
        // to already-loaded models proceeds while the engine load is in
        // flight.
        let _gate = self.load_gate.lock().await;

        {
            let mut st = self.state.lock().await;
            if st.loaded.contains_key(name) {
                tracing::info!(model = name, "already loaded, repointing current");
                st.current = Some(name.to_string());
                return Ok(true);
            }
        }

        let path = profile.weight_path(&self.models_dir);
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "model weight file {}",
                path.display()
            )));
        }

        // The budget charge is reserved before the engine load starts;
        // the gate keeps any other eviction pass from running meanwhile.
        let required = profile.memory_requirement_bytes;
        {
            let mut st = self.state.lock().await;
            Self::ensure_capacity(&mut st, required, name)?;
            st.budget.charge(name, required)?;
        }

        tracing::info!(model = name, bytes = required, "loading model");

        match self.engine.load(&profile, &path).await {
            Ok(runtime) => {
                let mut st = self.state.lock().await;
                st.loaded.insert(
                    name.to_string(),
                    LoadedModel {
                        profile,
                        runtime,
                        memory_usage_bytes: required,
                        last_used: Instant::now(),
                    },
                );
                st.current = Some(name.to_string());
                tracing::info!(model = name, "model loaded");
                Ok(true)
            }
            Err(e) => {
                self.state.lock().await.budget.release(name);
                tracing::error!(model = name, error = %e, "model load failed");
                Err(e)
            }
        }
    }

    /// Unload `name`, releasing its engine resources and budget charge.
    /// Returns false if the model was not loaded.
    pub async fn unload(&self, name: &str) -> bool {
        let mut st = self.state.lock().await;
        let removed = Self::remove_locked(&mut st, name);
        if removed {
            tracing::info!(model = name, "model unloaded");
        } else {
            tracing::warn!(model = name, "unload requested but model not loaded");
        }
        removed
    }

    /// Make `name` current, loading it first if necessary. Never unloads
    /// the previous current model; several models may coexist in budget.
    pub async fn switch(&self, name: &str) -> Result<()> {
        {
            let mut st = self.state.lock().await;
            if st.loaded.contains_key(name) {
                st.current = Some(name.to_string());
                tracing::info!(model = name, "switched current model");
                return Ok(());
            }
        }
        self.load(name).await?;
        Ok(())
    }

    pub async fn current_model(&self) -> Option<String> {
        self.state.lock().await.current.clone()
    }

    /// Information about `name`, or the current model when `None`.
    pub async fn get_model_info(&self, name: Option<&str>) -> Result<LoadedModelInfo> {
        let st = self.state.lock().await;
        let target = name
            .map(str::to_string)
            .or_else(|| st.current.clone())
            .ok_or_else(|| Error::NotFound("no model specified or loaded".into()))?;

        let model = st
            .loaded
            .get(&target)
            .ok_or_else(|| Error::NotFound(format!("model {target} not loaded")))?;

        Ok(LoadedModelInfo {
            name: target,
            path: model.profile.weight_path(&self.models_dir),
            memory_usage_bytes: model.memory_usage_bytes,
            profile: model.profile.clone(),
        })
    }

    /// Memory ledger and loaded set snapshot.
    pub async fn system_status(&self) -> SystemStatus {
        let st = self.state.lock().await;
        let mut loaded: Vec<String> = st.loaded.keys().cloned().collect();
        loaded.sort();
        SystemStatus {
            memory: MemoryLedger {
                max_bytes: st.budget.max_bytes(),
                used_bytes: st.budget.used(),
                available_bytes: st.budget.available(),
            },
            count: loaded.len(),
            loaded,
            current: st.current.clone(),
        }
    }

    /// Generate a finite stream of text fragments for `prompt`.
    ///
    /// The target model is the explicit `model_name` if given, else the
    /// current model, else the configured default. Every failure along
    /// the way — no model resolvable,
    /// implicit load failure, mid-generation engine fault — is downgraded
    /// to one terminal in-band `"Error: …"` fragment so the stream always
    /// terminates and nothing escapes to the consumer.
    pub async fn generate_stream(
        &self,
        prompt: String,
        model_name: Option<String>,
        params: GenerationParams,
    ) -> ReceiverStream<String> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        match self.prepare_generation(model_name, params).await {
            Ok((runtime, params)) => {
                tokio::spawn(async move {
                    if let Err(e) = runtime.generate(&prompt, params, tx.clone()).await {
                        tracing::error!(error = %e, "generation failed");
                        let _ = tx.send(format!("Error: {e}")).await;
                    }
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "generation failed before dispatch");
                // The channel is buffered, so the marker is queued even
                // before the consumer starts reading.
                let _ = tx.try_send(format!("Error: {e}"));
            }
        }

        ReceiverStream::new(rx)
    }

    /// Resolve the target model (loading implicitly if needed) and fill in
    /// profile defaults for unspecified sampling parameters.
    async fn prepare_generation(
        &self,
        model_name: Option<String>,
        mut params: GenerationParams,
    ) -> Result<(Arc<dyn ModelRuntime>, GenerationParams)> {
        let target = {
            let st = self.state.lock().await;
            model_name.or_else(|| st.current.clone())
        }
        .or_else(|| self.default_model.clone())
        .ok_or_else(|| {
            Error::EngineFailure("no model loaded and no model requested".into())
        })?;

        let (runtime, profile) = self.runtime_for(&target).await?;

        params.max_tokens = params.max_tokens.min(self.max_tokens_per_request);
        params.temperature.get_or_insert(profile.temperature);
        params.top_p.get_or_insert(profile.top_p);

        Ok((runtime, params))
    }

    /// Resolve the runtime for `name`, loading implicitly when absent, and
    /// mark it as used for eviction ordering.
    async fn runtime_for(&self, name: &str) -> Result<(Arc<dyn ModelRuntime>, ModelProfile)> {
        {
            let mut st = self.state.lock().await;
            if let Some(model) = st.loaded.get_mut(name) {
                model.last_used = Instant::now();
                return Ok((model.runtime.clone(), model.profile.clone()));
            }
        }

        self.load(name).await?;

        let mut st = self.state.lock().await;
        let model = st
            .loaded
            .get_mut(name)
            .ok_or_else(|| Error::EngineFailure(format!("model {name} evicted during load")))?;
        model.last_used = Instant::now();
        Ok((model.runtime.clone(), model.profile.clone()))
    }

    /// Evict least-recently-used models (other than `keep`) until `required`
    /// bytes are available, or fail when that cannot be reached.
    fn ensure_capacity(st: &mut ManagerState, required: u64, keep: &str) -> Result<()> {
        if !st.budget.fits_ceiling(required) {
            return Err(Error::InvalidResource(format!(
                "model {keep} requires {required} bytes, exceeding the {} byte ceiling",
                st.budget.max_bytes()
            )));
        }

        while st.budget.available() < required {
            let victim = st
                .loaded
                .iter()
                .filter(|(name, _)| name.as_str() != keep)
                .min_by_key(|(_, model)| model.last_used)
                .map(|(name, _)| name.clone());

            match victim {
                Some(victim) => {
                    tracing::info!(model = %victim, "evicting model to free memory");
                    Self::remove_locked(st, &victim);
                }
                None => {
                    return Err(Error::InvalidResource(format!(
                        "model {keep} requires {required} bytes, only {} available and nothing left to evict",
                        st.budget.available()
                    )));
                }
            }
        }

        Ok(())
    }

    fn remove_locked(st: &mut ManagerState, name: &str) -> bool {
        if st.loaded.remove(name).is_none() {
            return false;
        }
        st.budget.release(name);
        if st.current.as_deref() == Some(name) {
            st.current = st.loaded.keys().next().cloned();
        }
        true
    }
}
