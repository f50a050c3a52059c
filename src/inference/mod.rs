//! Inference runtime management
//!
//! This module owns everything between a model name and a stream of
//! generated text: the profile catalog, the memory budget ledger, the
//! engine seam, and the lifecycle manager that loads, evicts, and
//! dispatches to loaded models.

pub mod budget;
pub mod engine;
pub mod manager;
pub mod registry;

pub use budget::ResourceBudget;
pub use engine::{GenerationParams, InferenceEngine, ModelRuntime};
pub use manager::{LoadedModelInfo, MemoryLedger, ModelLifecycleManager, SystemStatus};
pub use registry::ModelRegistry;
