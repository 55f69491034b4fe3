#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

// Used by the integration tests' mock engine
#[cfg(test)]
use anyhow as _;
#[cfg(test)]
use rand as _;

pub mod audio;
pub mod cache;
pub mod conditioning;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod postprocess;
pub mod strategy;

// Re-export key types for convenience
pub use cache::MemoryCache;
pub use conditioning::{ConditioningResolver, ResolvedConditioning};
pub use error::{ConditioningError, SynthesisError};
pub use executor::BatchExecutor;
pub use lifecycle::{EngineHandle, EngineSlot, ModelLifecycle};
pub use postprocess::{PostprocessConfig, postprocess};
pub use strategy::{InferenceStrategy, StrategyPlan, instruct_text, select_strategy};
