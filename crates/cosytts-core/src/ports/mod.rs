//! Port definitions (trait abstractions) for external collaborators.
//!
//! Ports define the interfaces the orchestrator expects from the systems it
//! sits between. They contain no implementation details and use only domain
//! types.
//!
//! # Design Rules
//!
//! - No tensor or runtime types in any signature
//! - All ports are object-safe and `Send + Sync` so they can be shared as
//!   `Arc<dyn …>` across caller threads
//! - Key derivation for cached results belongs to the cache, not the caller

pub mod cache;
pub mod device;
pub mod engine;
pub mod speaker;

pub use cache::{NoopCache, ResultCache};
pub use device::{CpuPolicy, Device, DevicePolicy, Precision};
pub use engine::{
    FrontEnd, FrontEndAssets, ModelConfig, ModelError, ModelFactory, ModelInput, SpeechModel,
    WeightFiles,
};
pub use speaker::SpeakerProfile;
