#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod paths;
pub mod ports;
pub mod random;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    AudioBuffer, ConditioningToken, ReferenceClip, SamplingParams, Speaker, StopFlag,
    SynthesisContext, TextSegment,
};
pub use paths::{
    CANDIDATE_MODEL_DIRS, DEFAULT_MODEL_DIR, MODEL_DIR_ENV, ModelDirResolution, ModelDirSource,
    ModelLayout, PathError, resolve_model_dir,
};
pub use ports::{
    CpuPolicy, Device, DevicePolicy, FrontEnd, FrontEndAssets, ModelConfig, ModelError,
    ModelFactory, ModelInput, NoopCache, Precision, ResultCache, SpeakerProfile, SpeechModel,
    WeightFiles,
};
pub use random::{SeedScope, with_rng};
pub use settings::{
    DEFAULT_MODEL_ID, DEFAULT_TOKEN_ALIASES, EngineSettings, OUTPUT_SAMPLE_RATE,
    PROMPT_SAMPLE_RATE, SettingsError, validate_settings,
};
