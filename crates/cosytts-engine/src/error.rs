//! Orchestrator error types.

use std::path::PathBuf;

use cosytts_core::{ModelError, PathError, SettingsError};

use crate::strategy::InferenceStrategy;

/// Why a batch has no usable speaker conditioning.
#[derive(Debug, thiserror::Error)]
pub enum ConditioningError {
    /// The representative segment carries no speaker.
    #[error("Batch has no speaker")]
    MissingSpeaker,

    /// The speaker has neither an embedding nor a reference clip with a
    /// transcript for the requested emotion.
    #[error("Speaker '{speaker}' has no usable conditioning for emotion '{emotion}'")]
    NoUsableConditioning { speaker: String, emotion: String },
}

/// Errors that can occur while loading the model or synthesizing a batch.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// Model files missing or unreadable. Not retried.
    #[error("Failed to initialize model from {path}: {reason}")]
    Initialization { path: PathBuf, reason: String },

    /// No speaker conditioning could be resolved.
    #[error(transparent)]
    Conditioning(#[from] ConditioningError),

    /// The requested strategy does not match the loaded model.
    #[error("{model_dir} does not support {mode} inference")]
    UnsupportedMode {
        mode: InferenceStrategy,
        model_dir: PathBuf,
    },

    /// The engine failed during inference.
    #[error("Inference failed: {0}")]
    Model(#[from] ModelError),

    /// Reference audio could not be decoded or resampled.
    #[error("Reference audio processing failed: {0}")]
    Audio(String),

    /// `run` was called without segments.
    #[error("Batch contains no segments")]
    EmptyBatch,

    /// A segment disagrees with the batch's representative segment.
    #[error("Segment {index} does not match the batch: {reason}")]
    MixedBatch { index: usize, reason: String },

    /// The batch was cancelled before producing any audio.
    #[error("Synthesis cancelled")]
    Cancelled,

    /// Settings failed validation.
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    /// The blocking synthesis task panicked or was cancelled by the runtime.
    #[error("Synthesis task failed: {0}")]
    Task(String),
}

impl SynthesisError {
    pub(crate) fn initialization(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Initialization {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<PathError> for SynthesisError {
    fn from(e: PathError) -> Self {
        let path = match &e {
            PathError::MissingModelFile { dir, file } => dir.join(file),
            PathError::NotADirectory(p) => p.clone(),
            PathError::EmptyPath => PathBuf::new(),
        };
        Self::initialization(path, e)
    }
}
