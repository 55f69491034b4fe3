//! Neural engine port, the seam between the orchestrator and the model.
//!
//! The orchestrator never touches tensors. A [`ModelFactory`] builds a
//! [`FrontEnd`] (tokenizer, feature extractor, speaker-embedding index) and a
//! [`SpeechModel`] (language model, flow, vocoder) from the files of a model
//! directory; the front-end turns text plus conditioning into a typed
//! [`ModelInput`], and the speech model turns that into a waveform.
//!
//! Implementations that need randomness draw it from
//! [`random::with_rng`](crate::random::with_rng) so the orchestrator's seed
//! scopes make their output reproducible.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::SamplingParams;
use crate::ports::device::{Device, Precision};

/// Errors reported by engine implementations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A required model file does not exist.
    #[error("Model file not found: {0}")]
    MissingFile(PathBuf),

    /// The model configuration could not be interpreted.
    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),

    /// Any other failure inside the engine.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Raw model configuration (`cosyvoice.yaml`).
///
/// Interpreting the document is up to the factory; the orchestrator only
/// guarantees it exists and is non-empty.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub source: String,
}

impl ModelConfig {
    /// Read the configuration file at `path`.
    pub fn read(path: &Path) -> Result<Self, ModelError> {
        if !path.is_file() {
            return Err(ModelError::MissingFile(path.to_path_buf()));
        }
        let source = std::fs::read_to_string(path)
            .map_err(|e| ModelError::InvalidConfig(format!("{}: {e}", path.display())))?;
        if source.trim().is_empty() {
            return Err(ModelError::InvalidConfig(format!(
                "{} is empty",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Serialized weights of the three speech-model stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightFiles {
    pub llm: PathBuf,
    pub flow: PathBuf,
    pub hift: PathBuf,
}

/// Artifacts the front-end is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontEndAssets {
    /// Speaker-embedding extractor.
    pub campplus: PathBuf,
    /// Speech tokenizer.
    pub speech_tokenizer: PathBuf,
    /// Built-in speaker embedding table.
    pub spk2info: PathBuf,
    /// Whether the loaded model is an instruct model.
    pub instruct: bool,
}

/// Typed front-end output consumed by [`SpeechModel::inference`].
///
/// Fields a strategy does not use stay empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelInput {
    pub text: Vec<u32>,
    pub prompt_text: Vec<u32>,
    pub llm_prompt_speech_token: Vec<u32>,
    pub flow_prompt_speech_token: Vec<u32>,
    pub prompt_speech_feat: Vec<f32>,
    pub llm_embedding: Vec<f32>,
    pub flow_embedding: Vec<f32>,
    pub sampling: SamplingParams,
}

/// Tokenizer and feature extractor paired with a speech model.
pub trait FrontEnd: Send + Sync {
    /// Capability flag: `true` for instruct models.
    fn instruct(&self) -> bool;

    fn bind_device(&mut self, device: Device);

    fn encode(&self, text: &str) -> Result<Vec<u32>, ModelError>;

    fn decode(&self, ids: &[u32]) -> Result<String, ModelError>;

    /// Input for synthesis from a speaker embedding alone.
    fn sft_input(&self, text: &str, embedding: &[f32]) -> Result<ModelInput, ModelError>;

    /// Input for synthesis from a reference clip and its transcript.
    fn zero_shot_input(
        &self,
        text: &str,
        prompt_text: &str,
        prompt_speech_16k: &[f32],
    ) -> Result<ModelInput, ModelError>;

    /// Input for synthesis from a reference clip in another language.
    fn cross_lingual_input(
        &self,
        text: &str,
        prompt_speech_16k: &[f32],
    ) -> Result<ModelInput, ModelError>;

    /// Input for synthesis guided by a style description.
    fn instruct_input(
        &self,
        text: &str,
        embedding: &[f32],
        instruct_text: &str,
    ) -> Result<ModelInput, ModelError>;
}

/// The language-model, flow and vocoder stages.
pub trait SpeechModel: Send + Sync {
    fn bind_device(&mut self, device: Device);

    fn load_weights(&mut self, weights: &WeightFiles) -> Result<(), ModelError>;

    /// Move every stage to `device` and cast it to `precision`.
    fn to_device(&mut self, device: Device, precision: Precision) -> Result<(), ModelError>;

    /// Synthesize one waveform at the engine's output rate.
    fn inference(&self, input: ModelInput) -> Result<Vec<f32>, ModelError>;
}

/// Builds the engine halves from a model directory's configuration.
pub trait ModelFactory: Send + Sync {
    fn frontend(
        &self,
        config: &ModelConfig,
        assets: &FrontEndAssets,
    ) -> Result<Box<dyn FrontEnd>, ModelError>;

    fn speech_model(&self, config: &ModelConfig) -> Result<Box<dyn SpeechModel>, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_missing_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelConfig::read(&dir.path().join("cosyvoice.yaml")).unwrap_err();
        assert!(matches!(err, ModelError::MissingFile(_)));
    }

    #[test]
    fn read_empty_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cosyvoice.yaml");
        std::fs::write(&path, "  \n").unwrap();
        let err = ModelConfig::read(&path).unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
    }

    #[test]
    fn read_config_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cosyvoice.yaml");
        std::fs::write(&path, "sample_rate: 22050\n").unwrap();
        let config = ModelConfig::read(&path).unwrap();
        assert_eq!(config.source, "sample_rate: 22050\n");
    }
}
