//! Orchestrator settings and validation.
//!
//! Pure configuration types with no engine dependencies. Settings can be
//! built in code or read from a JSON file; every field has a default, so a
//! file only needs the values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Model id the orchestrator registers conditioning tokens under.
pub const DEFAULT_MODEL_ID: &str = "cosy-voice";

/// Legacy model ids whose tokens are accepted after [`DEFAULT_MODEL_ID`].
pub const DEFAULT_TOKEN_ALIASES: [&str; 2] = ["cosyvoice_300m_instruct", "cosyvoice_instruct"];

/// Rate of every waveform the engine produces.
pub const OUTPUT_SAMPLE_RATE: u32 = 22_050;

/// Rate reference audio is resampled to before it conditions the model.
pub const PROMPT_SAMPLE_RATE: u32 = 16_000;

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Explicit model directory; searched in well-known locations when unset.
    pub model_dir: Option<String>,

    /// Model id used for token lookup and device selection.
    pub model_id: String,

    /// Additional model ids tried, in order, when looking up tokens.
    pub token_aliases: Vec<String>,

    /// Whether the loaded model is an instruct model.
    pub instruct: bool,

    /// Sample rate reported for synthesized audio.
    pub output_sample_rate: u32,

    /// Sample rate reference audio is normalized to.
    pub prompt_sample_rate: u32,

    /// Reject batches whose segments disagree on speaker, seed or emotion
    /// instead of logging a warning.
    pub reject_mixed_batches: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            model_dir: None,
            model_id: DEFAULT_MODEL_ID.to_string(),
            token_aliases: DEFAULT_TOKEN_ALIASES.iter().map(ToString::to_string).collect(),
            instruct: true,
            output_sample_rate: OUTPUT_SAMPLE_RATE,
            prompt_sample_rate: PROMPT_SAMPLE_RATE,
            reject_mixed_batches: false,
        }
    }
}

impl EngineSettings {
    /// Read settings from a JSON file and validate them.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::Read(format!("{}: {e}", path.display())))?;
        let settings: Self =
            serde_json::from_str(&raw).map_err(|e| SettingsError::Parse(e.to_string()))?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Model ids to query for a conditioning token, in lookup order.
    pub fn token_lookup_order(&self) -> Vec<&str> {
        std::iter::once(self.model_id.as_str())
            .chain(self.token_aliases.iter().map(String::as_str))
            .collect()
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Model id cannot be empty")]
    EmptyModelId,

    #[error("Sample rate must be non-zero ({0})")]
    InvalidSampleRate(&'static str),

    #[error("Model directory cannot be empty")]
    EmptyModelDir,

    #[error("Failed to read settings: {0}")]
    Read(String),

    #[error("Failed to parse settings: {0}")]
    Parse(String),
}

/// Validate settings values.
pub fn validate_settings(settings: &EngineSettings) -> Result<(), SettingsError> {
    if settings.model_id.trim().is_empty() {
        return Err(SettingsError::EmptyModelId);
    }

    if settings.output_sample_rate == 0 {
        return Err(SettingsError::InvalidSampleRate("output_sample_rate"));
    }

    if settings.prompt_sample_rate == 0 {
        return Err(SettingsError::InvalidSampleRate("prompt_sample_rate"));
    }

    if settings
        .model_dir
        .as_ref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(SettingsError::EmptyModelDir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = EngineSettings::default();
        assert_eq!(settings.model_id, DEFAULT_MODEL_ID);
        assert_eq!(settings.output_sample_rate, 22_050);
        assert_eq!(settings.prompt_sample_rate, 16_000);
        assert!(settings.instruct);
        assert!(!settings.reject_mixed_batches);
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_token_lookup_order() {
        let settings = EngineSettings::default();
        assert_eq!(
            settings.token_lookup_order(),
            vec!["cosy-voice", "cosyvoice_300m_instruct", "cosyvoice_instruct"]
        );
    }

    #[test]
    fn test_validate_empty_model_id() {
        let settings = EngineSettings {
            model_id: " ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::EmptyModelId)
        ));
    }

    #[test]
    fn test_validate_zero_sample_rate() {
        let settings = EngineSettings {
            output_sample_rate: 0,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidSampleRate("output_sample_rate"))
        ));
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "instruct": false, "reject_mixed_batches": true }"#).unwrap();

        let settings = EngineSettings::load(&path).unwrap();
        assert!(!settings.instruct);
        assert!(settings.reject_mixed_batches);
        assert_eq!(settings.model_id, DEFAULT_MODEL_ID);
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EngineSettings::load(&path),
            Err(SettingsError::Parse(_))
        ));
    }
}
