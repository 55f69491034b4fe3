//! File layout of a CosyVoice model directory.

use std::path::{Path, PathBuf};

use super::error::PathError;
use crate::ports::{FrontEndAssets, WeightFiles};

const CONFIG_FILE: &str = "cosyvoice.yaml";
const LLM_FILE: &str = "llm.pt";
const FLOW_FILE: &str = "flow.pt";
const HIFT_FILE: &str = "hift.pt";
const CAMPPLUS_FILE: &str = "campplus.onnx";
const SPEECH_TOKENIZER_FILE: &str = "speech_tokenizer_v1.onnx";
const SPK2INFO_FILE: &str = "spk2info.pt";

/// Every file the lifecycle manager reads from a model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelLayout {
    dir: PathBuf,
}

impl ModelLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn weights(&self) -> WeightFiles {
        WeightFiles {
            llm: self.dir.join(LLM_FILE),
            flow: self.dir.join(FLOW_FILE),
            hift: self.dir.join(HIFT_FILE),
        }
    }

    pub fn frontend_assets(&self, instruct: bool) -> FrontEndAssets {
        FrontEndAssets {
            campplus: self.dir.join(CAMPPLUS_FILE),
            speech_tokenizer: self.dir.join(SPEECH_TOKENIZER_FILE),
            spk2info: self.dir.join(SPK2INFO_FILE),
            instruct,
        }
    }

    /// Check that every required file exists, reporting the first gap.
    pub fn verify(&self) -> Result<(), PathError> {
        if self.dir.exists() && !self.dir.is_dir() {
            return Err(PathError::NotADirectory(self.dir.clone()));
        }
        for file in [
            CONFIG_FILE,
            LLM_FILE,
            FLOW_FILE,
            HIFT_FILE,
            CAMPPLUS_FILE,
            SPEECH_TOKENIZER_FILE,
            SPK2INFO_FILE,
        ] {
            if !self.dir.join(file).is_file() {
                return Err(PathError::MissingModelFile {
                    dir: self.dir.clone(),
                    file,
                });
            }
            tracing::debug!(dir = %self.dir.display(), "Found model file {file}");
        }
        Ok(())
    }

    /// Names of all files [`verify`](Self::verify) expects.
    pub const fn required_files() -> [&'static str; 7] {
        [
            CONFIG_FILE,
            LLM_FILE,
            FLOW_FILE,
            HIFT_FILE,
            CAMPPLUS_FILE,
            SPEECH_TOKENIZER_FILE,
            SPK2INFO_FILE,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_reports_first_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "x").unwrap();
        let err = ModelLayout::new(dir.path()).verify().unwrap_err();
        assert!(matches!(err, PathError::MissingModelFile { file: LLM_FILE, .. }));
    }

    #[test]
    fn verify_accepts_complete_directory() {
        let dir = tempfile::tempdir().unwrap();
        for file in ModelLayout::required_files() {
            std::fs::write(dir.path().join(file), "x").unwrap();
        }
        ModelLayout::new(dir.path()).verify().unwrap();
    }

    #[test]
    fn weights_live_in_model_dir() {
        let layout = ModelLayout::new("/m");
        let weights = layout.weights();
        assert_eq!(weights.llm, Path::new("/m/llm.pt"));
        assert_eq!(weights.hift, Path::new("/m/hift.pt"));
        assert!(layout.frontend_assets(true).instruct);
    }
}
