//! Inference strategy selection.
//!
//! CosyVoice exposes four incompatible ways to condition synthesis. Which one
//! a batch uses follows from what the speaker resolved to:
//!
//! | Resolved conditioning | Plan |
//! |---|---|
//! | embedding | [`StrategyPlan::Instruct`] |
//! | reference clip + transcript | [`StrategyPlan::ZeroShot`] |
//! | nothing | [`ConditioningError::NoUsableConditioning`] |
//!
//! Selection does not look at the loaded model. An embedding on a model
//! without instruct support fails the mode guard with
//! [`SynthesisError::UnsupportedMode`] instead of switching strategy.
//! [`StrategyPlan::Sft`] and [`StrategyPlan::CrossLingual`] are never
//! selected automatically; callers build them directly. Instruct and
//! cross-lingual plans are guarded against the loaded model's capability
//! flag before any inference runs.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cosytts_core::{FrontEnd, ModelInput, SpeakerProfile};

use crate::conditioning::ResolvedConditioning;
use crate::error::{ConditioningError, SynthesisError};

/// The four synthesis modes of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceStrategy {
    Sft,
    ZeroShot,
    CrossLingual,
    Instruct,
}

impl fmt::Display for InferenceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sft => "sft",
            Self::ZeroShot => "zero_shot",
            Self::CrossLingual => "cross_lingual",
            Self::Instruct => "instruct",
        })
    }
}

/// A strategy together with the fixed arguments it is invoked with.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyPlan {
    Sft {
        embedding: Vec<f32>,
    },
    ZeroShot {
        prompt_text: String,
        prompt_speech_16k: Vec<f32>,
    },
    CrossLingual {
        prompt_speech_16k: Vec<f32>,
    },
    Instruct {
        embedding: Vec<f32>,
        instruct_text: String,
    },
}

impl StrategyPlan {
    pub const fn strategy(&self) -> InferenceStrategy {
        match self {
            Self::Sft { .. } => InferenceStrategy::Sft,
            Self::ZeroShot { .. } => InferenceStrategy::ZeroShot,
            Self::CrossLingual { .. } => InferenceStrategy::CrossLingual,
            Self::Instruct { .. } => InferenceStrategy::Instruct,
        }
    }

    /// Reject plans the loaded model cannot run.
    pub fn check_mode(&self, instruct_model: bool, model_dir: &Path) -> Result<(), SynthesisError> {
        let supported = match self {
            Self::CrossLingual { .. } => !instruct_model,
            Self::Instruct { .. } => instruct_model,
            Self::Sft { .. } | Self::ZeroShot { .. } => true,
        };
        if supported {
            Ok(())
        } else {
            Err(SynthesisError::UnsupportedMode {
                mode: self.strategy(),
                model_dir: model_dir.to_path_buf(),
            })
        }
    }

    /// Build the engine input for one text under this plan.
    pub fn model_input(
        &self,
        frontend: &dyn FrontEnd,
        text: &str,
    ) -> Result<ModelInput, SynthesisError> {
        let input = match self {
            Self::Sft { embedding } => frontend.sft_input(text, embedding)?,
            Self::ZeroShot {
                prompt_text,
                prompt_speech_16k,
            } => frontend.zero_shot_input(text, prompt_text, prompt_speech_16k)?,
            Self::CrossLingual { prompt_speech_16k } => {
                frontend.cross_lingual_input(text, prompt_speech_16k)?
            }
            Self::Instruct {
                embedding,
                instruct_text,
            } => frontend.instruct_input(text, embedding, instruct_text)?,
        };
        Ok(input)
    }
}

/// Pick the plan for a batch from its resolved conditioning.
///
/// `speaker` supplies the gender for the instruct voice tag and the id for
/// error reporting.
pub fn select_strategy(
    conditioning: ResolvedConditioning,
    speaker: &dyn SpeakerProfile,
    emotion: &str,
    prompt2: &str,
) -> Result<StrategyPlan, SynthesisError> {
    match conditioning {
        ResolvedConditioning::Embedding(embedding) => Ok(StrategyPlan::Instruct {
            embedding,
            instruct_text: instruct_text(speaker.gender(), emotion, prompt2),
        }),
        ResolvedConditioning::Reference {
            waveform,
            transcript,
        } if !transcript.is_empty() => Ok(StrategyPlan::ZeroShot {
            prompt_text: transcript,
            prompt_speech_16k: waveform,
        }),
        ResolvedConditioning::Reference { .. } | ResolvedConditioning::None => {
            Err(ConditioningError::NoUsableConditioning {
                speaker: speaker.id().to_string(),
                emotion: emotion.to_string(),
            }
            .into())
        }
    }
}

/// Style description for instruct synthesis.
///
/// Uses `emotion`, falling back to `prompt2`, prefixed with a voice tag
/// derived from the speaker's gender.
pub fn instruct_text(gender: &str, emotion: &str, prompt2: &str) -> String {
    let style = if emotion.is_empty() { prompt2 } else { emotion };
    let tag = if is_female(gender) {
        "female voice."
    } else {
        "male voice."
    };
    format!("{tag} {style}")
}

fn is_female(gender: &str) -> bool {
    gender.to_lowercase().contains("female") || gender.contains('女')
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosytts_core::Speaker;
    use std::path::PathBuf;

    fn reference(transcript: &str) -> ResolvedConditioning {
        ResolvedConditioning::Reference {
            waveform: vec![0.1; 4],
            transcript: transcript.to_string(),
        }
    }

    #[test]
    fn embedding_selects_instruct() {
        let spk = Speaker::new("s", "female");
        let embedding = ResolvedConditioning::Embedding(vec![1.0]);
        let plan = select_strategy(embedding, &spk, "calm", "").unwrap();
        assert_eq!(
            plan,
            StrategyPlan::Instruct {
                embedding: vec![1.0],
                instruct_text: "female voice. calm".to_string(),
            }
        );
    }

    #[test]
    fn embedding_plan_is_rejected_by_base_model() {
        let spk = Speaker::new("s", "male");
        let embedding = ResolvedConditioning::Embedding(vec![1.0]);
        let plan = select_strategy(embedding, &spk, "", "").unwrap();
        assert!(matches!(
            plan.check_mode(false, Path::new("/models/base")),
            Err(SynthesisError::UnsupportedMode {
                mode: InferenceStrategy::Instruct,
                ..
            })
        ));
    }

    #[test]
    fn reference_selects_zero_shot() {
        let spk = Speaker::new("s", "male");
        let plan = select_strategy(reference("hello"), &spk, "", "").unwrap();
        assert_eq!(plan.strategy(), InferenceStrategy::ZeroShot);
    }

    #[test]
    fn reference_without_transcript_is_unusable() {
        let spk = Speaker::new("s", "male");
        let err = select_strategy(reference(""), &spk, "calm", "").unwrap_err();
        assert!(matches!(
            err,
            SynthesisError::Conditioning(ConditioningError::NoUsableConditioning { .. })
        ));
    }

    #[test]
    fn nothing_resolved_is_unusable() {
        let spk = Speaker::new("s", "male");
        let err = select_strategy(ResolvedConditioning::None, &spk, "", "").unwrap_err();
        assert!(matches!(err, SynthesisError::Conditioning(_)));
    }

    #[test]
    fn instruct_text_uses_gender_tag() {
        assert_eq!(instruct_text("female", "calm", ""), "female voice. calm");
        assert_eq!(instruct_text("中文女", "", "whisper"), "female voice. whisper");
        assert_eq!(instruct_text("male", "", ""), "male voice. ");
        assert_eq!(instruct_text("Female", "happy", "ignored"), "female voice. happy");
    }

    #[test]
    fn mode_guards_follow_capability_flag() {
        let dir = PathBuf::from("/models/x");
        let cross = StrategyPlan::CrossLingual {
            prompt_speech_16k: vec![],
        };
        let instruct = StrategyPlan::Instruct {
            embedding: vec![],
            instruct_text: String::new(),
        };

        assert!(matches!(
            cross.check_mode(true, &dir),
            Err(SynthesisError::UnsupportedMode {
                mode: InferenceStrategy::CrossLingual,
                ..
            })
        ));
        assert!(cross.check_mode(false, &dir).is_ok());
        assert!(instruct.check_mode(true, &dir).is_ok());
        assert!(matches!(
            instruct.check_mode(false, &dir),
            Err(SynthesisError::UnsupportedMode {
                mode: InferenceStrategy::Instruct,
                ..
            })
        ));
    }
}
