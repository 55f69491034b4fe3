//! Speaker conditioning resolution.
//!
//! Turns a stored speaker profile into the conditioning the model consumes:
//! a precomputed embedding when one exists for this model family, otherwise
//! a reference clip (waveform at the prompt rate plus its transcript) chosen
//! by emotion.

use cosytts_core::{EngineSettings, SpeakerProfile};
use tracing::debug;

use crate::audio::{decode_clip, normalize_rate};
use crate::error::SynthesisError;
use crate::postprocess::{PostprocessConfig, postprocess};

/// Conditioning resolved for one speaker and emotion.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedConditioning {
    /// Canonical speaker embedding.
    Embedding(Vec<f32>),

    /// Post-processed reference waveform at the prompt rate, with its
    /// transcript.
    Reference { waveform: Vec<f32>, transcript: String },

    /// Nothing usable.
    None,
}

/// Resolves conditioning from speaker profiles.
///
/// Holds no state besides its configuration; the same speaker and emotion
/// always resolve to the same result.
#[derive(Debug, Clone)]
pub struct ConditioningResolver {
    lookup_ids: Vec<String>,
    prompt_sample_rate: u32,
    postprocess: PostprocessConfig,
}

impl ConditioningResolver {
    pub fn new(lookup_ids: Vec<String>, prompt_sample_rate: u32) -> Self {
        Self {
            lookup_ids,
            prompt_sample_rate,
            postprocess: PostprocessConfig {
                sample_rate: prompt_sample_rate,
                ..PostprocessConfig::default()
            },
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(
            settings
                .token_lookup_order()
                .into_iter()
                .map(str::to_string)
                .collect(),
            settings.prompt_sample_rate,
        )
    }

    /// Model ids tried, in order, when looking up a stored token.
    pub fn lookup_ids(&self) -> &[String] {
        &self.lookup_ids
    }

    /// Resolve `speaker` for `emotion`.
    ///
    /// The first model id with a stored token decides the embedding path. A
    /// token with an empty embedding falls through to the reference lookup.
    pub fn resolve(
        &self,
        speaker: &dyn SpeakerProfile,
        emotion: &str,
    ) -> Result<ResolvedConditioning, SynthesisError> {
        let token = self
            .lookup_ids
            .iter()
            .find_map(|id| speaker.get_token(id).map(|token| (id, token)));

        if let Some((model_id, token)) = token {
            if let Some(embedding) = token.speaker_embedding() {
                debug!(
                    speaker = speaker.id(),
                    model_id = %model_id,
                    "Using stored speaker embedding"
                );
                return Ok(ResolvedConditioning::Embedding(embedding.to_vec()));
            }
            debug!(speaker = speaker.id(), model_id = %model_id, "Stored token has no embedding");
        }

        let Some(clip) = speaker.get_ref(&|clip| clip.emotion == emotion) else {
            return Ok(ResolvedConditioning::None);
        };
        if clip.text.is_empty() {
            debug!(speaker = speaker.id(), emotion, "Reference clip has no transcript");
            return Ok(ResolvedConditioning::None);
        }

        let (rate, samples) = decode_clip(&clip.wav, clip.wav_sr)?;
        let resampled = normalize_rate(&samples, rate, self.prompt_sample_rate)?;
        let waveform = postprocess(&resampled, &self.postprocess);

        debug!(
            speaker = speaker.id(),
            emotion,
            source_rate = rate,
            samples = waveform.len(),
            "Using reference clip"
        );

        Ok(ResolvedConditioning::Reference {
            waveform,
            transcript: clip.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosytts_core::{ConditioningToken, ReferenceClip, Speaker};

    fn resolver() -> ConditioningResolver {
        ConditioningResolver::from_settings(&EngineSettings::default())
    }

    fn pcm_clip(emotion: &str, text: &str) -> ReferenceClip {
        let wav = std::iter::repeat_n(0x2000_i16, 1_600)
            .flat_map(i16::to_le_bytes)
            .collect();
        ReferenceClip {
            wav,
            wav_sr: 16_000,
            text: text.to_string(),
            emotion: emotion.to_string(),
        }
    }

    #[test]
    fn lookup_order_starts_with_model_id() {
        assert_eq!(
            resolver().lookup_ids(),
            ["cosy-voice", "cosyvoice_300m_instruct", "cosyvoice_instruct"]
        );
    }

    #[test]
    fn embedding_wins_over_reference() {
        let spk = Speaker::new("s1", "female")
            .with_token("cosy-voice", ConditioningToken::new(vec![vec![0.5, 0.25]]))
            .with_ref(pcm_clip("calm", "hello"));

        let resolved = resolver().resolve(&spk, "calm").unwrap();
        assert_eq!(resolved, ResolvedConditioning::Embedding(vec![0.5, 0.25]));
    }

    #[test]
    fn alias_token_is_found() {
        let spk = Speaker::new("s1", "male").with_token(
            "cosyvoice_instruct",
            ConditioningToken::new(vec![vec![1.0]]),
        );
        let resolved = resolver().resolve(&spk, "").unwrap();
        assert_eq!(resolved, ResolvedConditioning::Embedding(vec![1.0]));
    }

    #[test]
    fn empty_token_falls_back_to_reference() {
        let spk = Speaker::new("s1", "male")
            .with_token("cosy-voice", ConditioningToken::default())
            .with_ref(pcm_clip("calm", "hello"));

        let resolved = resolver().resolve(&spk, "calm").unwrap();
        let ResolvedConditioning::Reference {
            waveform,
            transcript,
        } = resolved
        else {
            panic!("expected reference, got {resolved:?}");
        };
        assert_eq!(transcript, "hello");
        // 1600 voiced samples + 0.2s pad at 16kHz
        assert_eq!(waveform.len(), 1_600 + 3_200);
    }

    #[test]
    fn emotion_must_match_exactly() {
        let spk = Speaker::new("s1", "male").with_ref(pcm_clip("calm", "hello"));
        assert_eq!(
            resolver().resolve(&spk, "angry").unwrap(),
            ResolvedConditioning::None
        );
        assert_eq!(
            resolver().resolve(&spk, "Calm").unwrap(),
            ResolvedConditioning::None
        );
    }

    #[test]
    fn clip_without_transcript_is_unusable() {
        let spk = Speaker::new("s1", "male").with_ref(pcm_clip("calm", ""));
        assert_eq!(
            resolver().resolve(&spk, "calm").unwrap(),
            ResolvedConditioning::None
        );
    }

    #[test]
    fn undecodable_clip_is_an_error() {
        let mut clip = pcm_clip("calm", "hello");
        clip.wav.push(0);
        let spk = Speaker::new("s1", "male").with_ref(clip);
        assert!(matches!(
            resolver().resolve(&spk, "calm"),
            Err(SynthesisError::Audio(_))
        ));
    }
}
