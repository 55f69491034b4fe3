//! Speaker profiles and the conditioning data attached to them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ports::SpeakerProfile;

/// Precomputed conditioning for one model family.
///
/// When `embedding` is non-empty its first vector is the canonical
/// speaker embedding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditioningToken {
    pub embedding: Vec<Vec<f32>>,
}

impl ConditioningToken {
    pub const fn new(embedding: Vec<Vec<f32>>) -> Self {
        Self { embedding }
    }

    /// The canonical speaker embedding, if any.
    pub fn speaker_embedding(&self) -> Option<&[f32]> {
        self.embedding.first().map(Vec::as_slice)
    }
}

/// A recorded reference clip with its transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceClip {
    /// Encoded audio: a WAV container or raw little-endian PCM16.
    pub wav: Vec<u8>,
    /// Native sample rate of `wav`.
    pub wav_sr: u32,
    /// Transcript of the clip.
    pub text: String,
    /// Emotion tag used to pick a clip for a request.
    pub emotion: String,
}

/// In-memory speaker profile.
///
/// The speaker-management subsystem owns real profiles; this type exists so
/// drivers and tests can hand the orchestrator a speaker without a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Speaker {
    pub id: String,
    pub gender: String,
    pub tokens: HashMap<String, ConditioningToken>,
    pub refs: Vec<ReferenceClip>,
}

impl Speaker {
    pub fn new(id: impl Into<String>, gender: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            gender: gender.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_token(mut self, model_id: impl Into<String>, token: ConditioningToken) -> Self {
        self.tokens.insert(model_id.into(), token);
        self
    }

    #[must_use]
    pub fn with_ref(mut self, clip: ReferenceClip) -> Self {
        self.refs.push(clip);
        self
    }
}

impl SpeakerProfile for Speaker {
    fn id(&self) -> &str {
        &self.id
    }

    fn gender(&self) -> &str {
        &self.gender
    }

    fn get_token(&self, model_id: &str) -> Option<ConditioningToken> {
        self.tokens.get(model_id).cloned()
    }

    fn get_ref(&self, predicate: &dyn Fn(&ReferenceClip) -> bool) -> Option<ReferenceClip> {
        self.refs.iter().find(|clip| predicate(clip)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(emotion: &str) -> ReferenceClip {
        ReferenceClip {
            wav: vec![0, 0],
            wav_sr: 16_000,
            text: "hi".to_string(),
            emotion: emotion.to_string(),
        }
    }

    #[test]
    fn get_ref_returns_first_match() {
        let spk = Speaker::new("s1", "female")
            .with_ref(clip("calm"))
            .with_ref(clip("angry"));
        let found = spk.get_ref(&|c| c.emotion == "angry").unwrap();
        assert_eq!(found.emotion, "angry");
        assert!(spk.get_ref(&|c| c.emotion == "sad").is_none());
    }

    #[test]
    fn speaker_embedding_is_first_vector() {
        let token = ConditioningToken::new(vec![vec![1.0, 2.0], vec![3.0]]);
        assert_eq!(token.speaker_embedding(), Some(&[1.0, 2.0][..]));
        assert!(ConditioningToken::default().speaker_embedding().is_none());
    }
}
