//! Text segments and the batch context they are synthesized under.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::ports::SpeakerProfile;

/// Sampling parameters forwarded to the language-model stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.7,
            top_k: 20,
        }
    }
}

/// One unit of text to synthesize.
///
/// Segments are built by the pipeline layer and only read by the
/// orchestrator. Within a batch the first segment's speaker, emotion,
/// secondary prompt, seed and sampling parameters apply to every segment.
#[derive(Clone, Default)]
pub struct TextSegment {
    pub text: String,
    pub speaker: Option<Arc<dyn SpeakerProfile>>,
    pub emotion: String,
    /// Secondary style prompt, used when `emotion` is empty.
    pub prompt2: String,
    pub infer_seed: u64,
    pub sampling: SamplingParams,
}

impl TextSegment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            infer_seed: 42,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_speaker(mut self, speaker: Arc<dyn SpeakerProfile>) -> Self {
        self.speaker = Some(speaker);
        self
    }

    #[must_use]
    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = emotion.into();
        self
    }

    #[must_use]
    pub fn with_prompt2(mut self, prompt2: impl Into<String>) -> Self {
        self.prompt2 = prompt2.into();
        self
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.infer_seed = seed;
        self
    }

    #[must_use]
    pub const fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    /// Identifier of the attached speaker, if any.
    pub fn speaker_id(&self) -> Option<&str> {
        self.speaker.as_deref().map(SpeakerProfile::id)
    }
}

impl fmt::Debug for TextSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextSegment")
            .field("text", &self.text)
            .field("speaker", &self.speaker_id())
            .field("emotion", &self.emotion)
            .field("prompt2", &self.prompt2)
            .field("infer_seed", &self.infer_seed)
            .field("sampling", &self.sampling)
            .finish()
    }
}

/// Cooperative cancellation flag shared by everything working on one batch.
///
/// Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the batch stop at the next segment boundary.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear a previous stop request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-batch context handed down by the pipeline layer.
#[derive(Debug, Clone, Default)]
pub struct SynthesisContext {
    /// Polled once per segment by the executor.
    pub stop: StopFlag,
}

impl SynthesisContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_stop(stop: StopFlag) -> Self {
        Self { stop }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_flag_is_shared_between_clones() {
        let flag = StopFlag::new();
        let other = flag.clone();
        assert!(!other.is_set());
        flag.stop();
        assert!(other.is_set());
        other.reset();
        assert!(!flag.is_set());
    }

    #[test]
    fn segment_builder_keeps_fields() {
        let seg = TextSegment::new("hello")
            .with_emotion("calm")
            .with_prompt2("slowly")
            .with_seed(7);
        assert_eq!(seg.text, "hello");
        assert_eq!(seg.emotion, "calm");
        assert_eq!(seg.prompt2, "slowly");
        assert_eq!(seg.infer_seed, 7);
        assert!(seg.speaker_id().is_none());
    }
}
