//! Batch synthesis: the orchestrator's entry point.
//!
//! A batch is an ordered list of segments that share one speaker, emotion,
//! seed and set of sampling parameters, taken from the first segment. The
//! executor consults the result cache, loads the engine, resolves
//! conditioning once, and then synthesizes each segment under a fresh seed
//! scope, stopping early when the batch's stop flag is raised.

use std::sync::Arc;

use futures_util::Stream;
use tracing::{debug, info, warn};

use cosytts_core::{
    AudioBuffer, DevicePolicy, EngineSettings, ModelFactory, ResultCache, SeedScope,
    SynthesisContext, TextSegment, resolve_model_dir, validate_settings,
};

use crate::conditioning::ConditioningResolver;
use crate::error::{ConditioningError, SynthesisError};
use crate::lifecycle::{EngineHandle, EngineSlot, ModelLifecycle};
use crate::strategy::select_strategy;

/// Turns batches of text segments into audio.
pub struct BatchExecutor {
    lifecycle: ModelLifecycle,
    resolver: ConditioningResolver,
    cache: Arc<dyn ResultCache>,
    output_sample_rate: u32,
    reject_mixed_batches: bool,
}

impl BatchExecutor {
    /// Build an executor on the process-wide [`EngineSlot`].
    pub fn new(
        settings: &EngineSettings,
        factory: Arc<dyn ModelFactory>,
        devices: Arc<dyn DevicePolicy>,
        cache: Arc<dyn ResultCache>,
    ) -> Result<Self, SynthesisError> {
        Self::with_slot(EngineSlot::shared(), settings, factory, devices, cache)
    }

    /// Build an executor on an explicit slot.
    pub fn with_slot(
        slot: Arc<EngineSlot>,
        settings: &EngineSettings,
        factory: Arc<dyn ModelFactory>,
        devices: Arc<dyn DevicePolicy>,
        cache: Arc<dyn ResultCache>,
    ) -> Result<Self, SynthesisError> {
        validate_settings(settings)?;
        let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
        debug!(
            path = %model_dir.path.display(),
            source = ?model_dir.source,
            "Resolved CosyVoice model directory"
        );

        Ok(Self {
            lifecycle: ModelLifecycle::new(
                slot,
                factory,
                devices,
                model_dir.path,
                settings.model_id.clone(),
                settings.instruct,
            ),
            resolver: ConditioningResolver::from_settings(settings),
            cache,
            output_sample_rate: settings.output_sample_rate,
            reject_mixed_batches: settings.reject_mixed_batches,
        })
    }

    pub const fn lifecycle(&self) -> &ModelLifecycle {
        &self.lifecycle
    }

    /// Load the engine if it is not loaded yet.
    pub fn load(&self) -> Result<Arc<EngineHandle>, SynthesisError> {
        self.lifecycle.load()
    }

    pub fn unload(&self) {
        self.lifecycle.unload();
    }

    pub fn is_loaded(&self) -> bool {
        self.lifecycle.is_loaded()
    }

    pub fn reset(&self) {
        self.lifecycle.reset();
    }

    /// Synthesize `segments` in order.
    ///
    /// Returns one buffer per synthesized segment. If the stop flag is raised
    /// the result holds the segments finished so far, and that partial
    /// result is also written to the cache. Any error discards the batch
    /// without touching the cache.
    pub fn run(
        &self,
        segments: &[TextSegment],
        context: &SynthesisContext,
    ) -> Result<Vec<AudioBuffer>, SynthesisError> {
        let Some(first) = segments.first() else {
            return Err(SynthesisError::EmptyBatch);
        };

        if let Some(cached) = self.cache.get(segments, context) {
            debug!(segments = segments.len(), "Serving batch from cache");
            return Ok(cached);
        }

        let engine = self.lifecycle.load()?;
        self.check_batch(first, segments)?;

        let speaker = first
            .speaker
            .as_deref()
            .ok_or(ConditioningError::MissingSpeaker)?;
        let conditioning = self.resolver.resolve(speaker, &first.emotion)?;
        let plan = select_strategy(conditioning, speaker, &first.emotion, &first.prompt2)?;
        plan.check_mode(engine.instruct(), engine.model_dir())?;

        info!(
            speaker = speaker.id(),
            strategy = %plan.strategy(),
            segments = segments.len(),
            seed = first.infer_seed,
            "Synthesizing batch"
        );

        let mut results = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            if context.stop.is_set() {
                info!(completed = index, total = segments.len(), "Batch stopped");
                break;
            }

            let _seed = SeedScope::enter(first.infer_seed);
            let samples = engine.infer(&plan, &[segment.text.as_str()], &first.sampling)?;
            debug!(index, samples = samples.len(), "Segment synthesized");
            results.push(AudioBuffer::new(self.output_sample_rate, samples));
        }

        self.cache.set(segments, context, &results);
        Ok(results)
    }

    /// Synthesize a single segment.
    ///
    /// Fails with [`SynthesisError::Cancelled`] when the stop flag was raised
    /// before the segment started.
    pub fn generate(
        &self,
        segment: &TextSegment,
        context: &SynthesisContext,
    ) -> Result<AudioBuffer, SynthesisError> {
        self.run(std::slice::from_ref(segment), context)?
            .pop()
            .ok_or(SynthesisError::Cancelled)
    }

    /// [`run`](Self::run) on the blocking thread pool.
    ///
    /// The whole batch runs on one blocking thread, so its seed scopes stay
    /// on the thread that entered them.
    pub async fn run_async(
        self: Arc<Self>,
        segments: Vec<TextSegment>,
        context: SynthesisContext,
    ) -> Result<Vec<AudioBuffer>, SynthesisError> {
        tokio::task::spawn_blocking(move || self.run(&segments, &context))
            .await
            .map_err(|e| SynthesisError::Task(format!("spawn_blocking join error: {e}")))?
    }

    /// Streaming facade over [`run_async`](Self::run_async).
    ///
    /// The engine is not incremental: the stream yields the whole batch
    /// result exactly once.
    pub fn run_stream(
        self: Arc<Self>,
        segments: Vec<TextSegment>,
        context: SynthesisContext,
    ) -> impl Stream<Item = Result<Vec<AudioBuffer>, SynthesisError>> {
        futures_util::stream::once(self.run_async(segments, context))
    }

    /// Tokenize `text` with the loaded front-end.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>, SynthesisError> {
        let engine = self.lifecycle.load()?;
        Ok(engine.frontend().encode(text)?)
    }

    /// Detokenize `ids` with the loaded front-end.
    pub fn decode(&self, ids: &[u32]) -> Result<String, SynthesisError> {
        let engine = self.lifecycle.load()?;
        Ok(engine.frontend().decode(ids)?)
    }

    fn check_batch(
        &self,
        first: &TextSegment,
        segments: &[TextSegment],
    ) -> Result<(), SynthesisError> {
        for (index, segment) in segments.iter().enumerate().skip(1) {
            let Some(reason) = mismatch(first, segment) else {
                continue;
            };
            if self.reject_mixed_batches {
                return Err(SynthesisError::MixedBatch {
                    index,
                    reason: reason.to_string(),
                });
            }
            warn!(
                index,
                reason,
                "Segment differs from the first segment, using the first segment's settings"
            );
        }
        Ok(())
    }
}

fn mismatch(first: &TextSegment, other: &TextSegment) -> Option<&'static str> {
    if other.speaker_id() != first.speaker_id() {
        Some("speaker differs")
    } else if other.infer_seed != first.infer_seed {
        Some("seed differs")
    } else if other.emotion != first.emotion {
        Some("emotion differs")
    } else {
        None
    }
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("lifecycle", &self.lifecycle)
            .field("output_sample_rate", &self.output_sample_rate)
            .field("reject_mixed_batches", &self.reject_mixed_batches)
            .finish_non_exhaustive()
    }
}
