//! Result cache port.

use crate::domain::{AudioBuffer, SynthesisContext, TextSegment};

/// Cache for whole-batch synthesis results.
///
/// Implementations derive their own key from the segments and context.
/// Failures inside the cache are the implementation's concern; a failed
/// lookup is reported as a miss.
pub trait ResultCache: Send + Sync {
    /// Look up a previously stored result for this batch.
    fn get(&self, segments: &[TextSegment], context: &SynthesisContext)
    -> Option<Vec<AudioBuffer>>;

    /// Store the result of a batch.
    fn set(&self, segments: &[TextSegment], context: &SynthesisContext, value: &[AudioBuffer]);
}

/// Cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl ResultCache for NoopCache {
    fn get(
        &self,
        _segments: &[TextSegment],
        _context: &SynthesisContext,
    ) -> Option<Vec<AudioBuffer>> {
        None
    }

    fn set(&self, _segments: &[TextSegment], _context: &SynthesisContext, _value: &[AudioBuffer]) {
    }
}
