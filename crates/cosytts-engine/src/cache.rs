//! In-memory result cache keyed by a digest of the batch.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use cosytts_core::{AudioBuffer, ResultCache, SynthesisContext, TextSegment};
use sha2::{Digest, Sha256};

type CacheKey = [u8; 32];

/// Process-local [`ResultCache`].
///
/// The key covers every segment's text, speaker id, emotion, secondary
/// prompt, seed and sampling parameters, in order. The stop flag is not part
/// of the key, so a partial result stored after cancellation is returned for
/// the same batch later.
///
/// [`MemoryCache::new`] is unbounded: entries live until [`clear`] is called
/// or the cache is dropped. [`MemoryCache::with_capacity`] keeps at most that
/// many batches and evicts the oldest insertion first.
///
/// [`clear`]: MemoryCache::clear
#[derive(Debug, Default)]
pub struct MemoryCache {
    capacity: Option<usize>,
    state: Mutex<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<CacheKey, Vec<AudioBuffer>>,
    order: VecDeque<CacheKey>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounded cache holding at most `capacity` batches.
    ///
    /// A capacity of zero stores nothing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            state: Mutex::default(),
        }
    }

    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state();
        state.map.clear();
        state.order.clear();
    }

    fn state(&self) -> MutexGuard<'_, Entries> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResultCache for MemoryCache {
    fn get(
        &self,
        segments: &[TextSegment],
        _context: &SynthesisContext,
    ) -> Option<Vec<AudioBuffer>> {
        let hit = self.state().map.get(&batch_key(segments)).cloned();
        tracing::trace!(segments = segments.len(), hit = hit.is_some(), "Result cache lookup");
        hit
    }

    fn set(&self, segments: &[TextSegment], _context: &SynthesisContext, value: &[AudioBuffer]) {
        if self.capacity == Some(0) {
            return;
        }

        let key = batch_key(segments);
        let mut state = self.state();
        if state.map.insert(key, value.to_vec()).is_none() {
            state.order.push_back(key);
        }

        let Some(capacity) = self.capacity else {
            return;
        };
        while state.map.len() > capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.map.remove(&oldest);
            tracing::trace!(capacity, "Evicted oldest cached batch");
        }
    }
}

fn batch_key(segments: &[TextSegment]) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update((segments.len() as u64).to_le_bytes());
    for segment in segments {
        update_str(&mut hasher, &segment.text);
        update_str(&mut hasher, segment.speaker_id().unwrap_or_default());
        update_str(&mut hasher, &segment.emotion);
        update_str(&mut hasher, &segment.prompt2);
        hasher.update(segment.infer_seed.to_le_bytes());
        hasher.update(segment.sampling.temperature.to_le_bytes());
        hasher.update(segment.sampling.top_p.to_le_bytes());
        hasher.update(segment.sampling.top_k.to_le_bytes());
    }
    hasher.finalize().into()
}

// Length prefix keeps ("ab", "c") and ("a", "bc") apart.
fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(value: f32) -> AudioBuffer {
        AudioBuffer::new(22_050, vec![value; 8])
    }

    #[test]
    fn stores_and_returns_batch() {
        let cache = MemoryCache::new();
        let ctx = SynthesisContext::new();
        let batch = vec![TextSegment::new("one"), TextSegment::new("two")];

        assert!(cache.get(&batch, &ctx).is_none());
        cache.set(&batch, &ctx, &[buffer(0.1), buffer(0.2)]);

        let hit = cache.get(&batch, &ctx).unwrap();
        assert_eq!(hit, vec![buffer(0.1), buffer(0.2)]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn key_depends_on_seed_and_text_boundaries() {
        let cache = MemoryCache::new();
        let ctx = SynthesisContext::new();
        cache.set(&[TextSegment::new("ab"), TextSegment::new("c")], &ctx, &[]);

        assert!(
            cache
                .get(&[TextSegment::new("a"), TextSegment::new("bc")], &ctx)
                .is_none()
        );
        assert!(
            cache
                .get(&[TextSegment::new("ab").with_seed(7), TextSegment::new("c")], &ctx)
                .is_none()
        );
    }

    #[test]
    fn bounded_cache_evicts_oldest_batch() {
        let cache = MemoryCache::with_capacity(2);
        let ctx = SynthesisContext::new();
        let one = [TextSegment::new("one")];
        let two = [TextSegment::new("two")];
        let three = [TextSegment::new("three")];

        cache.set(&one, &ctx, &[buffer(0.1)]);
        cache.set(&two, &ctx, &[buffer(0.2)]);
        // Overwriting keeps the original insertion slot.
        cache.set(&one, &ctx, &[buffer(0.3)]);
        cache.set(&three, &ctx, &[buffer(0.4)]);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&one, &ctx).is_none());
        assert_eq!(cache.get(&two, &ctx), Some(vec![buffer(0.2)]));
        assert_eq!(cache.get(&three, &ctx), Some(vec![buffer(0.4)]));
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let cache = MemoryCache::with_capacity(0);
        let ctx = SynthesisContext::new();
        cache.set(&[TextSegment::new("x")], &ctx, &[buffer(0.0)]);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), Some(0));
    }

    #[test]
    fn default_cache_is_unbounded() {
        let cache = MemoryCache::new();
        let ctx = SynthesisContext::new();
        for i in 0..64_u64 {
            cache.set(&[TextSegment::new("x").with_seed(i)], &ctx, &[]);
        }
        assert_eq!(cache.len(), 64);
        assert_eq!(cache.capacity(), None);
    }

    #[test]
    fn clear_empties_cache() {
        let cache = MemoryCache::new();
        cache.set(&[TextSegment::new("x")], &SynthesisContext::new(), &[buffer(0.0)]);
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }
}
