//! Speaker profile port: read-only view of a stored speaker.

use crate::domain::{ConditioningToken, ReferenceClip};

/// Read-only accessors the orchestrator needs from a speaker profile.
///
/// The orchestrator holds a profile only for the duration of one batch and
/// never mutates it.
pub trait SpeakerProfile: Send + Sync {
    /// Stable identifier, used for cache keys and logging.
    fn id(&self) -> &str;

    /// Free-form gender description (e.g. `"female"`, `"男"`).
    fn gender(&self) -> &str;

    /// Conditioning token stored for `model_id`, if any.
    fn get_token(&self, model_id: &str) -> Option<ConditioningToken>;

    /// First reference clip accepted by `predicate`.
    fn get_ref(&self, predicate: &dyn Fn(&ReferenceClip) -> bool) -> Option<ReferenceClip>;
}
