//! Domain types shared between the orchestrator and its collaborators.
//!
//! These are plain data types with no engine dependencies. Speakers are
//! described here as concrete data; the orchestrator only ever reads them
//! through the [`SpeakerProfile`](crate::ports::SpeakerProfile) port.

mod audio;
mod segment;
mod speaker;

pub use audio::AudioBuffer;
pub use segment::{SamplingParams, StopFlag, SynthesisContext, TextSegment};
pub use speaker::{ConditioningToken, ReferenceClip, Speaker};
