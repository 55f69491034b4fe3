//! Synthesized audio buffers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One synthesized waveform and the rate it was produced at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBuffer {
    /// Sample rate of `samples` in Hz.
    pub sample_rate: u32,

    /// Mono PCM f32 samples.
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    pub const fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// Playback duration of the buffer.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
