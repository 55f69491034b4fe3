//! Reference audio post-processing: silence trim, peak ceiling, tail pad.
//!
//! Applied to reference clips before they condition the model. Synthesized
//! output is returned at whatever loudness the engine produces.

use cosytts_core::PROMPT_SAMPLE_RATE;
use serde::{Deserialize, Serialize};

/// Power floor used when converting frame energy to decibels.
const POWER_FLOOR: f32 = 1e-10;

/// Post-processing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostprocessConfig {
    /// Frames quieter than the loudest frame by more than this many
    /// decibels count as silence.
    pub top_db: f32,

    /// Analysis window of the silence detector, in samples.
    pub frame_length: usize,

    /// Step between analysis windows, in samples.
    pub hop_length: usize,

    /// Peak ceiling; louder clips are scaled down to exactly this value.
    pub max_amplitude: f32,

    /// Length of the silence appended after trimming.
    pub pad_seconds: f32,

    /// Rate of the audio being processed, used to size the pad.
    pub sample_rate: u32,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            top_db: 60.0,
            frame_length: 440,
            hop_length: 220,
            max_amplitude: 0.8,
            pad_seconds: 0.2,
            sample_rate: PROMPT_SAMPLE_RATE,
        }
    }
}

impl PostprocessConfig {
    /// Number of zero samples appended by [`postprocess`].
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn pad_len(&self) -> usize {
        (self.sample_rate as f32 * self.pad_seconds).round() as usize
    }
}

/// Trim edge silence, cap the peak, and append a silent tail.
pub fn postprocess(samples: &[f32], config: &PostprocessConfig) -> Vec<f32> {
    let (start, end) = nonsilent_bounds(samples, config);
    let mut out = samples[start..end].to_vec();

    let peak = out.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak > config.max_amplitude {
        for s in &mut out {
            *s = *s / peak * config.max_amplitude;
        }
    }

    out.resize(out.len() + config.pad_len(), 0.0);
    out
}

/// Sample range between the first and last non-silent frame.
///
/// Frames are centered on multiples of `hop_length`, with the signal
/// zero-padded by half a frame on both sides. Returns an empty range when
/// every frame is silent.
fn nonsilent_bounds(samples: &[f32], config: &PostprocessConfig) -> (usize, usize) {
    let n = samples.len();
    let frame = config.frame_length.max(1);
    let hop = config.hop_length.max(1);
    if n == 0 {
        return (0, 0);
    }

    let energy = frame_energy(samples, frame, hop);
    let max_energy = energy.iter().copied().fold(0.0f32, f32::max);
    let reference_db = power_db(max_energy);

    let mut nonsilent = energy
        .iter()
        .enumerate()
        .filter(|&(_, &e)| power_db(e) - reference_db > -config.top_db)
        .map(|(i, _)| i);

    let Some(first) = nonsilent.next() else {
        return (0, 0);
    };
    let last = nonsilent.last().unwrap_or(first);

    let start = (first * hop).min(n);
    let end = ((last + 1) * hop).min(n);
    (start, end)
}

/// Mean-square energy of each centered frame.
#[allow(clippy::cast_precision_loss)]
fn frame_energy(samples: &[f32], frame: usize, hop: usize) -> Vec<f32> {
    let pad = frame / 2;
    let padded_len = samples.len() + 2 * pad;
    let n_frames = if padded_len >= frame {
        1 + (padded_len - frame) / hop
    } else {
        1
    };

    let at = |i: usize| -> f32 {
        i.checked_sub(pad)
            .and_then(|j| samples.get(j))
            .copied()
            .unwrap_or(0.0)
    };

    (0..n_frames)
        .map(|f| {
            let begin = f * hop;
            let sum: f32 = (begin..begin + frame).map(|i| at(i) * at(i)).sum();
            sum / frame as f32
        })
        .collect()
}

fn power_db(power: f32) -> f32 {
    10.0 * power.max(POWER_FLOOR).log10()
}
