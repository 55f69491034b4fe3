//! Reference clip decoding and sample-rate normalization.

use std::io::Cursor;

use rubato::{FftFixedIn, Resampler as _};

use crate::error::SynthesisError;

/// Decode a stored reference clip into mono f32 samples at its native rate.
///
/// Accepts either a RIFF/WAV container or headerless little-endian PCM16 at
/// `declared_rate`. For WAV input the container's rate wins.
pub fn decode_clip(bytes: &[u8], declared_rate: u32) -> Result<(u32, Vec<f32>), SynthesisError> {
    if bytes.starts_with(b"RIFF") {
        return decode_wav(bytes, declared_rate);
    }

    if bytes.len() % 2 != 0 {
        return Err(SynthesisError::Audio(format!(
            "raw PCM16 clip has odd length {}",
            bytes.len()
        )));
    }
    if declared_rate == 0 {
        return Err(SynthesisError::Audio("raw PCM16 clip has no sample rate".into()));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32_768.0)
        .collect();
    Ok((declared_rate, samples))
}

fn decode_wav(bytes: &[u8], declared_rate: u32) -> Result<(u32, Vec<f32>), SynthesisError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| SynthesisError::Audio(format!("invalid WAV data: {e}")))?;
    let spec = reader.spec();

    if declared_rate != 0 && declared_rate != spec.sample_rate {
        tracing::warn!(
            declared = declared_rate,
            container = spec.sample_rate,
            "Reference clip sample rate mismatch, using container rate"
        );
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| SynthesisError::Audio(e.to_string()))?,
        hound::SampleFormat::Int => {
            #[allow(clippy::cast_precision_loss)]
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| SynthesisError::Audio(e.to_string()))?
        }
    };

    Ok((spec.sample_rate, to_mono(&interleaved, spec.channels)))
}

/// Bring `samples` from `from_rate` to `to_rate`.
pub fn normalize_rate(
    samples: &[f32],
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<f32>, SynthesisError> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }
    resample(samples, from_rate, to_rate)
}

/// Convert interleaved multi-channel audio to mono by averaging channels.
#[allow(clippy::cast_precision_loss)]
fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let channels = channels as usize;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Resample audio from one sample rate to another using FFT-based resampling.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, SynthesisError> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        1024,
        2, // sub-chunks for quality
        1, // mono
    )
    .map_err(|e| SynthesisError::Audio(e.to_string()))?;
    let chunk_size = resampler.input_frames_next();

    let mut output = Vec::with_capacity(samples.len() * to_rate as usize / from_rate as usize + 1);

    for chunk in samples.chunks(chunk_size) {
        let is_tail = chunk.len() < chunk_size;
        let padded;
        let input = if is_tail {
            let mut buf = vec![0.0f32; chunk_size];
            buf[..chunk.len()].copy_from_slice(chunk);
            padded = buf;
            padded.as_slice()
        } else {
            chunk
        };

        let result = resampler
            .process(&[input], None)
            .map_err(|e| SynthesisError::Audio(e.to_string()))?;
        let Some(channel) = result.first() else {
            continue;
        };

        if is_tail {
            // Only take the proportional amount of output
            #[allow(
                clippy::cast_precision_loss,
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss
            )]
            let output_len =
                (chunk.len() as f64 * f64::from(to_rate) / f64::from(from_rate)).ceil() as usize;
            output.extend_from_slice(&channel[..output_len.min(channel.len())]);
        } else {
            output.extend_from_slice(channel);
        }
    }

    Ok(output)
}
