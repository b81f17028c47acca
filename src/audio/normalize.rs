//! Canonical waveform production: downmix, resample, truncate.
//!
//! Every decoder's output passes through [`Normalizer::normalize`], in this
//! fixed order:
//! 1. average all channels into one
//! 2. resample to the analysis rate (22050 Hz by default) with rubato
//! 3. keep only the first `max_duration_secs` (5 s by default)
//!
//! A waveform that is already mono, at the analysis rate and within the
//! duration limit comes back unchanged.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use serde::Serialize;
use tracing::debug;

use super::decoder::DecodedAudio;
use crate::config::NormalizeConfig;
use crate::error::{VoiceError, VoiceResult};

/// Mono samples at the analysis rate, never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalWaveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl CanonicalWaveform {
    /// Wrap samples that are already canonical. Fails on an empty buffer.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> VoiceResult<Self> {
        if samples.is_empty() {
            return Err(VoiceError::EmptyResult);
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Never true for a constructed waveform.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    sample_rate: u32,
    max_samples: usize,
}

impl Normalizer {
    pub fn new(config: &NormalizeConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            max_samples: config.max_samples(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    pub fn normalize(&self, audio: DecodedAudio) -> VoiceResult<CanonicalWaveform> {
        if audio.frames() == 0 || audio.sample_rate == 0 {
            return Err(VoiceError::EmptyResult);
        }

        let source_rate = audio.sample_rate;
        let mut mono = downmix(audio.samples, audio.channels);

        // Only the head of the recording survives truncation. Cut the source a
        // little past that point so long uploads are not resampled in full;
        // the extra second keeps the resampler's edge away from the kept span.
        let needed_source_frames =
            (self.max_samples as u64 * source_rate as u64).div_ceil(self.sample_rate as u64)
                as usize
                + source_rate as usize;
        if source_rate != self.sample_rate && mono.len() > needed_source_frames {
            mono.truncate(needed_source_frames);
        }

        let mut resampled = resample(mono, source_rate, self.sample_rate)?;

        if resampled.len() > self.max_samples {
            debug!(
                "Truncating {} samples to {} ({:.2}s)",
                resampled.len(),
                self.max_samples,
                self.max_samples as f64 / self.sample_rate as f64
            );
            resampled.truncate(self.max_samples);
        }

        CanonicalWaveform::new(resampled, self.sample_rate)
    }
}

/// Average interleaved channels into one; mono input passes through untouched.
pub fn downmix(interleaved: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved;
    }

    let scale = 1.0 / channels as f32;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// Resample mono audio with rubato's polynomial resampler.
///
/// Returns the input unchanged when the rates already match.
pub fn resample(input: Vec<f32>, input_rate: u32, output_rate: u32) -> VoiceResult<Vec<f32>> {
    if input_rate == output_rate {
        debug!("Sample rate already at {}Hz, skipping resample", output_rate);
        return Ok(input);
    }
    if input.is_empty() {
        return Err(VoiceError::EmptyResult);
    }

    let input_frames = input.len();
    let mut resampler = FastFixedIn::<f32>::new(
        output_rate as f64 / input_rate as f64,
        1.0,
        PolynomialDegree::Septic,
        input_frames,
        1,
    )
    .map_err(|e| VoiceError::Resample(format!("Failed to create resampler: {}", e)))?;

    let expected_frames = ((input_frames as u64 * output_rate as u64 + input_rate as u64 / 2)
        / input_rate as u64) as usize;
    let delay = resampler.output_delay();

    let mut output = resampler
        .process(&[input], None)
        .map_err(|e| VoiceError::Resample(format!("Resampling failed: {}", e)))?;
    let mut resampled = output.pop().unwrap_or_default();

    // Flush the filter tail, then drop the warm-up delay from the head
    let mut tail = resampler
        .process_partial::<Vec<f32>>(None, None)
        .map_err(|e| VoiceError::Resample(format!("Resampler flush failed: {}", e)))?;
    resampled.append(&mut tail.pop().unwrap_or_default());
    resampled.drain(..delay.min(resampled.len()));
    resampled.truncate(expected_frames);

    debug!(
        "Resampled {} frames at {}Hz to {} frames at {}Hz",
        input_frames,
        input_rate,
        resampled.len(),
        output_rate
    );

    if resampled.is_empty() {
        return Err(VoiceError::EmptyResult);
    }
    Ok(resampled)
}
