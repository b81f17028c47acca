// Tempo (speech rate) estimation using aubio's Tempo tracker.
//
// Algorithm overview:
// 1. Feed the canonical waveform in hop-sized frames to aubio's Tempo tracker
// 2. The tracker runs spectral-flux onset detection and autocorrelates the
//    onset function to find the dominant beat period
// 3. Return the final BPM estimate and the tracker's confidence
//
// Unlike a music library we do not fold the estimate into a "DJ range":
// the classifier compares raw BPM against a fixed 100 BPM boundary.

use bliss_audio_aubio_rs::{OnsetMode, Tempo};
use tracing::debug;

use super::normalize::CanonicalWaveform;
use crate::config::TempoConfig;
use crate::error::{VoiceError, VoiceResult};

/// Result of tempo detection for a single waveform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoEstimate {
    /// Beats per minute; 0.0 when no beat period was found
    pub bpm: f64,
    /// Confidence score (0.0 to 1.0)
    pub confidence: f64,
}

/// Detect the dominant tempo of a canonical waveform.
pub fn detect_tempo(wave: &CanonicalWaveform, config: &TempoConfig) -> VoiceResult<TempoEstimate> {
    detect_tempo_from_samples(wave.samples(), wave.sample_rate(), config)
}

/// Detect tempo from raw mono samples.
///
/// Separated from [`CanonicalWaveform`] so synthetic click tracks can be
/// tested at any sample rate.
pub fn detect_tempo_from_samples(
    samples: &[f32],
    sample_rate: u32,
    config: &TempoConfig,
) -> VoiceResult<TempoEstimate> {
    if samples.is_empty() {
        return Err(VoiceError::EmptyResult);
    }

    let mut tempo = Tempo::new(OnsetMode::SpecFlux, config.buf_size, config.hop_size, sample_rate)
        .map_err(|e| VoiceError::Analysis(format!("Failed to create tempo tracker: {:?}", e)))?;

    // A trailing partial hop is dropped
    for (i, frame) in samples.chunks_exact(config.hop_size).enumerate() {
        tempo
            .do_result(frame)
            .map_err(|e| VoiceError::Analysis(format!("Tempo tracking failed at frame {}: {:?}", i, e)))?;
    }

    let bpm = tempo.get_bpm() as f64;
    let confidence = (tempo.get_confidence() as f64).clamp(0.0, 1.0);

    let estimate = if bpm.is_finite() && bpm > 0.0 {
        TempoEstimate { bpm, confidence }
    } else {
        TempoEstimate {
            bpm: 0.0,
            confidence: 0.0,
        }
    };

    debug!(
        "Tempo: {:.2} BPM (confidence {:.2}) over {} hops",
        estimate.bpm,
        estimate.confidence,
        samples.len() / config.hop_size
    );

    Ok(estimate)
}
