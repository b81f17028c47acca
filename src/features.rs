//! Feature extraction: pitch, tempo and energy of a canonical waveform.

use serde::{Deserialize, Serialize};

use crate::audio::energy::detect_energy;
use crate::audio::normalize::CanonicalWaveform;
use crate::audio::pitch::detect_pitch;
use crate::audio::tempo::detect_tempo;
use crate::config::{AnalysisConfig, PitchConfig, TempoConfig};
use crate::error::VoiceResult;

/// The three summary statistics the classifier works on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Mean pitch-candidate frequency in Hz
    pub pitch: f64,
    /// Beats per minute
    pub tempo: f64,
    /// Mean squared amplitude
    pub energy: f64,
}

impl FeatureVector {
    pub fn new(pitch: f64, tempo: f64, energy: f64) -> Self {
        Self {
            pitch,
            tempo,
            energy,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    pitch: PitchConfig,
    tempo: TempoConfig,
}

impl FeatureExtractor {
    pub fn new(pitch: PitchConfig, tempo: TempoConfig) -> Self {
        Self { pitch, tempo }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.pitch.clone(), config.tempo.clone())
    }

    pub fn extract(&self, wave: &CanonicalWaveform) -> VoiceResult<FeatureVector> {
        let pitch = detect_pitch(wave, &self.pitch);
        let tempo = detect_tempo(wave, &self.tempo)?.bpm;
        let energy = detect_energy(wave);
        Ok(FeatureVector::new(pitch, tempo, energy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_extract_sine() {
        let samples: Vec<f32> = (0..22050 * 3)
            .map(|i| 0.5 * (2.0 * PI * 250.0 * i as f32 / 22050.0).sin())
            .collect();
        let wave = CanonicalWaveform::new(samples, 22050).unwrap();

        let features = FeatureExtractor::default().extract(&wave).unwrap();
        assert!((features.pitch - 250.0).abs() < 10.0, "pitch {}", features.pitch);
        assert!((features.energy - 0.125).abs() < 1e-3, "energy {}", features.energy);
        assert!(features.tempo.is_finite() && features.tempo >= 0.0);
    }

    #[test]
    fn test_extract_silence_is_finite() {
        let wave = CanonicalWaveform::new(vec![0.0; 22050], 22050).unwrap();
        let features = FeatureExtractor::default().extract(&wave).unwrap();
        assert_eq!(features.pitch, 0.0);
        assert_eq!(features.energy, 0.0);
        assert!(!features.tempo.is_nan());
    }

    #[test]
    fn test_feature_vector_serializes() {
        let json = serde_json::to_value(FeatureVector::new(200.0, 120.0, 0.005)).unwrap();
        assert_eq!(json["pitch"], 200.0);
        assert_eq!(json["tempo"], 120.0);
        assert_eq!(json["energy"], 0.005);
    }
}
