//! End-to-end classification: upload bytes → voice category + metrics.
//!
//! A [`VoiceAnalyzer`] is immutable after construction. Every call to
//! [`VoiceAnalyzer::classify`] builds its own waveform and feature vector, so
//! one analyzer can serve concurrent requests from several threads.

use serde::Serialize;
use tracing::{debug, info};

use crate::audio::decoder::{DecoderTable, RawAudio};
use crate::audio::format::AudioFormat;
use crate::audio::normalize::{CanonicalWaveform, Normalizer};
use crate::classifier::{classify_voice, VoiceCategory, EXPERT_DIAGNOSIS_NOTE};
use crate::config::AnalysisConfig;
use crate::error::VoiceResult;
use crate::features::{FeatureExtractor, FeatureVector};

/// Classification outcome plus the metrics it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceReport {
    pub category: VoiceCategory,
    pub features: FeatureVector,
}

impl VoiceReport {
    pub fn title(&self) -> &'static str {
        self.category.title()
    }

    pub fn description(&self) -> &'static str {
        self.category.description()
    }

    pub fn recommendation(&self) -> &'static str {
        EXPERT_DIAGNOSIS_NOTE
    }

    /// One-line diagnostics caption: pitch and tempo to 2 decimals, energy to 5.
    pub fn metrics_caption(&self) -> String {
        format!(
            "📊 Metrics → Pitch: {:.2}, Tempo: {:.2}, Energy: {:.5}",
            self.features.pitch, self.features.tempo, self.features.energy
        )
    }

    /// Report with the display text inlined, for JSON output
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "category": self.category,
            "title": self.title(),
            "description": self.description(),
            "recommendation": self.recommendation(),
            "metrics": self.features,
        })
    }
}

pub struct VoiceAnalyzer {
    config: AnalysisConfig,
    decoders: DecoderTable,
    normalizer: Normalizer,
    extractor: FeatureExtractor,
}

impl Default for VoiceAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl VoiceAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            decoders: DecoderTable::from_config(&config),
            normalizer: Normalizer::new(&config.normalize),
            extractor: FeatureExtractor::from_config(&config),
            config,
        }
    }

    /// Classify an upload. `hint` is a bare extension or a filename.
    pub fn classify(&self, bytes: Vec<u8>, hint: &str) -> VoiceResult<VoiceReport> {
        let format = AudioFormat::resolve(hint, self.config.unknown_format)?;
        let wave = self.normalize(RawAudio::new(bytes, format))?;
        let report = self.analyze_waveform(&wave)?;

        info!(
            "Classified {} upload as {} (pitch={:.2}, tempo={:.2}, energy={:.5})",
            format,
            report.category,
            report.features.pitch,
            report.features.tempo,
            report.features.energy
        );
        Ok(report)
    }

    /// Decode and normalize without extracting features.
    pub fn normalize(&self, raw: RawAudio) -> VoiceResult<CanonicalWaveform> {
        let byte_len = raw.bytes.len();
        let decoded = self.decoders.decode(raw)?;
        debug!(
            "Decoded {} bytes into {} frames ({} ch @ {}Hz)",
            byte_len,
            decoded.frames(),
            decoded.channels,
            decoded.sample_rate
        );
        self.normalizer.normalize(decoded)
    }

    /// Features and category for an already-canonical waveform.
    pub fn analyze_waveform(&self, wave: &CanonicalWaveform) -> VoiceResult<VoiceReport> {
        let features = self.extractor.extract(wave)?;
        Ok(VoiceReport {
            category: classify_voice(&features),
            features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnknownFormatPolicy;
    use crate::error::VoiceError;

    #[test]
    fn test_analyzer_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VoiceAnalyzer>();
    }

    #[test]
    fn test_metrics_caption_precision() {
        let report = VoiceReport {
            category: VoiceCategory::Autumn,
            features: FeatureVector::new(163.456, 99.999, 0.0123456),
        };
        assert_eq!(
            report.metrics_caption(),
            "📊 Metrics → Pitch: 163.46, Tempo: 100.00, Energy: 0.01235"
        );
    }

    #[test]
    fn test_json_report() {
        let report = VoiceReport {
            category: VoiceCategory::Summer,
            features: FeatureVector::new(200.0, 90.0, 0.03),
        };
        let json = report.to_json();
        assert_eq!(json["category"], "summer");
        assert_eq!(json["title"], VoiceCategory::Summer.title());
        assert_eq!(json["metrics"]["tempo"], 90.0);
    }

    #[test]
    fn test_reject_policy_stops_before_decoding() {
        let mut config = AnalysisConfig::default();
        config.unknown_format = UnknownFormatPolicy::Reject;
        let analyzer = VoiceAnalyzer::new(config);

        let result = analyzer.classify(vec![1, 2, 3], "clip.ogg");
        assert!(matches!(result, Err(VoiceError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_empty_upload_is_empty_result() {
        let result = VoiceAnalyzer::default().classify(Vec::new(), "mp3");
        assert!(matches!(result, Err(VoiceError::EmptyResult)));
    }

    #[test]
    fn test_analyze_canonical_waveform() {
        let samples: Vec<f32> = (0..22050 * 2)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 60.0 * i as f32 / 22050.0).sin())
            .collect();
        let wave = CanonicalWaveform::new(samples, 22050).unwrap();

        let report = VoiceAnalyzer::default().analyze_waveform(&wave).unwrap();
        // 60 Hz sits below the pitch band; energy 0.125 makes it Winter
        assert!(report.features.pitch <= 180.0);
        assert_eq!(report.category, VoiceCategory::Winter);
    }
}
