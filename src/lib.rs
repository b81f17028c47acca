// Modules
pub mod analyzer;
pub mod audio;
pub mod classifier;
pub mod config;
pub mod error;
pub mod features;

pub use analyzer::{VoiceAnalyzer, VoiceReport};
pub use audio::decoder::{AudioDecoder, DecoderTable, RawAudio};
pub use audio::format::AudioFormat;
pub use audio::normalize::{CanonicalWaveform, Normalizer};
pub use classifier::{classify_voice, VoiceCategory};
pub use config::AnalysisConfig;
pub use error::{ConfigError, VoiceError, VoiceResult};
pub use features::{FeatureExtractor, FeatureVector};

/// Classify an upload with the default configuration.
///
/// `hint` is a bare extension (`"m4a"`) or the uploaded filename
/// (`"memo.M4A"`). Unrecognized hints are decoded as WAV.
pub fn classify(bytes: Vec<u8>, hint: &str) -> VoiceResult<(VoiceCategory, FeatureVector)> {
    let report = VoiceAnalyzer::default().classify(bytes, hint)?;
    Ok((report.category, report.features))
}
