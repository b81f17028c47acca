//! Error types for voice analysis

use thiserror::Error;

/// Errors that can occur while turning an upload into a voice category.
///
/// Every variant is terminal for the current request: nothing here is retried.
#[derive(Error, Debug)]
pub enum VoiceError {
    /// Format hint not recognized and the config rejects unknown formats
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Bytes could not be parsed as the declared format
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    /// Decoding succeeded but produced no samples
    #[error("Audio contains no samples")]
    EmptyResult,

    /// Sample rate conversion failed
    #[error("Failed to resample audio: {0}")]
    Resample(String),

    /// A feature extraction backend failed to initialize or run
    #[error("Feature extraction failed: {0}")]
    Analysis(String),

    /// External decoder did not finish in time and was killed
    #[error("Decoder '{program}' timed out after {timeout_secs}s")]
    DecoderTimeout { program: String, timeout_secs: u64 },

    /// Temporary storage or subprocess I/O failure
    #[error("I/O error during decoding: {0}")]
    Io(#[from] std::io::Error),
}

impl VoiceError {
    /// True for failures a caller should report as "could not read this file".
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            VoiceError::Decode(_) | VoiceError::DecoderTimeout { .. } | VoiceError::Io(_)
        )
    }
}

/// Result type for voice analysis operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors raised while loading an [`AnalysisConfig`](crate::config::AnalysisConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_failure_grouping() {
        assert!(VoiceError::Decode("bad header".into()).is_decode_failure());
        assert!(VoiceError::DecoderTimeout {
            program: "ffmpeg".into(),
            timeout_secs: 3
        }
        .is_decode_failure());
        assert!(!VoiceError::EmptyResult.is_decode_failure());
        assert!(!VoiceError::UnsupportedFormat("ogg".into()).is_decode_failure());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            VoiceError::UnsupportedFormat("flac".into()).to_string(),
            "Unsupported audio format: flac"
        );
        assert_eq!(
            VoiceError::DecoderTimeout {
                program: "ffmpeg".into(),
                timeout_secs: 10
            }
            .to_string(),
            "Decoder 'ffmpeg' timed out after 10s"
        );
    }
}
