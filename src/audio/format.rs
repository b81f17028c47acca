// Format tags for uploaded audio and the hint → tag resolution policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::warn;

use crate::config::UnknownFormatPolicy;
use crate::error::{VoiceError, VoiceResult};

/// Container formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    M4a,
}

impl AudioFormat {
    /// Every accepted format, in the order shown to users
    pub const ALL: [AudioFormat; 3] = [AudioFormat::Mp3, AudioFormat::Wav, AudioFormat::M4a];

    /// Canonical lowercase file extension
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::M4a => "m4a",
        }
    }

    /// Recognize a bare extension or a filename, case-insensitively.
    ///
    /// `"M4A"`, `".wav"` and `"voice memo.mp3"` all resolve; anything else is `None`.
    pub fn from_hint(hint: &str) -> Option<AudioFormat> {
        let hint = hint.trim();
        let ext = match Path::new(hint).extension() {
            Some(ext) => ext.to_string_lossy().to_lowercase(),
            None => hint.trim_start_matches('.').to_lowercase(),
        };

        match ext.as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "m4a" => Some(AudioFormat::M4a),
            _ => None,
        }
    }

    /// Resolve a hint under the configured policy for unrecognized values.
    pub fn resolve(hint: &str, policy: UnknownFormatPolicy) -> VoiceResult<AudioFormat> {
        if let Some(format) = AudioFormat::from_hint(hint) {
            return Ok(format);
        }

        match policy {
            UnknownFormatPolicy::DefaultToWav => {
                warn!("Unrecognized format hint {:?}, decoding as wav", hint);
                Ok(AudioFormat::Wav)
            }
            UnknownFormatPolicy::Reject => Err(VoiceError::UnsupportedFormat(hint.to_string())),
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_extensions() {
        assert_eq!(AudioFormat::from_hint("mp3"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_hint("WAV"), Some(AudioFormat::Wav));
        assert_eq!(AudioFormat::from_hint(".m4a"), Some(AudioFormat::M4a));
    }

    #[test]
    fn test_filenames() {
        assert_eq!(AudioFormat::from_hint("voice memo.M4A"), Some(AudioFormat::M4a));
        assert_eq!(AudioFormat::from_hint("take.2.mp3"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_hint("/tmp/upload/rec.wav"), Some(AudioFormat::Wav));
    }

    #[test]
    fn test_unknown_hints() {
        assert_eq!(AudioFormat::from_hint("ogg"), None);
        assert_eq!(AudioFormat::from_hint("song.flac"), None);
        assert_eq!(AudioFormat::from_hint(""), None);
    }

    #[test]
    fn test_resolve_defaults_to_wav() {
        let format = AudioFormat::resolve("recording.ogg", UnknownFormatPolicy::DefaultToWav);
        assert_eq!(format.unwrap(), AudioFormat::Wav);
    }

    #[test]
    fn test_resolve_rejects_when_configured() {
        let result = AudioFormat::resolve("recording.ogg", UnknownFormatPolicy::Reject);
        assert!(matches!(result, Err(VoiceError::UnsupportedFormat(h)) if h == "recording.ogg"));
    }

    #[test]
    fn test_resolve_known_ignores_policy() {
        let format = AudioFormat::resolve("mp3", UnknownFormatPolicy::Reject).unwrap();
        assert_eq!(format, AudioFormat::Mp3);
    }

    #[test]
    fn test_display_matches_extension() {
        for format in AudioFormat::ALL {
            assert_eq!(format.to_string(), format.extension());
            assert_eq!(AudioFormat::from_hint(format.extension()), Some(format));
        }
    }
}
