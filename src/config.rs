// Analysis configuration, loaded from TOML.
//
// Every field has a default, so an empty file (or no file at all) yields the
// reference behavior: bundled decoding, unknown formats decoded as WAV,
// 22050 Hz mono, first 5 seconds.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub unknown_format: UnknownFormatPolicy,

    #[serde(default)]
    pub decoder: DecoderBackend,

    #[serde(default)]
    pub ffmpeg: FfmpegConfig,

    #[serde(default)]
    pub normalize: NormalizeConfig,

    #[serde(default)]
    pub pitch: PitchConfig,

    #[serde(default)]
    pub tempo: TempoConfig,
}

/// What to do with a format hint that is not mp3, wav or m4a
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFormatPolicy {
    /// Decode the bytes as WAV
    #[default]
    DefaultToWav,
    /// Fail with `VoiceError::UnsupportedFormat`
    Reject,
}

/// Which decoding strategy turns upload bytes into PCM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderBackend {
    /// In-process symphonia readers, one per container format
    #[default]
    Bundled,
    /// External `ffmpeg` process working on scoped temp files
    Ffmpeg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FfmpegConfig {
    #[serde(default = "default_ffmpeg_program")]
    pub program: String,

    /// Child process is killed after this many seconds
    #[serde(default = "default_ffmpeg_timeout")]
    pub timeout_secs: u64,

    /// Where per-request scratch directories are created; system temp dir when unset
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            program: default_ffmpeg_program(),
            timeout_secs: default_ffmpeg_timeout(),
            scratch_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f64,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            max_duration_secs: default_max_duration(),
        }
    }
}

impl NormalizeConfig {
    /// Maximum number of samples in a canonical waveform
    pub fn max_samples(&self) -> usize {
        (self.max_duration_secs * self.sample_rate as f64).round() as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchConfig {
    #[serde(default = "default_n_fft")]
    pub n_fft: usize,

    #[serde(default = "default_pitch_hop")]
    pub hop_length: usize,

    #[serde(default = "default_fmin")]
    pub fmin: f64,

    #[serde(default = "default_fmax")]
    pub fmax: f64,

    /// Fraction of the per-frame spectral peak a bin must exceed to be a candidate
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            n_fft: default_n_fft(),
            hop_length: default_pitch_hop(),
            fmin: default_fmin(),
            fmax: default_fmax(),
            threshold: default_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoConfig {
    #[serde(default = "default_tempo_buf")]
    pub buf_size: usize,

    #[serde(default = "default_tempo_hop")]
    pub hop_size: usize,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            buf_size: default_tempo_buf(),
            hop_size: default_tempo_hop(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            unknown_format: UnknownFormatPolicy::default(),
            decoder: DecoderBackend::default(),
            ffmpeg: FfmpegConfig::default(),
            normalize: NormalizeConfig::default(),
            pitch: PitchConfig::default(),
            tempo: TempoConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = &self.normalize;
        if n.sample_rate == 0 {
            return Err(ConfigError::Invalid("normalize.sample_rate must be > 0".into()));
        }
        if !(n.max_duration_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "normalize.max_duration_secs must be > 0".into(),
            ));
        }

        let p = &self.pitch;
        if p.n_fft < 4 || p.hop_length == 0 || p.hop_length > p.n_fft {
            return Err(ConfigError::Invalid(format!(
                "pitch frame sizes invalid: n_fft={}, hop_length={}",
                p.n_fft, p.hop_length
            )));
        }
        if !(p.fmin > 0.0 && p.fmin < p.fmax) {
            return Err(ConfigError::Invalid(format!(
                "pitch range invalid: fmin={}, fmax={}",
                p.fmin, p.fmax
            )));
        }
        if !(0.0..=1.0).contains(&p.threshold) {
            return Err(ConfigError::Invalid(format!(
                "pitch.threshold must be within [0, 1], got {}",
                p.threshold
            )));
        }

        let t = &self.tempo;
        if t.hop_size == 0 || t.buf_size < t.hop_size {
            return Err(ConfigError::Invalid(format!(
                "tempo frame sizes invalid: buf_size={}, hop_size={}",
                t.buf_size, t.hop_size
            )));
        }

        if self.ffmpeg.timeout_secs == 0 {
            return Err(ConfigError::Invalid("ffmpeg.timeout_secs must be > 0".into()));
        }
        if self.ffmpeg.program.trim().is_empty() {
            return Err(ConfigError::Invalid("ffmpeg.program must not be empty".into()));
        }

        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ffmpeg_program() -> String {
    "ffmpeg".to_string()
}

fn default_ffmpeg_timeout() -> u64 {
    10
}

fn default_sample_rate() -> u32 {
    22050
}

fn default_max_duration() -> f64 {
    5.0
}

fn default_n_fft() -> usize {
    2048
}

fn default_pitch_hop() -> usize {
    512
}

fn default_fmin() -> f64 {
    150.0
}

fn default_fmax() -> f64 {
    4000.0
}

fn default_threshold() -> f64 {
    0.1
}

fn default_tempo_buf() -> usize {
    1024
}

fn default_tempo_hop() -> usize {
    512
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AnalysisConfig::parse("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.normalize.sample_rate, 22050);
        assert_eq!(config.normalize.max_samples(), 110250);
        assert_eq!(config.unknown_format, UnknownFormatPolicy::DefaultToWav);
        assert_eq!(config.decoder, DecoderBackend::Bundled);
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            unknown_format = "reject"
            decoder = "ffmpeg"

            [ffmpeg]
            program = "/usr/local/bin/ffmpeg"
            timeout_secs = 3
        "#;
        let config = AnalysisConfig::parse(toml).unwrap();
        assert_eq!(config.unknown_format, UnknownFormatPolicy::Reject);
        assert_eq!(config.decoder, DecoderBackend::Ffmpeg);
        assert_eq!(config.ffmpeg.program, "/usr/local/bin/ffmpeg");
        assert_eq!(config.ffmpeg.timeout_secs, 3);
        assert_eq!(config.pitch.n_fft, 2048);
    }

    #[test]
    fn test_invalid_pitch_range_rejected() {
        let toml = r#"
            [pitch]
            fmin = 500.0
            fmax = 400.0
        "#;
        assert!(matches!(
            AnalysisConfig::parse(toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_hop_larger_than_window_rejected() {
        let toml = r#"
            [tempo]
            buf_size = 256
            hop_size = 512
        "#;
        assert!(AnalysisConfig::parse(toml).is_err());
    }

    #[test]
    fn test_unknown_policy_value_is_parse_error() {
        let result = AnalysisConfig::parse(r#"unknown_format = "guess""#);
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();
        writeln!(file, "[normalize]").unwrap();
        writeln!(file, "max_duration_secs = 3.0").unwrap();

        let config = AnalysisConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.normalize.max_samples(), 66150);
    }

    #[test]
    fn test_missing_file() {
        let result = AnalysisConfig::load_from_file(Path::new("/nonexistent/vcode.toml"));
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }
}
