// External-process decoding via ffmpeg.
//
// Each call gets its own scratch directory holding the upload, the decoded
// WAV and ffmpeg's stderr log. The directory is a `tempfile::TempDir`, so it
// is removed when the call returns on every path (success, decode failure,
// timeout). The decoded WAV goes back through `WavDecoder`, so normalization
// downstream is identical for both backends.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::decoder::{AudioDecoder, DecodedAudio, RawAudio, WavDecoder};
use super::format::AudioFormat;
use crate::config::FfmpegConfig;
use crate::error::{VoiceError, VoiceResult};

/// How often a running child is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Longest stderr excerpt carried into an error message
const STDERR_EXCERPT_CHARS: usize = 400;

pub struct FfmpegDecoder {
    format: AudioFormat,
    program: PathBuf,
    timeout: Duration,
    /// Parent directory for per-call scratch dirs; system temp dir when `None`
    scratch_root: Option<PathBuf>,
}

impl FfmpegDecoder {
    pub fn new(format: AudioFormat, program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            format,
            program: program.into(),
            timeout,
            scratch_root: None,
        }
    }

    pub fn from_config(format: AudioFormat, config: &FfmpegConfig) -> Self {
        let mut decoder = Self::new(
            format,
            &config.program,
            Duration::from_secs(config.timeout_secs),
        );
        decoder.scratch_root = config.scratch_dir.clone();
        decoder
    }

    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    fn scratch_dir(&self) -> std::io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("vcode_");
        match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error"])
            // Force the demuxer: never let ffmpeg sniff a different container
            .args(["-f", self.format.extension(), "-i"])
            .arg(input)
            .args(["-vn", "-acodec", "pcm_s16le", "-f", "wav", "-y"])
            .arg(output);
        cmd
    }
}

impl AudioDecoder for FfmpegDecoder {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn decode(&self, audio: RawAudio) -> VoiceResult<DecodedAudio> {
        audio.ensure_not_empty()?;

        let scratch = self.scratch_dir()?;
        let input_path = scratch
            .path()
            .join(format!("input.{}", self.format.extension()));
        let output_path = scratch.path().join("decoded.wav");
        let log_path = scratch.path().join("ffmpeg.log");

        std::fs::write(&input_path, &audio.bytes)?;
        drop(audio);

        let log_file = File::create(&log_path)?;
        debug!(
            "Running {:?} on {:?} as {}",
            self.program, input_path, self.format
        );

        let mut child = self
            .command(&input_path, &output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log_file))
            .spawn()
            .map_err(|e| {
                VoiceError::Decode(format!("Failed to start {:?}: {}", self.program, e))
            })?;

        let status = wait_with_timeout(&mut child, self.timeout).map_err(|e| match e {
            VoiceError::DecoderTimeout { timeout_secs, .. } => VoiceError::DecoderTimeout {
                program: self.program.display().to_string(),
                timeout_secs,
            },
            other => other,
        })?;

        if !status.success() {
            let log = std::fs::read_to_string(&log_path).unwrap_or_default();
            let excerpt: String = log.trim().chars().take(STDERR_EXCERPT_CHARS).collect();
            return Err(VoiceError::Decode(format!(
                "{:?} exited with {}: {}",
                self.program, status, excerpt
            )));
        }

        let wav = std::fs::read(&output_path).map_err(|e| {
            VoiceError::Decode(format!("Decoder produced no output file: {}", e))
        })?;

        WavDecoder.decode(RawAudio::new(wav, AudioFormat::Wav))
        // `scratch` drops here and removes the directory
    }
}

/// Block until the child exits, killing it once `timeout` elapses.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> VoiceResult<ExitStatus> {
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }

        if Instant::now() >= deadline {
            warn!("Decoder still running after {:?}, killing it", timeout);
            if let Err(e) = child.kill() {
                warn!("Failed to kill decoder process: {}", e);
            }
            // Reap so no zombie outlives the request
            let _ = child.wait();
            return Err(VoiceError::DecoderTimeout {
                program: String::new(),
                timeout_secs: timeout.as_secs(),
            });
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}
