use std::collections::HashMap;
use std::io::Cursor;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::conv::FromSample;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::sample::Sample;
use symphonia::default::formats::{IsoMp4Reader, MpaReader, WavReader};
use tracing::{debug, warn};

use super::ffmpeg::FfmpegDecoder;
use super::format::AudioFormat;
use crate::config::{AnalysisConfig, DecoderBackend};
use crate::error::{VoiceError, VoiceResult};

/// Upload bytes plus the format they were declared as.
#[derive(Debug, Clone)]
pub struct RawAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

impl RawAudio {
    pub fn new(bytes: Vec<u8>, format: AudioFormat) -> Self {
        Self { bytes, format }
    }

    /// Zero-byte uploads never reach a decoder.
    pub(crate) fn ensure_not_empty(&self) -> VoiceResult<()> {
        if self.bytes.is_empty() {
            return Err(VoiceError::EmptyResult);
        }
        Ok(())
    }
}

/// Decoded PCM at the source's native layout.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved samples (L, R, L, R, ...) in range [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }
}

/// Turns the bytes of one declared container format into PCM.
pub trait AudioDecoder: Send + Sync {
    fn format(&self) -> AudioFormat;

    fn decode(&self, audio: RawAudio) -> VoiceResult<DecodedAudio>;
}

/// MPEG audio (mp3) through symphonia's MPA reader
#[derive(Debug, Default, Clone, Copy)]
pub struct Mp3Decoder;

/// RIFF/WAVE through symphonia's WAV reader
#[derive(Debug, Default, Clone, Copy)]
pub struct WavDecoder;

/// ISO-MP4 (m4a: AAC or ALAC) through symphonia's MP4 demuxer
#[derive(Debug, Default, Clone, Copy)]
pub struct M4aDecoder;

impl AudioDecoder for Mp3Decoder {
    fn format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn decode(&self, audio: RawAudio) -> VoiceResult<DecodedAudio> {
        decode_container::<MpaReader>(audio)
    }
}

impl AudioDecoder for WavDecoder {
    fn format(&self) -> AudioFormat {
        AudioFormat::Wav
    }

    fn decode(&self, audio: RawAudio) -> VoiceResult<DecodedAudio> {
        decode_container::<WavReader>(audio)
    }
}

impl AudioDecoder for M4aDecoder {
    fn format(&self) -> AudioFormat {
        AudioFormat::M4a
    }

    fn decode(&self, audio: RawAudio) -> VoiceResult<DecodedAudio> {
        decode_container::<IsoMp4Reader>(audio)
    }
}

/// Format tag → decoder dispatch table.
pub struct DecoderTable {
    decoders: HashMap<AudioFormat, Box<dyn AudioDecoder>>,
}

impl DecoderTable {
    /// In-process decoders for every supported format
    pub fn bundled() -> Self {
        let mut table = Self {
            decoders: HashMap::new(),
        };
        table.register(Box::new(Mp3Decoder));
        table.register(Box::new(WavDecoder));
        table.register(Box::new(M4aDecoder));
        table
    }

    /// External-process decoders for every supported format
    pub fn ffmpeg(config: &crate::config::FfmpegConfig) -> Self {
        let mut table = Self {
            decoders: HashMap::new(),
        };
        for format in AudioFormat::ALL {
            table.register(Box::new(FfmpegDecoder::from_config(format, config)));
        }
        table
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        match config.decoder {
            DecoderBackend::Bundled => Self::bundled(),
            DecoderBackend::Ffmpeg => Self::ffmpeg(&config.ffmpeg),
        }
    }

    /// Replaces any decoder already registered for the same format.
    pub fn register(&mut self, decoder: Box<dyn AudioDecoder>) {
        self.decoders.insert(decoder.format(), decoder);
    }

    pub fn get(&self, format: AudioFormat) -> VoiceResult<&dyn AudioDecoder> {
        self.decoders
            .get(&format)
            .map(|d| d.as_ref())
            .ok_or_else(|| VoiceError::UnsupportedFormat(format.to_string()))
    }

    pub fn decode(&self, audio: RawAudio) -> VoiceResult<DecodedAudio> {
        self.get(audio.format)?.decode(audio)
    }
}

/// Decode a whole in-memory file with one specific container reader.
///
/// The reader is constructed directly instead of probed, so bytes are never
/// reinterpreted as a container other than the declared one.
fn decode_container<R>(audio: RawAudio) -> VoiceResult<DecodedAudio>
where
    R: FormatReader + 'static,
{
    audio.ensure_not_empty()?;
    let format = audio.format;

    let mss = MediaSourceStream::new(Box::new(Cursor::new(audio.bytes)), Default::default());

    let mut format_reader = R::try_new(mss, &FormatOptions::default())
        .map_err(|e| VoiceError::Decode(format!("Not a valid {} stream: {}", format, e)))?;

    let track = format_reader
        .default_track()
        .ok_or_else(|| VoiceError::Decode(format!("No audio tracks found in {} stream", format)))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| VoiceError::Decode(format!("Failed to create {} decoder: {}", format, e)))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // End of stream
            }
            Err(e) => {
                return Err(VoiceError::Decode(format!("Error reading packet: {}", e)));
            }
        };

        // Skip packets from other tracks
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                // Skip corrupted packets, continue decoding
                warn!("Skipping corrupted {} packet: {}", format, msg);
                continue;
            }
            Err(e) => return Err(VoiceError::Decode(format!("Decode error: {}", e))),
        };

        sample_rate.get_or_insert(decoded.spec().rate);
        let buffer_channels = decoded.spec().channels.count();
        match channels {
            None => channels = Some(buffer_channels),
            Some(c) if c != buffer_channels => {
                return Err(VoiceError::Decode(format!(
                    "Channel count changed mid-stream: {} -> {}",
                    c, buffer_channels
                )));
            }
            Some(_) => {}
        }

        append_interleaved(&decoded, &mut samples);
    }

    let channels = channels.unwrap_or(0);
    let sample_rate = sample_rate
        .ok_or_else(|| VoiceError::Decode(format!("{} stream has no sample rate", format)))?;

    if samples.is_empty() || channels == 0 {
        return Err(VoiceError::EmptyResult);
    }

    debug!(
        "Decoded {} stream: {} frames, {} channel(s), {}Hz",
        format,
        samples.len() / channels,
        channels,
        sample_rate
    );

    Ok(DecodedAudio {
        samples,
        channels,
        sample_rate,
    })
}

/// Append a decoded buffer to `out` as interleaved f32.
fn append_interleaved(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buf) => interleave_f32(buf, out),
        AudioBufferRef::U8(buf) => interleave_generic(buf, out),
        AudioBufferRef::U16(buf) => interleave_generic(buf, out),
        AudioBufferRef::U24(buf) => interleave_generic(buf, out),
        AudioBufferRef::U32(buf) => interleave_generic(buf, out),
        AudioBufferRef::S8(buf) => interleave_generic(buf, out),
        AudioBufferRef::S16(buf) => interleave_generic(buf, out),
        AudioBufferRef::S24(buf) => interleave_generic(buf, out),
        AudioBufferRef::S32(buf) => interleave_generic(buf, out),
        AudioBufferRef::F64(buf) => interleave_generic(buf, out),
    }
}

fn interleave_f32(buf: &AudioBuffer<f32>, out: &mut Vec<f32>) {
    let channels = buf.spec().channels.count();
    let frames = buf.frames();

    if channels == 1 {
        out.extend_from_slice(buf.chan(0));
        return;
    }

    out.reserve(frames * channels);
    for i in 0..frames {
        for ch in 0..channels {
            out.push(buf.chan(ch)[i]);
        }
    }
}

/// Generic converter: any sample format to interleaved f32
fn interleave_generic<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample,
    f32: FromSample<S>,
{
    let channels = buf.spec().channels.count();
    let frames = buf.frames();

    out.reserve(frames * channels);
    for i in 0..frames {
        for ch in 0..channels {
            out.push(f32::from_sample(buf.chan(ch)[i]));
        }
    }
}
