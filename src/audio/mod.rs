// Audio processing (DSP)
// Modules: format, decoder, ffmpeg, normalize, pitch, tempo, energy

pub mod decoder;
pub mod energy;
pub mod ffmpeg;
pub mod format;
pub mod normalize;
pub mod pitch;
pub mod tempo;
