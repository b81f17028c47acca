// Pitch estimation from spectral peak tracking.
//
// Algorithm overview:
// 1. Short-time Fourier transform of the canonical waveform
//    - frames of `n_fft` samples every `hop_length` samples
//    - signal zero-padded by n_fft/2 on both sides so frames are centered
//    - periodic Hann window, magnitude spectrum
// 2. In every frame, each bin that is a local maximum of the thresholded
//    spectrum (magnitude above `threshold` × the frame's peak) and lies in
//    [fmin, fmax) becomes a pitch candidate. Its frequency is refined by
//    parabolic interpolation over the neighbouring bins, and its magnitude
//    by the same parabola's peak height.
// 3. All other (bin, frame) cells hold frequency 0 and magnitude 0.
// 4. The estimate is the mean frequency of every cell whose magnitude is
//    strictly greater than the median magnitude of the whole grid; 0 Hz
//    when no cell qualifies.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use tracing::debug;

use super::normalize::CanonicalWaveform;
use crate::config::PitchConfig;

/// Pitch candidates for every (frame, bin) cell of the spectrogram.
///
/// Stored frame-major: cell `(frame, bin)` is at `frame * n_bins + bin`.
#[derive(Debug, Clone)]
pub struct PitchTrack {
    pub pitches: Vec<f32>,
    pub magnitudes: Vec<f32>,
    pub n_bins: usize,
    pub n_frames: usize,
}

impl PitchTrack {
    pub fn pitch_at(&self, frame: usize, bin: usize) -> f32 {
        self.pitches[frame * self.n_bins + bin]
    }

    pub fn magnitude_at(&self, frame: usize, bin: usize) -> f32 {
        self.magnitudes[frame * self.n_bins + bin]
    }

    /// Median magnitude over the entire grid.
    pub fn median_magnitude(&self) -> f32 {
        median(&self.magnitudes)
    }

    /// Mean frequency of the cells whose magnitude exceeds the global median.
    pub fn mean_confident_pitch(&self) -> f64 {
        if self.magnitudes.is_empty() {
            return 0.0;
        }

        let threshold = self.median_magnitude();
        let (sum, count) = self
            .pitches
            .iter()
            .zip(&self.magnitudes)
            .filter(|(_, &mag)| mag > threshold)
            .fold((0.0f64, 0usize), |(sum, count), (&pitch, _)| {
                (sum + pitch as f64, count + 1)
            });

        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }
}

/// Estimate the mean pitch of a waveform in Hz (0 if nothing qualifies).
pub fn detect_pitch(wave: &CanonicalWaveform, config: &PitchConfig) -> f64 {
    let track = pitch_track(wave.samples(), wave.sample_rate(), config);
    let pitch = track.mean_confident_pitch();
    debug!(
        "Pitch track: {} frames x {} bins, median magnitude {:.5}, pitch {:.2}Hz",
        track.n_frames,
        track.n_bins,
        track.median_magnitude(),
        pitch
    );
    pitch
}

/// Compute the full pitch-candidate grid for `samples`.
pub fn pitch_track(samples: &[f32], sample_rate: u32, config: &PitchConfig) -> PitchTrack {
    let n_fft = config.n_fft;
    let hop = config.hop_length;
    let n_bins = n_fft / 2 + 1;

    // Centered frames: pad n_fft/2 zeros on each side
    let pad = n_fft / 2;
    let mut padded = vec![0.0f32; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);
    let n_frames = 1 + (padded.len() - n_fft) / hop;

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);

    // Periodic Hann window
    let window: Vec<f32> = (0..n_fft)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / n_fft as f32).cos())
        .collect();

    let bin_hz = sample_rate as f64 / n_fft as f64;
    let in_range: Vec<bool> = (0..n_bins)
        .map(|bin| {
            let freq = bin as f64 * bin_hz;
            freq >= config.fmin && freq < config.fmax
        })
        .collect();

    let mut pitches = vec![0.0f32; n_frames * n_bins];
    let mut magnitudes = vec![0.0f32; n_frames * n_bins];

    let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
    let mut spectrum = vec![0.0f32; n_bins];
    let mut thresholded = vec![0.0f32; n_bins];

    for frame in 0..n_frames {
        let start = frame * hop;
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = Complex::new(padded[start + i] * window[i], 0.0);
        }
        fft.process(&mut buffer);

        for (bin, mag) in spectrum.iter_mut().enumerate() {
            *mag = buffer[bin].norm();
        }

        let peak = spectrum.iter().cloned().fold(0.0f32, f32::max);
        let reference = config.threshold as f32 * peak;
        for (t, &s) in thresholded.iter_mut().zip(&spectrum) {
            *t = if s > reference { s } else { 0.0 };
        }

        let row = frame * n_bins;
        for bin in 1..n_bins - 1 {
            if !in_range[bin] || !is_local_max(&thresholded, bin) {
                continue;
            }

            let (shift, skew) = parabolic_peak(spectrum[bin - 1], spectrum[bin], spectrum[bin + 1]);
            pitches[row + bin] = ((bin as f64 + shift as f64) * bin_hz) as f32;
            magnitudes[row + bin] = spectrum[bin] + skew;
        }
        // The outermost bins have no neighbour pair and keep zero shift
        let last = n_bins - 1;
        if in_range[last] && is_local_max(&thresholded, last) {
            pitches[row + last] = (last as f64 * bin_hz) as f32;
            magnitudes[row + last] = spectrum[last];
        }
    }

    PitchTrack {
        pitches,
        magnitudes,
        n_bins,
        n_frames,
    }
}

/// Strictly greater than the lower neighbour, at least the upper one.
/// Edges compare against themselves, so bin 0 is never a peak.
fn is_local_max(x: &[f32], i: usize) -> bool {
    let prev = if i == 0 { x[0] } else { x[i - 1] };
    let next = if i + 1 == x.len() { x[i] } else { x[i + 1] };
    x[i] > prev && x[i] >= next
}

/// Vertex offset (in bins) and height correction of the parabola through
/// three neighbouring magnitudes.
fn parabolic_peak(left: f32, center: f32, right: f32) -> (f32, f32) {
    let avg = 0.5 * (right - left);
    let mut curvature = 2.0 * center - right - left;
    if curvature.abs() < f32::MIN_POSITIVE {
        curvature += 1.0;
    }
    let shift = avg / curvature;
    (shift, 0.5 * avg * shift)
}

/// Median with the even-length convention of averaging the middle pair.
fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    let mid = sorted.len() / 2;
    let (lower, upper, _) = sorted.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    let upper = *upper;

    if values.len() % 2 == 1 {
        upper
    } else {
        let below = lower.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        0.5 * (below + upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, seconds: f32, amplitude: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn wave(samples: Vec<f32>) -> CanonicalWaveform {
        CanonicalWaveform::new(samples, 22050).unwrap()
    }

    #[test]
    fn test_sine_220hz() {
        let pitch = detect_pitch(&wave(sine(220.0, 22050, 5.0, 0.5)), &PitchConfig::default());
        assert!(
            (pitch - 220.0).abs() < 10.0,
            "Expected pitch ~220Hz, got {:.2}",
            pitch
        );
    }

    #[test]
    fn test_sine_440hz() {
        let pitch = detect_pitch(&wave(sine(440.0, 22050, 2.0, 0.3)), &PitchConfig::default());
        assert!(
            (pitch - 440.0).abs() < 15.0,
            "Expected pitch ~440Hz, got {:.2}",
            pitch
        );
    }

    #[test]
    fn test_higher_tone_gives_higher_pitch() {
        let config = PitchConfig::default();
        let low = detect_pitch(&wave(sine(200.0, 22050, 3.0, 0.5)), &config);
        let high = detect_pitch(&wave(sine(600.0, 22050, 3.0, 0.5)), &config);
        assert!(high > low, "600Hz tone ({:.1}) should beat 200Hz tone ({:.1})", high, low);
    }

    #[test]
    fn test_silence_has_zero_pitch() {
        let pitch = detect_pitch(&wave(vec![0.0; 22050]), &PitchConfig::default());
        assert_eq!(pitch, 0.0);
    }

    #[test]
    fn test_single_sample_is_finite() {
        let pitch = detect_pitch(&wave(vec![0.25]), &PitchConfig::default());
        assert!(pitch.is_finite());
    }

    #[test]
    fn test_grid_shape() {
        let config = PitchConfig::default();
        let track = pitch_track(&vec![0.1; 110_250], 22050, &config);
        assert_eq!(track.n_bins, 1025);
        assert_eq!(track.n_frames, 1 + 110_250 / 512);
        assert_eq!(track.pitches.len(), track.n_bins * track.n_frames);
        assert_eq!(track.magnitudes.len(), track.pitches.len());
    }

    #[test]
    fn test_candidates_only_inside_band() {
        let config = PitchConfig::default();
        let track = pitch_track(&sine(300.0, 22050, 1.0, 0.5), 22050, &config);
        for frame in 0..track.n_frames {
            for bin in 0..track.n_bins {
                let p = track.pitch_at(frame, bin);
                if track.magnitude_at(frame, bin) != 0.0 {
                    assert!(p >= 140.0 && p < 4010.0, "candidate outside band: {}", p);
                }
            }
        }
    }

    #[test]
    fn test_mean_uses_global_median() {
        // Four cells: median is 1.5, only cells with magnitude 2 and 3 count
        let track = PitchTrack {
            pitches: vec![100.0, 200.0, 300.0, 400.0],
            magnitudes: vec![0.0, 3.0, 1.0, 2.0],
            n_bins: 2,
            n_frames: 2,
        };
        assert_eq!(track.median_magnitude(), 1.5);
        assert_eq!(track.mean_confident_pitch(), 300.0);
    }

    #[test]
    fn test_no_cell_above_median_gives_zero() {
        let track = PitchTrack {
            pitches: vec![0.0, 250.0, 0.0],
            magnitudes: vec![0.7, 0.7, 0.7],
            n_bins: 3,
            n_frames: 1,
        };
        assert_eq!(track.mean_confident_pitch(), 0.0);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_local_max_edges() {
        let x = [5.0, 1.0, 3.0, 3.0];
        assert!(!is_local_max(&x, 0));
        assert!(is_local_max(&x, 2));
        assert!(!is_local_max(&x, 3));
    }

    #[test]
    fn test_parabolic_peak_symmetric() {
        let (shift, skew) = parabolic_peak(1.0, 2.0, 1.0);
        assert_eq!(shift, 0.0);
        assert_eq!(skew, 0.0);

        let (shift, _) = parabolic_peak(1.0, 2.0, 1.5);
        assert!(shift > 0.0 && shift < 0.5);
    }
}
