use super::normalize::CanonicalWaveform;

/// Mean squared amplitude over the whole waveform.
pub fn detect_energy(wave: &CanonicalWaveform) -> f64 {
    mean_square(wave.samples())
}

/// `sum(x²) / len`, accumulated in f64. Zero for an empty slice.
pub fn mean_square(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    sum / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_signal() {
        assert!((mean_square(&[0.5; 1000]) - 0.25).abs() < 1e-12);
        assert!((mean_square(&[-0.125; 10]) - 0.015625).abs() < 1e-12);
    }

    #[test]
    fn test_full_scale_sine_is_half() {
        let samples: Vec<f32> = (0..22050)
            .map(|i| (2.0 * std::f32::consts::PI * 441.0 * i as f32 / 22050.0).sin())
            .collect();
        assert!((mean_square(&samples) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_never_negative() {
        let signals: [&[f32]; 4] = [&[0.0], &[-1.0, 1.0], &[1e-20, -1e-20], &[-0.75, -0.25, -0.5]];
        for samples in signals {
            assert!(mean_square(samples) >= 0.0);
        }
    }

    #[test]
    fn test_waveform_energy() {
        let wave = CanonicalWaveform::new(vec![0.1; 110_250], 22050).unwrap();
        assert!((detect_energy(&wave) - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_empty_slice_is_zero() {
        assert_eq!(mean_square(&[]), 0.0);
    }
}
