//! Analysis windows

use std::f32::consts::PI;

/// Hann window of the given length
pub fn hann(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let phase = 2.0 * PI * i as f32 / len as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hann_endpoints_and_peak() {
        let w = hann(1024);
        assert_relative_eq!(w[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(w[512], 1.0, epsilon = 1e-6);
        // Coherent gain of a Hann window is 0.5
        let mean: f32 = w.iter().sum::<f32>() / w.len() as f32;
        assert_relative_eq!(mean, 0.5, epsilon = 1e-3);
    }
}
