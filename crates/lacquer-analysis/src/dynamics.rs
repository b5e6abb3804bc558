//! Dynamic-range and loudness metrics
//!
//! Whole-buffer peak, RMS and crest factor, plus the loudness and
//! true-peak proxies (sample-domain; a conforming upgrade would swap in
//! K-weighted gating and oversampled inter-sample detection without
//! changing this interface). Also the stereo width/balance numbers.

use lacquer_core::{linear_to_db, DB_EPSILON};

/// Whole-buffer dynamics numbers
#[derive(Debug, Clone)]
pub(crate) struct DynamicsAnalysis {
    pub peak: f32,
    pub rms: f32,
    pub crest_factor_db: f32,
    /// Labelled LUFS-integrated; currently the RMS proxy
    pub loudness_lufs: f32,
    /// Sample-peak proxy
    pub true_peak_db: f32,
    pub recommendation: String,
}

pub(crate) fn analyze(mono: &[f32]) -> DynamicsAnalysis {
    let mut peak = 0.0f32;
    let mut sum_sq = 0.0f64;
    let mut count = 0usize;

    for &s in mono {
        if !s.is_finite() {
            continue;
        }
        peak = peak.max(s.abs());
        sum_sq += (s as f64) * (s as f64);
        count += 1;
    }

    let rms = if count > 0 {
        (sum_sq / count as f64).sqrt() as f32
    } else {
        0.0
    };

    let crest_factor_db = if rms > DB_EPSILON {
        20.0 * (peak / rms).log10()
    } else {
        0.0
    };

    DynamicsAnalysis {
        peak,
        rms,
        crest_factor_db,
        loudness_lufs: linear_to_db(rms),
        true_peak_db: linear_to_db(peak),
        recommendation: recommendation_for(crest_factor_db),
    }
}

/// Crest-factor reading, banded
pub(crate) fn recommendation_for(crest_db: f32) -> String {
    if crest_db < 6.0 {
        "The dynamic range is very limited; the mix reads as over-compressed. Ease off bus \
         compression and limiting."
            .to_string()
    } else if crest_db < 10.0 {
        "Modern, loudness-forward dynamics; typical for contemporary masters.".to_string()
    } else if crest_db < 15.0 {
        "Natural dynamics with a healthy crest factor.".to_string()
    } else {
        "Very wide dynamics; consider gentle compression if a louder master is wanted."
            .to_string()
    }
}

/// Stereo width (side/mid energy ratio) and L/R balance
pub(crate) fn stereo_stats(left: &[f32], right: &[f32]) -> (f32, f32) {
    let mut mid_energy = 0.0f64;
    let mut side_energy = 0.0f64;
    let mut l_energy = 0.0f64;
    let mut r_energy = 0.0f64;

    for (&l, &r) in left.iter().zip(right.iter()) {
        if !l.is_finite() || !r.is_finite() {
            continue;
        }
        let l = l as f64;
        let r = r as f64;
        let mid = (l + r) * 0.5;
        let side = (l - r) * 0.5;
        mid_energy += mid * mid;
        side_energy += side * side;
        l_energy += l * l;
        r_energy += r * r;
    }

    let width = if mid_energy > 1e-12 {
        (side_energy / mid_energy).sqrt() as f32
    } else {
        0.0
    };
    let balance = if l_energy + r_energy > 1e-12 {
        ((l_energy - r_energy) / (l_energy + r_energy)) as f32
    } else {
        0.0
    };

    (width, balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    #[test]
    fn test_sine_crest_factor() {
        let sine: Vec<f32> = (0..48000)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / 48000.0).sin() * 0.5)
            .collect();
        let d = analyze(&sine);
        // Sine crest factor is 3.01 dB
        assert_relative_eq!(d.crest_factor_db, 3.01, epsilon = 0.1);
        assert_relative_eq!(d.peak, 0.5, epsilon = 1e-3);
        assert!(d.recommendation.contains("very limited"));
    }

    #[test]
    fn test_silence() {
        let d = analyze(&vec![0.0f32; 1000]);
        assert_eq!(d.crest_factor_db, 0.0);
        assert!(d.loudness_lufs <= -199.0);
    }

    #[test]
    fn test_loudness_proxy_tracks_rms() {
        let dc = vec![0.1f32; 4800];
        let d = analyze(&dc);
        assert_relative_eq!(d.loudness_lufs, -20.0, epsilon = 0.1);
        assert_relative_eq!(d.true_peak_db, -20.0, epsilon = 0.1);
    }

    #[test]
    fn test_recommendation_bands() {
        assert!(recommendation_for(4.0).contains("dynamic range is very limited"));
        assert!(recommendation_for(8.0).contains("Modern"));
        assert!(recommendation_for(12.0).contains("Natural"));
        assert!(recommendation_for(18.0).contains("gentle compression"));
    }

    #[test]
    fn test_stereo_stats() {
        let l: Vec<f32> = (0..4800)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / 48000.0).sin() * 0.5)
            .collect();

        // Identical channels: no width, centred
        let (width, balance) = stereo_stats(&l, &l.clone());
        assert!(width < 1e-3);
        assert!(balance.abs() < 1e-6);

        // Hard-panned left: all energy on one side
        let silence = vec![0.0f32; l.len()];
        let (width, balance) = stereo_stats(&l, &silence);
        assert!(width > 0.9 && width < 1.1, "width was {width}");
        assert!(balance > 0.9, "balance was {balance}");
    }
}
