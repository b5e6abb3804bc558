//! Tonal-balance analyser
//!
//! Averages the magnitude spectrum across all frames, measures RMS
//! level per band, and compares against a reference curve interpolated
//! linearly in log-frequency at the band centre. Band levels and the
//! reference are both mean-normalized first: raw STFT magnitudes carry
//! an arbitrary level offset, so only the relative balance is
//! meaningful. Deviations beyond 3 dB raise excessive/deficient issues.

use lacquer_core::linear_to_db;
use lacquer_dsp::{bin_to_hz, MagnitudeFrames};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::bands::{BAND_COUNT, BANDS};
use crate::issue::{AnalysisIssue, FrequencyRange, IssueDetail, Severity, TimeRange, TonalKind};
use crate::{AnalysisConfig, AnalysisError, CancelToken};

/// Deviation that starts raising issues
const DEVIATION_THRESHOLD_DB: f32 = 3.0;

/// Tonal reference curve selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReferenceCurve {
    /// ITU-R BS.1770-4 K-weighting response
    #[default]
    KWeighting,
    /// 80-phon equal-loudness contour
    FletcherMunson,
    /// No tilt
    Flat,
}

/// K-weighting pre-filter response (high shelf + RLB high-pass),
/// normalized to 0 dB at 1 kHz
const K_WEIGHTING_TABLE: [(f32, f32); 15] = [
    (20.0, -10.4),
    (30.0, -6.3),
    (40.0, -4.0),
    (60.0, -1.9),
    (100.0, -0.7),
    (200.0, -0.2),
    (500.0, 0.0),
    (1000.0, 0.0),
    (2000.0, 0.6),
    (3000.0, 1.4),
    (5000.0, 2.6),
    (8000.0, 3.4),
    (10000.0, 3.6),
    (16000.0, 3.9),
    (20000.0, 4.0),
];

/// 80-phon equal-loudness contour relative to 1 kHz
const FLETCHER_MUNSON_TABLE: [(f32, f32); 13] = [
    (20.0, 38.0),
    (40.0, 24.0),
    (80.0, 15.0),
    (155.0, 9.0),
    (375.0, 4.0),
    (1000.0, 0.0),
    (2000.0, 1.0),
    (2800.0, -2.0),
    (5000.0, -1.0),
    (8000.0, 6.0),
    (10000.0, 9.0),
    (16000.0, 15.0),
    (20000.0, 20.0),
];

impl ReferenceCurve {
    /// Reference level at `freq_hz`, interpolated linearly in
    /// log-frequency between table points
    pub fn level_db(self, freq_hz: f32) -> f32 {
        let table: &[(f32, f32)] = match self {
            ReferenceCurve::Flat => return 0.0,
            ReferenceCurve::KWeighting => &K_WEIGHTING_TABLE,
            ReferenceCurve::FletcherMunson => &FLETCHER_MUNSON_TABLE,
        };

        let freq = freq_hz.clamp(table[0].0, table[table.len() - 1].0);
        let log_f = freq.log10();

        for pair in table.windows(2) {
            let (f0, db0) = pair[0];
            let (f1, db1) = pair[1];
            if freq <= f1 {
                let t = (log_f - f0.log10()) / (f1.log10() - f0.log10());
                return db0 + (db1 - db0) * t;
            }
        }
        table[table.len() - 1].1
    }
}

/// Band levels plus any balance issues
pub(crate) struct TonalAnalysis {
    pub issues: Vec<AnalysisIssue>,
    /// Raw per-band RMS magnitude in dB
    pub band_energy_db: [f32; BAND_COUNT],
}

pub(crate) fn analyze(
    mono: &[f32],
    sample_rate: f64,
    config: &AnalysisConfig,
    cancel: &CancelToken,
) -> Result<TonalAnalysis, AnalysisError> {
    let window_len = config.fft_size;
    let hop = ((window_len as f32 * config.hop_fraction) as usize).max(1);
    let frames = MagnitudeFrames::new(mono, window_len, hop);
    let fft_size = frames.fft_size();
    let bins = fft_size / 2;

    // Average magnitude spectrum across all frames
    let mut avg = vec![0.0f64; bins];
    let mut frame_count = 0usize;
    let mut warned_bad_frame = false;

    for frame in frames {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        if frame.magnitudes.iter().any(|m| !m.is_finite()) {
            if !warned_bad_frame {
                warned_bad_frame = true;
                warn!("tonal: skipping frame with non-finite spectrum");
            }
            continue;
        }
        for (acc, &m) in avg.iter_mut().zip(frame.magnitudes.iter()) {
            *acc += m as f64;
        }
        frame_count += 1;
    }

    let mut band_energy_db = [-200.0f32; BAND_COUNT];
    if frame_count == 0 {
        return Ok(TonalAnalysis {
            issues: Vec::new(),
            band_energy_db,
        });
    }
    for acc in avg.iter_mut() {
        *acc /= frame_count as f64;
    }

    // RMS magnitude per band
    for (i, band) in BANDS.iter().enumerate() {
        let mut sum_sq = 0.0f64;
        let mut count = 0usize;
        for (bin, &mag) in avg.iter().enumerate() {
            let freq = bin_to_hz(bin, sample_rate, fft_size);
            if freq >= band.low_hz && freq < band.high_hz {
                sum_sq += mag * mag;
                count += 1;
            }
        }
        if count > 0 {
            band_energy_db[i] = linear_to_db((sum_sq / count as f64).sqrt() as f32);
        }
    }

    let issues = balance_issues(&band_energy_db, mono.len(), sample_rate, config);
    Ok(TonalAnalysis {
        issues,
        band_energy_db,
    })
}

fn severity_for(deviation_abs: f32) -> Severity {
    if deviation_abs >= 15.0 {
        Severity::Critical
    } else if deviation_abs >= 10.0 {
        Severity::High
    } else if deviation_abs >= 6.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn balance_issues(
    band_energy_db: &[f32; BAND_COUNT],
    buffer_len: usize,
    sample_rate: f64,
    config: &AnalysisConfig,
) -> Vec<AnalysisIssue> {
    // Mean-normalize both sides: only relative balance matters
    let band_mean = band_energy_db.iter().sum::<f32>() / BAND_COUNT as f32;
    let reference: Vec<f32> = BANDS
        .iter()
        .map(|b| config.reference_curve.level_db(b.center_hz))
        .collect();
    let ref_mean = reference.iter().sum::<f32>() / BAND_COUNT as f32;

    let time_range = TimeRange::new(0.0, buffer_len as f32 / sample_rate as f32);
    let mut issues = Vec::new();

    for (i, band) in BANDS.iter().enumerate() {
        let energy_rel = band_energy_db[i] - band_mean;
        let expected_rel = reference[i] - ref_mean;
        let deviation = energy_rel - expected_rel;

        if deviation.abs() <= DEVIATION_THRESHOLD_DB {
            continue;
        }

        let severity = severity_for(deviation.abs());
        let confidence = (0.5 + deviation.abs() / 20.0).min(1.0);
        if confidence < config.min_confidence || severity < config.min_severity {
            continue;
        }

        let kind = if deviation > 0.0 {
            TonalKind::Excessive
        } else {
            TonalKind::Deficient
        };
        let adjective = match kind {
            TonalKind::Excessive => "heavy",
            TonalKind::Deficient => "light",
        };

        issues.push(AnalysisIssue {
            severity,
            confidence,
            frequency_range: FrequencyRange {
                low_hz: band.low_hz,
                high_hz: band.high_hz,
            },
            time_range,
            description: format!(
                "The {} band is {:.1} dB {} against the reference balance",
                band.name,
                deviation.abs(),
                adjective
            ),
            suggestion: match kind {
                TonalKind::Excessive => format!(
                    "Cut around {:.0} Hz or rebalance the elements living there",
                    band.center_hz
                ),
                TonalKind::Deficient => format!(
                    "Lift around {:.0} Hz or bring up the elements living there",
                    band.center_hz
                ),
            },
            detail: IssueDetail::Tonal {
                band: band.name.to_string(),
                energy_db: energy_rel,
                expected_db: expected_rel,
                deviation_db: deviation,
                kind,
            },
        });
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SR: f64 = 48000.0;

    #[test]
    fn test_reference_curve_anchor_points() {
        assert_eq!(ReferenceCurve::Flat.level_db(440.0), 0.0);
        assert!(ReferenceCurve::KWeighting.level_db(1000.0).abs() < 0.1);
        // The K curve rolls off the lows and lifts the highs
        assert!(ReferenceCurve::KWeighting.level_db(40.0) < -3.0);
        assert!(ReferenceCurve::KWeighting.level_db(10000.0) > 3.0);
        // 80-phon contour expects much more low end
        assert!(ReferenceCurve::FletcherMunson.level_db(40.0) > 20.0);
    }

    #[test]
    fn test_interpolation_is_monotone_between_points() {
        let a = ReferenceCurve::KWeighting.level_db(2000.0);
        let b = ReferenceCurve::KWeighting.level_db(2500.0);
        let c = ReferenceCurve::KWeighting.level_db(3000.0);
        assert!(a <= b && b <= c);
    }

    #[test]
    fn test_bass_heavy_material_flags_excessive_low_end() {
        // Strong 50 Hz fundamental with a whisper of highs, flat reference
        let audio: Vec<f32> = (0..SR as usize * 2)
            .map(|i| {
                let t = i as f32 / SR as f32;
                (2.0 * PI * 50.0 * t).sin() * 0.7 + (2.0 * PI * 5000.0 * t).sin() * 0.001
            })
            .collect();

        let config = AnalysisConfig {
            reference_curve: ReferenceCurve::Flat,
            ..Default::default()
        };
        let analysis = analyze(&audio, SR, &config, &CancelToken::new()).unwrap();

        let excessive_sub = analysis.issues.iter().any(|i| {
            matches!(
                &i.detail,
                IssueDetail::Tonal { band, kind, .. }
                    if band == "sub-bass" && *kind == TonalKind::Excessive
            )
        });
        assert!(
            excessive_sub,
            "no excessive sub-bass issue: {:?}",
            analysis.issues
        );
    }

    #[test]
    fn test_band_energy_ordering_matches_content() {
        let audio: Vec<f32> = (0..SR as usize)
            .map(|i| (2.0 * PI * 1000.0 * i as f32 / SR as f32).sin() * 0.5)
            .collect();
        let analysis = analyze(
            &audio,
            SR,
            &AnalysisConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();

        // Mid band (carrying the tone) must dominate every other band
        let mid = analysis.band_energy_db[3];
        for (i, &db) in analysis.band_energy_db.iter().enumerate() {
            if i != 3 {
                assert!(mid > db, "band {i} at {db} dB not below mid at {mid} dB");
            }
        }
    }

    #[test]
    fn test_cancel_between_frames() {
        let audio = vec![0.1f32; SR as usize];
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            analyze(&audio, SR, &AnalysisConfig::default(), &cancel),
            Err(AnalysisError::Cancelled)
        ));
    }
}
