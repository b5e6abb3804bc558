//! Psychoacoustic frequency-masking detector
//!
//! Per STFT frame: find spectral peaks, then test every peak pair in
//! the bark domain against the spreading function. A peak buries
//! another when the spread masking threshold sits more than 6 dB above
//! the victim's level. Temporally adjacent candidates at the same
//! frequencies merge into one issue.

use lacquer_core::{bark_scale, linear_to_db};
use lacquer_dsp::{bin_to_hz, MagnitudeFrames};
use log::warn;

use crate::issue::{AnalysisIssue, FrequencyRange, IssueDetail, Severity, TimeRange};
use crate::{AnalysisConfig, AnalysisError, CancelToken};

/// Peaks must clear the neighbour average by this much
const PEAK_PROMINENCE_DB: f32 = 6.0;

/// Absolute floor for peaks worth considering
const PEAK_FLOOR_DB: f32 = -60.0;

/// Minimum masking ratio that produces a candidate
const MIN_RATIO_DB: f32 = 6.0;

/// Spread slopes, dB per bark
const SPREAD_BELOW: f32 = -27.0;
const SPREAD_ABOVE: f32 = -12.0;

/// Self-masking offset inside one tenth of a bark
const SELF_MASK_DB: f32 = 6.0;

/// Frequency window for merging adjacent candidates
const MERGE_HZ: f32 = 100.0;

struct SpectralPeak {
    bin: usize,
    level_db: f32,
    prominence_db: f32,
}

struct Candidate {
    masker_hz: f32,
    masked_hz: f32,
    ratio_db: f32,
    prominence_db: f32,
    time_range: TimeRange,
}

pub(crate) fn detect(
    mono: &[f32],
    sample_rate: f64,
    config: &AnalysisConfig,
    cancel: &CancelToken,
) -> Result<Vec<AnalysisIssue>, AnalysisError> {
    let window_len = config.fft_size;
    let hop = ((window_len as f32 * config.hop_fraction) as usize).max(1);
    let frames = MagnitudeFrames::new(mono, window_len, hop);
    let fft_size = frames.fft_size();

    let mut warned_bad_frame = false;
    let mut candidates: Vec<Candidate> = Vec::new();

    for frame in frames {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        if frame.magnitudes.iter().any(|m| !m.is_finite()) {
            if !warned_bad_frame {
                warned_bad_frame = true;
                warn!("masking: skipping frame with non-finite spectrum");
            }
            continue;
        }

        let db: Vec<f32> = frame.magnitudes.iter().map(|&m| linear_to_db(m)).collect();
        let peaks = find_peaks(&db);

        let time_range = TimeRange::new(
            frame.start_sample as f32 / sample_rate as f32,
            (frame.start_sample + frame.span) as f32 / sample_rate as f32,
        );

        for masker in &peaks {
            let masker_hz = bin_to_hz(masker.bin, sample_rate, fft_size);
            let masker_bark = bark_scale(masker_hz);

            for maskee in &peaks {
                if maskee.bin == masker.bin {
                    continue;
                }
                let maskee_hz = bin_to_hz(maskee.bin, sample_rate, fft_size);
                let delta_bark = bark_scale(maskee_hz) - masker_bark;

                let threshold = if delta_bark.abs() < 0.1 {
                    masker.level_db - SELF_MASK_DB
                } else if delta_bark < 0.0 {
                    masker.level_db + SPREAD_BELOW * delta_bark.abs()
                } else {
                    masker.level_db + SPREAD_ABOVE * delta_bark
                };

                let ratio = threshold - maskee.level_db;
                if ratio > MIN_RATIO_DB {
                    candidates.push(Candidate {
                        masker_hz,
                        masked_hz: maskee_hz,
                        ratio_db: ratio,
                        prominence_db: masker.prominence_db,
                        time_range,
                    });
                }
            }
        }
    }

    Ok(merge_candidates(candidates, config))
}

/// Local maxima at least 6 dB above the four-neighbour average and
/// above the absolute floor
fn find_peaks(db: &[f32]) -> Vec<SpectralPeak> {
    let mut peaks = Vec::new();
    for bin in 2..db.len().saturating_sub(2) {
        let level = db[bin];
        if level < PEAK_FLOOR_DB {
            continue;
        }
        if level <= db[bin - 1] || level <= db[bin + 1] {
            continue;
        }
        let neighbour_avg = (db[bin - 2] + db[bin - 1] + db[bin + 1] + db[bin + 2]) / 4.0;
        let prominence = level - neighbour_avg;
        if prominence >= PEAK_PROMINENCE_DB {
            peaks.push(SpectralPeak {
                bin,
                level_db: level,
                prominence_db: prominence,
            });
        }
    }
    peaks
}

fn severity_for_ratio(ratio_db: f32) -> Severity {
    if ratio_db >= 20.0 {
        Severity::Critical
    } else if ratio_db >= 15.0 {
        Severity::High
    } else if ratio_db >= 10.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn confidence_for(ratio_db: f32, prominence_db: f32) -> f32 {
    0.7 * (ratio_db / 20.0).min(1.0) + 0.3 * (prominence_db / 12.0).min(1.0)
}

/// Merge temporally adjacent candidates with both frequencies within
/// the merge window, keeping the worst ratio and the extended range.
fn merge_candidates(candidates: Vec<Candidate>, config: &AnalysisConfig) -> Vec<AnalysisIssue> {
    let mut merged: Vec<Candidate> = Vec::new();

    for cand in candidates {
        let slot = merged.iter_mut().find(|m| {
            m.time_range.overlaps(&cand.time_range)
                && (m.masker_hz - cand.masker_hz).abs() <= MERGE_HZ
                && (m.masked_hz - cand.masked_hz).abs() <= MERGE_HZ
        });
        match slot {
            Some(m) => {
                m.time_range = m.time_range.union(&cand.time_range);
                if cand.ratio_db > m.ratio_db {
                    m.ratio_db = cand.ratio_db;
                    m.prominence_db = cand.prominence_db;
                    m.masker_hz = cand.masker_hz;
                    m.masked_hz = cand.masked_hz;
                }
            }
            None => merged.push(cand),
        }
    }

    merged
        .into_iter()
        .filter_map(|m| {
            let severity = severity_for_ratio(m.ratio_db);
            let confidence = confidence_for(m.ratio_db, m.prominence_db);
            if confidence < config.min_confidence || severity < config.min_severity {
                return None;
            }
            Some(AnalysisIssue {
                severity,
                confidence,
                frequency_range: FrequencyRange {
                    low_hz: m.masker_hz.min(m.masked_hz),
                    high_hz: m.masker_hz.max(m.masked_hz),
                },
                time_range: m.time_range,
                description: format!(
                    "Content at {:.0} Hz is masked by {:.0} Hz ({:.1} dB over the masking threshold)",
                    m.masked_hz, m.masker_hz, m.ratio_db
                ),
                suggestion: format!(
                    "Carve space around {:.0} Hz on the masking element, or separate the parts in level or time",
                    m.masked_hz
                ),
                detail: IssueDetail::Masking {
                    masker_hz: m.masker_hz,
                    masked_hz: m.masked_hz,
                    ratio_db: m.ratio_db,
                },
            })
        })
        .collect()
}
