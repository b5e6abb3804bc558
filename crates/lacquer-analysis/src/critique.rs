//! Critique generator
//!
//! Folds the detected issues and the numeric metrics into a scored mix
//! critique: five component scores clamped to [0, 100], a weighted
//! overall score, strengths/improvements text, the top priority issues
//! and an estimated improvement headroom.

use serde::{Deserialize, Serialize};

use crate::issue::{AnalysisIssue, IssueCategory, IssueDetail};
use crate::AnalysisMetrics;

/// Component weights of the overall score
const WEIGHT_FREQUENCY: f32 = 0.25;
const WEIGHT_DYNAMICS: f32 = 0.20;
const WEIGHT_STEREO: f32 = 0.20;
const WEIGHT_CLARITY: f32 = 0.20;
const WEIGHT_LOUDNESS: f32 = 0.15;

/// Per-category component scores, each in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub frequency: f32,
    pub dynamics: f32,
    pub stereo: f32,
    pub clarity: f32,
    pub loudness: f32,
}

/// The aggregated, scored critique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixCritique {
    /// Weighted overall score, rounded to the nearest integer
    pub overall: u32,
    pub breakdown: ScoreBreakdown,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    /// Top five issues by severity weight, then confidence
    pub priority_issues: Vec<AnalysisIssue>,
    /// Expected score gain if the reported issues were fixed
    pub estimated_improvement: f32,
}

pub(crate) fn generate(
    issues: &[AnalysisIssue],
    metrics: &AnalysisMetrics,
    dynamics_recommendation: &str,
) -> MixCritique {
    let breakdown = ScoreBreakdown {
        frequency: frequency_score(issues),
        dynamics: dynamics_score(metrics.crest_factor_db),
        stereo: stereo_score(issues, metrics.overall_correlation),
        clarity: clarity_score(issues),
        loudness: loudness_score(metrics.loudness_lufs, metrics.true_peak_db),
    };

    let weighted = WEIGHT_FREQUENCY * breakdown.frequency
        + WEIGHT_DYNAMICS * breakdown.dynamics
        + WEIGHT_STEREO * breakdown.stereo
        + WEIGHT_CLARITY * breakdown.clarity
        + WEIGHT_LOUDNESS * breakdown.loudness;
    let overall = weighted.round() as u32;

    let strengths = strengths_for(&breakdown);
    let improvements = improvements_for(&breakdown, metrics, dynamics_recommendation);

    let mut priority: Vec<AnalysisIssue> = issues.to_vec();
    priority.sort_by(|a, b| {
        b.severity_weight()
            .partial_cmp(&a.severity_weight())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
    priority.truncate(5);

    let issue_potential: f32 = issues
        .iter()
        .map(|i| i.severity_weight() * i.confidence * 2.0)
        .sum();
    let estimated_improvement = issue_potential.min(100.0 - overall as f32);

    MixCritique {
        overall,
        breakdown,
        strengths,
        improvements,
        priority_issues: priority,
        estimated_improvement,
    }
}

fn frequency_score(issues: &[AnalysisIssue]) -> f32 {
    let penalty: f32 = issues
        .iter()
        .filter_map(|i| match &i.detail {
            IssueDetail::Tonal { deviation_db, .. } => {
                Some(i.severity_weight() * deviation_db.abs() * 0.5)
            }
            _ => None,
        })
        .sum();
    (100.0 - penalty).clamp(0.0, 100.0)
}

fn dynamics_score(crest_db: f32) -> f32 {
    let score = if (8.0..=12.0).contains(&crest_db) {
        100.0
    } else if crest_db < 8.0 {
        100.0 - 8.0 * (8.0 - crest_db)
    } else {
        100.0 - 3.0 * (crest_db - 12.0)
    };
    score.clamp(0.0, 100.0)
}

fn stereo_score(issues: &[AnalysisIssue], correlation: f32) -> f32 {
    let baseline = if correlation < 0.0 {
        30.0 - 30.0 * correlation
    } else if correlation < 0.5 {
        60.0 + 40.0 * correlation
    } else {
        80.0 + 40.0 * (correlation - 0.5)
    };

    let penalty: f32 = issues
        .iter()
        .filter(|i| i.category() == IssueCategory::Phase)
        .map(|i| 5.0 * i.severity_weight())
        .sum();

    (baseline - penalty).clamp(0.0, 100.0)
}

fn clarity_score(issues: &[AnalysisIssue]) -> f32 {
    let penalty: f32 = issues
        .iter()
        .filter_map(|i| match &i.detail {
            IssueDetail::Masking { ratio_db, .. } => {
                Some(i.severity_weight() * ratio_db * 0.3)
            }
            _ => None,
        })
        .sum();
    (100.0 - penalty).clamp(0.0, 100.0)
}

fn loudness_score(lufs: f32, true_peak_db: f32) -> f32 {
    let mut score = 100.0;
    if lufs < -23.0 {
        score -= 2.0 * (lufs.abs() - 23.0);
    } else if lufs > -6.0 {
        score -= 3.0 * (lufs + 6.0);
    }
    if true_peak_db > -1.0 {
        score -= 10.0 * (true_peak_db + 1.0);
    }
    score.clamp(0.0, 100.0)
}

fn strengths_for(b: &ScoreBreakdown) -> Vec<String> {
    let mut out = Vec::new();
    if b.frequency >= 80.0 {
        out.push("Well-balanced frequency response".to_string());
    }
    if b.dynamics >= 80.0 {
        out.push("Healthy dynamic range".to_string());
    }
    if b.stereo >= 80.0 {
        out.push("Stable, mono-compatible stereo image".to_string());
    }
    if b.clarity >= 85.0 {
        out.push("Clear mix with little spectral masking".to_string());
    }
    if b.loudness >= 80.0 {
        out.push("Loudness sits in a comfortable delivery range".to_string());
    }
    out
}

fn improvements_for(
    b: &ScoreBreakdown,
    metrics: &AnalysisMetrics,
    dynamics_recommendation: &str,
) -> Vec<String> {
    let mut out = Vec::new();
    if metrics.crest_factor_db < 6.0 || metrics.crest_factor_db > 15.0 {
        out.push(dynamics_recommendation.to_string());
    }
    if b.frequency < 60.0 {
        out.push(
            "Rebalance the tonal spectrum; several bands deviate strongly from the reference"
                .to_string(),
        );
    }
    if b.stereo < 60.0 {
        out.push(
            "Resolve phase problems between the channels and verify mono compatibility"
                .to_string(),
        );
    }
    if b.clarity < 60.0 {
        out.push("Reduce frequency masking; carve competing elements apart with EQ".to_string());
    }
    if b.loudness < 60.0 {
        out.push(
            "Revisit the loudness target; the master sits far from common delivery levels"
                .to_string(),
        );
    }
    out
}
