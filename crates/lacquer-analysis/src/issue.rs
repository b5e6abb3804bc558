//! Analysis issue vocabulary

use serde::{Deserialize, Serialize};

/// Issue severity, ordered from least to most severe
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Scoring weight
    pub fn weight(self) -> f32 {
        match self {
            Severity::Critical => 4.0,
            Severity::High => 3.0,
            Severity::Medium => 2.0,
            Severity::Low => 1.0,
        }
    }
}

/// Issue category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueCategory {
    Masking,
    Phase,
    Tonal,
}

/// A span of the analysed buffer, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_secs: f32,
    pub end_secs: f32,
}

impl TimeRange {
    pub fn new(start_secs: f32, end_secs: f32) -> Self {
        Self {
            start_secs,
            end_secs,
        }
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start_secs <= other.end_secs && other.start_secs <= self.end_secs
    }

    /// Smallest range covering both
    pub fn union(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start_secs: self.start_secs.min(other.start_secs),
            end_secs: self.end_secs.max(other.end_secs),
        }
    }
}

/// Frequency span an issue applies to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRange {
    pub low_hz: f32,
    pub high_hz: f32,
}

/// Direction of a tonal-balance deviation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TonalKind {
    Excessive,
    Deficient,
}

/// Category-specific issue payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IssueDetail {
    Masking {
        masker_hz: f32,
        masked_hz: f32,
        ratio_db: f32,
    },
    Phase {
        /// Band correlation in [-1, 1]
        correlation: f32,
        /// Band centre
        frequency_hz: f32,
        mono_compatible: bool,
    },
    Tonal {
        band: String,
        energy_db: f32,
        expected_db: f32,
        deviation_db: f32,
        kind: TonalKind,
    },
}

/// One detected mix problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisIssue {
    pub severity: Severity,
    /// Detector confidence in [0, 1]
    pub confidence: f32,
    pub frequency_range: FrequencyRange,
    pub time_range: TimeRange,
    pub description: String,
    pub suggestion: String,
    pub detail: IssueDetail,
}

impl AnalysisIssue {
    pub fn category(&self) -> IssueCategory {
        match self.detail {
            IssueDetail::Masking { .. } => IssueCategory::Masking,
            IssueDetail::Phase { .. } => IssueCategory::Phase,
            IssueDetail::Tonal { .. } => IssueCategory::Tonal,
        }
    }

    #[inline]
    pub fn severity_weight(&self) -> f32 {
        self.severity.weight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order_and_weights() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(Severity::Critical.weight(), 4.0);
        assert_eq!(Severity::Low.weight(), 1.0);
    }

    #[test]
    fn test_time_range_overlap_and_union() {
        let a = TimeRange::new(0.0, 1.0);
        let b = TimeRange::new(0.5, 2.0);
        let c = TimeRange::new(3.0, 4.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));

        let u = a.union(&b);
        assert_eq!(u.start_secs, 0.0);
        assert_eq!(u.end_secs, 2.0);
    }
}
