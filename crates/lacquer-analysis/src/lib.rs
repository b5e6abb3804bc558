//! lacquer-analysis: offline mix analysis for the Lacquer mastering core
//!
//! Consumes a decoded PCM buffer and produces a structured mix
//! critique: psychoacoustic masking issues, stereo phase-correlation
//! issues, tonal-balance deviations against a reference curve,
//! dynamic-range and loudness metrics, and an aggregated scored
//! critique.
//!
//! The pipeline is a lazy sequence of STFT frames consumed by each
//! detector; a cooperative cancellation token is polled between frames
//! and between the four analysers. Runs on a worker context, never on
//! the audio thread. Analysis is deterministic: the same buffer and
//! configuration produce a bit-identical report.

pub mod bands;
pub mod critique;
pub mod issue;

mod dynamics;
mod masking;
mod phase;
mod tonal;

pub use critique::{MixCritique, ScoreBreakdown};
pub use issue::{
    AnalysisIssue, FrequencyRange, IssueCategory, IssueDetail, Severity, TimeRange, TonalKind,
};
pub use tonal::ReferenceCurve;

use lacquer_core::SampleRate;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Analysis error type
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Cooperative cancellation was requested
    #[error("analysis cancelled")]
    Cancelled,

    /// Empty or malformed input buffer
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Cooperative cancellation token, polled between frames and analysers
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// A decoded PCM buffer: one or two channels at a supported rate
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    sample_rate_hz: u32,
    left: Vec<f32>,
    right: Option<Vec<f32>>,
}

impl PcmBuffer {
    pub fn mono(sample_rate_hz: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate_hz,
            left: samples,
            right: None,
        }
    }

    pub fn stereo(sample_rate_hz: u32, left: Vec<f32>, right: Vec<f32>) -> Self {
        Self {
            sample_rate_hz,
            left,
            right: Some(right),
        }
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn channels(&self) -> usize {
        if self.right.is_some() {
            2
        } else {
            1
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        if self.left.is_empty() {
            return Err(AnalysisError::InvalidInput("empty buffer".to_string()));
        }
        if let Some(right) = &self.right {
            if right.len() != self.left.len() {
                return Err(AnalysisError::InvalidInput(format!(
                    "channel length mismatch: {} vs {}",
                    self.left.len(),
                    right.len()
                )));
            }
        }
        SampleRate::from_hz(self.sample_rate_hz)
            .map_err(|e| AnalysisError::InvalidInput(e.to_string()))?;
        Ok(())
    }

    /// Mono sum, (L + R) / 2 for stereo material
    fn mono_sum(&self) -> Vec<f32> {
        match &self.right {
            Some(right) => self
                .left
                .iter()
                .zip(right.iter())
                .map(|(l, r)| (l + r) * 0.5)
                .collect(),
            None => self.left.clone(),
        }
    }
}

/// Analyser configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// STFT frame length (zero-padded to a power of two)
    pub fft_size: usize,
    /// Hop as a fraction of the frame length
    pub hop_fraction: f32,
    pub detect_masking: bool,
    pub detect_phase: bool,
    pub detect_tonal: bool,
    /// Issues below this confidence are dropped
    pub min_confidence: f32,
    /// Issues below this severity are dropped
    pub min_severity: Severity,
    pub reference_curve: ReferenceCurve,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 8192,
            hop_fraction: 0.25,
            detect_masking: true,
            detect_phase: true,
            detect_tonal: true,
            min_confidence: 0.6,
            min_severity: Severity::Low,
            reference_curve: ReferenceCurve::KWeighting,
        }
    }
}

impl AnalysisConfig {
    /// Normalize degenerate values to usable ones
    fn sanitized(mut self) -> Self {
        self.fft_size = self.fft_size.clamp(256, 65536);
        self.hop_fraction = self.hop_fraction.clamp(0.01, 1.0);
        self.min_confidence = self.min_confidence.clamp(0.0, 1.0);
        self
    }
}

/// Raw numeric metrics of the analysed buffer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    /// Sample peak, linear
    pub peak: f32,
    /// Whole-buffer RMS, linear
    pub rms: f32,
    pub crest_factor_db: f32,
    /// Labelled LUFS-integrated; RMS proxy in this release
    pub loudness_lufs: f32,
    /// Sample-peak proxy
    pub true_peak_db: f32,
    /// Time-domain Pearson correlation of L and R (1.0 for mono)
    pub overall_correlation: f32,
    /// Side/mid energy ratio (0 for mono)
    pub stereo_width: f32,
    /// L/R energy balance, positive when left is louder
    pub balance: f32,
    /// Per-band RMS magnitude of the average spectrum
    pub band_energy_db: [f32; bands::BAND_COUNT],
}

/// The complete analysis output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// All surviving issues, sorted by severity, confidence, frequency
    pub issues: Vec<AnalysisIssue>,
    pub metrics: AnalysisMetrics,
    pub critique: MixCritique,
}

impl AnalysisReport {
    /// Issues of one severity, in the documented order
    pub fn issues_with_severity(&self, severity: Severity) -> impl Iterator<Item = &AnalysisIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    pub fn issue_count(&self, severity: Severity) -> usize {
        self.issues_with_severity(severity).count()
    }
}

/// The offline mix analyser. Ordinary value: construct, analyse, drop.
#[derive(Debug, Clone)]
pub struct MixAnalyzer {
    config: AnalysisConfig,
}

impl MixAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config: config.sanitized(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyse a buffer to completion
    pub fn analyze(&self, buffer: &PcmBuffer) -> Result<AnalysisReport, AnalysisError> {
        self.analyze_with_cancel(buffer, &CancelToken::new())
    }

    /// Analyse with cooperative cancellation. The token is polled
    /// between STFT frames and between the four analysers.
    pub fn analyze_with_cancel(
        &self,
        buffer: &PcmBuffer,
        cancel: &CancelToken,
    ) -> Result<AnalysisReport, AnalysisError> {
        buffer.validate()?;
        let sample_rate = buffer.sample_rate_hz as f64;
        let mono = buffer.mono_sum();

        let mut issues: Vec<AnalysisIssue> = Vec::new();

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        if self.config.detect_masking {
            issues.extend(masking::detect(&mono, sample_rate, &self.config, cancel)?);
        }

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let (overall_correlation, stereo_width, balance) = match &buffer.right {
            Some(right) => {
                if self.config.detect_phase {
                    issues.extend(phase::detect(
                        &buffer.left,
                        right,
                        sample_rate,
                        &self.config,
                        cancel,
                    )?);
                }
                let corr = phase::overall_correlation(&buffer.left, right);
                let (width, balance) = dynamics::stereo_stats(&buffer.left, right);
                (corr, width, balance)
            }
            None => (1.0, 0.0, 0.0),
        };

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        // Band energies feed the metrics even when the detector is off
        let tonal = tonal::analyze(&mono, sample_rate, &self.config, cancel)?;
        if self.config.detect_tonal {
            issues.extend(tonal.issues);
        }

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let dyn_analysis = dynamics::analyze(&mono);

        let metrics = AnalysisMetrics {
            peak: dyn_analysis.peak,
            rms: dyn_analysis.rms,
            crest_factor_db: dyn_analysis.crest_factor_db,
            loudness_lufs: dyn_analysis.loudness_lufs,
            true_peak_db: dyn_analysis.true_peak_db,
            overall_correlation,
            stereo_width,
            balance,
            band_energy_db: tonal.band_energy_db,
        };

        // Detectors already enforce the confidence/severity minima; the
        // retain is the contract for anything that slips through
        issues.retain(|i| {
            i.confidence >= self.config.min_confidence && i.severity >= self.config.min_severity
        });
        sort_issues(&mut issues);

        let critique = critique::generate(&issues, &metrics, &dyn_analysis.recommendation);

        Ok(AnalysisReport {
            issues,
            metrics,
            critique,
        })
    }
}

impl Default for MixAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

/// Documented deterministic order: severity desc, confidence desc,
/// frequency asc, time asc
fn sort_issues(issues: &mut [AnalysisIssue]) {
    issues.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(
                a.frequency_range
                    .low_hz
                    .partial_cmp(&b.frequency_range.low_hz)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(
                a.time_range
                    .start_secs
                    .partial_cmp(&b.time_range.start_secs)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_is_invalid() {
        let analyzer = MixAnalyzer::default();
        let err = analyzer.analyze(&PcmBuffer::mono(48000, vec![])).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }

    #[test]
    fn test_mismatched_channels_are_invalid() {
        let analyzer = MixAnalyzer::default();
        let buffer = PcmBuffer::stereo(48000, vec![0.0; 100], vec![0.0; 99]);
        assert!(matches!(
            analyzer.analyze(&buffer),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unsupported_rate_is_invalid() {
        let analyzer = MixAnalyzer::default();
        let buffer = PcmBuffer::mono(22050, vec![0.0; 100]);
        assert!(matches!(
            analyzer.analyze(&buffer),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_pre_cancelled_token() {
        let analyzer = MixAnalyzer::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let buffer = PcmBuffer::mono(48000, vec![0.1; 48000]);
        assert!(matches!(
            analyzer.analyze_with_cancel(&buffer, &cancel),
            Err(AnalysisError::Cancelled)
        ));
    }

    #[test]
    fn test_mono_buffer_analyzes() {
        let analyzer = MixAnalyzer::default();
        let buffer = PcmBuffer::mono(48000, vec![0.1; 48000]);
        let report = analyzer.analyze(&buffer).unwrap();
        assert_eq!(report.metrics.overall_correlation, 1.0);
        assert_eq!(report.metrics.stereo_width, 0.0);
        assert!(report.critique.overall <= 100);
    }

    #[test]
    fn test_config_sanitization() {
        let analyzer = MixAnalyzer::new(AnalysisConfig {
            fft_size: 1,
            hop_fraction: 0.0,
            min_confidence: 3.0,
            ..Default::default()
        });
        assert_eq!(analyzer.config().fft_size, 256);
        assert!(analyzer.config().hop_fraction > 0.0);
        assert_eq!(analyzer.config().min_confidence, 1.0);
    }
}
