//! End-to-end analysis tests
//!
//! Runs the complete analyser over constructed programme material and
//! checks the report contracts: phase pathology, over-compressed
//! masters, determinism, filtering and ordering.

use lacquer_analysis::{
    AnalysisConfig, CancelToken, IssueDetail, MixAnalyzer, PcmBuffer, Severity,
};

const SR: u32 = 48000;

fn sine(len: usize, freq: f32, amp: f32) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin() * amp)
        .collect()
}

/// Deterministic sign pattern from hashing the index
fn sign(i: usize) -> f32 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    i.hash(&mut hasher);
    if hasher.finish() & 1 == 0 {
        1.0
    } else {
        -1.0
    }
}

#[test]
fn out_of_phase_stereo_is_flagged_critical() {
    let left = sine(SR as usize * 2, 440.0, 0.5);
    let right: Vec<f32> = left.iter().map(|s| -s).collect();

    let analyzer = MixAnalyzer::default();
    let report = analyzer
        .analyze(&PcmBuffer::stereo(SR, left, right))
        .unwrap();

    let corr = report.metrics.overall_correlation;
    assert!(
        (-1.0001..=-0.98).contains(&corr),
        "overall correlation was {corr}"
    );

    // The tone sits in low-mid, but the anti-phase relationship holds
    // in every band carrying energy, the mid band included
    let mid_issue = report
        .issues
        .iter()
        .find(|i| {
            matches!(
                i.detail,
                IssueDetail::Phase { frequency_hz, .. } if frequency_hz == 1000.0
            )
        })
        .expect("no phase issue in the mid band");

    assert_eq!(mid_issue.severity, Severity::Critical);
    match mid_issue.detail {
        IssueDetail::Phase {
            mono_compatible,
            correlation,
            ..
        } => {
            assert!(!mono_compatible, "band should not be mono compatible");
            assert!(correlation < -0.5);
        }
        _ => unreachable!(),
    }
}

#[test]
fn over_compressed_master_critique() {
    // Peak-limited programme: 2 of 7 samples at +/-0.5, the rest at
    // +/-0.2, giving rms ~0.316 and a crest factor of ~4 dB
    let samples: Vec<f32> = (0..SR as usize * 2)
        .map(|i| {
            let mag = if i % 7 < 2 { 0.5 } else { 0.2 };
            mag * sign(i)
        })
        .collect();

    let analyzer = MixAnalyzer::default();
    let report = analyzer
        .analyze(&PcmBuffer::stereo(SR, samples.clone(), samples))
        .unwrap();

    let crest = report.metrics.crest_factor_db;
    assert!((3.5..=4.5).contains(&crest), "crest factor was {crest} dB");

    assert!(
        report.critique.breakdown.dynamics <= 70.0,
        "dynamics score was {}",
        report.critique.breakdown.dynamics
    );
    assert!(
        report
            .critique
            .improvements
            .iter()
            .any(|s| s.contains("dynamic range is very limited")),
        "improvements: {:?}",
        report.critique.improvements
    );
}

#[test]
fn analysis_is_deterministic() {
    let left = sine(SR as usize, 440.0, 0.5);
    let right = sine(SR as usize, 660.0, 0.3);
    let buffer = PcmBuffer::stereo(SR, left, right);

    let analyzer = MixAnalyzer::default();
    let first = analyzer.analyze(&buffer).unwrap();
    let second = analyzer.analyze(&buffer).unwrap();

    assert_eq!(first, second);
}

#[test]
fn issues_are_sorted_by_severity_then_confidence() {
    let left = sine(SR as usize * 2, 440.0, 0.5);
    let right: Vec<f32> = left.iter().map(|s| -s).collect();

    let report = MixAnalyzer::default()
        .analyze(&PcmBuffer::stereo(SR, left, right))
        .unwrap();

    for pair in report.issues.windows(2) {
        let a = &pair[0];
        let b = &pair[1];
        assert!(
            a.severity > b.severity
                || (a.severity == b.severity && a.confidence >= b.confidence),
            "issues out of order: {a:?} before {b:?}"
        );
    }
}

#[test]
fn min_severity_filters_the_report() {
    let left = sine(SR as usize * 2, 440.0, 0.5);
    let right: Vec<f32> = left.iter().map(|s| -s).collect();

    let config = AnalysisConfig {
        min_severity: Severity::Critical,
        ..Default::default()
    };
    let report = MixAnalyzer::new(config)
        .analyze(&PcmBuffer::stereo(SR, left, right))
        .unwrap();

    assert!(!report.issues.is_empty());
    assert!(report.issues.iter().all(|i| i.severity == Severity::Critical));
}

#[test]
fn disabled_detectors_stay_silent() {
    let left = sine(SR as usize * 2, 440.0, 0.5);
    let right: Vec<f32> = left.iter().map(|s| -s).collect();

    let config = AnalysisConfig {
        detect_phase: false,
        detect_masking: false,
        detect_tonal: false,
        ..Default::default()
    };
    let report = MixAnalyzer::new(config)
        .analyze(&PcmBuffer::stereo(SR, left.clone(), right))
        .unwrap();

    assert!(report.issues.is_empty());
    // Metrics still come through
    assert!(report.metrics.overall_correlation < -0.98);
    assert!(report.metrics.peak > 0.49);
}

#[test]
fn cancellation_mid_analysis() {
    // Pre-cancelled: the first poll wins, whatever the buffer size
    let buffer = PcmBuffer::stereo(
        SR,
        sine(SR as usize * 4, 440.0, 0.5),
        sine(SR as usize * 4, 550.0, 0.5),
    );
    let cancel = CancelToken::new();
    cancel.cancel();

    let result = MixAnalyzer::default().analyze_with_cancel(&buffer, &cancel);
    assert!(matches!(
        result,
        Err(lacquer_analysis::AnalysisError::Cancelled)
    ));
}

#[test]
fn silence_produces_a_clean_enough_report() {
    let report = MixAnalyzer::default()
        .analyze(&PcmBuffer::stereo(
            SR,
            vec![0.0; SR as usize],
            vec![0.0; SR as usize],
        ))
        .unwrap();

    assert!(report.issues.is_empty());
    assert_eq!(report.metrics.peak, 0.0);
    assert!(report.metrics.loudness_lufs <= -199.0);
    assert!(report.critique.overall <= 100);
}
