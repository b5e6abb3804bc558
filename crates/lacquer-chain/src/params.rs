//! Parameter records and the control-plane message type
//!
//! Every processor takes a small value record with published ranges.
//! Out-of-range values are silently clamped; the clamped value is what
//! subsequent metering reflects. Records are plain serde values; their
//! wire format is the host's concern.

use serde::{Deserialize, Serialize};

/// Baxandall EQ parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqParams {
    /// Bass shelf gain in dB (-12..=12)
    pub bass_gain_db: f32,
    /// Treble shelf gain in dB (-12..=12)
    pub treble_gain_db: f32,
    /// Bass turnover frequency in Hz (20..=500)
    pub bass_freq_hz: f32,
    /// Treble turnover frequency in Hz (1000..=20000)
    pub treble_freq_hz: f32,
    pub bypass: bool,
}

impl Default for EqParams {
    fn default() -> Self {
        Self {
            bass_gain_db: 0.0,
            treble_gain_db: 0.0,
            bass_freq_hz: 100.0,
            treble_freq_hz: 10000.0,
            bypass: false,
        }
    }
}

impl EqParams {
    /// Clamp all fields to their published ranges
    pub fn clamped(mut self) -> Self {
        self.bass_gain_db = self.bass_gain_db.clamp(-12.0, 12.0);
        self.treble_gain_db = self.treble_gain_db.clamp(-12.0, 12.0);
        self.bass_freq_hz = self.bass_freq_hz.clamp(20.0, 500.0);
        self.treble_freq_hz = self.treble_freq_hz.clamp(1000.0, 20000.0);
        self
    }
}

/// Stereo-linked bus compressor parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressorParams {
    /// Threshold in dB (-60..=0)
    pub threshold_db: f32,
    /// Ratio (1..=20)
    pub ratio: f32,
    /// Attack in ms (0.1..=100)
    pub attack_ms: f32,
    /// Release in ms (10..=1000)
    pub release_ms: f32,
    /// Makeup gain in dB (0..=20)
    pub makeup_db: f32,
    pub bypass: bool,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -20.0,
            ratio: 4.0,
            attack_ms: 10.0,
            release_ms: 100.0,
            makeup_db: 0.0,
            bypass: false,
        }
    }
}

impl CompressorParams {
    pub fn clamped(mut self) -> Self {
        self.threshold_db = self.threshold_db.clamp(-60.0, 0.0);
        self.ratio = self.ratio.clamp(1.0, 20.0);
        self.attack_ms = self.attack_ms.clamp(0.1, 100.0);
        self.release_ms = self.release_ms.clamp(10.0, 1000.0);
        self.makeup_db = self.makeup_db.clamp(0.0, 20.0);
        self
    }
}

/// Brick-wall limiter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimiterParams {
    /// Activation threshold in dB (-20..=0)
    pub threshold_db: f32,
    /// Release in ms (10..=1000)
    pub release_ms: f32,
    /// Hard ceiling in dB (-1.0..=0)
    pub ceiling_db: f32,
    pub bypass: bool,
}

impl Default for LimiterParams {
    fn default() -> Self {
        Self {
            threshold_db: -1.0,
            release_ms: 50.0,
            ceiling_db: -0.3,
            bypass: false,
        }
    }
}

impl LimiterParams {
    pub fn clamped(mut self) -> Self {
        self.threshold_db = self.threshold_db.clamp(-20.0, 0.0);
        self.release_ms = self.release_ms.clamp(10.0, 1000.0);
        self.ceiling_db = self.ceiling_db.clamp(-1.0, 0.0);
        self
    }
}

/// Trim node parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimParams {
    /// Gain in dB (-12..=12)
    pub gain_db: f32,
    pub bypass: bool,
}

impl Default for TrimParams {
    fn default() -> Self {
        Self {
            gain_db: 0.0,
            bypass: false,
        }
    }
}

impl TrimParams {
    pub fn clamped(mut self) -> Self {
        self.gain_db = self.gain_db.clamp(-12.0, 12.0);
        self
    }
}

/// A single parameter change message.
///
/// Small value record, never owning heap pointers; drained by the audio
/// callback between blocks (bounded count per block) and applied before
/// any audio is processed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamChange {
    InputTrimGain(f32),
    OutputTrimGain(f32),
    /// Host overshoot policy on the safety ceiling node, dB at or below 0
    SafetyGain(f32),
    EqBassGain(f32),
    EqTrebleGain(f32),
    EqBassFreq(f32),
    EqTrebleFreq(f32),
    EqBypass(bool),
    CompThreshold(f32),
    CompRatio(f32),
    CompAttack(f32),
    CompRelease(f32),
    CompMakeup(f32),
    CompBypass(bool),
    LimiterThreshold(f32),
    LimiterRelease(f32),
    LimiterCeiling(f32),
    LimiterBypass(bool),
    ClipBypass(bool),
    /// Metering publish rate in Hz (10..=240)
    MeterRate(f32),
}

/// Number of distinct coalescing slots
pub const PARAM_SLOT_COUNT: usize = 20;

impl ParamChange {
    /// Stable slot index for latest-wins coalescing
    pub fn slot(&self) -> usize {
        match self {
            ParamChange::InputTrimGain(_) => 0,
            ParamChange::OutputTrimGain(_) => 1,
            ParamChange::SafetyGain(_) => 2,
            ParamChange::EqBassGain(_) => 3,
            ParamChange::EqTrebleGain(_) => 4,
            ParamChange::EqBassFreq(_) => 5,
            ParamChange::EqTrebleFreq(_) => 6,
            ParamChange::EqBypass(_) => 7,
            ParamChange::CompThreshold(_) => 8,
            ParamChange::CompRatio(_) => 9,
            ParamChange::CompAttack(_) => 10,
            ParamChange::CompRelease(_) => 11,
            ParamChange::CompMakeup(_) => 12,
            ParamChange::CompBypass(_) => 13,
            ParamChange::LimiterThreshold(_) => 14,
            ParamChange::LimiterRelease(_) => 15,
            ParamChange::LimiterCeiling(_) => 16,
            ParamChange::LimiterBypass(_) => 17,
            ParamChange::ClipBypass(_) => 18,
            ParamChange::MeterRate(_) => 19,
        }
    }
}
