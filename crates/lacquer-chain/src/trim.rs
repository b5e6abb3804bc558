//! Trim and compensation nodes
//!
//! Pure per-sample multiplies by a scalar gain, ramped between blocks to
//! avoid zipper noise. Used for input/output trim, the unity-gain pre and
//! post compensation nodes, and the safety ceiling the host policy may
//! pull below unity. At exactly unity with no ramp in flight the block
//! passes through untouched.

use lacquer_core::{db_to_linear_f64, Sample};
use lacquer_dsp::{Processor, SmoothedParam, StereoProcessor};

/// Gain ramp length
const TRIM_RAMP_MS: f64 = 5.0;

/// Scalar gain node
#[derive(Debug, Clone)]
pub struct Trim {
    gain: SmoothedParam,
    gain_db: f32,
    min_db: f32,
    max_db: f32,
    bypass: bool,
}

impl Trim {
    /// A trim with the given dB range; starts at unity
    pub fn new(sample_rate: f64, min_db: f32, max_db: f32) -> Self {
        Self {
            gain: SmoothedParam::with_ramp_ms(1.0, TRIM_RAMP_MS, sample_rate),
            gain_db: 0.0,
            min_db,
            max_db,
            bypass: false,
        }
    }

    /// User trim node: +/-12 dB
    pub fn user(sample_rate: f64) -> Self {
        Self::new(sample_rate, -12.0, 12.0)
    }

    /// Compensation node: fixed unity until the host says otherwise
    pub fn unity(sample_rate: f64) -> Self {
        Self::new(sample_rate, -12.0, 0.0)
    }

    /// Set the gain in dB, clamped to this node's range; ramps from the
    /// current value starting with the next block.
    pub fn set_gain_db(&mut self, db: f32) {
        self.gain_db = db.clamp(self.min_db, self.max_db);
        self.gain.set_target(db_to_linear_f64(self.gain_db as f64));
    }

    #[inline]
    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    pub fn set_bypass(&mut self, bypass: bool) {
        self.bypass = bypass;
    }

    #[inline]
    pub fn bypassed(&self) -> bool {
        self.bypass
    }
}

impl Processor for Trim {
    fn reset(&mut self) {
        self.gain.snap_to(db_to_linear_f64(self.gain_db as f64));
    }
}

impl StereoProcessor for Trim {
    fn process_block(&mut self, left: &mut [Sample], right: &mut [Sample]) {
        if self.bypass {
            return;
        }
        // Settled at unity: exact passthrough
        if !self.gain.is_ramping() && self.gain.value() == 1.0 {
            return;
        }
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let gain = self.gain.next() as f32;
            *l *= gain;
            *r *= gain;
        }
    }
}
