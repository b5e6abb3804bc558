//! SSL-style stereo-linked bus compressor
//!
//! Side-chain level is max(|L|, |R|) so both channels receive the same
//! gain and the stereo image holds. Soft knee of 2 dB width with a
//! parabolic slope interpolation; one-pole envelope with split
//! attack/release converts the target gain into the applied gain.

use lacquer_core::{db_to_linear_f64, Sample, DB_EPSILON};
use lacquer_dsp::{EnvelopeFollower, Processor, StereoProcessor};

use crate::params::CompressorParams;

/// Soft knee width in dB
pub const KNEE_WIDTH_DB: f64 = 2.0;

/// Stereo-linked soft-knee VCA compressor
#[derive(Debug, Clone)]
pub struct BusCompressor {
    params: CompressorParams,
    envelope: EnvelopeFollower,
    makeup_gain: f64,
    gain_reduction_db: f32,
    max_gain_reduction_db: f32,
}

impl BusCompressor {
    pub fn new(sample_rate: f64) -> Self {
        let params = CompressorParams::default();
        let envelope =
            EnvelopeFollower::new(sample_rate, params.attack_ms as f64, params.release_ms as f64);
        Self {
            params,
            envelope,
            makeup_gain: 1.0,
            gain_reduction_db: 0.0,
            max_gain_reduction_db: 0.0,
        }
    }

    /// Apply a parameter record (clamped) and rederive coefficients
    pub fn set_params(&mut self, params: CompressorParams) {
        self.params = params.clamped();
        self.envelope.set_attack_ms(self.params.attack_ms as f64);
        self.envelope.set_release_ms(self.params.release_ms as f64);
        self.makeup_gain = db_to_linear_f64(self.params.makeup_db as f64);
    }

    #[inline]
    pub fn params(&self) -> &CompressorParams {
        &self.params
    }

    /// Target linear gain for a side-chain level in dB.
    ///
    /// Below the knee: unity. Above: `T + (x - T)/R`. Inside:
    /// `u = (x - (T - W)) / 2W`, slope `1 - (1 - 1/R)*u^2`, which is 1 at
    /// the lower edge and 1/R at the upper, so the gain is continuous at
    /// both knee boundaries.
    pub fn gain_for_level(&self, x_db: f64) -> f64 {
        let t = self.params.threshold_db as f64;
        let r = self.params.ratio as f64;
        let w = KNEE_WIDTH_DB;

        if x_db < t - w {
            return 1.0;
        }

        let compressed = if x_db > t + w {
            t + (x_db - t) / r
        } else {
            let u = (x_db - (t - w)) / (2.0 * w);
            let slope = 1.0 - (1.0 - 1.0 / r) * u * u;
            t + (x_db - t) * slope
        };

        db_to_linear_f64(compressed - x_db)
    }

    /// Instantaneous gain reduction in dB, positive when reducing
    #[inline]
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    /// Maximum gain reduction since the last reset request
    #[inline]
    pub fn max_gain_reduction_db(&self) -> f32 {
        self.max_gain_reduction_db
    }

    pub fn reset_max_gain_reduction(&mut self) {
        self.max_gain_reduction_db = 0.0;
    }
}

impl Processor for BusCompressor {
    fn reset(&mut self) {
        self.envelope.reset();
        self.gain_reduction_db = 0.0;
        self.max_gain_reduction_db = 0.0;
    }
}

impl StereoProcessor for BusCompressor {
    fn process_block(&mut self, left: &mut [Sample], right: &mut [Sample]) {
        if self.params.bypass {
            self.gain_reduction_db = 0.0;
            return;
        }

        let mut min_env = self.envelope.value();

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let side_chain = l.abs().max(r.abs()) as f64;
            let x_db = 20.0 * side_chain.max(DB_EPSILON as f64).log10();

            let target = self.gain_for_level(x_db);
            let env = self.envelope.process(target);
            min_env = min_env.min(env);

            let gain = (env * self.makeup_gain) as f32;
            *l *= gain;
            *r *= gain;
        }

        let env = self.envelope.value();
        self.gain_reduction_db = (-20.0 * env.log10()).max(0.0) as f32;
        let block_max = (-20.0 * min_env.log10()).max(0.0) as f32;
        self.max_gain_reduction_db = self.max_gain_reduction_db.max(block_max);
    }
}
