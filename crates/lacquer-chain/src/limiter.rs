//! Brick-wall peak limiter
//!
//! Per-sample peak detection with a very fast fixed attack, configurable
//! release, and a hard clamp to the ceiling after the envelope gain.
//! The clamp is the final brick-wall guarantee; the envelope keeps it
//! from being audible under nominal programme.

use lacquer_core::{db_to_linear_f64, Sample, DB_EPSILON};
use lacquer_dsp::{EnvelopeFollower, Processor, StereoProcessor};

use crate::params::LimiterParams;

/// Fixed attack time
pub const LIMITER_ATTACK_MS: f64 = 0.1;

/// Floor on the target gain to avoid numerical collapse
pub const MIN_TARGET_GAIN: f64 = 0.01;

/// Brick-wall limiter with gain-reduction telemetry
#[derive(Debug, Clone)]
pub struct PeakLimiter {
    params: LimiterParams,
    envelope: EnvelopeFollower,
    ceiling: f64,
    gain_reduction_db: f32,
    max_gain_reduction_db: f32,
}

impl PeakLimiter {
    pub fn new(sample_rate: f64) -> Self {
        let params = LimiterParams::default();
        let envelope =
            EnvelopeFollower::new(sample_rate, LIMITER_ATTACK_MS, params.release_ms as f64);
        Self {
            ceiling: db_to_linear_f64(params.ceiling_db as f64),
            params,
            envelope,
            gain_reduction_db: 0.0,
            max_gain_reduction_db: 0.0,
        }
    }

    /// Apply a parameter record (clamped) and rederive coefficients
    pub fn set_params(&mut self, params: LimiterParams) {
        self.params = params.clamped();
        self.envelope.set_release_ms(self.params.release_ms as f64);
        self.ceiling = db_to_linear_f64(self.params.ceiling_db as f64);
    }

    #[inline]
    pub fn params(&self) -> &LimiterParams {
        &self.params
    }

    /// Current gain reduction in dB, positive when reducing
    #[inline]
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    /// Maximum gain reduction seen since the last reset request
    #[inline]
    pub fn max_gain_reduction_db(&self) -> f32 {
        self.max_gain_reduction_db
    }

    pub fn reset_max_gain_reduction(&mut self) {
        self.max_gain_reduction_db = 0.0;
    }
}

impl Processor for PeakLimiter {
    fn reset(&mut self) {
        self.envelope.reset();
        self.gain_reduction_db = 0.0;
        self.max_gain_reduction_db = 0.0;
    }
}

impl StereoProcessor for PeakLimiter {
    fn process_block(&mut self, left: &mut [Sample], right: &mut [Sample]) {
        if self.params.bypass {
            self.gain_reduction_db = 0.0;
            return;
        }

        let threshold_db = self.params.threshold_db as f64;
        let ceiling_db = self.params.ceiling_db as f64;
        let ceiling = self.ceiling as f32;
        let mut min_env = self.envelope.value();

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let peak = l.abs().max(r.abs()) as f64;
            let peak_db = 20.0 * peak.max(DB_EPSILON as f64).log10();

            let target = if peak_db <= threshold_db {
                1.0
            } else {
                db_to_linear_f64(ceiling_db - peak_db).clamp(MIN_TARGET_GAIN, 1.0)
            };

            let env = self.envelope.process(target);
            min_env = min_env.min(env);
            let gain = env as f32;

            // Hard-clip tail: the brick-wall guarantee
            *l = (*l * gain).clamp(-ceiling, ceiling);
            *r = (*r * gain).clamp(-ceiling, ceiling);
        }

        self.gain_reduction_db = (-20.0 * self.envelope.value().log10()).max(0.0) as f32;
        let block_max = (-20.0 * min_env.log10()).max(0.0) as f32;
        self.max_gain_reduction_db = self.max_gain_reduction_db.max(block_max);
    }
}
