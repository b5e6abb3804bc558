//! Baxandall shelving equaliser
//!
//! Two cascaded per-channel shelving biquads (low shelf then high
//! shelf), RBJ coefficients with Q = 1/sqrt(2). The shelf corner is
//! placed a fixed ratio away from the user turnover so the full
//! published gain is effective at the knob frequency (tone-control
//! behaviour; an RBJ shelf centred on the knob would only reach half
//! the dB gain there). Gains within 0.01 dB of zero collapse each
//! biquad to the exact identity filter.

use lacquer_core::Sample;
use lacquer_dsp::biquad::{BiquadDf1, ShelfCoeffs, SHELF_Q};
use lacquer_dsp::{Processor, StereoProcessor};

use crate::params::EqParams;

/// Corner placement relative to the user turnover frequency
const TURNOVER_RATIO: f64 = 2.5;

/// Baxandall-style two-band shelving EQ
#[derive(Debug, Clone)]
pub struct BaxandallEq {
    params: EqParams,
    sample_rate: f64,
    bass_l: BiquadDf1,
    bass_r: BiquadDf1,
    treble_l: BiquadDf1,
    treble_r: BiquadDf1,
}

impl BaxandallEq {
    pub fn new(sample_rate: f64) -> Self {
        let mut eq = Self {
            params: EqParams::default(),
            sample_rate,
            bass_l: BiquadDf1::new(),
            bass_r: BiquadDf1::new(),
            treble_l: BiquadDf1::new(),
            treble_r: BiquadDf1::new(),
        };
        eq.update_coeffs();
        eq
    }

    /// Apply a parameter record (clamped) and recompute coefficients.
    /// Called between blocks; a mid-block update waits for the boundary.
    pub fn set_params(&mut self, params: EqParams) {
        self.params = params.clamped();
        self.update_coeffs();
    }

    #[inline]
    pub fn params(&self) -> &EqParams {
        &self.params
    }

    fn update_coeffs(&mut self) {
        // Full boost/cut at the knob frequency: corner sits above the
        // bass turnover and below the treble turnover.
        let bass_corner =
            (self.params.bass_freq_hz as f64 * TURNOVER_RATIO).min(self.sample_rate * 0.45);
        let treble_corner =
            (self.params.treble_freq_hz as f64 / TURNOVER_RATIO).min(self.sample_rate * 0.45);

        let bass = ShelfCoeffs::low_shelf(
            bass_corner,
            SHELF_Q,
            self.params.bass_gain_db as f64,
            self.sample_rate,
        );
        let treble = ShelfCoeffs::high_shelf(
            treble_corner,
            SHELF_Q,
            self.params.treble_gain_db as f64,
            self.sample_rate,
        );

        self.bass_l.set_coeffs(bass);
        self.bass_r.set_coeffs(bass);
        self.treble_l.set_coeffs(treble);
        self.treble_r.set_coeffs(treble);
    }
}

impl Processor for BaxandallEq {
    fn reset(&mut self) {
        self.bass_l.reset();
        self.bass_r.reset();
        self.treble_l.reset();
        self.treble_r.reset();
    }
}

impl StereoProcessor for BaxandallEq {
    fn process_block(&mut self, left: &mut [Sample], right: &mut [Sample]) {
        if self.params.bypass {
            return;
        }
        self.bass_l.process_block(left);
        self.treble_l.process_block(left);
        self.bass_r.process_block(right);
        self.treble_r.process_block(right);
    }
}
