//! Block metering primitives
//!
//! Per-block peak/RMS measurement with a short mean-square history ring
//! for RMS smoothing, and the metering frame published by the taps.

use lacquer_core::{linear_to_db, Sample};
use serde::{Deserialize, Serialize};

/// Blocks of mean-square history kept for RMS smoothing
const HISTORY_BLOCKS: usize = 4;

/// A metering snapshot captured by a tap.
///
/// Level fields are linear; `*_db()` accessors convert with the
/// `20*log10(max(x, 1e-10))` floor. Gain-reduction fields are present on
/// dynamics taps only, positive dB when reducing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MeteringFrame {
    /// Host sample clock at the end of the metered block
    pub timestamp_samples: u64,
    pub peak_l: f32,
    pub peak_r: f32,
    pub rms_l: f32,
    pub rms_r: f32,
    /// Instantaneous gain reduction of the upstream dynamics stage
    pub gain_reduction_db: Option<f32>,
    /// Maximum gain reduction seen since the last reset request
    pub max_gain_reduction_db: Option<f32>,
}

impl MeteringFrame {
    #[inline]
    pub fn peak_l_db(&self) -> f32 {
        linear_to_db(self.peak_l)
    }

    #[inline]
    pub fn peak_r_db(&self) -> f32 {
        linear_to_db(self.peak_r)
    }

    #[inline]
    pub fn rms_l_db(&self) -> f32 {
        linear_to_db(self.rms_l)
    }

    #[inline]
    pub fn rms_r_db(&self) -> f32 {
        linear_to_db(self.rms_r)
    }
}

/// Peak/RMS meter over stereo blocks.
///
/// RMS is smoothed over a small ring of recent block mean-squares; peak
/// holds over the same window, which keeps RMS <= peak for every
/// published frame.
#[derive(Debug, Clone)]
pub struct BlockMeter {
    ms_l: [f64; HISTORY_BLOCKS],
    ms_r: [f64; HISTORY_BLOCKS],
    peak_l: [f32; HISTORY_BLOCKS],
    peak_r: [f32; HISTORY_BLOCKS],
    pos: usize,
    filled: usize,
}

impl BlockMeter {
    pub fn new() -> Self {
        Self {
            ms_l: [0.0; HISTORY_BLOCKS],
            ms_r: [0.0; HISTORY_BLOCKS],
            peak_l: [0.0; HISTORY_BLOCKS],
            peak_r: [0.0; HISTORY_BLOCKS],
            pos: 0,
            filled: 0,
        }
    }

    /// Measure one block; returns (peak_l, peak_r, rms_l, rms_r) linear.
    pub fn measure(&mut self, left: &[Sample], right: &[Sample]) -> (f32, f32, f32, f32) {
        let mut peak_l = 0.0f32;
        let mut peak_r = 0.0f32;
        let mut sum_l = 0.0f64;
        let mut sum_r = 0.0f64;

        for (&l, &r) in left.iter().zip(right.iter()) {
            peak_l = peak_l.max(l.abs());
            peak_r = peak_r.max(r.abs());
            sum_l += (l as f64) * (l as f64);
            sum_r += (r as f64) * (r as f64);
        }

        let n = left.len().max(1) as f64;
        self.ms_l[self.pos] = sum_l / n;
        self.ms_r[self.pos] = sum_r / n;
        self.peak_l[self.pos] = peak_l;
        self.peak_r[self.pos] = peak_r;
        self.pos = (self.pos + 1) % HISTORY_BLOCKS;
        self.filled = (self.filled + 1).min(HISTORY_BLOCKS);

        let count = self.filled as f64;
        let rms_l = (self.ms_l.iter().take(self.filled).sum::<f64>() / count).sqrt() as f32;
        let rms_r = (self.ms_r.iter().take(self.filled).sum::<f64>() / count).sqrt() as f32;
        let hold_l = self.peak_l[..self.filled].iter().copied().fold(0.0, f32::max);
        let hold_r = self.peak_r[..self.filled].iter().copied().fold(0.0, f32::max);

        (hold_l, hold_r, rms_l, rms_r)
    }

    pub fn reset(&mut self) {
        self.ms_l = [0.0; HISTORY_BLOCKS];
        self.ms_r = [0.0; HISTORY_BLOCKS];
        self.peak_l = [0.0; HISTORY_BLOCKS];
        self.peak_r = [0.0; HISTORY_BLOCKS];
        self.pos = 0;
        self.filled = 0;
    }
}

impl Default for BlockMeter {
    fn default() -> Self {
        Self::new()
    }
}
