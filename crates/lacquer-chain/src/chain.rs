//! The real-time mastering chain
//!
//! Fixed stage order:
//! InputTrim -> PreComp -> EQ -> Comp -> Limiter -> PostComp ->
//! SafetyCeiling -> OutputTrim -> SoftClip -> sink, with metering taps
//! at the input, post-EQ, post-Comp, post-Limiter and output edges.
//!
//! `process_block` is the single hot entry: non-blocking,
//! allocation-free, deterministic. Pending parameter messages are
//! drained (bounded count) and applied before any audio; metering for a
//! block is published only after the block is fully processed.

use lacquer_core::{scrub_non_finite, BlockSize, SampleRate, StereoBlock};
use lacquer_dsp::{SoftClipper, StereoProcessor};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::compressor::BusCompressor;
use crate::control::{param_channel, ControlHandle, MAX_PARAM_CHANGES_PER_BLOCK};
use crate::eq::BaxandallEq;
use crate::error::ChainResult;
use crate::limiter::PeakLimiter;
use crate::params::ParamChange;
use crate::tap::{TapArena, TapPoint, DEFAULT_METER_RATE_HZ};
use crate::trim::Trim;

/// Chain construction parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Host sample rate in Hz (44100/48000/88200/96000/176400/192000)
    pub sample_rate_hz: u32,
    /// Host block size in samples (64/128/256)
    pub block_size: usize,
    /// Metering publish rate in Hz (10..=240)
    pub meter_rate_hz: f32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 48000,
            block_size: 128,
            meter_rate_hz: DEFAULT_METER_RATE_HZ,
        }
    }
}

/// The mastering chain. One instance per audio host; constructed when
/// the driver initialises and dropped on teardown.
pub struct MasteringChain {
    config: ChainConfig,
    sample_rate: f64,
    input_trim: Trim,
    pre_comp: Trim,
    eq: BaxandallEq,
    compressor: BusCompressor,
    limiter: PeakLimiter,
    post_comp: Trim,
    safety: Trim,
    output_trim: Trim,
    clipper: SoftClipper,
    clip_bypass: bool,
    taps: TapArena,
    param_rx: rtrb::Consumer<ParamChange>,
    sample_clock: u64,
    warned_non_finite: bool,
}

impl MasteringChain {
    /// Build a chain and its controller handle. Fails with
    /// `Unsupported` for configurations outside the published sets.
    pub fn new(config: ChainConfig) -> ChainResult<(Self, ControlHandle)> {
        let rate = SampleRate::from_hz(config.sample_rate_hz)?;
        BlockSize::from_samples(config.block_size)?;
        let sample_rate = rate.as_f64();

        let (param_tx, param_rx) = param_channel();
        let (taps, meters) = TapArena::new(sample_rate, config.meter_rate_hz);

        debug!(
            "mastering chain up: {} Hz, {}-sample blocks",
            config.sample_rate_hz, config.block_size
        );

        let chain = Self {
            config,
            sample_rate,
            input_trim: Trim::user(sample_rate),
            pre_comp: Trim::unity(sample_rate),
            eq: BaxandallEq::new(sample_rate),
            compressor: BusCompressor::new(sample_rate),
            limiter: PeakLimiter::new(sample_rate),
            post_comp: Trim::unity(sample_rate),
            safety: Trim::unity(sample_rate),
            output_trim: Trim::user(sample_rate),
            clipper: SoftClipper::new(),
            clip_bypass: false,
            taps,
            param_rx,
            sample_clock: 0,
            warned_non_finite: false,
        };

        Ok((chain, ControlHandle::new(param_tx, meters)))
    }

    #[inline]
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Process one stereo block. The hot path: no allocation, no
    /// blocking, no errors, no panics on well-typed input.
    pub fn process_block(&mut self, input: &StereoBlock, output: &mut StereoBlock) {
        debug_assert_eq!(input.len(), output.len());

        output.copy_from(input);

        // Numerical degenerates never enter a processor
        let (left, right) = output.channels_mut();
        let scrubbed = scrub_non_finite(left) + scrub_non_finite(right);
        if scrubbed > 0 && !self.warned_non_finite {
            self.warned_non_finite = true;
            warn!("non-finite input samples replaced with silence");
        }

        self.apply_pending_params();

        let block_len = output.len() as u64;
        let timestamp = self.sample_clock + block_len;
        let (left, right) = output.channels_mut();

        self.taps
            .tap(TapPoint::Input)
            .observe(left, right, timestamp, None);

        self.input_trim.process_block(left, right);
        self.pre_comp.process_block(left, right);

        self.eq.process_block(left, right);
        self.taps
            .tap(TapPoint::PostEq)
            .observe(left, right, timestamp, None);

        self.compressor.process_block(left, right);
        self.taps.tap(TapPoint::PostComp).observe(
            left,
            right,
            timestamp,
            Some((
                self.compressor.gain_reduction_db(),
                self.compressor.max_gain_reduction_db(),
            )),
        );

        self.limiter.process_block(left, right);
        self.taps.tap(TapPoint::PostLimiter).observe(
            left,
            right,
            timestamp,
            Some((
                self.limiter.gain_reduction_db(),
                self.limiter.max_gain_reduction_db(),
            )),
        );

        self.post_comp.process_block(left, right);
        self.safety.process_block(left, right);
        self.output_trim.process_block(left, right);
        if !self.clip_bypass {
            self.clipper.process_block(left, right);
        }

        self.taps
            .tap(TapPoint::Output)
            .observe(left, right, timestamp, None);

        // The block is done; only now does metering leave the chain
        self.taps.publish_all();
        self.sample_clock = timestamp;
    }

    /// Drain pending parameter messages, bounded per block
    fn apply_pending_params(&mut self) {
        for _ in 0..MAX_PARAM_CHANGES_PER_BLOCK {
            match self.param_rx.pop() {
                Ok(change) => self.apply_param(change),
                Err(_) => break,
            }
        }
    }

    fn apply_param(&mut self, change: ParamChange) {
        match change {
            ParamChange::InputTrimGain(db) => self.input_trim.set_gain_db(db),
            ParamChange::OutputTrimGain(db) => self.output_trim.set_gain_db(db),
            ParamChange::SafetyGain(db) => self.safety.set_gain_db(db),
            ParamChange::EqBassGain(db) => {
                let p = *self.eq.params();
                self.eq.set_params(crate::params::EqParams {
                    bass_gain_db: db,
                    ..p
                });
            }
            ParamChange::EqTrebleGain(db) => {
                let p = *self.eq.params();
                self.eq.set_params(crate::params::EqParams {
                    treble_gain_db: db,
                    ..p
                });
            }
            ParamChange::EqBassFreq(hz) => {
                let p = *self.eq.params();
                self.eq.set_params(crate::params::EqParams {
                    bass_freq_hz: hz,
                    ..p
                });
            }
            ParamChange::EqTrebleFreq(hz) => {
                let p = *self.eq.params();
                self.eq.set_params(crate::params::EqParams {
                    treble_freq_hz: hz,
                    ..p
                });
            }
            ParamChange::EqBypass(bypass) => {
                let p = *self.eq.params();
                self.eq.set_params(crate::params::EqParams { bypass, ..p });
            }
            ParamChange::CompThreshold(db) => {
                let p = *self.compressor.params();
                self.compressor.set_params(crate::params::CompressorParams {
                    threshold_db: db,
                    ..p
                });
            }
            ParamChange::CompRatio(ratio) => {
                let p = *self.compressor.params();
                self.compressor
                    .set_params(crate::params::CompressorParams { ratio, ..p });
            }
            ParamChange::CompAttack(ms) => {
                let p = *self.compressor.params();
                self.compressor.set_params(crate::params::CompressorParams {
                    attack_ms: ms,
                    ..p
                });
            }
            ParamChange::CompRelease(ms) => {
                let p = *self.compressor.params();
                self.compressor.set_params(crate::params::CompressorParams {
                    release_ms: ms,
                    ..p
                });
            }
            ParamChange::CompMakeup(db) => {
                let p = *self.compressor.params();
                self.compressor.set_params(crate::params::CompressorParams {
                    makeup_db: db,
                    ..p
                });
            }
            ParamChange::CompBypass(bypass) => {
                let p = *self.compressor.params();
                self.compressor
                    .set_params(crate::params::CompressorParams { bypass, ..p });
            }
            ParamChange::LimiterThreshold(db) => {
                let p = *self.limiter.params();
                self.limiter.set_params(crate::params::LimiterParams {
                    threshold_db: db,
                    ..p
                });
            }
            ParamChange::LimiterRelease(ms) => {
                let p = *self.limiter.params();
                self.limiter.set_params(crate::params::LimiterParams {
                    release_ms: ms,
                    ..p
                });
            }
            ParamChange::LimiterCeiling(db) => {
                let p = *self.limiter.params();
                self.limiter.set_params(crate::params::LimiterParams {
                    ceiling_db: db,
                    ..p
                });
            }
            ParamChange::LimiterBypass(bypass) => {
                let p = *self.limiter.params();
                self.limiter
                    .set_params(crate::params::LimiterParams { bypass, ..p });
            }
            ParamChange::ClipBypass(bypass) => {
                self.clip_bypass = bypass;
            }
            ParamChange::MeterRate(hz) => {
                self.taps.set_rate(self.sample_rate, hz);
            }
        }
    }

    /// Direct (same-thread) parameter application, for hosts driving the
    /// chain without the channel. Same clamping and timing rules.
    pub fn apply_change(&mut self, change: ParamChange) {
        self.apply_param(change);
    }

    /// Reset all processor state, metering history and the sample clock
    pub fn reset(&mut self) {
        use lacquer_dsp::Processor;
        self.input_trim.reset();
        self.pre_comp.reset();
        self.eq.reset();
        self.compressor.reset();
        self.limiter.reset();
        self.post_comp.reset();
        self.safety.reset();
        self.output_trim.reset();
        self.taps.reset();
        self.sample_clock = 0;
    }

    /// Host sample clock: samples processed since construction
    #[inline]
    pub fn sample_clock(&self) -> u64 {
        self.sample_clock
    }

    /// Clear the limiter and compressor max gain-reduction holds
    pub fn reset_max_gain_reduction(&mut self) {
        self.compressor.reset_max_gain_reduction();
        self.limiter.reset_max_gain_reduction();
    }
}
