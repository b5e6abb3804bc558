//! lacquer-chain: the Lacquer real-time mastering chain
//!
//! A sample-block pipeline over stereo audio: input trim,
//! pre-compensation, Baxandall shelving EQ, stereo-linked bus
//! compressor, brick-wall peak limiter, post-compensation, safety
//! ceiling, output trim and a transparent soft-clip stage, with
//! metering taps fanned out along the edges.
//!
//! The hot path is a single-threaded cooperative callback: strictly
//! sequential, deterministic, no allocation, no locks, no blocking.
//! Parameter updates arrive over an SPSC channel and apply between
//! blocks; metering leaves over per-tap SPSC rings.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lacquer_chain::{ChainConfig, MasteringChain, ParamChange};
//! use lacquer_core::StereoBlock;
//!
//! let (mut chain, mut control) = MasteringChain::new(ChainConfig::default())?;
//! control.set(ParamChange::EqBassGain(3.0));
//!
//! // audio callback:
//! chain.process_block(&input, &mut output);
//! ```

pub mod chain;
pub mod compressor;
pub mod control;
pub mod engine;
pub mod eq;
pub mod limiter;
pub mod params;
pub mod tap;
pub mod trim;

mod error;

pub use chain::{ChainConfig, MasteringChain};
pub use compressor::BusCompressor;
pub use control::{ControlHandle, MAX_PARAM_CHANGES_PER_BLOCK};
pub use engine::Engine;
pub use eq::BaxandallEq;
pub use error::{ChainError, ChainResult};
pub use limiter::PeakLimiter;
pub use params::{
    CompressorParams, EqParams, LimiterParams, ParamChange, TrimParams, PARAM_SLOT_COUNT,
};
pub use tap::{MeteringConsumer, TapPoint, DEFAULT_METER_RATE_HZ, TAP_COUNT};
pub use trim::Trim;

pub use lacquer_dsp::MeteringFrame;
