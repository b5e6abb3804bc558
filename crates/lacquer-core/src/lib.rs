//! lacquer-core: Shared types and utilities for the Lacquer mastering core
//!
//! This crate provides the foundational vocabulary used by both the
//! real-time chain and the offline analysis engine: sample and block
//! types, supported sample-rate/block-size sets, decibel and bark
//! conversions, and the core error type.

mod error;
mod sample;
mod units;

pub use error::{CoreError, CoreResult};
pub use sample::*;
pub use units::*;

/// Supported sample rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum SampleRate {
    Hz44100 = 44100,
    Hz48000 = 48000,
    Hz88200 = 88200,
    Hz96000 = 96000,
    Hz176400 = 176400,
    Hz192000 = 192000,
}

impl SampleRate {
    /// All supported rates, for validation messages
    pub const ALL: [SampleRate; 6] = [
        SampleRate::Hz44100,
        SampleRate::Hz48000,
        SampleRate::Hz88200,
        SampleRate::Hz96000,
        SampleRate::Hz176400,
        SampleRate::Hz192000,
    ];

    #[inline]
    pub fn as_f64(self) -> f64 {
        self as u32 as f64
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Validate a raw rate against the supported set
    pub fn from_hz(hz: u32) -> CoreResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.as_u32() == hz)
            .ok_or_else(|| CoreError::Unsupported(format!("sample rate {hz} Hz")))
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::Hz48000
    }
}

/// Supported block sizes for the real-time chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum BlockSize {
    Samples64 = 64,
    Samples128 = 128,
    Samples256 = 256,
}

impl BlockSize {
    #[inline]
    pub fn as_usize(self) -> usize {
        self as u32 as usize
    }

    /// Validate a raw block size against the supported set
    pub fn from_samples(samples: usize) -> CoreResult<Self> {
        match samples {
            64 => Ok(BlockSize::Samples64),
            128 => Ok(BlockSize::Samples128),
            256 => Ok(BlockSize::Samples256),
            other => Err(CoreError::Unsupported(format!("block size {other}"))),
        }
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self::Samples128
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rate_validation() {
        assert_eq!(SampleRate::from_hz(48000).unwrap(), SampleRate::Hz48000);
        assert_eq!(SampleRate::from_hz(192000).unwrap(), SampleRate::Hz192000);
        assert!(SampleRate::from_hz(22050).is_err());
    }

    #[test]
    fn test_block_size_validation() {
        assert_eq!(
            BlockSize::from_samples(128).unwrap(),
            BlockSize::Samples128
        );
        assert!(BlockSize::from_samples(512).is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(SampleRate::default().as_u32(), 48000);
        assert_eq!(BlockSize::default().as_usize(), 128);
    }
}
