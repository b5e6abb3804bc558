//! Metering taps
//!
//! A tap observes one edge of the chain: it measures peak/RMS for each
//! block, stamps the host sample clock, and publishes frames over an
//! SPSC ring to the control plane. Publication is decimated to the
//! configured rate and happens only after the block is fully processed.
//! A full ring silently discards the frame; metering is advisory and
//! never back-pressures audio.
//!
//! Taps live in a flat arena indexed by `TapPoint`; processors do not
//! own taps.

use lacquer_core::Sample;
use lacquer_dsp::{BlockMeter, MeteringFrame};
use rtrb::{Consumer, Producer, RingBuffer};
use serde::{Deserialize, Serialize};

/// Default metering publish rate
pub const DEFAULT_METER_RATE_HZ: f32 = 60.0;

/// Publish rate bounds
pub const METER_RATE_RANGE_HZ: (f32, f32) = (10.0, 240.0);

/// Frames buffered per tap before overflow drops
const METER_RING_CAPACITY: usize = 64;

/// Edges of the chain that carry a tap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TapPoint {
    Input,
    PostEq,
    PostComp,
    PostLimiter,
    Output,
}

impl TapPoint {
    pub const ALL: [TapPoint; 5] = [
        TapPoint::Input,
        TapPoint::PostEq,
        TapPoint::PostComp,
        TapPoint::PostLimiter,
        TapPoint::Output,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            TapPoint::Input => 0,
            TapPoint::PostEq => 1,
            TapPoint::PostComp => 2,
            TapPoint::PostLimiter => 3,
            TapPoint::Output => 4,
        }
    }
}

/// Number of taps in the chain
pub const TAP_COUNT: usize = TapPoint::ALL.len();

/// One metering observer on a chain edge
pub struct MeteringTap {
    meter: BlockMeter,
    producer: Producer<MeteringFrame>,
    interval_samples: u64,
    since_publish: u64,
    pending: Option<MeteringFrame>,
}

impl MeteringTap {
    fn new(producer: Producer<MeteringFrame>, sample_rate: f64, rate_hz: f32) -> Self {
        let mut tap = Self {
            meter: BlockMeter::new(),
            producer,
            interval_samples: 1,
            since_publish: u64::MAX / 2, // publish on the first block
            pending: None,
        };
        tap.set_rate(sample_rate, rate_hz);
        tap
    }

    /// Change the publish rate, clamped to the supported range
    pub fn set_rate(&mut self, sample_rate: f64, rate_hz: f32) {
        let rate = rate_hz.clamp(METER_RATE_RANGE_HZ.0, METER_RATE_RANGE_HZ.1);
        self.interval_samples = (sample_rate / rate as f64).max(1.0) as u64;
    }

    /// Measure a block at this edge. `gain_reduction` carries the
    /// upstream dynamics telemetry for the dynamics taps.
    pub fn observe(
        &mut self,
        left: &[Sample],
        right: &[Sample],
        timestamp_samples: u64,
        gain_reduction: Option<(f32, f32)>,
    ) {
        let (peak_l, peak_r, rms_l, rms_r) = self.meter.measure(left, right);

        self.since_publish += left.len() as u64;
        if self.since_publish < self.interval_samples {
            return;
        }
        self.since_publish = 0;

        self.pending = Some(MeteringFrame {
            timestamp_samples,
            peak_l,
            peak_r,
            rms_l,
            rms_r,
            gain_reduction_db: gain_reduction.map(|(gr, _)| gr),
            max_gain_reduction_db: gain_reduction.map(|(_, max)| max),
        });
    }

    /// Publish the pending frame, if any. Called after the whole block
    /// has been processed. Overflow drops the frame silently.
    fn publish(&mut self) {
        if let Some(frame) = self.pending.take() {
            let _ = self.producer.push(frame);
        }
    }

    fn reset(&mut self) {
        self.meter.reset();
        self.pending = None;
        self.since_publish = u64::MAX / 2;
    }
}

/// Flat arena of taps, indexed by `TapPoint`
pub struct TapArena {
    taps: Vec<MeteringTap>,
}

impl TapArena {
    /// Build the arena and the matching consumer set
    pub fn new(sample_rate: f64, rate_hz: f32) -> (Self, Vec<MeteringConsumer>) {
        let mut taps = Vec::with_capacity(TAP_COUNT);
        let mut consumers = Vec::with_capacity(TAP_COUNT);

        for point in TapPoint::ALL {
            let (producer, consumer) = RingBuffer::new(METER_RING_CAPACITY);
            taps.push(MeteringTap::new(producer, sample_rate, rate_hz));
            consumers.push(MeteringConsumer { point, consumer });
        }

        (Self { taps }, consumers)
    }

    #[inline]
    pub fn tap(&mut self, point: TapPoint) -> &mut MeteringTap {
        &mut self.taps[point.index()]
    }

    /// Publish every pending frame; call once per block, after processing
    pub fn publish_all(&mut self) {
        for tap in &mut self.taps {
            tap.publish();
        }
    }

    pub fn set_rate(&mut self, sample_rate: f64, rate_hz: f32) {
        for tap in &mut self.taps {
            tap.set_rate(sample_rate, rate_hz);
        }
    }

    pub fn reset(&mut self) {
        for tap in &mut self.taps {
            tap.reset();
        }
    }
}

/// Controller-side reader for one tap
pub struct MeteringConsumer {
    point: TapPoint,
    consumer: Consumer<MeteringFrame>,
}

impl MeteringConsumer {
    #[inline]
    pub fn point(&self) -> TapPoint {
        self.point
    }

    /// Pop the oldest buffered frame
    pub fn pop(&mut self) -> Option<MeteringFrame> {
        self.consumer.pop().ok()
    }

    /// Drain everything buffered and keep only the newest frame
    pub fn latest(&mut self) -> Option<MeteringFrame> {
        let mut latest = None;
        while let Ok(frame) = self.consumer.pop() {
            latest = Some(frame);
        }
        latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_points_are_dense() {
        for (i, point) in TapPoint::ALL.iter().enumerate() {
            assert_eq!(point.index(), i);
        }
    }

    #[test]
    fn test_first_block_publishes() {
        let (mut arena, mut consumers) = TapArena::new(48000.0, 60.0);
        let block = vec![0.25f32; 128];

        arena.tap(TapPoint::Input).observe(&block, &block, 128, None);
        arena.publish_all();

        let frame = consumers[TapPoint::Input.index()].pop().unwrap();
        assert_eq!(frame.timestamp_samples, 128);
        assert!((frame.peak_l - 0.25).abs() < 1e-6);
        assert!(frame.gain_reduction_db.is_none());
    }

    #[test]
    fn test_decimation_at_60_hz() {
        let (mut arena, mut consumers) = TapArena::new(48000.0, 60.0);
        let block = vec![0.1f32; 128];

        // 48000/60 = 800 samples per frame -> one frame per ~7 blocks,
        // plus the immediate first frame.
        let mut clock = 0u64;
        for _ in 0..70 {
            clock += 128;
            arena.tap(TapPoint::Output).observe(&block, &block, clock, None);
            arena.publish_all();
        }

        let mut frames = 0;
        while consumers[TapPoint::Output.index()].pop().is_some() {
            frames += 1;
        }
        assert!((10..=13).contains(&frames), "published {frames} frames");
    }

    #[test]
    fn test_overflow_drops_silently() {
        let (mut arena, mut consumers) = TapArena::new(48000.0, 240.0);
        let block = vec![0.1f32; 256];

        // Way more frames than the ring holds; must not block or panic
        let mut clock = 0u64;
        for _ in 0..1000 {
            clock += 256;
            arena.tap(TapPoint::Input).observe(&block, &block, clock, None);
            arena.publish_all();
        }

        let mut drained = 0;
        while consumers[TapPoint::Input.index()].pop().is_some() {
            drained += 1;
        }
        assert!(drained <= 64);
    }

    #[test]
    fn test_dynamics_telemetry_carried() {
        let (mut arena, mut consumers) = TapArena::new(48000.0, 60.0);
        let block = vec![0.5f32; 128];

        arena
            .tap(TapPoint::PostComp)
            .observe(&block, &block, 128, Some((3.5, 7.0)));
        arena.publish_all();

        let frame = consumers[TapPoint::PostComp.index()].latest().unwrap();
        assert_eq!(frame.gain_reduction_db, Some(3.5));
        assert_eq!(frame.max_gain_reduction_db, Some(7.0));
    }
}
