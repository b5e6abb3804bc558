//! Control plane
//!
//! Single-producer/single-consumer parameter channel into the audio
//! callback, and the controller-side metering readers. The producer
//! never blocks: when the ring is full, changes park in a per-parameter
//! latest-wins table and flush ahead of later sends.

use rtrb::{Consumer, Producer, RingBuffer};

use crate::params::{ParamChange, PARAM_SLOT_COUNT};
use crate::tap::{MeteringConsumer, TapPoint};

/// Capacity of the parameter ring
const PARAM_RING_CAPACITY: usize = 256;

/// Most parameter messages applied per block; bounds worst-case jitter
pub const MAX_PARAM_CHANGES_PER_BLOCK: usize = 32;

/// Build the parameter channel pair
pub(crate) fn param_channel() -> (Producer<ParamChange>, Consumer<ParamChange>) {
    RingBuffer::new(PARAM_RING_CAPACITY)
}

/// Non-real-time controller handle: sends parameter changes, reads
/// metering frames. Single producer by contract.
pub struct ControlHandle {
    producer: Producer<ParamChange>,
    pending: [Option<ParamChange>; PARAM_SLOT_COUNT],
    meters: Vec<MeteringConsumer>,
}

impl ControlHandle {
    pub(crate) fn new(producer: Producer<ParamChange>, meters: Vec<MeteringConsumer>) -> Self {
        Self {
            producer,
            pending: [None; PARAM_SLOT_COUNT],
            meters,
        }
    }

    /// Submit a parameter change. Takes effect no later than the block
    /// after the one during which it is drained, never inside a block.
    /// A full channel coalesces: the latest value per parameter wins.
    pub fn set(&mut self, change: ParamChange) {
        self.flush_pending();
        if self.producer.push(change).is_err() {
            self.pending[change.slot()] = Some(change);
        }
    }

    fn flush_pending(&mut self) {
        for slot in 0..PARAM_SLOT_COUNT {
            if let Some(change) = self.pending[slot] {
                if self.producer.push(change).is_ok() {
                    self.pending[slot] = None;
                } else {
                    return;
                }
            }
        }
    }

    /// Pop the oldest metering frame from one tap
    pub fn poll_meter(&mut self, point: TapPoint) -> Option<lacquer_dsp::MeteringFrame> {
        self.meters[point.index()].pop()
    }

    /// Drain a tap and return only its newest frame
    pub fn latest_meter(&mut self, point: TapPoint) -> Option<lacquer_dsp::MeteringFrame> {
        self.meters[point.index()].latest()
    }
}
