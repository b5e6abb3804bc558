//! Lazy STFT frame iterators
//!
//! Overlapping, Hann-windowed, zero-padded frames over a sample buffer.
//! `MagnitudeFrames` yields normalized magnitude spectra (a full-scale
//! sine peaks near 0 dBFS); `ComplexFrames` yields the raw complex
//! half-spectrum for phase work. Bin `k` maps to `k * sr / N`.

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;
use std::sync::Arc;

use crate::window::hann;

/// Frequency of bin `k` for an `fft_size`-point transform
#[inline]
pub fn bin_to_hz(bin: usize, sample_rate: f64, fft_size: usize) -> f32 {
    (bin as f64 * sample_rate / fft_size as f64) as f32
}

/// One magnitude spectrum frame
#[derive(Debug, Clone)]
pub struct MagnitudeFrame {
    /// First sample of the frame in the source buffer
    pub start_sample: usize,
    /// Frame span in source samples (the window length, pre-padding)
    pub span: usize,
    /// Normalized magnitudes for the first `fft_size / 2` bins
    pub magnitudes: Vec<f32>,
}

struct FrameEngine {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    window_len: usize,
    fft_size: usize,
    hop: usize,
    input: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
}

impl FrameEngine {
    fn new(window_len: usize, hop: usize) -> Self {
        let fft_size = window_len.next_power_of_two();
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let spectrum = fft.make_output_vec();

        Self {
            fft,
            window: hann(window_len),
            window_len,
            fft_size,
            hop: hop.max(1),
            input: vec![0.0; fft_size],
            spectrum,
        }
    }

    /// Window, zero-pad and transform the frame starting at `pos`.
    /// Returns false if the source ran out.
    fn transform(&mut self, samples: &[f32], pos: usize) -> bool {
        if pos + self.window_len > samples.len() {
            return false;
        }
        self.input.fill(0.0);
        for i in 0..self.window_len {
            self.input[i] = samples[pos + i] * self.window[i];
        }
        self.fft.process(&mut self.input, &mut self.spectrum).ok();
        true
    }
}

/// Lazy iterator over normalized magnitude frames
pub struct MagnitudeFrames<'a> {
    samples: &'a [f32],
    engine: FrameEngine,
    pos: usize,
    norm: f32,
}

impl<'a> MagnitudeFrames<'a> {
    /// `window_len` samples per frame (zero-padded to a power of two),
    /// advancing by `hop` samples
    pub fn new(samples: &'a [f32], window_len: usize, hop: usize) -> Self {
        let engine = FrameEngine::new(window_len, hop);
        // Peak bin of a windowed full-scale sine is window_len / 4
        let norm = 4.0 / window_len as f32;
        Self {
            samples,
            engine,
            pos: 0,
            norm,
        }
    }

    /// Padded transform size actually used
    pub fn fft_size(&self) -> usize {
        self.engine.fft_size
    }
}

impl Iterator for MagnitudeFrames<'_> {
    type Item = MagnitudeFrame;

    fn next(&mut self) -> Option<MagnitudeFrame> {
        if !self.engine.transform(self.samples, self.pos) {
            return None;
        }
        let bins = self.engine.fft_size / 2;
        let magnitudes: Vec<f32> = self.engine.spectrum[..bins]
            .iter()
            .map(|c| c.norm() * self.norm)
            .collect();

        let frame = MagnitudeFrame {
            start_sample: self.pos,
            span: self.engine.window_len,
            magnitudes,
        };
        self.pos += self.engine.hop;
        Some(frame)
    }
}

/// Lazy iterator over raw complex half-spectrum frames (single channel)
pub struct ComplexFrames<'a> {
    samples: &'a [f32],
    engine: FrameEngine,
    pos: usize,
}

impl<'a> ComplexFrames<'a> {
    pub fn new(samples: &'a [f32], window_len: usize, hop: usize) -> Self {
        Self {
            samples,
            engine: FrameEngine::new(window_len, hop),
            pos: 0,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.engine.fft_size
    }
}

impl Iterator for ComplexFrames<'_> {
    type Item = Vec<Complex<f32>>;

    fn next(&mut self) -> Option<Vec<Complex<f32>>> {
        if !self.engine.transform(self.samples, self.pos) {
            return None;
        }
        let bins = self.engine.fft_size / 2;
        let frame = self.engine.spectrum[..bins].to_vec();
        self.pos += self.engine.hop;
        Some(frame)
    }
}
