//! Streaming DC-block + Hilbert-FIR front end that turns a real audio sample stream
//! into a complex analytic signal.

use crate::dsp::{Delay, Sma};
use crate::FILTER_LENGTH;
use rustfft::num_complex::Complex;

const HILBERT_DELAY: usize = (FILTER_LENGTH - 1) / 2;

/// Removes the local DC component by subtracting a moving mean over `FILTER_LENGTH`
/// samples.
struct BlockDc {
    sma: Sma<FILTER_LENGTH>,
}

impl BlockDc {
    fn new() -> Self {
        Self { sma: Sma::new() }
    }

    fn push(&mut self, x: f32) -> f32 {
        let mean = self.sma.push(x) / FILTER_LENGTH as f32;
        x - mean
    }
}

/// `FILTER_LENGTH`-tap (odd, antisymmetric Type-III) Hilbert transformer, designed as
/// a windowed ideal-response FIR: `h[k] = 0` for even `k - center`, `2/(pi*(k -
/// center))` for odd, tapered by a Hamming window.
struct Hilbert {
    coeffs: [f32; FILTER_LENGTH],
    history: [f32; FILTER_LENGTH],
    index: usize,
}

impl Hilbert {
    fn new() -> Self {
        let center = HILBERT_DELAY as isize;
        let mut coeffs = [0.0_f32; FILTER_LENGTH];
        for k in 0..FILTER_LENGTH {
            let n = k as isize - center;
            if n % 2 != 0 {
                let ideal = 2.0 / (std::f32::consts::PI * n as f32);
                let window = 0.54
                    - 0.46 * (2.0 * std::f32::consts::PI * k as f32 / (FILTER_LENGTH as f32 - 1.0)).cos();
                coeffs[k] = ideal * window;
            }
        }
        Self { coeffs, history: [0.0; FILTER_LENGTH], index: 0 }
    }

    fn push(&mut self, x: f32) -> f32 {
        self.history[self.index] = x;
        let mut acc = 0.0;
        let mut idx = self.index;
        for &c in self.coeffs.iter() {
            acc += c * self.history[idx];
            idx = if idx == 0 { FILTER_LENGTH - 1 } else { idx - 1 };
        }
        self.index = (self.index + 1) % FILTER_LENGTH;
        acc
    }
}

/// Block-DC removal followed by a Hilbert FIR, producing a complex analytic signal
/// whose negative-frequency content is attenuated.
pub struct AnalyticFrontEnd {
    block_dc: BlockDc,
    hilbert: Hilbert,
    real_delay: Delay<HILBERT_DELAY>,
}

impl AnalyticFrontEnd {
    pub fn new() -> Self {
        Self { block_dc: BlockDc::new(), hilbert: Hilbert::new(), real_delay: Delay::new() }
    }

    pub fn push(&mut self, x: f32) -> Complex<f32> {
        let dc_free = self.block_dc.push(x);
        let imag = self.hilbert.push(dc_free);
        let real = self.real_delay.push(dc_free);
        Complex::new(real, imag)
    }
}

impl Default for AnalyticFrontEnd {
    fn default() -> Self {
        Self::new()
    }
}
