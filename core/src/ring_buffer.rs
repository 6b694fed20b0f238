//! Fixed-capacity sliding window of complex samples that always exposes a contiguous
//! view of its most recent `CAPACITY` samples — a "bip buffer".
//!
//! Generalizes the fixed-capacity, index/length bookkeeping of a classic circular
//! buffer (compare `williamyang98-dab-ofdm-rust`'s `CircularBucket`) into a buffer
//! that never makes the caller deal with wraparound: every push mirrors the write
//! into a second copy offset by `CAPACITY` within one backing array, so a window of
//! length `CAPACITY` read starting at the current write cursor is always contiguous.

use rustfft::num_complex::Complex;

pub struct RingWindow<const CAPACITY: usize> {
    cursor: usize,
    filled: usize,
    backing: Vec<Complex<f32>>,
}

impl<const CAPACITY: usize> RingWindow<CAPACITY> {
    pub fn new() -> Self {
        Self {
            cursor: 0,
            filled: 0,
            backing: vec![Complex::new(0.0, 0.0); 2 * CAPACITY],
        }
    }

    /// Admits one sample, overwriting the oldest.
    pub fn push(&mut self, sample: Complex<f32>) {
        self.backing[self.cursor] = sample;
        self.backing[self.cursor + CAPACITY] = sample;
        self.cursor = (self.cursor + 1) % CAPACITY;
        if self.filled < CAPACITY {
            self.filled += 1;
        }
    }

    pub fn is_full(&self) -> bool {
        self.filled == CAPACITY
    }

    /// Returns a contiguous, oldest-first view of the most recent `CAPACITY` samples.
    /// Valid from construction: positions not yet written hold the zero sample the
    /// backing array was initialized with, the same way a freshly started receiver
    /// sees silence rather than garbage.
    pub fn view(&self) -> &[Complex<f32>] {
        &self.backing[self.cursor..self.cursor + CAPACITY]
    }
}

impl<const CAPACITY: usize> Default for RingWindow<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
