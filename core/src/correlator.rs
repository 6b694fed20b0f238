//! Schmidl–Cox preamble correlator: timing detection, integer and fractional
//! carrier-frequency-offset (CFO) estimation.
//!
//! Translated directly from the reference C++ `SchmidlCox` template (autocorrelation
//! over a half-symbol, a Schmitt-triggered peak tracker, then a frequency-domain
//! cross-correlation against a known MLS-derived sequence to resolve integer CFO and
//! sub-sample timing).

use crate::dsp::{ComplexSma, Delay, FallingEdgeTrigger, Nco, SchmittTrigger, Sma};
use crate::mls::Mls;
use crate::{FIRST_SUBCARRIER, GUARD_LENGTH, SUBCARRIER_COUNT, SYMBOL_LENGTH};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

const MATCH_LEN: usize = GUARD_LENGTH | 1;
const MATCH_DEL: usize = (MATCH_LEN - 1) / 2;
const INDEX_MAX_CAP: usize = SYMBOL_LENGTH + GUARD_LENGTH + MATCH_DEL;

/// `demod_or_erase(curr, prev)`: divides out the previous symbol's phase/amplitude,
/// erasing (returning zero) when the reference has no energy or the result falls
/// outside the transmitter's expected dynamic range.
pub fn demod_or_erase(curr: Complex<f32>, prev: Complex<f32>) -> Complex<f32> {
    if !(prev.norm_sqr() > 0.0) {
        return Complex::new(0.0, 0.0);
    }
    let cons = curr / prev;
    if !(cons.norm_sqr() <= 4.0) {
        return Complex::new(0.0, 0.0);
    }
    cons
}

fn bin(carrier: isize) -> usize {
    (((carrier % SYMBOL_LENGTH as isize) + SYMBOL_LENGTH as isize) % SYMBOL_LENGTH as isize) as usize
}

/// Builds the frequency-domain reference sequence: an MLS-driven ±1 pattern placed on
/// the data subcarriers, all other bins zero.
pub(crate) fn reference_spectrum() -> [Complex<f32>; SYMBOL_LENGTH] {
    let mut freq = [Complex::new(0.0, 0.0); SYMBOL_LENGTH];
    let mut seq = Mls::new(crate::MLS_POLYNOMIAL);
    for i in (FIRST_SUBCARRIER + 1)..(FIRST_SUBCARRIER + SUBCARRIER_COUNT) {
        let bit = seq.next_bit();
        let nrz = if bit { -1.0 } else { 1.0 };
        freq[i] = Complex::new(nrz, 0.0);
    }
    freq
}

pub struct SchmidlCox {
    fwd: Arc<dyn Fft<f32>>,
    bwd: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    cor: ComplexSma<SYMBOL_LENGTH>,
    pwr: Sma<SYMBOL_LENGTH>,
    match_filter: Sma<MATCH_LEN>,
    align: Delay<MATCH_DEL>,
    threshold: SchmittTrigger,
    falling: FallingEdgeTrigger,
    tmp0: [Complex<f32>; SYMBOL_LENGTH],
    tmp1: [Complex<f32>; SYMBOL_LENGTH],
    kern: [Complex<f32>; SYMBOL_LENGTH],
    timing_max: f32,
    phase_max: f32,
    index_max: usize,
    /// Sample position (within the correlator's own view) of the detected symbol.
    pub symbol_pos: isize,
    /// Estimated residual carrier-frequency offset, radians/sample, in `(-pi, pi]`.
    pub cfo_rad: f32,
    pub frac_cfo: f32,
}

impl SchmidlCox {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fwd = planner.plan_fft_forward(SYMBOL_LENGTH);
        let bwd = planner.plan_fft_inverse(SYMBOL_LENGTH);
        let scratch_len = fwd.get_inplace_scratch_len().max(bwd.get_inplace_scratch_len());

        let mut kern = reference_spectrum();
        fwd.process(&mut kern);
        for k in kern.iter_mut() {
            *k = k.conj() / SYMBOL_LENGTH as f32;
        }

        Self {
            fwd,
            bwd,
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            cor: ComplexSma::new(),
            pwr: Sma::new(),
            match_filter: Sma::new(),
            align: Delay::new(),
            threshold: SchmittTrigger::new(0.2 * MATCH_LEN as f32, 0.3 * MATCH_LEN as f32),
            falling: FallingEdgeTrigger::new(),
            tmp0: [Complex::new(0.0, 0.0); SYMBOL_LENGTH],
            tmp1: [Complex::new(0.0, 0.0); SYMBOL_LENGTH],
            kern,
            timing_max: 0.0,
            phase_max: 0.0,
            index_max: 0,
            symbol_pos: crate::SEARCH_POSITION as isize,
            cfo_rad: 0.0,
            frac_cfo: 0.0,
        }
    }

    /// Evaluates the correlator against `search_position`/`search_position +
    /// symbol_length` of `window`. Returns `true` exactly when a new detection was
    /// published to `symbol_pos`/`cfo_rad`.
    pub fn push(&mut self, window: &[Complex<f32>], search_position: usize) -> bool {
        let a = window[search_position];
        let b = window[search_position + SYMBOL_LENGTH];

        let p = self.cor.push(a * b.conj());
        let min_r = 0.00001 * SYMBOL_LENGTH as f32;
        let r = (0.5 * self.pwr.push(a.norm_sqr() + b.norm_sqr())).max(min_r);
        let timing = self.match_filter.push(p.norm_sqr() / (r * r));
        let phase = self.align.push(p.arg());

        let collect = self.threshold.push(timing);
        let process = self.falling.push(collect);

        if !collect && !process {
            return false;
        }

        if self.timing_max < timing {
            self.timing_max = timing;
            self.phase_max = phase;
            self.index_max = MATCH_DEL;
        } else if self.index_max < INDEX_MAX_CAP {
            self.index_max += 1;
        } else if process {
            self.index_max = 0;
            self.timing_max = 0.0;
            return false;
        }

        if !process {
            return false;
        }

        self.frac_cfo = self.phase_max / SYMBOL_LENGTH as f32;
        let test_pos = search_position as isize - self.index_max as isize;
        self.index_max = 0;
        self.timing_max = 0.0;

        if test_pos < 0 {
            return false;
        }
        let test_pos = test_pos as usize;

        let mut nco = Nco::new();
        nco.set_omega(self.frac_cfo);
        for i in 0..SYMBOL_LENGTH {
            self.tmp1[i] = window[test_pos + i] * nco.next();
        }
        self.fwd.process_with_scratch(&mut self.tmp1, &mut self.scratch);
        self.tmp0.copy_from_slice(&self.tmp1);
        for i in 0..SYMBOL_LENGTH {
            self.tmp1[i] = demod_or_erase(self.tmp0[i], self.tmp0[bin(i as isize - 1)]);
        }
        self.fwd.process_with_scratch(&mut self.tmp1, &mut self.scratch);
        self.tmp0.copy_from_slice(&self.tmp1);
        for i in 0..SYMBOL_LENGTH {
            self.tmp0[i] *= self.kern[i];
        }
        self.tmp1.copy_from_slice(&self.tmp0);
        self.bwd.process_with_scratch(&mut self.tmp1, &mut self.scratch);

        let mut shift = 0;
        let mut peak = 0.0_f32;
        let mut next = 0.0_f32;
        for (i, c) in self.tmp1.iter().enumerate() {
            let power = c.norm_sqr();
            if power > peak {
                next = peak;
                peak = power;
                shift = i;
            } else if power > next {
                next = power;
            }
        }
        if peak <= next * 4.0 {
            return false;
        }

        let pos_err = (self.tmp1[shift].arg() * SYMBOL_LENGTH as f32 / (2.0 * std::f32::consts::PI))
            .round() as isize;
        if pos_err.unsigned_abs() > GUARD_LENGTH / 2 {
            return false;
        }
        self.symbol_pos = test_pos as isize - pos_err;

        let mut cfo_rad = shift as f32 * (2.0 * std::f32::consts::PI / SYMBOL_LENGTH as f32) - self.frac_cfo;
        if cfo_rad >= std::f32::consts::PI {
            cfo_rad -= 2.0 * std::f32::consts::PI;
        }
        self.cfo_rad = cfo_rad;
        true
    }
}

impl Default for SchmidlCox {
    fn default() -> Self {
        Self::new()
    }
}
