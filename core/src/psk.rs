//! QPSK constellation mapping and hard/soft demodulation.
//!
//! Generalizes the teacher's BPSK threshold pattern (`ofdm_cp.rs`:
//! `phase_compensated.re > 0.0`) to two independent Gray-coded axes, and adds a soft
//! (precision-scaled) decision since the payload path feeds a Polar decoder rather
//! than a hard-threshold bit sink.

use rustfft::num_complex::Complex;

const HALF_SQRT2: f32 = std::f32::consts::FRAC_1_SQRT_2;

pub struct Qpsk;

impl Qpsk {
    /// Maps two bits (each `0` or nonzero) to a unit-energy QPSK symbol.
    pub fn map(bits: [i8; 2]) -> Complex<f32> {
        let i = if bits[0] <= 0 { HALF_SQRT2 } else { -HALF_SQRT2 };
        let q = if bits[1] <= 0 { HALF_SQRT2 } else { -HALF_SQRT2 };
        Complex::new(i, q)
    }

    /// Hard bit decision by quadrant.
    pub fn hard(c: Complex<f32>) -> [i8; 2] {
        [if c.re < 0.0 { 1 } else { -1 }, if c.im < 0.0 { 1 } else { -1 }]
    }

    /// Soft bit decision: each axis scaled by `precision` and clamped into `i8`.
    pub fn soft(out: &mut [i8], c: Complex<f32>, precision: f32) {
        out[0] = scale(-c.re, precision);
        out[1] = scale(-c.im, precision);
    }
}

fn scale(value: f32, precision: f32) -> i8 {
    let scaled = (value * precision).round();
    scaled.clamp(i8::MIN as f32, i8::MAX as f32) as i8
}
