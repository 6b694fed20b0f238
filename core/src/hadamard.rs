//! Soft Hadamard-code decoder.
//!
//! `HadamardDecoder<ORDER>` decodes an `ORDER`-bit value from a length
//! `1 << (ORDER - 1)` biorthogonal Walsh–Hadamard codeword: `ORDER - 1` bits select
//! one of the `1 << (ORDER - 1)` Hadamard rows (found as the index of the transform's
//! largest-magnitude coefficient) and the remaining bit is the sign of that
//! coefficient. Implemented as a standard in-place fast Hadamard transform (FHT),
//! `O(n log n)`, matching the "template-parameterized DSP primitive" guidance for
//! components like this one that are otherwise fixed by compile-time constants.

pub struct HadamardDecoder<const ORDER: usize>;

impl<const ORDER: usize> HadamardDecoder<ORDER> {
    pub const CODE_LEN: usize = 1 << (ORDER - 1);

    /// Runs the forward/inverse Walsh–Hadamard transform in place (the transform is
    /// its own inverse up to a constant scale, so one routine serves encode and
    /// decode).
    pub fn transform(values: &mut [f32]) {
        debug_assert_eq!(values.len(), Self::CODE_LEN);
        let n = values.len();
        let mut h = 1;
        while h < n {
            let mut i = 0;
            while i < n {
                for j in i..i + h {
                    let x = values[j];
                    let y = values[j + h];
                    values[j] = x + y;
                    values[j + h] = x - y;
                }
                i += h * 2;
            }
            h *= 2;
        }
    }

    /// Decodes a soft codeword into the `ORDER`-bit value it encodes.
    pub fn decode(bits: &[i8]) -> i32 {
        debug_assert_eq!(bits.len(), Self::CODE_LEN);
        let mut values: Vec<f32> = bits.iter().map(|&b| b as f32).collect();
        Self::transform(&mut values);

        let mut peak_index = 0;
        let mut peak_value = values[0];
        for (i, &v) in values.iter().enumerate() {
            if v.abs() > peak_value.abs() {
                peak_index = i;
                peak_value = v;
            }
        }
        let sign_bit = if peak_value < 0.0 { 1 } else { 0 };
        ((sign_bit << (ORDER - 1)) | peak_index) as i32
    }

    /// Encodes a value into a codeword of `+1`/`-1` chips (used only by test
    /// fixtures — encoding is out of scope for this crate's public surface).
    #[cfg(test)]
    pub fn encode(value: i32) -> Vec<i8> {
        let index = (value as usize) & (Self::CODE_LEN - 1);
        let sign = (value >> (ORDER - 1)) & 1;
        let mut impulse = vec![0.0_f32; Self::CODE_LEN];
        impulse[index] = if sign == 1 { -1.0 } else { 1.0 };
        Self::transform(&mut impulse);
        impulse.into_iter().map(|v| v.clamp(-1.0, 1.0) as i8).collect()
    }
}
