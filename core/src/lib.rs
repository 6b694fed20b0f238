//! Acoustic data modem receiver: Schmidl–Cox OFDM/QPSK preamble detection and
//! Polar/Hadamard forward error correction.
//!
//! This crate implements the receive side only. There is no public encoder: the
//! wire format is fixed by the transmitter this receiver was built to interoperate
//! with, and `Decoder` is the only supported entry point.

pub mod analytic;
pub mod correlator;
pub mod decoder;
pub mod dsp;
pub mod error;
pub mod hadamard;
pub mod mls;
pub mod polar;
pub mod psk;
pub mod ring_buffer;
pub mod xorshift;

pub use decoder::Decoder;
pub use error::{AudioModemError, Result};

/// Samples per OFDM symbol (FFT size).
pub const SYMBOL_LENGTH: usize = 256;
/// Cyclic-prefix guard interval, in samples.
pub const GUARD_LENGTH: usize = 32;
/// `SYMBOL_LENGTH + GUARD_LENGTH`: one OFDM symbol including its cyclic prefix.
pub const EXTENDED_LENGTH: usize = SYMBOL_LENGTH + GUARD_LENGTH;
/// Number of data-bearing subcarriers.
pub const SUBCARRIER_COUNT: usize = 64;
/// Index of the first data-bearing subcarrier (DC and low bins are left unused).
pub const FIRST_SUBCARRIER: usize = 16;
/// Bits per modulated subcarrier (QPSK).
pub const MOD_BITS: usize = 2;
/// Number of OFDM symbols carrying the Polar-coded payload.
pub const PAYLOAD_SYMBOLS: usize = 32;
/// Soft bits carried by the metadata (Hadamard-coded) symbol.
pub const META_LEN: usize = 128;

/// `log2` of the Polar code length.
pub const CODE_ORDER: usize = 12;
/// Polar codeword length, `1 << CODE_ORDER`.
pub const CODE_LEN: usize = 1 << CODE_ORDER;
/// Decoded payload size, in bytes.
pub const MESG_BYTES: usize = 256;

/// Hadamard order (`HadamardDecoder<HADAMARD_ORDER>` decodes the metadata symbol).
pub const HADAMARD_ORDER: usize = 8;

/// Tap count of the analytic front end's DC-block and Hilbert FIR stages.
pub const FILTER_LENGTH: usize = 33;
/// Capacity, in samples, of the receiver's sliding detection window.
pub const BUFFER_LENGTH: usize = 1440;
/// Offset within the sliding window at which the correlator searches for a preamble.
pub const SEARCH_POSITION: usize = 576;

/// Generator polynomial for the maximum-length sequence used as the correlator's
/// frequency-domain reference pattern.
pub const MLS_POLYNOMIAL: u32 = 0b1100111;

/// Fixed seed shared by the transmitter's scrambler and this receiver's descrambler.
pub const XORSHIFT_SEED: u32 = xorshift::XORSHIFT_SEED;
