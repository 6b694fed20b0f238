use thiserror::Error;

/// Failure modes for one-time construction work.
///
/// Per-sample and per-frame channel conditions (no preamble detected, metadata
/// rejected, FEC failure) are never represented here: they are ordinary `bool`/`Option`
/// return values, since they are expected outcomes of a noisy channel rather than bugs.
#[derive(Debug, Error)]
pub enum AudioModemError {
    #[error("FFT planning failed for size {0}")]
    FftPlanningFailed(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, AudioModemError>;
