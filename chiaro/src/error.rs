//! Error types for tone mapping.

use thiserror::Error;

/// Errors that can occur while tone mapping a plane.
///
/// Invalid configuration values are not represented here: `Config::validate`
/// rejects them with a panic because they are programming errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported channel count {channels}: expected 1 (gray) or 3 (RGB)")]
    UnsupportedChannelCount { channels: usize },

    #[error("Non-finite value at index {index} in {stage}")]
    NonFinite { stage: &'static str, index: usize },

    #[error("Tone mapping was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
