use std::io;

use thiserror::Error;

/// Errors reported by this crate.
///
/// Rendering never fails on malformed input, so the only failures are
/// configuration problems detected at construction time and I/O errors from
/// the output sink.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid per logger level rule: {0}")]
    InvalidRule(String),

    #[error("invalid level: {text:?}: {reason}")]
    InvalidLevel { text: String, reason: &'static str },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
