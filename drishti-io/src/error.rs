//! Error types for DrishtiIO.

use thiserror::Error;

/// Errors raised by point sources.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scanner init failed: {0}")]
    Init(String),

    #[error("Parse error at line {line}: {msg}")]
    Parse { line: usize, msg: String },

    #[error("Capture format error: {0}")]
    Capture(String),

    #[error("No callback registered before start")]
    NoCallback,
}

pub type Result<T> = std::result::Result<T, Error>;
