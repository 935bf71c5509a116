//! Error types for the Drishti engine.
//!
//! Everything surfaces to the control caller; nothing is retried inside the
//! engine. Stream-level transient conditions are the scanner's problem, and
//! the characterizer never propagates an error through the point callback —
//! it records state and lets the control thread observe it.

use thiserror::Error;

/// Engine error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Scanner error: {0}")]
    Scanner(#[from] drishti_io::Error),

    #[error("No object: clustering produced no cluster above the minimum size")]
    NoObject,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Query kernel radius must be positive (got {0})")]
    EmptyKernel(f64),

    #[error("Model format error: {0}")]
    Model(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
