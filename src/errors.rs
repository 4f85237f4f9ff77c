//! Crate-wide error type.

use std::io;
use thiserror::Error;

/// Errors that can occur while loading inputs or patching reads.
#[derive(Error, Debug)]
pub enum FixError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("track {track}: {message}")]
    Track { track: String, message: String },

    #[error("read {read}: {message}")]
    Read { read: u32, message: String },
}

pub type Result<T> = std::result::Result<T, FixError>;
