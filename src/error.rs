use std::path::PathBuf;

use thiserror::Error;

use crate::model::Mode;

#[derive(Error, Debug)]
pub enum TarpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {path} at line {line}: {message}")]
    InputParse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("Cannot merge '{unit}': mode '{incoming}' conflicts with '{existing}'")]
    ModeConflict {
        unit: String,
        existing: Mode,
        incoming: Mode,
    },

    #[error("Inconsistent blocks for '{unit}': {message}")]
    BlockMismatch { unit: String, message: String },

    #[error("Cannot resolve package for '{unit}': {message}")]
    Resolution { unit: String, message: String },

    #[error("Can't read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Source {} is not valid UTF-8 (first bad byte at {offset})", .path.display())]
    Encoding { path: PathBuf, offset: usize },

    #[error("Malformed coverage boundaries: {0}")]
    AnnotationConsistency(String),
}

pub type Result<T> = std::result::Result<T, TarpError>;
