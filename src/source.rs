//! Reading source files. Kept behind a trait so reports can be assembled
//! from in-memory sources.

use std::path::Path;

use crate::error::{Result, TarpError};

pub trait SourceReader {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Reads sources from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskReader;

impl SourceReader for DiskReader {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|source| TarpError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}
