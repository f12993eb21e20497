#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tarp::error::{Result, TarpError};
use tarp::funcs::{FuncExtent, FunctionExtractor};
use tarp::model::Position;
use tarp::source::SourceReader;
use tempfile::TempDir;

/// Create a temp dir holding the given files. The caller must hold onto
/// `TempDir` to keep the directory alive.
pub fn write_files(files: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = Vec::new();
    for (name, contents) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        paths.push(path);
    }
    (dir, paths)
}

/// Sources served from memory, keyed by path.
#[derive(Default)]
pub struct MemorySources(pub HashMap<PathBuf, Vec<u8>>);

impl MemorySources {
    pub fn with(mut self, path: &str, src: &str) -> Self {
        self.0.insert(PathBuf::from(path), src.as_bytes().to_vec());
        self
    }
}

impl SourceReader for MemorySources {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.0.get(path).cloned().ok_or_else(|| TarpError::Read {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

/// Treats the whole file as a single function.
pub struct WholeFile;

impl FunctionExtractor for WholeFile {
    fn extract_functions(&self, _path: &Path, _src: &[u8]) -> Result<Vec<FuncExtent>> {
        Ok(vec![FuncExtent {
            name: "file".to_string(),
            start: Position::new(0, 0),
            end: Position::new(u32::MAX, u32::MAX),
        }])
    }
}
