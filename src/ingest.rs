use std::path::{Path, PathBuf};

use crate::error::{Result, TarpError};
use crate::merge::ProfileMerger;
use crate::model::Profile;
use crate::parsers::gocover::GocoverParser;
use crate::parsers::Parser;

/// Read and parse every coverage file, merging records for the same unit
/// across files. Units keep the order in which they were first seen.
pub fn read_profiles<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Profile>> {
    let mut merger = ProfileMerger::new();
    for path in paths {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|source| TarpError::Read {
            path: PathBuf::from(path),
            source,
        })?;

        let profiles = GocoverParser.parse(&path.display().to_string(), &content)?;
        let (covered, total) = profiles.iter().fold((0, 0), |(c, t), p| {
            let (pc, pt) = p.statements();
            (c + pc, t + pt)
        });
        tracing::info!(
            input = %path.display(),
            profiles = profiles.len(),
            covered,
            total,
            "read coverage file"
        );
        for profile in profiles {
            merger.add(profile)?;
        }
    }
    if merger.is_empty() {
        tracing::warn!("no coverage blocks in any input");
    } else {
        tracing::debug!(units = merger.len(), "merged inputs");
    }
    Ok(merger.into_profiles())
}
