//! Folding many coverage profiles into one profile per source unit.
//!
//! Profiles are keyed by exact file name. The first occurrence of a unit
//! fixes its position in the output, so the merged list keeps insertion
//! order rather than being sorted.

use std::collections::HashMap;

use crate::error::{Result, TarpError};
use crate::model::{Block, Profile};

/// Accumulates profiles from any number of inputs.
#[derive(Debug, Default)]
pub struct ProfileMerger {
    profiles: Vec<Profile>,
    index: HashMap<String, usize>,
}

impl ProfileMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `next` into the working list.
    ///
    /// A unit seen for the first time is appended unchanged. Otherwise its
    /// mode must match the existing record and every incoming block must
    /// name a range the existing record already has.
    pub fn add(&mut self, next: Profile) -> Result<()> {
        let Some(&i) = self.index.get(&next.file_name) else {
            self.index.insert(next.file_name.clone(), self.profiles.len());
            self.profiles.push(next);
            return Ok(());
        };

        let into = &mut self.profiles[i];
        if into.mode != next.mode {
            return Err(TarpError::ModeConflict {
                unit: next.file_name,
                existing: into.mode,
                incoming: next.mode,
            });
        }

        for block in &next.blocks {
            merge_block(into, block)?;
        }
        tracing::debug!(
            unit = %into.file_name,
            blocks = next.blocks.len(),
            "merged duplicate profile"
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn into_profiles(self) -> Vec<Profile> {
        self.profiles
    }
}

/// Merge one profile into an already merged list, returning the new list.
pub fn merge(existing: Vec<Profile>, next: Profile) -> Result<Vec<Profile>> {
    let mut merger = ProfileMerger::new();
    for profile in existing {
        merger.add(profile)?;
    }
    merger.add(next)?;
    Ok(merger.into_profiles())
}

/// Merge every profile, left to right.
pub fn merge_all(profiles: impl IntoIterator<Item = Profile>) -> Result<Vec<Profile>> {
    let mut merger = ProfileMerger::new();
    for profile in profiles {
        merger.add(profile)?;
    }
    Ok(merger.into_profiles())
}

fn merge_block(into: &mut Profile, block: &Block) -> Result<()> {
    let mismatch = |message: String| TarpError::BlockMismatch {
        unit: into.file_name.clone(),
        message,
    };

    let found = into
        .blocks
        .binary_search_by_key(&(block.start, block.end), |b| (b.start, b.end));
    let Ok(i) = found else {
        return Err(mismatch(format!("no block at {},{}", block.start, block.end)));
    };

    let target = &into.blocks[i];
    if target.num_stmt != block.num_stmt {
        return Err(mismatch(format!(
            "block {},{} has {} statements, incoming has {}",
            block.start, block.end, target.num_stmt, block.num_stmt
        )));
    }

    let count = into.mode.combine(target.count, block.count);
    into.blocks[i].count = count;
    Ok(())
}
