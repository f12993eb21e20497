/// Parser for Go's `-coverprofile` format.
///
/// Reference: https://go.dev/blog/cover
///
/// Format:
///   mode: set|count|atomic
///   <file>:<startLine>.<startCol>,<endLine>.<endCol> <numStatements> <count>
///
/// Each line describes a basic block with the number of statements in the
/// block and how many times it was executed. Blocks are grouped per source
/// file, sorted by start position, and repeated samples for the same range
/// are folded together using the profile's mode.
use std::collections::BTreeMap;
use std::io::BufRead;
use std::sync::LazyLock;

use regex::Regex;

use super::Parser;
use crate::error::{Result, TarpError};
use crate::model::{Block, Mode, Position, Profile};

/// Pre-compiled regex for block lines. The greedy file group anchors on the
/// last `:` followed by a range, so paths containing colons still parse.
static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+):([0-9]+)\.([0-9]+),([0-9]+)\.([0-9]+) ([0-9]+) ([0-9]+)$").unwrap()
});

/// Go coverage profile parser.
pub struct GocoverParser;

impl Parser for GocoverParser {
    fn parse(&self, source: &str, input: &[u8]) -> Result<Vec<Profile>> {
        parse_reader(source, &mut &*input)
    }
}

/// Parse a Go coverage profile from raw bytes.
pub fn parse(source: &str, input: &[u8]) -> Result<Vec<Profile>> {
    GocoverParser.parse(source, input)
}

/// Parse a single block line, returning (file_path, Block).
fn parse_block_line(line: &str) -> Option<(&str, Block)> {
    let caps = BLOCK_RE.captures(line)?;
    let num = |i: usize| caps.get(i).map(|m| m.as_str());

    let file = caps.get(1)?.as_str();
    let block = Block {
        start: Position::new(num(2)?.parse().ok()?, num(3)?.parse().ok()?),
        end: Position::new(num(4)?.parse().ok()?, num(5)?.parse().ok()?),
        num_stmt: num(6)?.parse().ok()?,
        count: num(7)?.parse().ok()?,
    };
    Some((file, block))
}

fn parse_error(source: &str, line: usize, message: impl Into<String>) -> TarpError {
    TarpError::InputParse {
        path: source.to_string(),
        line,
        message: message.into(),
    }
}

fn parse_reader(source: &str, reader: &mut dyn BufRead) -> Result<Vec<Profile>> {
    let mut mode: Option<Mode> = None;
    // Blocks per file, tagged with the input line they came from.
    let mut files: BTreeMap<String, Vec<(usize, Block)>> = BTreeMap::new();

    let mut raw_line = String::new();
    let mut line_no = 0;
    loop {
        raw_line.clear();
        let n = reader
            .read_line(&mut raw_line)
            .map_err(|e| parse_error(source, line_no + 1, e.to_string()))?;
        if n == 0 {
            break;
        }
        line_no += 1;

        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(name) = line.strip_prefix("mode:") {
            let name = name.trim();
            let parsed = Mode::from_name(name)
                .ok_or_else(|| parse_error(source, line_no, format!("bad mode '{name}'")))?;
            match mode {
                None => mode = Some(parsed),
                // Concatenated profiles repeat the header.
                Some(current) if current == parsed => {}
                Some(current) => {
                    return Err(parse_error(
                        source,
                        line_no,
                        format!("mode '{parsed}' after mode '{current}'"),
                    ))
                }
            }
            continue;
        }

        if mode.is_none() {
            return Err(parse_error(source, line_no, "missing 'mode:' header"));
        }

        let (file, block) = parse_block_line(line).ok_or_else(|| {
            parse_error(source, line_no, format!("line doesn't match expected format: {line}"))
        })?;
        files
            .entry(file.to_string())
            .or_default()
            .push((line_no, block));
    }

    let mut profiles = Vec::with_capacity(files.len());
    if let Some(mode) = mode {
        for (file_name, blocks) in files {
            let mut profile = Profile::new(file_name, mode);
            profile.blocks = fold_duplicate_blocks(source, &profile, blocks)?;
            profiles.push(profile);
        }
    }
    tracing::debug!(source, profiles = profiles.len(), "parsed coverage profile");
    Ok(profiles)
}

/// Sort blocks by start and fold samples that repeat the same range.
fn fold_duplicate_blocks(
    source: &str,
    profile: &Profile,
    mut blocks: Vec<(usize, Block)>,
) -> Result<Vec<Block>> {
    blocks.sort_by_key(|(_, b)| (b.start, b.end));

    let mut folded: Vec<Block> = Vec::with_capacity(blocks.len());
    for (line_no, block) in blocks {
        match folded.last_mut() {
            Some(last) if last.same_range(&block) => {
                if last.num_stmt != block.num_stmt {
                    return Err(parse_error(
                        source,
                        line_no,
                        format!(
                            "inconsistent statement count for {}:{},{}",
                            profile.file_name, block.start, block.end
                        ),
                    ));
                }
                last.count = profile.mode.combine(last.count, block.count);
            }
            _ => folded.push(block),
        }
    }
    Ok(folded)
}
