//! In-memory representation of Go coverage profiles. Parsers produce
//! `Profile`s, the merger folds them together, and the annotator turns one
//! profile plus its source bytes into `Boundary` markers.

use std::fmt;

/// Compute a coverage rate, returning 0.0 when the total is zero.
#[must_use]
pub fn rate(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64
    }
}

/// Coverage as a percentage in `0.0..=100.0`, or 0.0 when nothing is
/// instrumentable.
#[must_use]
pub fn percent(covered: u64, total: u64) -> f64 {
    rate(covered, total) * 100.0
}

/// How execution counts were recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Binary hit/not-hit per block.
    Set,
    /// Cumulative hit count per block.
    Count,
    /// Like `Count`, recorded with atomic counters.
    Atomic,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Set => "set",
            Mode::Count => "count",
            Mode::Atomic => "atomic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "set" => Some(Mode::Set),
            "count" => Some(Mode::Count),
            "atomic" => Some(Mode::Atomic),
            _ => None,
        }
    }

    /// Combine two execution counts for the same block.
    ///
    /// `Set` is a logical OR normalized to 0/1. `Count` and `Atomic` add,
    /// saturating at `u64::MAX`.
    #[must_use]
    pub fn combine(&self, a: u64, b: u64) -> u64 {
        match self {
            Mode::Set => u64::from(a != 0 || b != 0),
            Mode::Count | Mode::Atomic => a.saturating_add(b),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 1-based line and byte column inside a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

impl Position {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.line, self.col)
    }
}

/// A contiguous statement range with its execution count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub start: Position,
    pub end: Position,
    pub num_stmt: u32,
    pub count: u64,
}

impl Block {
    /// Two blocks describe the same instrumented range.
    pub fn same_range(&self, other: &Block) -> bool {
        self.start == other.start && self.end == other.end
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{} {} {}",
            self.start, self.end, self.num_stmt, self.count
        )
    }
}

/// Coverage record for one source unit. Blocks are sorted by start
/// position and do not overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub file_name: String,
    pub mode: Mode,
    pub blocks: Vec<Block>,
}

impl Profile {
    pub fn new(file_name: impl Into<String>, mode: Mode) -> Self {
        Self {
            file_name: file_name.into(),
            mode,
            blocks: Vec::new(),
        }
    }

    /// Largest execution count over all blocks.
    pub fn max_count(&self) -> u64 {
        self.blocks.iter().map(|b| b.count).max().unwrap_or(0)
    }

    /// Statements in the profile, and how many of them were executed.
    pub fn statements(&self) -> (u64, u64) {
        self.blocks.iter().fold((0, 0), |(covered, total), b| {
            let n = u64::from(b.num_stmt);
            let hit = if b.count > 0 { n } else { 0 };
            (covered + hit, total + n)
        })
    }
}

/// A marker at a byte offset where a coverage region opens or closes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub offset: usize,
    pub start: bool,
    pub count: u64,
    /// Execution density in `0.0..=1.0`, meaningful on start boundaries only.
    pub norm: f64,
}

impl Boundary {
    /// Heat tier for the region: 0 when never executed, else `1..=10`.
    pub fn tier(&self) -> u8 {
        if self.count == 0 {
            0
        } else {
            ((self.norm.clamp(0.0, 1.0) * 9.0).floor() as u8) + 1
        }
    }
}
