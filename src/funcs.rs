//! Function extents and their statement coverage.

use std::path::Path;

use crate::error::Result;
use crate::model::{Position, Profile};

/// The source range of one function declaration, from the `func` keyword
/// to just past its closing brace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncExtent {
    pub name: String,
    pub start: Position,
    pub end: Position,
}

impl FuncExtent {
    /// Statements of `profile` inside this function: (covered, total).
    /// Blocks are sorted, so the scan stops at the first block past the end.
    pub fn coverage(&self, profile: &Profile) -> (u64, u64) {
        let mut covered = 0u64;
        let mut total = 0u64;
        for b in &profile.blocks {
            if b.start >= self.end {
                break;
            }
            if b.end <= self.start {
                continue;
            }
            let n = u64::from(b.num_stmt);
            total += n;
            if b.count > 0 {
                covered += n;
            }
        }
        (covered, total)
    }
}

/// Enumerates the functions declared in a source file.
pub trait FunctionExtractor {
    fn extract_functions(&self, path: &Path, src: &[u8]) -> Result<Vec<FuncExtent>>;
}

/// Finds top-level `func` declarations in Go source without a full parse.
///
/// Comments, interpreted and raw strings, and rune literals are skipped.
/// `struct{...}` and `interface{...}` in a signature are not mistaken for the
/// body. Declarations without a body (assembly stubs) are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoFuncExtractor;

impl FunctionExtractor for GoFuncExtractor {
    fn extract_functions(&self, path: &Path, src: &[u8]) -> Result<Vec<FuncExtent>> {
        let funcs = scan_funcs(src);
        tracing::debug!(path = %path.display(), funcs = funcs.len(), "extracted functions");
        Ok(funcs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind<'a> {
    Ident(&'a [u8]),
    Punct(u8),
    Literal,
    Newline,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: Kind<'a>,
    pos: Position,
}

struct Lexer<'a> {
    src: &'a [u8],
    i: usize,
    pos: Position,
}

impl<'a> Lexer<'a> {
    fn peek(&self, k: usize) -> Option<u8> {
        self.src.get(self.i + k).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek(0)?;
        self.i += 1;
        if b == b'\n' {
            self.pos = Position::new(self.pos.line + 1, 1);
        } else {
            self.pos.col += 1;
        }
        Some(b)
    }

    fn skip_quoted(&mut self, quote: u8) {
        while let Some(c) = self.bump() {
            match c {
                b'\\' => {
                    self.bump();
                }
                b'\n' => break,
                c if c == quote => break,
                _ => {}
            }
        }
    }

    fn tokenize(mut self) -> Vec<Token<'a>> {
        let mut toks = Vec::new();
        while let Some(b) = self.peek(0) {
            let pos = self.pos;
            let kind = match b {
                b'\n' => {
                    self.bump();
                    Kind::Newline
                }
                b' ' | b'\t' | b'\r' => {
                    self.bump();
                    continue;
                }
                b'/' if self.peek(1) == Some(b'/') => {
                    while self.peek(0).is_some_and(|c| c != b'\n') {
                        self.bump();
                    }
                    continue;
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    self.bump();
                    self.bump();
                    let mut newline = false;
                    loop {
                        match self.bump() {
                            None => break,
                            Some(b'*') if self.peek(0) == Some(b'/') => {
                                self.bump();
                                break;
                            }
                            Some(b'\n') => newline = true,
                            Some(_) => {}
                        }
                    }
                    if !newline {
                        continue;
                    }
                    Kind::Newline
                }
                b'"' | b'\'' => {
                    self.bump();
                    self.skip_quoted(b);
                    Kind::Literal
                }
                b'`' => {
                    self.bump();
                    while self.bump().is_some_and(|c| c != b'`') {}
                    Kind::Literal
                }
                c if is_ident_byte(c) => {
                    let src = self.src;
                    let start = self.i;
                    while self.peek(0).is_some_and(is_ident_byte) {
                        self.bump();
                    }
                    Kind::Ident(&src[start..self.i])
                }
                c => {
                    self.bump();
                    Kind::Punct(c)
                }
            };
            toks.push(Token { kind, pos });
        }
        toks
    }
}

fn is_ident_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c >= 0x80
}

fn scan_funcs(src: &[u8]) -> Vec<FuncExtent> {
    let toks = Lexer {
        src,
        i: 0,
        pos: Position::new(1, 1),
    }
    .tokenize();

    let mut funcs = Vec::new();
    let mut depth = 0usize;
    let mut line_start = true;
    let mut i = 0;
    while let Some(tok) = toks.get(i) {
        match tok.kind {
            Kind::Newline => {
                line_start = true;
                i += 1;
                continue;
            }
            Kind::Ident(b"func") if depth == 0 && line_start => {
                if let Some((func, next)) = parse_func(&toks, i) {
                    funcs.push(func);
                    i = next;
                    line_start = false;
                    continue;
                }
            }
            Kind::Punct(b'{') => depth += 1,
            Kind::Punct(b'}') => depth = depth.saturating_sub(1),
            _ => {}
        }
        line_start = false;
        i += 1;
    }
    funcs
}

/// Parse the declaration whose `func` keyword is at `toks[i]`, returning
/// the extent and the index of the token after the closing brace.
fn parse_func(toks: &[Token<'_>], i: usize) -> Option<(FuncExtent, usize)> {
    let start = toks[i].pos;
    let mut name: Option<&[u8]> = None;
    let mut nesting = 0i32;
    let mut j = i + 1;

    let body = loop {
        let tok = toks.get(j)?;
        match tok.kind {
            Kind::Ident(ident) if name.is_none() && nesting == 0 => name = Some(ident),
            Kind::Ident(b"struct" | b"interface")
                if matches!(toks.get(j + 1).map(|t| t.kind), Some(Kind::Punct(b'{'))) =>
            {
                j = skip_braces(toks, j + 1)?;
                continue;
            }
            Kind::Punct(b'(' | b'[') => nesting += 1,
            Kind::Punct(b')' | b']') => nesting -= 1,
            Kind::Punct(b'{') if nesting == 0 => break j,
            Kind::Punct(b'{') => {
                j = skip_braces(toks, j)?;
                continue;
            }
            Kind::Newline if nesting == 0 => return None,
            _ => {}
        }
        j += 1;
    };

    let next = skip_braces(toks, body)?;
    let close = toks[next - 1].pos;
    let func = FuncExtent {
        name: String::from_utf8_lossy(name.unwrap_or(b"_")).into_owned(),
        start,
        end: Position::new(close.line, close.col + 1),
    };
    Some((func, next))
}

/// `toks[open]` is `{`; return the index just past its matching `}`.
fn skip_braces(toks: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (j, tok) in toks.iter().enumerate().skip(open) {
        match tok.kind {
            Kind::Punct(b'{') => depth += 1,
            Kind::Punct(b'}') => {
                depth -= 1;
                if depth == 0 {
                    return Some(j + 1);
                }
            }
            _ => {}
        }
    }
    None
}
