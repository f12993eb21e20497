//! Rendering source bytes as HTML with coverage spans.
//!
//! [`boundaries`] turns a profile's line/column blocks into byte offsets,
//! and [`annotate`] walks the source once, escaping text and inserting a
//! `<span>` for every region.

use crate::error::{Result, TarpError};
use crate::model::{Boundary, Position, Profile};

/// Compute the start and end offsets of every block in `profile` within
/// `src`, in ascending offset order.
///
/// Start boundaries carry a density `norm`: `0.8` when no block ran more
/// than once, otherwise `ln(count) / ln(max)`. A block still open at the
/// end of the source is closed at `src.len()`.
pub fn boundaries(profile: &Profile, src: &[u8]) -> Vec<Boundary> {
    let max = profile.max_count();
    let divisor = (max as f64).ln();
    let start = |offset: usize, count: u64| {
        let norm = if max <= 1 {
            0.8
        } else if count > 0 {
            (count as f64).ln() / divisor
        } else {
            0.0
        };
        Boundary {
            offset,
            start: true,
            count,
            norm,
        }
    };
    let end = |offset: usize| Boundary {
        offset,
        start: false,
        count: 0,
        norm: 0.0,
    };

    let mut out = Vec::with_capacity(profile.blocks.len() * 2);
    let mut here = Position::new(1, 1);
    let mut si = 0;
    let mut bi = 0;
    let mut open = false;
    while let Some(block) = profile.blocks.get(bi) {
        if !open && here >= block.start {
            out.push(start(si, block.count));
            open = true;
        }
        if open && here >= block.end {
            out.push(end(si));
            open = false;
            bi += 1;
            // The next block may start at this same offset.
            continue;
        }
        let Some(&byte) = src.get(si) else {
            break;
        };
        if byte == b'\n' {
            here = Position::new(here.line + 1, 1);
        } else {
            here.col += 1;
        }
        si += 1;
    }
    if open {
        out.push(end(src.len()));
    }
    out
}

/// Escape `src` and wrap every boundary region in a coverage span.
///
/// Boundaries must be sorted by offset. An empty list yields the escaped
/// text unchanged. Any other list must be balanced: every start needs a
/// later matching end, so a single lone start is rejected as well as an
/// unmatched end. Those cases, like source bytes that are not UTF-8 or a
/// boundary inside a multi-byte character, are a
/// [`TarpError::AnnotationConsistency`]. Source bytes are never replaced.
pub fn annotate(src: &[u8], boundaries: &[Boundary]) -> Result<String> {
    if let Err(e) = std::str::from_utf8(src) {
        return Err(TarpError::AnnotationConsistency(format!(
            "source is not valid UTF-8 at byte {}",
            e.valid_up_to()
        )));
    }
    let mut out: Vec<u8> = Vec::with_capacity(src.len() + boundaries.len() * 24);
    let mut cursor = 0;
    let mut depth = 0usize;

    for b in boundaries {
        if b.offset < cursor {
            return Err(TarpError::AnnotationConsistency(format!(
                "boundary at offset {} after offset {cursor}",
                b.offset
            )));
        }
        if b.offset > src.len() {
            return Err(TarpError::AnnotationConsistency(format!(
                "boundary at offset {} past end of source ({} bytes)",
                b.offset,
                src.len()
            )));
        }

        escape_into(&mut out, &src[cursor..b.offset]);
        cursor = b.offset;

        if b.start {
            let tag = format!(r#"<span class="cov{}" title="{}">"#, b.tier(), b.count);
            out.extend_from_slice(tag.as_bytes());
            depth += 1;
        } else {
            depth = depth.checked_sub(1).ok_or_else(|| {
                TarpError::AnnotationConsistency(format!(
                    "region end at offset {} without a start",
                    b.offset
                ))
            })?;
            out.extend_from_slice(b"</span>");
        }
    }
    escape_into(&mut out, &src[cursor..]);

    if depth != 0 {
        return Err(TarpError::AnnotationConsistency(format!(
            "{depth} region(s) left open at end of source"
        )));
    }
    String::from_utf8(out).map_err(|_| {
        TarpError::AnnotationConsistency("boundary splits a UTF-8 character".to_string())
    })
}

/// Escape text for use in HTML content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn escape_into(out: &mut Vec<u8>, text: &[u8]) {
    for &byte in text {
        match byte {
            b'&' => out.extend_from_slice(b"&amp;"),
            b'<' => out.extend_from_slice(b"&lt;"),
            b'>' => out.extend_from_slice(b"&gt;"),
            b'"' => out.extend_from_slice(b"&quot;"),
            b'\'' => out.extend_from_slice(b"&#39;"),
            b => out.push(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, Mode};

    fn start(offset: usize, count: u64) -> Boundary {
        Boundary {
            offset,
            start: true,
            count,
            norm: 0.8,
        }
    }

    fn end(offset: usize) -> Boundary {
        Boundary {
            offset,
            start: false,
            count: 0,
            norm: 0.0,
        }
    }

    fn block(start: (u32, u32), end: (u32, u32), count: u64) -> Block {
        Block {
            start: Position::new(start.0, start.1),
            end: Position::new(end.0, end.1),
            num_stmt: 1,
            count,
        }
    }

    #[test]
    fn wraps_region_and_keeps_newline() {
        let html = annotate(b"ab\ncd", &[start(0, 1), end(2)]).unwrap();
        assert_eq!(html, "<span class=\"cov8\" title=\"1\">ab</span>\ncd");
    }

    #[test]
    fn escapes_reserved_characters() {
        let html = annotate(br#"a<b> && "c" 'd'"#, &[]).unwrap();
        assert_eq!(html, "a&lt;b&gt; &amp;&amp; &quot;c&quot; &#39;d&#39;");
    }

    #[test]
    fn no_boundaries_is_plain_escaped_text() {
        let src = b"line 1\nline <2>\n";
        let html = annotate(src, &[]).unwrap();
        assert_eq!(html, "line 1\nline &lt;2&gt;\n");
        assert_eq!(html.lines().count(), 2);
    }

    #[test]
    fn multibyte_text_is_kept_intact() {
        let src = "// café ünïcode\nx".as_bytes();
        let html = annotate(src, &[start(0, 1), end(src.len())]).unwrap();
        assert_eq!(
            html,
            "<span class=\"cov8\" title=\"1\">// café ünïcode\nx</span>"
        );
        assert!(!html.contains('\u{FFFD}'));
    }

    #[test]
    fn invalid_utf8_is_rejected_not_replaced() {
        let err = annotate(b"// caf\xe9\nx", &[]).unwrap_err();
        match err {
            TarpError::AnnotationConsistency(msg) => assert!(msg.contains("byte 6"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn boundary_inside_a_character_is_rejected() {
        // "é" is two bytes; offset 2 falls between them.
        let err = annotate("xé".as_bytes(), &[start(2, 1), end(3)]).unwrap_err();
        assert!(matches!(err, TarpError::AnnotationConsistency(_)));
    }

    #[test]
    fn lone_start_is_rejected() {
        let err = annotate(b"abc", &[start(1, 1)]).unwrap_err();
        assert!(matches!(err, TarpError::AnnotationConsistency(_)));
    }

    #[test]
    fn escape_html_keeps_non_ascii() {
        assert_eq!(escape_html("<ü & 'ß'>"), "&lt;ü &amp; &#39;ß&#39;&gt;");
    }

    #[test]
    fn zero_width_region() {
        let html = annotate(b"ab", &[start(1, 0), end(1)]).unwrap();
        assert_eq!(html, "a<span class=\"cov0\" title=\"0\"></span>b");
    }

    #[test]
    fn adjacent_regions_share_an_offset() {
        let html = annotate(b"abcd", &[start(0, 1), end(2), start(2, 0), end(4)]).unwrap();
        assert_eq!(
            html,
            "<span class=\"cov8\" title=\"1\">ab</span><span class=\"cov0\" title=\"0\">cd</span>"
        );
    }

    #[test]
    fn unmatched_start_is_rejected() {
        let err = annotate(b"abc", &[start(0, 1), end(1), start(2, 1)]).unwrap_err();
        assert!(matches!(err, TarpError::AnnotationConsistency(_)));
    }

    #[test]
    fn unmatched_end_is_rejected() {
        let err = annotate(b"abc", &[end(1)]).unwrap_err();
        assert!(matches!(err, TarpError::AnnotationConsistency(_)));
    }

    #[test]
    fn out_of_range_or_unsorted_is_rejected() {
        assert!(annotate(b"ab", &[start(0, 1), end(5)]).is_err());
        assert!(annotate(b"abcd", &[start(3, 1), end(1)]).is_err());
    }

    #[test]
    fn boundaries_from_line_columns() {
        let src = b"package p\n\nfunc f() {\n\tx()\n}\n";
        let mut profile = Profile::new("p/f.go", Mode::Count);
        profile.blocks.push(block((3, 10), (5, 2), 3));

        let bs = boundaries(&profile, src);
        assert_eq!(bs.len(), 2);
        assert!(bs[0].start);
        assert_eq!(bs[0].offset, 20);
        assert_eq!(bs[0].count, 3);
        assert!(!bs[1].start);
        assert_eq!(bs[1].offset, 28);
        assert_eq!(&src[20..28], b"{\n\tx()\n}");
    }

    #[test]
    fn boundaries_normalize_against_max_count() {
        let src = b"aaaa\nbbbb\ncccc\n";
        let mut profile = Profile::new("f.go", Mode::Count);
        profile.blocks.push(block((1, 1), (1, 5), 0));
        profile.blocks.push(block((2, 1), (2, 5), 1));
        profile.blocks.push(block((3, 1), (3, 5), 100));

        let bs = boundaries(&profile, src);
        let tiers: Vec<u8> = bs.iter().filter(|b| b.start).map(Boundary::tier).collect();
        assert_eq!(tiers, [0, 1, 10]);
    }

    #[test]
    fn set_mode_profiles_use_fixed_density() {
        let mut profile = Profile::new("f.go", Mode::Set);
        profile.blocks.push(block((1, 1), (1, 3), 1));
        let bs = boundaries(&profile, b"ab\n");
        assert_eq!(bs[0].tier(), 8);
    }

    #[test]
    fn block_open_at_eof_is_closed() {
        let mut profile = Profile::new("f.go", Mode::Set);
        profile.blocks.push(block((1, 1), (1, 9), 1));
        let bs = boundaries(&profile, b"ab");
        assert_eq!(bs.len(), 2);
        assert_eq!(bs[1].offset, 2);
        assert!(annotate(b"ab", &bs).is_ok());
    }

    #[test]
    fn end_to_end_annotation_round_trips_text() {
        let src = b"package p\n\nfunc f() {\n\tif a < b {\n\t\tg()\n\t}\n}\n";
        let mut profile = Profile::new("p/f.go", Mode::Count);
        profile.blocks.push(block((3, 10), (4, 12), 4));
        profile.blocks.push(block((4, 12), (6, 3), 0));
        profile.blocks.push(block((6, 3), (7, 2), 4));

        let html = annotate(src, &boundaries(&profile, src)).unwrap();
        assert_eq!(html.matches("<span").count(), 3);
        assert_eq!(html.matches("</span>").count(), 3);
        assert_eq!(html.lines().count(), 7);
        assert!(html.contains("a &lt; b"));
    }
}
