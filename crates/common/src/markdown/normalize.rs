// Markdown layout normalization for stable rendering of generated documents.
//
// Generated legal text often inlines enumerations ("as follows: 1. ... 2. ...")
// and omits the blank lines CommonMark needs before lists and headings. The
// pass here is line-based and idempotent.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

fn inline_enumeration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([.:;])\s+([0-9]+\.|[a-zA-Z]\.)\s+")
            .expect("inline enumeration pattern should compile")
    })
}

fn list_item_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:[-*+]\s+|[0-9]+\.\s+|[a-zA-Z]\.\s+)")
            .expect("list item pattern should compile")
    })
}

fn heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^#{1,6}\s+").expect("heading pattern should compile"))
}

/// Returns true when the (already trimmed) line starts a bullet, numbered or
/// lettered list item.
pub fn is_list_item(trimmed: &str) -> bool {
    list_item_pattern().is_match(trimmed)
}

/// Returns true when the (already trimmed) line is an ATX heading.
pub fn is_heading(trimmed: &str) -> bool {
    heading_pattern().is_match(trimmed)
}

/// Normalize markdown layout.
///
/// Rules, applied per line:
/// - Split inline enumerations after `.`, `:` or `;` onto their own lines
/// - Insert a blank line before a list that follows non-list text
/// - Insert a blank line before a heading that follows non-blank text
/// - Strip surrounding whitespace from headings
///
/// All other lines pass through unchanged.
pub fn normalize(markdown: &str) -> String {
    let mut result: Vec<String> = Vec::new();

    for raw_line in markdown.split('\n') {
        for line in split_inline_enumerations(raw_line) {
            let trimmed = line.trim();
            let (prev_blank, prev_list) = match result.last() {
                Some(prev) => (prev.trim().is_empty(), is_list_item(prev.trim())),
                None => (true, false),
            };
            let list_item = is_list_item(trimmed);
            let heading = is_heading(trimmed);

            if (list_item && !prev_blank && !prev_list) || (heading && !prev_blank) {
                result.push(String::new());
            }

            if heading {
                result.push(trimmed.to_string());
            } else {
                result.push(line);
            }
        }
    }

    result.join("\n")
}

/// Append a markdown hard line break (two trailing spaces) to every
/// non-blank line that does not already end with one.
pub fn apply_hard_line_breaks(markdown: &str) -> String {
    markdown
        .split('\n')
        .map(|line| {
            if line.trim().is_empty() || line.ends_with("  ") {
                Cow::Borrowed(line)
            } else {
                Cow::Owned(format!("{line}  "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split one input line into the lines produced by inline enumeration markers.
///
/// The punctuation stays on the current line and the marker starts the next
/// one, followed by a single space. Splitting repeats until no match remains,
/// so `"a. b. c"` style chains split fully. Segments started by a marker also
/// split at the successor marker (`1.` → `2.`, `a.` → `b.`) even without
/// preceding punctuation.
fn split_inline_enumerations(line: &str) -> Vec<String> {
    let pattern = inline_enumeration_pattern();
    let mut lines = Vec::new();
    let mut rest = line.to_string();
    let mut rest_starts_with_marker = false;

    loop {
        let Some(captures) = pattern.captures(&rest) else {
            push_segment(&mut lines, rest, rest_starts_with_marker);
            break;
        };

        let (Some(whole), Some(punctuation), Some(marker)) =
            (captures.get(0), captures.get(1), captures.get(2))
        else {
            push_segment(&mut lines, rest, rest_starts_with_marker);
            break;
        };

        let head = rest[..punctuation.end()].to_string();
        let next = format!("{} {}", marker.as_str(), &rest[whole.end()..]);

        push_segment(&mut lines, head, rest_starts_with_marker);
        rest = next;
        rest_starts_with_marker = true;
    }

    lines
}

fn push_segment(lines: &mut Vec<String>, segment: String, starts_with_marker: bool) {
    if starts_with_marker {
        lines.extend(split_successor_markers(segment));
    } else {
        lines.push(segment);
    }
}

/// Split `"1. first 2. second 3. third"` at each successor marker.
fn split_successor_markers(segment: String) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = segment;

    loop {
        let Some((marker, marker_len)) = leading_marker(&current) else {
            break;
        };
        let Some(next_marker) = marker.successor() else {
            break;
        };

        let literal = next_marker.literal();
        let Ok(successor_pattern) = Regex::new(&format!(r"\s+{}\s+", regex::escape(&literal)))
        else {
            break;
        };
        let Some(found) = successor_pattern.find_at(&current, marker_len) else {
            break;
        };

        let next = format!("{literal} {}", &current[found.end()..]);
        current.truncate(found.start());
        pieces.push(current);
        current = next;
    }

    pieces.push(current);
    pieces
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Number(u64),
    Letter(char),
}

impl Marker {
    fn successor(self) -> Option<Self> {
        match self {
            Self::Number(value) => value.checked_add(1).map(Self::Number),
            Self::Letter('z' | 'Z') => None,
            Self::Letter(letter) => char::from_u32(letter as u32 + 1).map(Self::Letter),
        }
    }

    fn literal(self) -> String {
        match self {
            Self::Number(value) => format!("{value}."),
            Self::Letter(letter) => format!("{letter}."),
        }
    }
}

/// Parse the enumeration marker a segment starts with, returning the marker
/// and its byte length including the trailing `.`.
fn leading_marker(segment: &str) -> Option<(Marker, usize)> {
    let digits = segment.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        if segment.as_bytes().get(digits) != Some(&b'.') {
            return None;
        }
        let value = segment[..digits].parse().ok()?;
        return Some((Marker::Number(value), digits + 1));
    }

    let mut chars = segment.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), Some('.')) if letter.is_ascii_alphabetic() => {
            Some((Marker::Letter(letter), 2))
        }
        _ => None,
    }
}
