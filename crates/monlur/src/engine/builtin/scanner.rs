//! Splits Lua source into code, comments and string literals.
//!
//! The scanner never fails: an unterminated literal or long bracket is
//! treated as plain code so arbitrary text passes through unchanged.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Code(&'a str),
    /// A single- or double-quoted literal. `raw` includes the quotes.
    Quoted { raw: &'a str, body: &'a str },
    Comment(&'a str),
    LongString(&'a str),
}

impl<'a> Segment<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            Segment::Code(s) | Segment::Comment(s) | Segment::LongString(s) => s,
            Segment::Quoted { raw, .. } => raw,
        }
    }
}

pub fn scan(source: &str) -> Vec<Segment<'_>> {
    let bytes = source.as_bytes();
    let mut segments = Vec::new();
    let mut code_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let (end, segment) = match bytes[i] {
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let end = comment_end(bytes, i + 2);
                (end, Segment::Comment(&source[i..end]))
            }
            quote @ (b'"' | b'\'') => match quoted_end(bytes, i + 1, quote) {
                Some(end) => (
                    end,
                    Segment::Quoted {
                        raw: &source[i..end],
                        body: &source[i + 1..end - 1],
                    },
                ),
                None => {
                    i += 1;
                    continue;
                }
            },
            b'[' => match long_bracket_level(bytes, i).and_then(|level| {
                long_bracket_end(bytes, i + level + 2, level)
            }) {
                Some(end) => (end, Segment::LongString(&source[i..end])),
                None => {
                    i += 1;
                    continue;
                }
            },
            _ => {
                i += 1;
                continue;
            }
        };

        if code_start < i {
            segments.push(Segment::Code(&source[code_start..i]));
        }
        segments.push(segment);
        i = end;
        code_start = end;
    }

    if code_start < bytes.len() {
        segments.push(Segment::Code(&source[code_start..]));
    }
    segments
}

/// `start` points just past the `--`. Returns the exclusive end of the comment.
fn comment_end(bytes: &[u8], start: usize) -> usize {
    if let Some(level) = long_bracket_level(bytes, start) {
        if let Some(end) = long_bracket_end(bytes, start + level + 2, level) {
            return end;
        }
    }
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|offset| start + offset)
        .unwrap_or(bytes.len())
}

/// Finds the closing quote; backslash escapes are skipped. A raw newline ends
/// the search unsuccessfully.
fn quoted_end(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut j = start;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'\n' => return None,
            b if b == quote => return Some(j + 1),
            _ => j += 1,
        }
    }
    None
}

/// If `[` `=`* `[` starts at `i`, returns the number of `=`.
fn long_bracket_level(bytes: &[u8], i: usize) -> Option<usize> {
    if bytes.get(i) != Some(&b'[') {
        return None;
    }
    let level = bytes[i + 1..].iter().take_while(|&&b| b == b'=').count();
    (bytes.get(i + 1 + level) == Some(&b'[')).then_some(level)
}

fn long_bracket_end(bytes: &[u8], start: usize, level: usize) -> Option<usize> {
    let mut j = start;
    while j < bytes.len() {
        if bytes[j] == b']' {
            let equals = bytes[j + 1..].iter().take_while(|&&b| b == b'=').count();
            if equals == level && bytes.get(j + 1 + level) == Some(&b']') {
                return Some(j + level + 2);
            }
        }
        j += 1;
    }
    None
}
