//! Rewrites quoted string literals into expressions that rebuild them at runtime.

use std::fmt::Write;

/// Literals shorter than this (in characters, as written) are left as-is.
pub const MIN_LITERAL_CHARS: usize = 3;

/// Returns the replacement expression for a literal body, or `None` when the
/// literal should be kept verbatim (too short, or escapes that cannot be decoded).
pub fn encode_literal(body: &str) -> Option<String> {
    if body.chars().count() < MIN_LITERAL_CHARS {
        return None;
    }
    let bytes = decode_escapes(body)?;
    Some(byte_builder(&bytes))
}

fn byte_builder(bytes: &[u8]) -> String {
    let mut list = String::with_capacity(bytes.len() * 4);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            list.push(',');
        }
        let _ = write!(list, "{}", b);
    }
    // Outer parentheses keep the call a single expression in every position,
    // including string-call syntax such as `require "mod"`.
    format!(
        "((function()local t={{{}}}local s=''for i=1,#t do s=s..string.char(t[i])end return s end)())",
        list
    )
}

/// Decodes Lua escape sequences into the byte string the literal denotes.
pub fn decode_escapes(body: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        match chars.next()? {
            'a' => out.push(0x07),
            'b' => out.push(0x08),
            'f' => out.push(0x0c),
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            'v' => out.push(0x0b),
            '\\' => out.push(b'\\'),
            '"' => out.push(b'"'),
            '\'' => out.push(b'\''),
            nl @ ('\n' | '\r') => {
                // "\r\n" and "\n\r" count as a single line break
                if let Some(&next) = chars.peek() {
                    if (next == '\n' || next == '\r') && next != nl {
                        chars.next();
                    }
                }
                out.push(b'\n');
            }
            'z' => {
                while chars.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                    chars.next();
                }
            }
            'x' => {
                let hi = chars.next()?.to_digit(16)?;
                let lo = chars.next()?.to_digit(16)?;
                out.push((hi * 16 + lo) as u8);
            }
            'u' => {
                if chars.next()? != '{' {
                    return None;
                }
                let mut code: u32 = 0;
                let mut digits = 0;
                loop {
                    let c = chars.next()?;
                    if c == '}' {
                        break;
                    }
                    code = code.checked_mul(16)?.checked_add(c.to_digit(16)?)?;
                    digits += 1;
                }
                if digits == 0 {
                    return None;
                }
                let mut buf = [0u8; 4];
                out.extend_from_slice(char::from_u32(code)?.encode_utf8(&mut buf).as_bytes());
            }
            d if d.is_ascii_digit() => {
                let mut value = d.to_digit(10)?;
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(10)) {
                        Some(next) => {
                            value = value * 10 + next;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(u8::try_from(value).ok()?);
            }
            _ => return None,
        }
    }

    Some(out)
}
