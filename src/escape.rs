//! Escape-sequence normalization for literal chunks.
//!
//! Raw chunks keep their escape sequences textually intact and only have
//! line endings canonicalized; cooked chunks additionally expand every
//! escape. Both forms are pure functions of the chunk text.

/// Canonicalizes line endings: CRLF becomes LF. Lone CR and escape
/// sequences are left untouched.
pub fn normalize_line_endings(raw: &str) -> String {
    raw.replace("\r\n", "\n")
}

/// Expands the escape sequences of a raw chunk, producing its cooked form.
///
/// Recognized escapes: `\uXXXX` (4 hex digits), `\xXX` (2 hex digits),
/// octal `\0`..`\377` (a leading digit of 4-7 takes at most one more),
/// line continuations (backslash + line terminator, elided), and the
/// single-character escapes `n r t v f b`. Any other escaped character maps
/// to itself, including a `\u`/`\x` with too few hex digits.
pub fn expand_escape_sequences(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(i) = rest.find('\\') {
        out.push_str(&rest[..i]);
        let tail = &rest[i + 1..];
        let consumed = expand_one(&mut out, tail);
        rest = &tail[consumed..];
    }
    out.push_str(rest);
    out
}

/// Expands the escape starting right after a backslash, returning how many
/// bytes of `tail` it consumed.
fn expand_one(out: &mut String, tail: &str) -> usize {
    let mut chars = tail.chars();
    let Some(first) = chars.next() else {
        // A trailing backslash; kept as-is.
        out.push('\\');
        return 0;
    };
    match first {
        'u' if hex_prefix(tail, 1, 4).is_some() => {
            push_code_point(out, hex_prefix(tail, 1, 4).unwrap());
            5
        }
        'x' if hex_prefix(tail, 1, 2).is_some() => {
            push_code_point(out, hex_prefix(tail, 1, 2).unwrap());
            3
        }
        '0'..='7' => {
            let mut value = first as u32 - '0' as u32;
            // Cap at \377 so the result stays within one byte.
            let extra = if value <= 3 { 2 } else { 1 };
            let mut consumed = 1;
            for c in chars.take(extra) {
                if !('0'..='7').contains(&c) {
                    break;
                }
                value = value * 8 + (c as u32 - '0' as u32);
                consumed += 1;
            }
            push_code_point(out, value);
            consumed
        }
        // Line continuation: the backslash and the terminator are elided.
        '\r' => {
            if tail[1..].starts_with('\n') {
                2
            } else {
                1
            }
        }
        '\n' | '\u{2028}' | '\u{2029}' => first.len_utf8(),
        'n' => {
            out.push('\n');
            1
        }
        'r' => {
            out.push('\r');
            1
        }
        't' => {
            out.push('\t');
            1
        }
        'v' => {
            out.push('\x0b');
            1
        }
        'f' => {
            out.push('\x0c');
            1
        }
        'b' => {
            out.push('\x08');
            1
        }
        other => {
            out.push(other);
            other.len_utf8()
        }
    }
}

/// Parses exactly `len` ASCII hex digits at byte offset `at`.
fn hex_prefix(tail: &str, at: usize, len: usize) -> Option<u32> {
    let digits = tail.get(at..at + len)?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Escapes that decode to an unpaired surrogate have no `char`
/// representation; they degrade to U+FFFD.
fn push_code_point(out: &mut String, value: u32) {
    out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
}
