//! Render runtime values as Rust source literals.

use std::fmt::Write;

/// Render `bytes` as a Rust byte-string literal (`b"..."`).
///
/// Printable ASCII other than `"` and `\` is emitted verbatim, every other
/// byte as `\xNN`, so the literal is a single line of ASCII whatever the
/// payload holds.
pub fn byte_string_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 3);
    out.push_str("b\"");
    for &b in bytes {
        match b {
            b'"' | b'\\' => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\x{:02x}", b);
            }
        }
    }
    out.push('"');
    out
}

/// Render `text` as a Rust string literal.
pub fn str_literal(text: &str) -> String {
    format!("\"{}\"", text.escape_default())
}
