//! Naming contract between the generated driver and a migration source.
//!
//! A migration source for version `V` defines
//!
//! ```text
//! pub fn Up_V(tx: &mut Transaction<'_>) -> R
//! pub fn Down_V(tx: &mut Transaction<'_>) -> R
//! ```
//!
//! where `R` is `()` or `Result<(), E>` with `E: Display`. The driver calls the
//! entry point by name, so the name is the whole interface.

use crate::error::RenderError;
use codemigrate_types::Direction;

/// `Up_<version>` or `Down_<version>`.
pub fn entry_point_name(direction: Direction, version: i64) -> String {
    format!("{}_{}", direction.entry_prefix(), version)
}

/// Check that `source` declares `fn <entry_point>`.
///
/// Comments and literal contents are blanked out first, so only code counts.
/// The check is otherwise lexical: it catches a missing or misnumbered entry
/// point before a toolchain run, while signature mismatches are still
/// reported by the compiler.
pub fn validate_entry_point(source: &str, entry_point: &str) -> Result<(), RenderError> {
    let code = code_only(source);
    let needle = format!("fn {}", entry_point);
    let declared = code.match_indices(&needle).any(|(idx, _)| {
        let starts_item = code[..idx]
            .chars()
            .next_back()
            .is_none_or(char::is_whitespace);
        let rest = code[idx + needle.len()..].trim_start();
        starts_item && (rest.starts_with('(') || rest.starts_with('<'))
    });

    if declared {
        Ok(())
    } else {
        Err(RenderError::MissingEntryPoint {
            entry_point: entry_point.to_string(),
        })
    }
}

/// Replace every comment and string or char literal with a single space.
fn code_only(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    while i < chars.len() {
        let next = chars.get(i + 1).copied();
        let skip_to = match chars[i] {
            '/' if next == Some('/') => Some(line_comment_end(&chars, i)),
            '/' if next == Some('*') => Some(block_comment_end(&chars, i)),
            '"' => Some(quoted_end(&chars, i + 1)),
            'r' => raw_string_end(&chars, i),
            '\'' => char_literal_end(&chars, i),
            _ => None,
        };
        match skip_to {
            Some(end) => {
                out.push(' ');
                i = end;
            }
            None => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }
    out
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Index of the newline ending the comment; the newline itself is kept.
fn line_comment_end(chars: &[char], start: usize) -> usize {
    chars[start..]
        .iter()
        .position(|&c| c == '\n')
        .map_or(chars.len(), |offset| start + offset)
}

fn block_comment_end(chars: &[char], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < chars.len() {
        match (chars[i], chars.get(i + 1)) {
            ('/', Some('*')) => {
                depth += 1;
                i += 2;
            }
            ('*', Some('/')) => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    chars.len()
}

/// End of a `"`-delimited literal whose body starts at `body`.
fn quoted_end(chars: &[char], body: usize) -> usize {
    let mut i = body;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '"' => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// End of `r"..."`, `r#"..."#` or `br#"..."#` starting at the `r`, if it is one.
fn raw_string_end(chars: &[char], start: usize) -> Option<usize> {
    let prefix_ok = match start.checked_sub(1).map(|p| chars[p]) {
        None => true,
        Some('b') => start
            .checked_sub(2)
            .is_none_or(|p| !is_ident_char(chars[p])),
        Some(prev) => !is_ident_char(prev),
    };
    if !prefix_ok {
        return None;
    }
    let hashes = chars[start + 1..].iter().take_while(|&&c| c == '#').count();
    let open = start + 1 + hashes;
    if chars.get(open) != Some(&'"') {
        return None;
    }
    let mut i = open + 1;
    while i < chars.len() {
        if chars[i] == '"'
            && chars[i + 1..].iter().take_while(|&&c| c == '#').count() >= hashes
        {
            return Some(i + 1 + hashes);
        }
        i += 1;
    }
    Some(chars.len())
}

/// End of a char literal starting at `start`; `None` for a lifetime.
fn char_literal_end(chars: &[char], start: usize) -> Option<usize> {
    match chars.get(start + 1) {
        Some('\\') => chars
            .get(start + 3..)?
            .iter()
            .position(|&c| c == '\'')
            .map(|offset| start + 3 + offset + 1),
        Some(&c) if c != '\'' && chars.get(start + 2) == Some(&'\'') => Some(start + 3),
        _ => None,
    }
}
