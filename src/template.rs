//! `%`-substitution for report strings.
//!
//! ```text
//! %w          single-character name "w"
//! %[width]    bracketed name "width"
//! %[] %[      invalid, eaten without output
//! trailing %  kept literally
//! ```
//!
//! Names are resolved by a caller-supplied mapping, so the same expander
//! serves any property table. See [`crate::wand::Wand::format_string`] for the
//! image one.

use std::borrow::Cow;

/// Expand every `%name` in `template` through `mapping`.
///
/// Returns the input unchanged (borrowed) if it contains no substitutions.
pub fn expand<F>(template: &str, mut mapping: F) -> Cow<'_, str>
where
    F: FnMut(&str) -> String,
{
    let mut out: Option<String> = None;
    // Start of the literal run not yet copied to `out`.
    let mut copied = 0;
    let mut pos = 0;

    while let Some(offset) = template[pos..].find('%') {
        let at = pos + offset;
        let rest = &template[at + 1..];
        if rest.is_empty() {
            break;
        }
        let buf = out.get_or_insert_with(|| String::with_capacity(template.len() * 2));
        buf.push_str(&template[copied..at]);

        let (name, width) = parse_name(rest);
        if let Some(name) = name {
            buf.push_str(&mapping(name));
        }
        pos = at + 1 + width;
        copied = pos;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&template[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(template),
    }
}

/// Name following a `%` and the number of bytes it spans. `None` means
/// invalid bracket syntax, whose bytes are dropped.
fn parse_name(rest: &str) -> (Option<&str>, usize) {
    if let Some(inner) = rest.strip_prefix('[') {
        return match inner.find(']') {
            Some(0) => (None, 2),
            Some(end) => (Some(&inner[..end]), end + 2),
            None => (None, 1),
        };
    }
    // Non-empty: the caller checked.
    let len = rest.chars().next().map_or(1, char::len_utf8);
    (Some(&rest[..len]), len)
}
