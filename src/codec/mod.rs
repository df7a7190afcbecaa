//! Content codecs: conversion between coded text and external notations.
//!
//! Three notation families are supported:
//!
//! - [`generic`]: numeric tags (`<1>`, `</1>`, `<2/>`)
//! - [`letter`]: letter-coded tags (`<g1>`, `</g1>`, `<x2/>`, `<b3/>`, `<e3/>`)
//! - [`interchange`]: TM-interchange paired/placeholder tags (`<bpt>`,
//!   `<ept>`, `<ph>`, `<it>`)
//!
//! [`position`] maps offsets in a rendered notation string back to offsets in
//! the plain content.

pub mod generic;
pub mod interchange;
pub mod letter;
pub mod position;

/// How quote characters are escaped in rendered markup.
///
/// The numbering follows the conventional quote modes 0-3.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuoteMode {
    /// Mode 0: no quote escaped.
    None,
    /// Mode 1: `'` to `&apos;` and `"` to `&quot;`.
    #[default]
    All,
    /// Mode 2: `'` to `&#39;` and `"` to `&quot;`.
    NumericSingleQuotes,
    /// Mode 3: only `"` to `&quot;`.
    DoubleOnly,
}

/// Escapes text for embedding in a markup notation.
///
/// `<` and `&` are always escaped; `>` is escaped when `escape_gt` is set, or
/// when it directly follows `]`; quotes follow the [`QuoteMode`]. A carriage
/// return is a literal in markup context and becomes `&#13;`.
#[must_use]
pub fn escape_xml(text: &str, quote_mode: QuoteMode, escape_gt: bool) -> String {
    escape_xml_with_encoder(text, quote_mode, escape_gt, |_| true)
}

/// Escapes text for embedding in a markup notation, additionally replacing
/// any character rejected by `can_encode` with a numeric character reference.
///
/// Unencodable characters are never an error: they degrade to `&#x…;` and
/// processing continues.
#[must_use]
pub fn escape_xml_with_encoder<F>(
    text: &str,
    quote_mode: QuoteMode,
    escape_gt: bool,
    can_encode: F,
) -> String
where
    F: Fn(char) -> bool,
{
    let mut out = String::with_capacity(text.len());
    let mut prev = '\0';
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => {
                if escape_gt || prev == ']' {
                    out.push_str("&gt;");
                } else {
                    out.push('>');
                }
            }
            '&' => out.push_str("&amp;"),
            '\r' => out.push_str("&#13;"),
            '"' => {
                if quote_mode == QuoteMode::None {
                    out.push('"');
                } else {
                    out.push_str("&quot;");
                }
            }
            '\'' => match quote_mode {
                QuoteMode::All => out.push_str("&apos;"),
                QuoteMode::NumericSingleQuotes => out.push_str("&#39;"),
                QuoteMode::None | QuoteMode::DoubleOnly => out.push('\''),
            },
            _ => {
                if ch.is_ascii() || can_encode(ch) {
                    out.push(ch);
                } else if u32::from(ch) > 0xFFFF {
                    out.push_str(&format!("&#x{:x};", u32::from(ch)));
                } else {
                    out.push_str(&format!("&#x{:04x};", u32::from(ch)));
                }
            }
        }
        prev = ch;
    }
    out
}

/// Reverses [`escape_xml`]: resolves the named references produced by the
/// escaper and numeric character references.
#[must_use]
pub fn unescape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let end = match rest.find(';') {
            Some(end) => end,
            None => break,
        };
        let entity = &rest[1..end];
        let resolved = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => parse_char_ref(entity),
        };
        match resolved {
            Some(ch) => {
                out.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                // Not a recognized reference: keep the ampersand literal.
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn parse_char_ref(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let value = if let Some(hex) = digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<u32>().ok()?
    };
    char::from_u32(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_angle_brackets_and_ampersand() {
        assert_eq!(
            escape_xml("a < b & c", QuoteMode::None, false),
            "a &lt; b &amp; c"
        );
    }

    #[test]
    fn gt_escaped_only_after_bracket_unless_forced() {
        assert_eq!(escape_xml("a > b", QuoteMode::None, false), "a > b");
        assert_eq!(escape_xml("a]> b", QuoteMode::None, false), "a]&gt; b");
        assert_eq!(escape_xml("a > b", QuoteMode::None, true), "a &gt; b");
    }

    #[test]
    fn quote_modes() {
        let text = r#"it's "here""#;
        assert_eq!(escape_xml(text, QuoteMode::None, false), r#"it's "here""#);
        assert_eq!(
            escape_xml(text, QuoteMode::All, false),
            "it&apos;s &quot;here&quot;"
        );
        assert_eq!(
            escape_xml(text, QuoteMode::NumericSingleQuotes, false),
            "it&#39;s &quot;here&quot;"
        );
        assert_eq!(
            escape_xml(text, QuoteMode::DoubleOnly, false),
            "it's &quot;here&quot;"
        );
    }

    #[test]
    fn unencodable_chars_become_numeric_references() {
        let escaped = escape_xml_with_encoder("café", QuoteMode::None, false, |ch| ch != 'é');
        assert_eq!(escaped, "caf&#x00e9;");
        let astral = escape_xml_with_encoder("a\u{1F600}b", QuoteMode::None, false, |ch| ch.is_ascii());
        assert_eq!(astral, "a&#x1f600;b");
    }

    #[test]
    fn unescape_reverses_escape() {
        let text = r#"a < b & "c" > 'd'"#;
        let escaped = escape_xml(text, QuoteMode::All, true);
        assert_eq!(unescape_xml(&escaped), text);
        assert_eq!(unescape_xml("caf&#x00e9;"), "café");
        assert_eq!(unescape_xml("caf&#233;"), "café");
        assert_eq!(unescape_xml(&escape_xml("a\rb", QuoteMode::None, false)), "a\rb");
    }

    #[test]
    fn unescape_keeps_unknown_references_literal() {
        assert_eq!(unescape_xml("a &unknown; b"), "a &unknown; b");
        assert_eq!(unescape_xml("a & b"), "a & b");
    }
}
