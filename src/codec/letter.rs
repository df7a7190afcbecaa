//! Letter-coded notation codec.
//!
//! Renders in-line codes as letter-prefixed tags: `<g1>…</g1>` for paired
//! spans, `<x2/>` for placeholders, and `<b3/>`/`<e3/>` for isolated
//! opening/closing codes. This is the interchange spelling used by editors
//! that expect OmegaT-style inline markup.
//!
//! Content that already contains literal occurrences of the scheme's own
//! syntax is protected by the escaping transform: a tag-shaped literal is
//! shifted by one extra prefix letter on encode ([`escape`]) and un-shifted
//! on decode ([`unescape`]), so `<g1>` as text round-trips as `<gg1>` and is
//! never mistaken for a live code.

use crate::code::{Code, TagRole};
use crate::fragment::{CodedText, Marker, Segment};
use crate::patterns;

/// Renders the fragment in letter-coded notation.
///
/// With `escape_letter_codes` set, plain-text runs are passed through
/// [`escape`] before rendering so literal tag-shaped text survives a decode.
#[must_use]
pub fn encode(fragment: &CodedText, escape_letter_codes: bool) -> String {
    let mut out = String::new();
    for segment in fragment.segments() {
        match segment {
            Segment::Plain(run) => {
                if escape_letter_codes {
                    out.push_str(&escape(run));
                } else {
                    out.push_str(run);
                }
            }
            Segment::Code { marker, index } => {
                if let Some(code) = fragment.code(*index) {
                    out.push_str(&tag_for(code.id, code.tag_role, *marker));
                }
            }
        }
    }
    out
}

/// The letter-coded tag a code renders as, given its embedding marker.
pub(crate) fn tag_for(id: i32, tag_role: TagRole, marker: Marker) -> String {
    match marker {
        Marker::Opening => format!("<g{id}>"),
        Marker::Closing => format!("</g{id}>"),
        Marker::Isolated => match tag_role {
            TagRole::Opening => format!("<b{id}/>"),
            TagRole::Closing => format!("<e{id}/>"),
            TagRole::Placeholder => format!("<x{id}/>"),
        },
    }
}

/// Escapes literal occurrences of letter-coded syntax by shifting the prefix
/// letter run one longer (`<g1>` to `<gg1>`, `<xx2/>` to `<xxx2/>`).
#[must_use]
pub fn escape(text: &str) -> String {
    let paired = patterns::LETTER_PAIRED_ESCAPE.replace_all(text, |caps: &regex::Captures<'_>| {
        format!("<{}g{}>", &caps[1], &caps[2])
    });
    patterns::LETTER_ISOLATED_ESCAPE
        .replace_all(&paired, |caps: &regex::Captures<'_>| {
            let letters = &caps[1];
            let first = &letters[..1];
            format!("<{first}{letters}{}/>", &caps[2])
        })
        .into_owned()
}

/// Reverses [`escape`] by shifting the prefix letter run one shorter.
#[must_use]
pub fn unescape(text: &str) -> String {
    let paired =
        patterns::LETTER_PAIRED_UNESCAPE.replace_all(text, |caps: &regex::Captures<'_>| {
            format!("<{}{}>", &caps[1], &caps[2])
        });
    patterns::LETTER_ISOLATED_UNESCAPE
        .replace_all(&paired, |caps: &regex::Captures<'_>| {
            let letters = &caps[1];
            format!("<{}{}/>", &letters[1..], &caps[2])
        })
        .into_owned()
}

/// Converts a letter-coded text to a fragment.
///
/// Codes are created from the parsed tags. With `existing` supplied, a code
/// whose external id is found there is cloned instead (opening/placeholder
/// ids match non-closing codes, closing ids match closing codes); ids absent
/// from `existing` still synthesize a new code, so the conversion never
/// fails. The `existing` fragment is read-only: the result is always a fresh
/// fragment.
///
/// With `unescape_letter_codes` set, the escaping transform is reversed on
/// the plain-text runs left after tag extraction; this must match the
/// `escape_letter_codes` flag used when the text was encoded.
#[must_use]
pub fn decode(
    text: &str,
    existing: Option<&CodedText>,
    unescape_letter_codes: bool,
) -> CodedText {
    let mut fragment = CodedText::new();

    // Case with no in-line codes.
    if !text.contains('<') {
        fragment.append_text(text);
        return fragment;
    }

    let mut rest = text;
    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some((id, len)) = capture_id(&patterns::LETTER_OPENING, rest) {
                let code = reuse_or_new(existing, id, false, || {
                    Code::with_id(id, TagRole::Opening, "Xpt", &rest[..len])
                });
                fragment.push_code_ref(code, Marker::Opening);
                rest = &rest[len..];
                continue;
            }
            if let Some((id, len)) = capture_id(&patterns::LETTER_CLOSING, rest) {
                let code = reuse_or_new(existing, id, true, || {
                    Code::with_id(id, TagRole::Closing, "Xpt", &rest[..len])
                });
                fragment.push_code_ref(code, Marker::Closing);
                rest = &rest[len..];
                continue;
            }
            if let Some((id, len)) = capture_id(&patterns::LETTER_ISOLATED, rest) {
                let code = reuse_or_new(existing, id, false, || {
                    Code::with_id(id, TagRole::Placeholder, "Xph", &rest[..len])
                });
                fragment.push_code_ref(code, Marker::Isolated);
                rest = &rest[len..];
                continue;
            }
            if let Some((id, len)) = capture_id(&patterns::GENERIC_ISOLATED_OPENING, rest) {
                let code = reuse_or_new(existing, id, false, || {
                    Code::with_id(id, TagRole::Opening, "Xpt", &rest[..len])
                });
                fragment.push_code_ref(code, Marker::Isolated);
                rest = &rest[len..];
                continue;
            }
            if let Some((id, len)) = capture_id(&patterns::GENERIC_ISOLATED_CLOSING, rest) {
                let code = reuse_or_new(existing, id, true, || {
                    Code::with_id(id, TagRole::Closing, "Xpt", &rest[..len])
                });
                fragment.push_code_ref(code, Marker::Isolated);
                rest = &rest[len..];
                continue;
            }
        }
        push_char(&mut fragment, ch);
        rest = &rest[ch.len_utf8()..];
    }

    if unescape_letter_codes {
        for segment in &mut fragment.segments {
            if let Segment::Plain(run) = segment {
                *run = unescape(run);
            }
        }
    }
    fragment
}

fn push_char(fragment: &mut CodedText, ch: char) {
    let mut buf = [0u8; 4];
    fragment.append_text(ch.encode_utf8(&mut buf));
}

fn capture_id(pattern: &regex::Regex, rest: &str) -> Option<(i32, usize)> {
    let caps = pattern.captures(rest)?;
    let id = caps[1].parse::<i32>().ok()?;
    Some((id, caps[0].len()))
}

/// Clone-if-found, else synthesize: looks up a code by external id in the
/// read-only `existing` fragment.
fn reuse_or_new<F>(existing: Option<&CodedText>, id: i32, closing: bool, synthesize: F) -> Code
where
    F: FnOnce() -> Code,
{
    existing
        .and_then(|fragment| {
            fragment
                .codes
                .iter()
                .find(|code| (code.tag_role == TagRole::Closing) == closing && code.id == id)
        })
        .cloned()
        .unwrap_or_else(synthesize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold_and_image_fragment() -> CodedText {
        let mut fragment = CodedText::new();
        let mut open = Code::new(TagRole::Opening, "bold", "<b>");
        open.id = 7;
        fragment.push_code_ref(open, Marker::Opening);
        fragment.append_text("bold text");
        let mut close = Code::new(TagRole::Closing, "bold", "</b>");
        close.id = 7;
        fragment.push_code_ref(close, Marker::Closing);
        let mut image = Code::new(TagRole::Placeholder, "image", "<img/>");
        image.id = 3;
        fragment.push_code_ref(image, Marker::Isolated);
        fragment
    }

    #[test]
    fn encode_renders_letter_tags() {
        let fragment = bold_and_image_fragment();
        assert_eq!(encode(&fragment, false), "<g7>bold text</g7><x3/>");
    }

    #[test]
    fn decode_reconstructs_equivalent_fragment() {
        let fragment = bold_and_image_fragment();
        let decoded = decode("<g7>bold text</g7><x3/>", None, false);
        assert_eq!(decoded.plain_text(), "bold text");
        assert_eq!(decoded.codes().len(), 3);
        assert_eq!(decoded.codes()[0].tag_role, TagRole::Opening);
        assert_eq!(decoded.codes()[0].id, 7);
        assert_eq!(decoded.codes()[1].tag_role, TagRole::Closing);
        assert_eq!(decoded.codes()[1].id, 7);
        assert_eq!(decoded.codes()[2].tag_role, TagRole::Placeholder);
        assert_eq!(decoded.codes()[2].id, 3);
        assert_eq!(encode(&decoded, false), encode(&fragment, false));
    }

    #[test]
    fn decode_reuses_existing_codes() {
        let fragment = bold_and_image_fragment();
        let decoded = decode("<x3/><g7>rearranged</g7>", Some(&fragment), false);
        assert_eq!(decoded.codes()[0].kind, "image");
        assert_eq!(decoded.codes()[0].data, "<img/>");
        assert_eq!(decoded.codes()[1].kind, "bold");
        assert_eq!(decoded.codes()[1].data, "<b>");
        assert_eq!(decoded.codes()[2].kind, "bold");
        assert_eq!(decoded.codes()[2].data, "</b>");
    }

    #[test]
    fn decode_synthesizes_missing_codes() {
        let fragment = bold_and_image_fragment();
        let decoded = decode("<g9>new</g9>", Some(&fragment), false);
        assert_eq!(decoded.codes()[0].kind, "Xpt");
        assert_eq!(decoded.codes()[0].id, 9);
        assert_eq!(decoded.codes()[0].data, "<g9>");
    }

    #[test]
    fn isolated_letter_tags_keep_their_role() {
        let decoded = decode("a<b5/>b<e5/>c", None, false);
        assert_eq!(decoded.codes()[0].tag_role, TagRole::Opening);
        assert_eq!(decoded.codes()[1].tag_role, TagRole::Closing);
        assert_eq!(encode(&decoded, false), "a<b5/>b<e5/>c");
    }

    #[test]
    fn escape_shifts_prefix_letters() {
        assert_eq!(escape("a <g1> b"), "a <gg1> b");
        assert_eq!(escape("</g12>"), "</gg12>");
        assert_eq!(escape("<x2/><bb4/>"), "<xx2/><bbb4/>");
    }

    #[test]
    fn unescape_reverses_escape() {
        let samples = [
            "plain text",
            "a <g1> b </g1>",
            "<x2/>",
            "<gg3> already escaped",
            "<e9/><b10/>",
            "mixed <g1><x2/></g1> and <ggg5>",
        ];
        for sample in samples {
            assert_eq!(unescape(&escape(sample)), sample, "sample: {sample}");
        }
    }

    #[test]
    fn escaped_literal_survives_round_trip() {
        let mut fragment = CodedText::new();
        fragment.append_text("literal <g1> is not a code");
        let encoded = encode(&fragment, true);
        assert_eq!(encoded, "literal <gg1> is not a code");
        let decoded = decode(&encoded, None, true);
        assert!(!decoded.has_code());
        assert_eq!(decoded.plain_text(), "literal <g1> is not a code");
    }
}
