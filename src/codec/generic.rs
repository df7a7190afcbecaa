//! Generic numeric notation codec.
//!
//! Renders in-line codes as numeric tags (`<1>`, `</1>`, `<2/>`), the
//! compact display form used when exposing coded text to editors and tools.
//! Isolated references keep track of what they used to be: an orphaned
//! opening renders as `<b1/>`, an orphaned closing as `<e1/>`, and a true
//! placeholder as `<1/>`.

use crate::code::{Code, TagRole};
use crate::error::{Error, Result};
use crate::fragment::{CodedText, Marker, Segment};
use crate::patterns;

/// Renders the fragment in generic numeric notation.
#[must_use]
pub fn encode(fragment: &CodedText) -> String {
    let mut out = String::new();
    for segment in fragment.segments() {
        match segment {
            Segment::Plain(run) => out.push_str(run),
            Segment::Code { marker, index } => {
                if let Some(code) = fragment.code(*index) {
                    out.push_str(&tag_for(code.id, code.tag_role, *marker));
                }
            }
        }
    }
    out
}

/// Renders the fragment with each code replaced by its literal data instead
/// of a numeric tag.
#[must_use]
pub fn encode_normal_text(fragment: &CodedText) -> String {
    let mut out = String::new();
    for segment in fragment.segments() {
        match segment {
            Segment::Plain(run) => out.push_str(run),
            Segment::Code { index, .. } => {
                if let Some(code) = fragment.code(*index) {
                    out.push_str(&code.data);
                }
            }
        }
    }
    out
}

/// Renders the fragment with each code reference shown as its index in the
/// code list (`{0}`, `{1}`, …). Debugging aid.
#[must_use]
pub fn marker_indexes(fragment: &CodedText) -> String {
    let mut out = String::new();
    for segment in fragment.segments() {
        match segment {
            Segment::Plain(run) => out.push_str(run),
            Segment::Code { index, .. } => {
                out.push('{');
                out.push_str(&index.to_string());
                out.push('}');
            }
        }
    }
    out
}

/// The numeric tag a code renders as, given its embedding marker.
pub(crate) fn tag_for(id: i32, tag_role: TagRole, marker: Marker) -> String {
    match marker {
        Marker::Opening => format!("<{id}>"),
        Marker::Closing => format!("</{id}>"),
        Marker::Isolated => match tag_role {
            TagRole::Opening => format!("<b{id}/>"),
            TagRole::Closing => format!("<e{id}/>"),
            TagRole::Placeholder => format!("<{id}/>"),
        },
    }
}

/// One external tag occurrence found at the head of the unprocessed slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagFamily {
    Opening,
    Closing,
    Isolated,
    IsolatedOpening,
    IsolatedClosing,
}

/// Matches one numeric tag at the start of `rest`. Returns the tag family,
/// external id, and matched length, or `None` when no family matches.
fn next_tag(rest: &str) -> Option<Result<(TagFamily, i32, usize)>> {
    let families = [
        (TagFamily::Opening, &patterns::GENERIC_OPENING),
        (TagFamily::Closing, &patterns::GENERIC_CLOSING),
        (TagFamily::Isolated, &patterns::GENERIC_ISOLATED),
        (TagFamily::IsolatedOpening, &patterns::GENERIC_ISOLATED_OPENING),
        (TagFamily::IsolatedClosing, &patterns::GENERIC_ISOLATED_CLOSING),
    ];
    for (family, pattern) in families {
        if let Some(caps) = pattern.captures(rest) {
            let parsed = caps[1]
                .parse::<i32>()
                .map(|id| (family, id, caps[0].len()))
                .map_err(|_| Error::InvalidContent(format!("invalid code: '{}'", &caps[0])));
            return Some(parsed);
        }
    }
    None
}

/// Updates a fragment from its generic numeric rendering.
///
/// When the fragment already holds codes, the notation's numeric ids are
/// resolved against them and only the plain text and reference order are
/// replaced; resolved closings are marked pending and the whole fragment is
/// re-balanced, so render-back produces consistent ids even if the input
/// used non-sequential numbering. When the fragment holds no codes, fresh
/// codes are minted from the parsed tags.
///
/// Fails with [`Error::InvalidContent`] when a closing or isolated-closing
/// tag has no matching open code.
pub fn decode_into(notation: &str, fragment: &mut CodedText) -> Result<()> {
    // Case with no in-line codes.
    if !fragment.has_code() && !notation.contains('<') {
        fragment.set_text(notation.to_string());
        return Ok(());
    }
    if fragment.has_code() {
        decode_with_existing(notation, fragment)
    } else {
        decode_fresh(notation, fragment)
    }
}

/// Decode path reusing the fragment's existing code list.
fn decode_with_existing(notation: &str, fragment: &mut CodedText) -> Result<()> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut plain = String::new();
    let mut rest = notation;
    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some(matched) = next_tag(rest) {
                let (family, id, len) = matched?;
                let raw = &rest[..len];
                let (index, marker) = match family {
                    TagFamily::Opening => (fragment.index_of(id), Marker::Opening),
                    TagFamily::Isolated | TagFamily::IsolatedOpening => {
                        (fragment.index_of(id), Marker::Isolated)
                    }
                    TagFamily::Closing => (fragment.index_of_closing(id), Marker::Closing),
                    TagFamily::IsolatedClosing => {
                        (fragment.index_of_closing(id), Marker::Isolated)
                    }
                };
                let index = index
                    .ok_or_else(|| Error::InvalidContent(format!("invalid code: '{raw}'")))?;
                if matches!(family, TagFamily::Closing | TagFamily::IsolatedClosing) {
                    // Re-balancing assigns the final id from the matching
                    // opening.
                    if let Some(code) = fragment.code_mut(index) {
                        code.id = Code::PENDING_ID;
                    }
                    fragment.balanced = false;
                }
                flush_plain(&mut segments, &mut plain);
                segments.push(Segment::Code { marker, index });
                rest = &rest[len..];
                continue;
            }
        }
        plain.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    flush_plain(&mut segments, &mut plain);

    fragment.segments = segments;
    fragment.balanced = false;
    fragment.balance_markers();
    Ok(())
}

/// Decode path minting fresh codes from the parsed tags. Closing tags must
/// still match a currently-open id.
fn decode_fresh(notation: &str, fragment: &mut CodedText) -> Result<()> {
    fragment.segments.clear();
    let mut open_ids: Vec<i32> = Vec::new();
    let mut rest = notation;
    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some(matched) = next_tag(rest) {
                let (family, id, len) = matched?;
                let raw = &rest[..len];
                match family {
                    TagFamily::Opening => {
                        open_ids.push(id);
                        fragment.push_code_ref(
                            Code::with_id(id, TagRole::Opening, "Xpt", raw),
                            Marker::Opening,
                        );
                    }
                    TagFamily::IsolatedOpening => {
                        open_ids.push(id);
                        fragment.push_code_ref(
                            Code::with_id(id, TagRole::Opening, "Xpt", raw),
                            Marker::Isolated,
                        );
                    }
                    TagFamily::Closing | TagFamily::IsolatedClosing => {
                        let open = open_ids.iter().rposition(|&open_id| open_id == id);
                        let open = open.ok_or_else(|| {
                            Error::InvalidContent(format!("invalid code: '{raw}'"))
                        })?;
                        open_ids.remove(open);
                        let marker = if family == TagFamily::Closing {
                            Marker::Closing
                        } else {
                            Marker::Isolated
                        };
                        fragment.push_code_ref(
                            Code::with_id(id, TagRole::Closing, "Xpt", raw),
                            marker,
                        );
                    }
                    TagFamily::Isolated => {
                        fragment.push_code_ref(
                            Code::with_id(id, TagRole::Placeholder, "Xph", raw),
                            Marker::Isolated,
                        );
                    }
                }
                rest = &rest[len..];
                continue;
            }
        }
        fragment.append_text(&ch.to_string());
        rest = &rest[ch.len_utf8()..];
    }
    Ok(())
}

fn flush_plain(segments: &mut Vec<Segment>, plain: &mut String) {
    if !plain.is_empty() {
        segments.push(Segment::Plain(std::mem::take(plain)));
    }
}
