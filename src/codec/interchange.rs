//! TM-interchange notation codec.
//!
//! Renders in-line codes as the paired/placeholder tags used by translation
//! memory interchange formats: `<bpt i="1">…</bpt>` / `<ept i="1">…</ept>`
//! for paired spans, `<ph x="2">…</ph>` for placeholders, and
//! `<it x="3" pos="begin|end">…</it>` for isolated opening/closing codes.
//!
//! What goes inside the paired tags is controlled by [`CodeMode`]: the
//! original code data, nothing, or a nested generic/letter-coded tag. For the
//! nested modes an open-id stack is carried during encode so the closing tag
//! reuses the id pushed at the opening.

use crate::code::{Code, TagRole};
use crate::codec::{escape_xml, unescape_xml, QuoteMode};
use crate::fragment::{CodedText, Marker, Segment};
use crate::patterns;

/// What the paired/placeholder tags contain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodeMode {
    /// The code's original data.
    #[default]
    Original,
    /// Nothing.
    Empty,
    /// A nested generic numeric tag (`<1>`, `</1>`, `<2/>`).
    Generic,
    /// A nested letter-coded tag (`<g1>`, `</g1>`, `<x2/>`).
    LetterCoded,
}

/// Collaborator that stores annotation payloads out of line.
///
/// When a code carries more than one annotation the codec does not inline
/// them; it asks the sink for a stable identifier and emits a reference
/// attribute instead. Rendering the deferred payload is the sink's business.
pub trait StandoffSink {
    /// Returns a stable identifier for the code's annotation payload.
    fn standoff_id(&mut self, code: &Code) -> String;
}

/// Converter between coded text and the TM-interchange notation.
#[derive(Debug, Clone)]
pub struct InterchangeCodec {
    /// Inner content of the paired/placeholder tags.
    pub code_mode: CodeMode,
    /// Quote escaping applied to text and inner content.
    pub quote_mode: QuoteMode,
    /// Always escape `>`, instead of only after `]`.
    pub escape_gt: bool,
    letter_code_offset: i32,
}

impl Default for InterchangeCodec {
    fn default() -> Self {
        Self {
            code_mode: CodeMode::Original,
            quote_mode: QuoteMode::All,
            escape_gt: true,
            letter_code_offset: 0,
        }
    }
}

impl InterchangeCodec {
    /// Creates a codec with the default settings: original code data inlined,
    /// quote mode [`QuoteMode::All`], `>` always escaped.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches to letter-coded inner content. With `zero_based` set, the
    /// nested tags use ids shifted down by one.
    pub fn set_letter_coded_mode(&mut self, zero_based: bool) {
        self.code_mode = CodeMode::LetterCoded;
        self.letter_code_offset = i32::from(zero_based);
    }

    /// Renders the fragment in TM-interchange notation.
    ///
    /// Codes carrying more than one annotation have their payload dropped
    /// with a warning; use [`encode_with_standoff`](Self::encode_with_standoff)
    /// to externalize those payloads instead.
    #[must_use]
    pub fn encode(&self, fragment: &CodedText) -> String {
        self.render(fragment, None)
    }

    /// Renders the fragment in TM-interchange notation, deferring
    /// multi-annotation payloads to `sink` and emitting `ref="#id"` in their
    /// place.
    pub fn encode_with_standoff(
        &self,
        fragment: &CodedText,
        sink: &mut dyn StandoffSink,
    ) -> String {
        self.render(fragment, Some(sink))
    }

    fn render(&self, fragment: &CodedText, mut sink: Option<&mut dyn StandoffSink>) -> String {
        let mut out = String::new();
        let mut open_ids: Vec<i32> = Vec::new();
        for segment in fragment.segments() {
            match segment {
                Segment::Plain(run) => {
                    out.push_str(&escape_xml(run, self.quote_mode, self.escape_gt));
                }
                Segment::Code { marker, index } => {
                    let Some(code) = fragment.code(*index) else {
                        continue;
                    };
                    match marker {
                        Marker::Opening => {
                            out.push_str(&format!("<bpt i=\"{}\"", code.id));
                            out.push_str(&self.extra_attributes(code, &mut sink));
                            out.push('>');
                            out.push_str(&self.inner(code, *marker, &mut open_ids));
                            out.push_str("</bpt>");
                        }
                        Marker::Closing => {
                            out.push_str(&format!("<ept i=\"{}\">", code.id));
                            out.push_str(&self.inner(code, *marker, &mut open_ids));
                            out.push_str("</ept>");
                        }
                        Marker::Isolated => match code.tag_role {
                            TagRole::Placeholder => {
                                out.push_str(&format!("<ph x=\"{}\"", code.id));
                                out.push_str(&self.extra_attributes(code, &mut sink));
                                out.push('>');
                                out.push_str(&self.inner(code, *marker, &mut open_ids));
                                out.push_str("</ph>");
                            }
                            TagRole::Opening | TagRole::Closing => {
                                let pos = if code.tag_role == TagRole::Opening {
                                    "begin"
                                } else {
                                    "end"
                                };
                                out.push_str(&format!("<it x=\"{}\" pos=\"{pos}\"", code.id));
                                out.push_str(&self.extra_attributes(code, &mut sink));
                                out.push('>');
                                out.push_str(&self.inner(code, *marker, &mut open_ids));
                                out.push_str("</it>");
                            }
                        },
                    }
                }
            }
        }
        out
    }

    /// The `type` attribute plus the annotation attribute or standoff
    /// reference, already escaped, with a leading space per attribute.
    fn extra_attributes(
        &self,
        code: &Code,
        sink: &mut Option<&mut dyn StandoffSink>,
    ) -> String {
        let mut out = String::new();
        if !code.kind.is_empty() {
            out.push_str(&format!(
                " type=\"{}\"",
                escape_xml(&code.kind, self.quote_mode, self.escape_gt)
            ));
        }
        match code.annotations.len() {
            0 => {}
            1 => {
                let (name, value) = &code.annotations[0];
                out.push_str(&format!(
                    " {name}=\"{}\"",
                    escape_xml(value, self.quote_mode, self.escape_gt)
                ));
            }
            count => match sink.as_deref_mut() {
                Some(sink) => {
                    out.push_str(&format!(" ref=\"#{}\"", sink.standoff_id(code)));
                }
                None => {
                    log::warn!(
                        "dropping {count} annotations on code {}: no standoff sink attached",
                        code.id
                    );
                }
            },
        }
        out
    }

    /// Inner content of the paired/placeholder tag, already escaped.
    fn inner(&self, code: &Code, marker: Marker, open_ids: &mut Vec<i32>) -> String {
        let raw = match self.code_mode {
            CodeMode::Original => code.data.clone(),
            CodeMode::Empty => return String::new(),
            CodeMode::Generic | CodeMode::LetterCoded => {
                let letter = self.code_mode == CodeMode::LetterCoded;
                let offset = if letter { self.letter_code_offset } else { 0 };
                match marker {
                    Marker::Opening => {
                        let id = code.id - offset;
                        open_ids.push(id);
                        if letter {
                            format!("<g{id}>")
                        } else {
                            format!("<{id}>")
                        }
                    }
                    Marker::Closing => {
                        let id = open_ids.pop().unwrap_or(code.id - offset);
                        if letter {
                            format!("</g{id}>")
                        } else {
                            format!("</{id}>")
                        }
                    }
                    Marker::Isolated => {
                        let id = code.id - offset;
                        if letter {
                            format!("<x{id}/>")
                        } else {
                            format!("<{id}/>")
                        }
                    }
                }
            }
        };
        escape_xml(&raw, self.quote_mode, self.escape_gt)
    }
}

/// Converts a TM-interchange text to a fragment.
///
/// Codes are created from the parsed tags; the inner content of a paired or
/// placeholder tag becomes the code's data, and the `type` attribute its
/// kind. With `existing` supplied, a code whose external id is found there is
/// cloned instead; ids absent from `existing` still synthesize a new code, so
/// the conversion never fails. Markup that does not parse as one of the
/// interchange tags is kept as plain text.
#[must_use]
pub fn decode(text: &str, existing: Option<&CodedText>) -> CodedText {
    let mut fragment = CodedText::new();

    let mut rest = text;
    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some(caps) = patterns::INTERCHANGE_BPT.captures(rest) {
                if let Some(len) = push_paired(&mut fragment, existing, &caps, TagRole::Opening) {
                    rest = &rest[len..];
                    continue;
                }
            }
            if let Some(caps) = patterns::INTERCHANGE_EPT.captures(rest) {
                if let Some(len) = push_paired(&mut fragment, existing, &caps, TagRole::Closing) {
                    rest = &rest[len..];
                    continue;
                }
            }
            if let Some(caps) = patterns::INTERCHANGE_PH.captures(rest) {
                if let Some(len) =
                    push_paired(&mut fragment, existing, &caps, TagRole::Placeholder)
                {
                    rest = &rest[len..];
                    continue;
                }
            }
            if let Some(caps) = patterns::INTERCHANGE_IT.captures(rest) {
                if let Some(len) = push_isolated(&mut fragment, existing, &caps) {
                    rest = &rest[len..];
                    continue;
                }
            }
        }
        let mut buf = [0u8; 4];
        fragment.append_text(ch.encode_utf8(&mut buf));
        rest = &rest[ch.len_utf8()..];
    }

    for segment in &mut fragment.segments {
        if let Segment::Plain(run) = segment {
            *run = unescape_xml(run);
        }
    }
    fragment
}

/// Handles `<bpt>`, `<ept>`, and `<ph>`: captures are (id, attributes,
/// inner). Returns the matched length, or `None` when the id does not parse.
fn push_paired(
    fragment: &mut CodedText,
    existing: Option<&CodedText>,
    caps: &regex::Captures<'_>,
    tag_role: TagRole,
) -> Option<usize> {
    let id = caps[1].parse::<i32>().ok()?;
    let code = reuse_or_new(existing, id, tag_role == TagRole::Closing, || {
        minted(id, tag_role, &caps[2], &caps[3])
    });
    let marker = match tag_role {
        TagRole::Opening => Marker::Opening,
        TagRole::Closing => Marker::Closing,
        TagRole::Placeholder => Marker::Isolated,
    };
    fragment.push_code_ref(code, marker);
    Some(caps[0].len())
}

/// Handles `<it>`: captures are (id, pos, attributes, inner).
fn push_isolated(
    fragment: &mut CodedText,
    existing: Option<&CodedText>,
    caps: &regex::Captures<'_>,
) -> Option<usize> {
    let id = caps[1].parse::<i32>().ok()?;
    let tag_role = if &caps[2] == "begin" {
        TagRole::Opening
    } else {
        TagRole::Closing
    };
    let code = reuse_or_new(existing, id, tag_role == TagRole::Closing, || {
        minted(id, tag_role, &caps[3], &caps[4])
    });
    fragment.push_code_ref(code, Marker::Isolated);
    Some(caps[0].len())
}

/// Mints a fresh code from a parsed tag's attribute blob and inner content.
fn minted(id: i32, tag_role: TagRole, attributes: &str, inner: &str) -> Code {
    let kind = patterns::TYPE_ATTRIBUTE
        .captures(attributes)
        .map_or_else(
            || {
                if tag_role == TagRole::Placeholder {
                    "Xph".to_string()
                } else {
                    "Xpt".to_string()
                }
            },
            |caps| caps[1].to_string(),
        );
    Code::with_id(id, tag_role, &kind, &unescape_xml(inner))
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
                .codes()
                .iter()
                .find(|code| (code.tag_role == TagRole::Closing) == closing && code.id == id)
        })
        .cloned()
        .unwrap_or_else(synthesize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fragment() -> CodedText {
        let mut fragment = CodedText::new();
        fragment.append_code(Code::new(TagRole::Opening, "bold", "<b>"));
        fragment.append_text("Hello ");
        fragment.append_code(Code::new(TagRole::Placeholder, "image", "<img/>"));
        fragment.append_text("world");
        fragment.append_code(Code::new(TagRole::Closing, "bold", "</b>"));
        fragment.balance_markers();
        fragment
    }

    #[test]
    fn original_mode_inlines_code_data() {
        let codec = InterchangeCodec::new();
        assert_eq!(
            codec.encode(&sample_fragment()),
            "<bpt i=\"1\" type=\"bold\">&lt;b&gt;</bpt>Hello \
             <ph x=\"2\" type=\"image\">&lt;img/&gt;</ph>world<ept i=\"1\">&lt;/b&gt;</ept>"
        );
    }

    #[test]
    fn empty_mode_emits_bare_tags() {
        let codec = InterchangeCodec {
            code_mode: CodeMode::Empty,
            ..InterchangeCodec::new()
        };
        assert_eq!(
            codec.encode(&sample_fragment()),
            "<bpt i=\"1\" type=\"bold\"></bpt>Hello \
             <ph x=\"2\" type=\"image\"></ph>world<ept i=\"1\"></ept>"
        );
    }

    #[test]
    fn generic_mode_nests_numeric_tags() {
        let codec = InterchangeCodec {
            code_mode: CodeMode::Generic,
            ..InterchangeCodec::new()
        };
        assert_eq!(
            codec.encode(&sample_fragment()),
            "<bpt i=\"1\" type=\"bold\">&lt;1&gt;</bpt>Hello \
             <ph x=\"2\" type=\"image\">&lt;2/&gt;</ph>world<ept i=\"1\">&lt;/1&gt;</ept>"
        );
    }

    #[test]
    fn letter_coded_mode_shifts_ids_when_zero_based() {
        let mut codec = InterchangeCodec::new();
        codec.set_letter_coded_mode(true);
        assert_eq!(
            codec.encode(&sample_fragment()),
            "<bpt i=\"1\" type=\"bold\">&lt;g0&gt;</bpt>Hello \
             <ph x=\"2\" type=\"image\">&lt;x1/&gt;</ph>world<ept i=\"1\">&lt;/g0&gt;</ept>"
        );
    }

    #[test]
    fn isolated_codes_render_as_it_with_pos() {
        let mut fragment = CodedText::new();
        fragment.append_code(Code::new(TagRole::Opening, "bold", "<b>"));
        fragment.append_text("x");
        fragment.balance_markers();
        let codec = InterchangeCodec {
            code_mode: CodeMode::Empty,
            ..InterchangeCodec::new()
        };
        assert_eq!(
            codec.encode(&fragment),
            "<it x=\"1\" pos=\"begin\" type=\"bold\"></it>x"
        );
    }

    #[test]
    fn single_annotation_is_inlined() {
        let mut fragment = CodedText::new();
        let mut code = Code::new(TagRole::Placeholder, "", "<br/>");
        code.add_annotation("note", "line break");
        fragment.append_code(code);
        let codec = InterchangeCodec {
            code_mode: CodeMode::Empty,
            ..InterchangeCodec::new()
        };
        assert_eq!(codec.encode(&fragment), "<ph x=\"1\" note=\"line break\"></ph>");
    }

    struct CountingSink {
        calls: usize,
    }

    impl StandoffSink for CountingSink {
        fn standoff_id(&mut self, _code: &Code) -> String {
            self.calls += 1;
            format!("ann{}", self.calls)
        }
    }

    #[test]
    fn multiple_annotations_defer_to_standoff() {
        let mut fragment = CodedText::new();
        let mut code = Code::new(TagRole::Placeholder, "", "<br/>");
        code.add_annotation("note", "one");
        code.add_annotation("origin", "two");
        fragment.append_code(code);
        let codec = InterchangeCodec {
            code_mode: CodeMode::Empty,
            ..InterchangeCodec::new()
        };
        let mut sink = CountingSink { calls: 0 };
        assert_eq!(
            codec.encode_with_standoff(&fragment, &mut sink),
            "<ph x=\"1\" ref=\"#ann1\"></ph>"
        );
        assert_eq!(sink.calls, 1);
        // Without a sink the payload is dropped, not inlined.
        assert_eq!(codec.encode(&fragment), "<ph x=\"1\"></ph>");
    }

    #[test]
    fn decode_reconstructs_codes_from_tags() {
        let decoded = decode(
            "<bpt i=\"1\" type=\"bold\">&lt;b&gt;</bpt>Hello \
             <ph x=\"2\" type=\"image\">&lt;img/&gt;</ph>world<ept i=\"1\">&lt;/b&gt;</ept>",
            None,
        );
        assert_eq!(decoded.plain_text(), "Hello world");
        assert_eq!(decoded.codes().len(), 3);
        assert_eq!(decoded.codes()[0].tag_role, TagRole::Opening);
        assert_eq!(decoded.codes()[0].kind, "bold");
        assert_eq!(decoded.codes()[0].data, "<b>");
        assert_eq!(decoded.codes()[1].tag_role, TagRole::Placeholder);
        assert_eq!(decoded.codes()[1].data, "<img/>");
        assert_eq!(decoded.codes()[2].tag_role, TagRole::Closing);
        assert_eq!(decoded.codes()[2].data, "</b>");
    }

    #[test]
    fn decode_round_trips_original_mode() {
        let codec = InterchangeCodec::new();
        let fragment = sample_fragment();
        let decoded = decode(&codec.encode(&fragment), Some(&fragment));
        assert_eq!(decoded.plain_text(), fragment.plain_text());
        assert_eq!(codec.encode(&decoded), codec.encode(&fragment));
    }

    #[test]
    fn decode_handles_it_positions() {
        let decoded = decode(
            "<it x=\"4\" pos=\"begin\"></it>a<it x=\"4\" pos=\"end\"></it>",
            None,
        );
        assert_eq!(decoded.codes()[0].tag_role, TagRole::Opening);
        assert_eq!(decoded.codes()[1].tag_role, TagRole::Closing);
        assert_eq!(decoded.plain_text(), "a");
    }

    #[test]
    fn decode_keeps_unrecognized_markup_as_text() {
        let decoded = decode("a <hi>b</hi>", None);
        assert!(!decoded.has_code());
        assert_eq!(decoded.plain_text(), "a <hi>b</hi>");
    }
}
