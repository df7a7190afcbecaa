//! Markup event builder: structured events and the skeleton contract.
//!
//! The [`extractor::MarkupExtractor`] consumes tokenizer output and emits
//! [`Event`]s: translatable text units, opaque document parts, and group
//! boundaries. Everything that is not translatable is replayed byte-for-byte
//! through a [`SkeletonSink`]; text units are substituted by placeholder
//! markers resolved at output time.

pub mod extractor;

pub use extractor::MarkupExtractor;

use crate::fragment::CodedText;

/// One structured event produced by extraction.
#[derive(Debug, Clone)]
pub enum Event {
    /// A translatable unit with its in-line codes.
    TextUnit(ExtractedUnit),
    /// Opaque markup replayed unchanged.
    DocumentPart(String),
    /// Start of a logical group (e.g. a table).
    StartGroup {
        /// Element name the group was opened for.
        name: String,
    },
    /// End of a logical group.
    EndGroup {
        /// Element name the group was closed for.
        name: String,
    },
}

/// A finished translatable unit.
#[derive(Debug, Clone)]
pub struct ExtractedUnit {
    /// Sequential identifier, unique within one parse.
    pub id: u64,
    /// Resource name, when the source element carried an id attribute.
    pub name: Option<String>,
    /// Element name the unit was extracted from.
    pub unit_type: Option<String>,
    /// The unit's content.
    pub fragment: CodedText,
    /// Whitespace in the unit is significant and was not normalized.
    pub preserve_whitespace: bool,
}

/// Append-only sink for the opaque skeleton.
///
/// The sink receives literal markup plus placeholder markers meaning
/// "substitute the rendered form of unit `unit_id` here at output time".
pub trait SkeletonSink {
    /// Appends literal markup.
    fn append(&mut self, literal: &str);
    /// Appends a placeholder for a text unit.
    fn append_placeholder(&mut self, unit_id: u64);
}

/// One part of a buffered skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkeletonPart {
    /// Literal markup.
    Literal(String),
    /// Placeholder for a text unit.
    Placeholder(u64),
}

/// In-memory [`SkeletonSink`] for tests and simple callers.
#[derive(Debug, Clone, Default)]
pub struct SkeletonBuffer {
    parts: Vec<SkeletonPart>,
}

impl SkeletonBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The buffered parts, in append order.
    #[must_use]
    pub fn parts(&self) -> &[SkeletonPart] {
        &self.parts
    }
}

impl SkeletonSink for SkeletonBuffer {
    fn append(&mut self, literal: &str) {
        if let Some(SkeletonPart::Literal(run)) = self.parts.last_mut() {
            run.push_str(literal);
        } else {
            self.parts.push(SkeletonPart::Literal(literal.to_string()));
        }
    }

    fn append_placeholder(&mut self, unit_id: u64) {
        self.parts.push(SkeletonPart::Placeholder(unit_id));
    }
}

/// Replays a sequence of events into a skeleton sink: document parts are
/// appended literally, text units as placeholders. Group boundaries carry no
/// markup of their own (their tags are document parts) and are skipped.
pub fn write_skeleton(events: &[Event], sink: &mut dyn SkeletonSink) {
    for event in events {
        match event {
            Event::DocumentPart(literal) => sink.append(literal),
            Event::TextUnit(unit) => sink.append_placeholder(unit.id),
            Event::StartGroup { .. } | Event::EndGroup { .. } => {}
        }
    }
}
