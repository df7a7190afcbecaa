//! In-line code data model.
//!
//! A [`Code`] is a single unit of in-line markup (an opening tag, a closing
//! tag, or a standalone placeholder) referenced from a
//! [`CodedText`](crate::CodedText). Codes carry the literal markup they stand
//! for so the original document can be reproduced exactly.

/// Role of an in-line code within a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagRole {
    /// Start of a paired span (e.g. `<b>`).
    Opening,
    /// End of a paired span (e.g. `</b>`).
    Closing,
    /// Self-contained, unpaired code (e.g. `<br/>` or an image).
    Placeholder,
}

/// A single in-line markup unit.
///
/// The `id` pairs an opening code with its closing code inside one coded
/// text; ids are not necessarily contiguous and do not start at a fixed
/// origin. Placeholder codes are self-contained and never paired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    /// Identifier used to pair opening/closing codes and to render notations.
    pub id: i32,
    /// Whether this code opens, closes, or stands alone.
    pub tag_role: TagRole,
    /// Type tag, e.g. "bold", "link", or an auto-generated type.
    pub kind: String,
    /// Literal payload rendered by default notations.
    pub data: String,
    /// Original surrounding markup literal, when the code must reproduce
    /// exact source syntax.
    pub outer_data: Option<String>,
    /// Human-meaningful substitute text (e.g. equivalent text for images).
    pub display_text: Option<String>,
    /// Serialized original sequence when several adjacent codes were merged
    /// into this one, recoverable for exact re-expansion.
    pub merged_data: Option<String>,
    /// Whether downstream editing may remove this code.
    pub deletable: bool,
    /// Annotation payloads (name, value) attached to this code. More than
    /// one annotation forces standoff serialization in the interchange
    /// notation.
    pub annotations: Vec<(String, String)>,
}

impl Code {
    /// Sentinel id meaning "pending": the matching opening id is assigned
    /// during marker balancing.
    pub const PENDING_ID: i32 = -1;

    /// Creates a code with the given role, type tag, and literal data.
    ///
    /// The id starts out as [`Code::PENDING_ID`]; appending the code to a
    /// [`CodedText`](crate::CodedText) allocates a real id for opening and
    /// placeholder codes.
    #[must_use]
    pub fn new(tag_role: TagRole, kind: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: Self::PENDING_ID,
            tag_role,
            kind: kind.into(),
            data: data.into(),
            outer_data: None,
            display_text: None,
            merged_data: None,
            deletable: true,
            annotations: Vec::new(),
        }
    }

    /// Creates a code with a pre-assigned id.
    #[must_use]
    pub fn with_id(
        id: i32,
        tag_role: TagRole,
        kind: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        let mut code = Self::new(tag_role, kind, data);
        code.id = id;
        code
    }

    /// Appends literal text to the code's data payload.
    pub fn append_data(&mut self, text: &str) {
        self.data.push_str(text);
    }

    /// Appends literal text to the code's outer (original markup) payload.
    pub fn append_outer_data(&mut self, text: &str) {
        match &mut self.outer_data {
            Some(outer) => outer.push_str(text),
            None => self.outer_data = Some(text.to_string()),
        }
    }

    /// Attaches an annotation payload to this code.
    pub fn add_annotation(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.annotations.push((name.into(), value.into()));
    }

    /// True when the code has a pending id awaiting balancing.
    #[must_use]
    pub fn has_pending_id(&self) -> bool {
        self.id == Self::PENDING_ID
    }

    /// The literal this code stands for: the outer markup when present,
    /// otherwise the data payload.
    #[must_use]
    pub fn literal(&self) -> &str {
        self.outer_data.as_deref().unwrap_or(&self.data)
    }
}
