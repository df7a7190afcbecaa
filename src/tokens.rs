//! Tokenizer contract.
//!
//! The crate never tokenizes markup itself. Extraction is driven by a
//! sequence of [`Token`]s produced by an external tokenizer; anything
//! yielding them (`Vec`, an adapter over a pull parser) works. Tags carry
//! their raw source text so excluded content can be replayed byte-for-byte,
//! and every token carries its source span for error reporting.

use std::collections::HashMap;
use std::ops::Range;

/// One tagged token from the external tokenizer.
#[derive(Debug, Clone)]
pub struct Token {
    /// What the token is.
    pub kind: TokenKind,
    /// Source offsets the token was read from.
    pub span: Range<usize>,
}

/// Token payload.
#[derive(Debug, Clone)]
pub enum TokenKind {
    /// A start tag, possibly self-closing.
    StartTag(StartTag),
    /// An end tag.
    EndTag {
        /// Element name.
        name: String,
        /// Raw source text of the tag.
        raw: String,
    },
    /// Character data between tags.
    Text(String),
    /// A comment, raw text included.
    Comment(String),
    /// A processing instruction, raw text included.
    ProcessingInstruction(String),
    /// A CDATA section.
    Cdata {
        /// Content without the section markers.
        content: String,
        /// Raw source text including the markers.
        raw: String,
    },
    /// A document type declaration, raw text included.
    DocType(String),
}

/// A start tag with its parsed attributes.
#[derive(Debug, Clone)]
pub struct StartTag {
    /// Element name.
    pub name: String,
    /// Attribute name-value pairs, names lowercased by the tokenizer.
    pub attributes: HashMap<String, String>,
    /// Raw source text of the tag.
    pub raw: String,
    /// The tag closes itself (`<br/>`).
    pub self_closing: bool,
}

impl Token {
    /// Convenience constructor for a token without meaningful offsets, used
    /// when the producer does not track positions.
    #[must_use]
    pub fn new(kind: TokenKind) -> Self {
        Self { kind, span: 0..0 }
    }

    /// Convenience constructor with source offsets.
    #[must_use]
    pub fn spanned(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }
}

impl StartTag {
    /// A start tag with no attributes.
    #[must_use]
    pub fn named(name: &str, raw: &str, self_closing: bool) -> Self {
        Self {
            name: name.to_string(),
            attributes: HashMap::new(),
            raw: raw.to_string(),
            self_closing,
        }
    }
}
