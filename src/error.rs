//! Error types for markup-extract.
//!
//! This module defines the error types returned by codec and extraction
//! operations.

/// Error type for codec and extraction operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A notation string references an in-line code that cannot be resolved
    /// against the known codes (no opening/closing partner with that id).
    #[error("invalid content: {0}")]
    InvalidContent(String),

    /// A position mapping was requested for an offset that is out of range or
    /// falls inside the rendered span of an in-line code.
    #[error("position {0} is invalid")]
    InvalidPosition(usize),

    /// A rule-stack pop found a different element name than the end tag being
    /// processed. The tokenizer guarantees tag pairing, so this indicates an
    /// internal bookkeeping bug and aborts the current parse.
    #[error("end tag '{end_tag}' does not match start tag '{start_tag}' at offset {offset}")]
    MismatchedTag {
        /// Name found in the end tag.
        end_tag: String,
        /// Name recorded on the rule stack.
        start_tag: String,
        /// Source offset of the end tag.
        offset: usize,
    },

    /// A rule configuration document could not be parsed.
    #[error("invalid rule configuration: {0}")]
    InvalidConfig(#[from] serde_yaml::Error),
}

/// Result type alias for codec and extraction operations.
pub type Result<T> = std::result::Result<T, Error>;
