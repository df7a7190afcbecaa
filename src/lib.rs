//! # markup-extract
//!
//! Extraction of translatable text from tagged markup.
//!
//! This library separates the translatable content of a markup document from
//! everything else: text units come out as coded text (plain runs plus
//! in-line codes standing for the markup inside them), and the rest is an
//! opaque skeleton replayed byte-for-byte at output time.
//!
//! ## Quick Start
//!
//! ```rust
//! use markup_extract::{codec::generic, CodedText};
//!
//! let mut unit = CodedText::new();
//! generic::decode_into("<1>Hello <2/>world</1>", &mut unit)?;
//!
//! assert_eq!(unit.plain_text(), "Hello world");
//! assert_eq!(unit.codes().len(), 3);
//! # Ok::<(), markup_extract::Error>(())
//! ```
//!
//! ## Features
//!
//! - **Coded text**: position-stable text plus in-line code model with
//!   marker balancing and id renumbering
//! - **Codecs**: generic numeric (`<1>`, `</1>`, `<2/>`), letter-coded
//!   (`<g1>`, `<x2/>`) with an escaping transform, and TM-interchange
//!   (`<bpt>`, `<ept>`, `<ph>`, `<it>`) notations, plus a position mapper
//! - **Extraction**: a rule-driven event builder that classifies tokenizer
//!   output into text units, in-line codes, groups, and skeleton
//! - **Configurable**: YAML rule files map element names to their
//!   classification, with attribute-value conditions

mod code;
mod error;
mod fragment;
mod patterns;

/// Content codecs between coded text and external notations.
pub mod codec;

/// Extraction rule configuration and per-parse rule state.
pub mod rules;

/// Tokenizer contract consumed by extraction.
pub mod tokens;

/// The markup event builder: structured events and the extraction driver.
pub mod builder;

// Public API - re-exports
pub use builder::{Event, ExtractedUnit, MarkupExtractor, SkeletonBuffer, SkeletonSink};
pub use code::{Code, TagRole};
pub use error::{Error, Result};
pub use fragment::{CodedText, Marker, Segment};
pub use rules::{RuleConfig, RuleKind};
