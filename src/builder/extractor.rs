//! The markup event builder driver.
//!
//! Consumes tokenizer output, classifies each token against the extraction
//! rule state, and emits structured [`Event`]s. There is no single named
//! state machine; the state is the product of the five rule stacks plus the
//! whitespace buffer and the in-progress text unit.
//!
//! Inter-tag whitespace is buffered rather than emitted immediately: whether
//! it belongs to translatable content or to the skeleton is only known once
//! the next tag reveals context. A text unit may only begin when none is
//! already open; that check is enforced in one place
//! ([`MarkupExtractor::ensure_unit`]).

use std::collections::VecDeque;

use crate::builder::{Event, ExtractedUnit};
use crate::code::{Code, TagRole};
use crate::error::Result;
use crate::fragment::{CodedText, Segment};
use crate::patterns;
use crate::rules::state::RuleState;
use crate::rules::{RuleConfig, RuleKind};
use crate::tokens::{StartTag, Token, TokenKind};

/// A text unit being accumulated.
#[derive(Debug)]
struct OpenUnit {
    id: u64,
    name: Option<String>,
    unit_type: Option<String>,
    fragment: CodedText,
    preserve_whitespace: bool,
    /// Protected codes currently collecting content, innermost last. Nested
    /// protected elements repeat the enclosing index, so only the outermost
    /// close seals the code.
    open_codes: Vec<usize>,
}

/// Single-document extraction driver.
///
/// Owns the five rule stacks, the whitespace buffer, and the in-progress
/// coded text for exactly one parse; [`reset`](Self::reset) starts a new
/// document. Cancellation is cooperative: [`cancel`](Self::cancel) stops
/// further structured events, but already-buffered output still flushes.
#[derive(Debug)]
pub struct MarkupExtractor {
    config: RuleConfig,
    state: RuleState,
    events: VecDeque<Event>,
    /// Literal markup awaiting emission as one document part.
    skeleton: String,
    /// Inter-tag whitespace whose classification is still unknown.
    whitespace_buffer: String,
    unit: Option<OpenUnit>,
    next_unit_id: u64,
    cancelled: bool,
}

impl MarkupExtractor {
    /// Creates a driver for the given rule configuration.
    #[must_use]
    pub fn new(config: RuleConfig) -> Self {
        let state = RuleState::new(config.preserve_whitespace, config.exclude_by_default);
        Self {
            config,
            state,
            events: VecDeque::new(),
            skeleton: String::new(),
            whitespace_buffer: String::new(),
            unit: None,
            next_unit_id: 0,
            cancelled: false,
        }
    }

    /// Resets all state for a new document parse.
    pub fn reset(&mut self) {
        self.state.reset();
        self.events.clear();
        self.skeleton.clear();
        self.whitespace_buffer.clear();
        self.unit = None;
        self.next_unit_id = 0;
        self.cancelled = false;
    }

    /// Stops emitting further structured events. Checked between tokens;
    /// output buffered before the cancel still flushes on
    /// [`finish`](Self::finish).
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// The next pending event, if any.
    pub fn next_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Drives a whole token sequence and returns all events.
    pub fn extract<I>(&mut self, tokens: I) -> Result<Vec<Event>>
    where
        I: IntoIterator<Item = Token>,
    {
        for token in tokens {
            self.push_token(&token)?;
        }
        self.finish()?;
        Ok(self.events.drain(..).collect())
    }

    /// Feeds one token through classification and dispatch.
    pub fn push_token(&mut self, token: &Token) -> Result<()> {
        if self.cancelled {
            return Ok(());
        }
        self.flush_whitespace_buffer(token);
        match &token.kind {
            TokenKind::Text(text) => self.handle_text(text),
            TokenKind::StartTag(tag) => self.handle_start_tag(tag)?,
            TokenKind::EndTag { name, raw } => {
                self.handle_end_tag(name, raw, token.span.start)?;
            }
            TokenKind::Comment(raw) | TokenKind::ProcessingInstruction(raw) => {
                self.handle_standalone(raw, "comment");
            }
            TokenKind::Cdata { content, raw } => self.handle_cdata(content, raw),
            TokenKind::DocType(raw) => {
                if self.state.is_excluded() {
                    self.skeleton.push_str(raw);
                } else {
                    self.add_document_part(raw);
                }
            }
        }
        Ok(())
    }

    /// Flushes trailing state at end of input: an unfinished unit, buffered
    /// whitespace, and pending skeleton.
    pub fn finish(&mut self) -> Result<()> {
        if self.unit.is_some() {
            log::warn!("input ended with an unfinished text unit");
            self.end_unit("");
        }
        if !self.whitespace_buffer.is_empty() {
            let buffered = std::mem::take(&mut self.whitespace_buffer);
            self.skeleton.push_str(&buffered);
        }
        self.flush_skeleton();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Whitespace buffering
    // ------------------------------------------------------------------

    /// Routes buffered inter-tag whitespace once the next token reveals
    /// context: into the translatable text when the token belongs to a text
    /// run, into the skeleton otherwise.
    fn flush_whitespace_buffer(&mut self, token: &Token) {
        if self.whitespace_buffer.is_empty() {
            return;
        }
        let inside_text_run = match &token.kind {
            TokenKind::StartTag(StartTag { name, .. }) | TokenKind::EndTag { name, .. } => {
                matches!(
                    self.config.element_kind(name),
                    RuleKind::Inline | RuleKind::InlineExcluded
                )
            }
            TokenKind::Comment(_) | TokenKind::ProcessingInstruction(_) => self.unit.is_some(),
            _ => false,
        };
        let buffered = std::mem::take(&mut self.whitespace_buffer);
        if inside_text_run {
            self.ensure_unit();
            self.append_unit_text(&buffered);
        } else {
            self.skeleton.push_str(&buffered);
        }
    }

    // ------------------------------------------------------------------
    // Token handlers
    // ------------------------------------------------------------------

    fn handle_text(&mut self, text: &str) {
        if self.state.is_excluded() {
            self.skeleton.push_str(text);
            return;
        }
        if self.state.is_inline_excluded() {
            self.append_to_open_code(text, true);
            return;
        }
        if self.unit.is_none() && is_whitespace(text) {
            // Defer: translatable or skeleton is decided by the next tag.
            self.whitespace_buffer.push_str(text);
            return;
        }
        self.ensure_unit();
        self.append_unit_text(text);
    }

    fn handle_start_tag(&mut self, tag: &StartTag) -> Result<()> {
        let kind = self.config.conditional_element_kind(&tag.name, &tag.attributes);

        // Under exclude-by-default a text-unit rule must override the global
        // exclusion for its span.
        if self.config.exclude_by_default && !tag.self_closing && kind == RuleKind::TextUnit {
            self.state.push_included(&tag.name);
        }

        if self.state.is_excluded() {
            self.skeleton.push_str(&tag.raw);
            if !tag.self_closing {
                self.push_rule_state(tag, kind);
            }
            return Ok(());
        }

        if !tag.self_closing {
            self.push_rule_state(tag, kind);
        }

        match kind {
            RuleKind::InlineExcluded => {
                self.ensure_unit();
                if let Some(unit) = &mut self.unit {
                    if let Some(&enclosing) = unit.open_codes.last() {
                        // Nested protected element: its tag is content of the
                        // enclosing code, which stays current.
                        if let Some(code) = unit.fragment.code_mut(enclosing) {
                            code.append_data(&tag.raw);
                            code.append_outer_data(&tag.raw);
                        }
                        if !tag.self_closing {
                            unit.open_codes.push(enclosing);
                        }
                    } else {
                        let mut code = Code::new(TagRole::Placeholder, tag.name.clone(), "");
                        code.append_outer_data(&tag.raw);
                        let index = unit.fragment.append_code(code);
                        if !tag.self_closing {
                            unit.open_codes.push(index);
                        }
                    }
                }
            }
            RuleKind::Inline => {
                if self.state.is_inline_excluded() {
                    self.append_to_open_code(&tag.raw, true);
                } else {
                    self.ensure_unit();
                    let role = if tag.self_closing {
                        TagRole::Placeholder
                    } else {
                        TagRole::Opening
                    };
                    self.append_unit_code(Code::new(role, tag.name.clone(), tag.raw.clone()));
                }
            }
            RuleKind::Group => {
                self.add_document_part(&tag.raw);
                self.push_event(Event::StartGroup {
                    name: tag.name.clone(),
                });
            }
            RuleKind::TextUnit => {
                if tag.self_closing {
                    self.skeleton.push_str(&tag.raw);
                } else {
                    if self.unit.is_some() {
                        log::warn!(
                            "text-unit element '{}' opened inside an open unit; closing the current unit",
                            tag.name
                        );
                        self.end_unit("");
                    }
                    self.add_document_part(&tag.raw);
                    self.start_unit(tag);
                }
            }
            RuleKind::Excluded
            | RuleKind::Included
            | RuleKind::AttributesOnly
            | RuleKind::PreserveWhitespace
            | RuleKind::NotFound => {
                if self.unit.is_some() && kind == RuleKind::NotFound {
                    // Unknown markup inside a text run stays in-line.
                    let role = if tag.self_closing {
                        TagRole::Placeholder
                    } else {
                        TagRole::Opening
                    };
                    self.append_unit_code(Code::new(role, tag.name.clone(), tag.raw.clone()));
                } else {
                    if kind == RuleKind::Excluded && self.unit.is_some() {
                        // The unit splits here so the excluded markup keeps
                        // its document position in the skeleton.
                        self.end_unit("");
                    }
                    self.skeleton.push_str(&tag.raw);
                }
            }
        }

        // The whitespace rule may have changed what the open unit preserves.
        if let Some(unit) = &mut self.unit {
            unit.preserve_whitespace = self.state.preserve_whitespace();
        }
        Ok(())
    }

    fn handle_end_tag(&mut self, name: &str, raw: &str, offset: usize) -> Result<()> {
        if self.state.is_excluded() {
            self.skeleton.push_str(raw);
            self.pop_rule_state(name, offset)?;
            self.pop_whitespace_rule(name, offset)?;
            return Ok(());
        }

        let kind = self.pop_rule_state(name, offset)?;

        if self.config.exclude_by_default && kind == RuleKind::TextUnit {
            // Synthetic included entry pushed at the start tag.
            self.state.pop_exclusion_unchecked();
        }

        match kind {
            RuleKind::InlineExcluded => {
                self.close_protected_code(raw);
            }
            RuleKind::Inline => {
                if self.state.is_inline_excluded() {
                    self.append_to_open_code(raw, true);
                } else {
                    self.ensure_unit();
                    self.append_unit_code(Code::new(TagRole::Closing, name, raw));
                }
            }
            RuleKind::Group => {
                self.add_document_part(raw);
                self.push_event(Event::EndGroup {
                    name: name.to_string(),
                });
            }
            RuleKind::TextUnit => {
                if self.unit.is_some() {
                    self.end_unit(raw);
                } else {
                    log::warn!("text-unit element '{name}' closed without an open unit");
                    self.skeleton.push_str(raw);
                }
            }
            RuleKind::Excluded
            | RuleKind::Included
            | RuleKind::AttributesOnly
            | RuleKind::PreserveWhitespace
            | RuleKind::NotFound => {
                if self.unit.is_some() && kind == RuleKind::NotFound {
                    self.append_unit_code(Code::new(TagRole::Closing, name, raw));
                } else {
                    self.skeleton.push_str(raw);
                }
            }
        }

        self.pop_whitespace_rule(name, offset)?;
        Ok(())
    }

    /// Comments and processing instructions: excluded content is skeleton;
    /// inside a text run they are in-line codes (or protected content);
    /// otherwise they are independent document parts.
    fn handle_standalone(&mut self, raw: &str, kind: &str) {
        if self.state.is_excluded() {
            self.skeleton.push_str(raw);
            return;
        }
        if self.unit.is_some() {
            if self.state.is_inline_excluded() {
                self.append_to_open_code(raw, true);
            } else {
                self.append_unit_code(Code::new(TagRole::Placeholder, kind, raw));
            }
        } else {
            self.add_document_part(raw);
        }
    }

    fn handle_cdata(&mut self, content: &str, raw: &str) {
        if self.state.is_excluded() {
            self.skeleton.push_str(raw);
            return;
        }
        if self.unit.is_some() {
            self.append_unit_text(content);
            return;
        }
        // A standalone CDATA section is one plain-text unit between the
        // section markers.
        self.add_document_part("<![CDATA[");
        let id = self.next_unit_id;
        self.next_unit_id += 1;
        self.push_event(Event::TextUnit(ExtractedUnit {
            id,
            name: None,
            unit_type: Some("cdata".to_string()),
            fragment: CodedText::from_text(content),
            preserve_whitespace: true,
        }));
        self.add_document_part("]]>");
    }

    // ------------------------------------------------------------------
    // Rule-state bookkeeping
    // ------------------------------------------------------------------

    /// Pushes the element's rules onto the stacks it participates in. An
    /// element with both a content rule and a whitespace rule pushes onto
    /// both stacks.
    fn push_rule_state(&mut self, tag: &StartTag, kind: RuleKind) {
        match self.config.element_kind(&tag.name) {
            RuleKind::Inline | RuleKind::InlineExcluded => {
                self.state.push_inline(&tag.name, kind);
            }
            RuleKind::Group => self.state.push_group(&tag.name),
            RuleKind::Excluded => self.state.push_excluded(&tag.name),
            RuleKind::Included => self.state.push_included(&tag.name),
            RuleKind::TextUnit => {
                let id_value = tag.attributes.get("id").cloned();
                self.state.push_text_unit(&tag.name, id_value);
            }
            RuleKind::AttributesOnly | RuleKind::PreserveWhitespace | RuleKind::NotFound => {}
        }

        if let Some(value) = tag.attributes.get("xml:space") {
            self.state
                .push_preserve_whitespace(&tag.name, true, value.eq_ignore_ascii_case("preserve"));
        } else if self.config.is_preserve_whitespace_element(&tag.name) {
            self.state.push_preserve_whitespace(&tag.name, true, true);
        }
    }

    /// Pops the stack matching the element's configured kind and returns the
    /// rule kind recorded at push time.
    fn pop_rule_state(&mut self, name: &str, offset: usize) -> Result<RuleKind> {
        let entry = match self.config.element_kind(name) {
            RuleKind::Inline | RuleKind::InlineExcluded => {
                Some(self.state.pop_inline(name, offset)?)
            }
            RuleKind::Group => Some(self.state.pop_group(name, offset)?),
            RuleKind::Excluded | RuleKind::Included => {
                Some(self.state.pop_excluded(name, offset)?)
            }
            RuleKind::TextUnit => Some(self.state.pop_text_unit(name, offset)?),
            RuleKind::AttributesOnly | RuleKind::PreserveWhitespace | RuleKind::NotFound => None,
        };
        Ok(entry.map_or(RuleKind::NotFound, |entry| entry.kind))
    }

    fn pop_whitespace_rule(&mut self, name: &str, offset: usize) -> Result<()> {
        if self.config.is_preserve_whitespace_element(name) {
            self.state.pop_preserve_whitespace(name, offset)?;
        } else {
            // Rules pushed from attribute handling (xml:space) pop by name.
            self.state.pop_preserve_whitespace_if(name);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Unit lifecycle
    // ------------------------------------------------------------------

    /// Starts a text unit when none is open. This is the only place a unit
    /// can begin.
    fn ensure_unit(&mut self) {
        if self.unit.is_some() {
            return;
        }
        let id = self.next_unit_id;
        self.next_unit_id += 1;
        self.unit = Some(OpenUnit {
            id,
            name: None,
            unit_type: None,
            fragment: CodedText::new(),
            preserve_whitespace: self.state.preserve_whitespace(),
            open_codes: Vec::new(),
        });
    }

    fn start_unit(&mut self, tag: &StartTag) {
        self.ensure_unit();
        if let Some(unit) = &mut self.unit {
            unit.name = tag.attributes.get("id").cloned();
            unit.unit_type = Some(tag.name.clone());
        }
    }

    /// Finalizes the open unit. A unit that never accumulated text is
    /// demoted: its collected content is replayed as skeleton instead of
    /// being exposed for translation.
    fn end_unit(&mut self, end_raw: &str) {
        let Some(mut unit) = self.unit.take() else {
            return;
        };
        if !unit.fragment.has_text(true) {
            self.skeleton.push_str(&raw_text(&unit.fragment));
            self.skeleton.push_str(end_raw);
            return;
        }
        unit.fragment.balance_markers();
        if !unit.preserve_whitespace {
            normalize_whitespace(&mut unit.fragment);
        }
        self.push_event(Event::TextUnit(ExtractedUnit {
            id: unit.id,
            name: unit.name,
            unit_type: unit.unit_type,
            fragment: unit.fragment,
            preserve_whitespace: unit.preserve_whitespace,
        }));
        self.skeleton.push_str(end_raw);
    }

    fn append_unit_text(&mut self, text: &str) {
        if let Some(unit) = &mut self.unit {
            unit.fragment.append_text(text);
        }
    }

    fn append_unit_code(&mut self, code: Code) {
        self.ensure_unit();
        if let Some(unit) = &mut self.unit {
            unit.fragment.append_code(code);
        }
    }

    /// Appends content to the protected code currently collecting. With
    /// `also_data` set the text goes to both the data and the outer data
    /// (content); end tags go to the outer data only.
    fn append_to_open_code(&mut self, text: &str, also_data: bool) {
        let Some(unit) = &mut self.unit else {
            log::warn!("protected content outside any unit; skipped");
            return;
        };
        let index = unit.open_codes.last().copied();
        let Some(code) = index.and_then(|index| unit.fragment.code_mut(index)) else {
            log::warn!("protected content without an open code; skipped");
            return;
        };
        if also_data {
            code.append_data(text);
        }
        code.append_outer_data(text);
    }

    /// Closes one level of protected content. A nested close is still
    /// content of the enclosing code; the outermost close goes to the outer
    /// data only and seals the code.
    fn close_protected_code(&mut self, raw: &str) {
        let Some(unit) = &mut self.unit else {
            log::warn!("protected end tag outside any unit; skipped");
            return;
        };
        let Some(index) = unit.open_codes.pop() else {
            log::warn!("protected end tag without an open code; skipped");
            return;
        };
        let nested = !unit.open_codes.is_empty();
        if let Some(code) = unit.fragment.code_mut(index) {
            if nested {
                code.append_data(raw);
            }
            code.append_outer_data(raw);
        }
    }

    // ------------------------------------------------------------------
    // Event plumbing
    // ------------------------------------------------------------------

    /// Emits pending skeleton as one document part.
    fn flush_skeleton(&mut self) {
        if !self.skeleton.is_empty() {
            let literal = std::mem::take(&mut self.skeleton);
            self.events.push_back(Event::DocumentPart(literal));
        }
    }

    fn add_document_part(&mut self, literal: &str) {
        self.skeleton.push_str(literal);
    }

    fn push_event(&mut self, event: Event) {
        self.flush_skeleton();
        self.events.push_back(event);
    }
}

/// Whitespace per the markup character class.
fn is_whitespace(text: &str) -> bool {
    text.chars()
        .all(|ch| matches!(ch, ' ' | '\t' | '\r' | '\n' | '\x0B' | '\x0C'))
}

/// The unit's content replayed as literal markup, for demoted units.
fn raw_text(fragment: &CodedText) -> String {
    let mut out = String::new();
    for segment in fragment.segments() {
        match segment {
            Segment::Plain(run) => out.push_str(run),
            Segment::Code { index, .. } => {
                if let Some(code) = fragment.code(*index) {
                    out.push_str(code.literal());
                }
            }
        }
    }
    out
}

/// Collapses whitespace runs to single spaces and trims the unit's leading
/// and trailing whitespace. Applied once, after the unit's content is
/// complete.
fn normalize_whitespace(fragment: &mut CodedText) {
    for segment in &mut fragment.segments {
        if let Segment::Plain(run) = segment {
            *run = patterns::WHITESPACE_RUN.replace_all(run, " ").into_owned();
        }
    }
    if let Some(Segment::Plain(run)) = fragment.segments.first_mut() {
        *run = run.trim_start().to_string();
    }
    if let Some(Segment::Plain(run)) = fragment.segments.last_mut() {
        *run = run.trim_end().to_string();
    }
    fragment
        .segments
        .retain(|segment| !matches!(segment, Segment::Plain(run) if run.is_empty()));
}
