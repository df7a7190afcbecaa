//! Per-parse extraction rule state.
//!
//! Five independent stacks record, per open element, which classification
//! rule applies: exclusion (excluded/included), group, in-line, text-unit,
//! and whitespace preservation. Each entry caches the effective state at its
//! depth when pushed, so the queries are a top-of-stack read instead of a
//! scan; the fallback below the deepest entry is the configured global
//! default.
//!
//! Pops assert the popped entry's name matches the end tag. The tokenizer
//! guarantees tag pairing, so a mismatch is an internal bookkeeping bug and
//! fails the parse.

use crate::error::{Error, Result};
use crate::rules::RuleKind;

/// One entry on a rule stack.
#[derive(Debug, Clone)]
pub struct RuleEntry {
    /// Element name the rule was pushed for.
    pub name: String,
    /// Rule kind recorded at push time.
    pub kind: RuleKind,
    /// Id value captured from the element, when configured.
    pub id_value: Option<String>,
    /// Effective state at this depth. For the whitespace stack an entry can
    /// be pushed as a no-op marker that carries the state below it.
    effective: bool,
}

impl RuleEntry {
    fn new(name: &str, kind: RuleKind, effective: bool) -> Self {
        Self {
            name: name.to_string(),
            kind,
            id_value: None,
            effective,
        }
    }
}

/// The five rule stacks for one in-flight document parse.
#[derive(Debug, Clone)]
pub struct RuleState {
    exclusions: Vec<RuleEntry>,
    groups: Vec<RuleEntry>,
    inlines: Vec<RuleEntry>,
    text_units: Vec<RuleEntry>,
    whitespace: Vec<RuleEntry>,
    exclude_by_default: bool,
    preserve_whitespace_default: bool,
}

impl RuleState {
    /// Creates the state for a new parse, seeded from the global defaults.
    #[must_use]
    pub fn new(preserve_whitespace: bool, exclude_by_default: bool) -> Self {
        Self {
            exclusions: Vec::new(),
            groups: Vec::new(),
            inlines: Vec::new(),
            text_units: Vec::new(),
            whitespace: Vec::new(),
            exclude_by_default,
            preserve_whitespace_default: preserve_whitespace,
        }
    }

    /// Clears all stacks back to the baseline for a fresh parse.
    pub fn reset(&mut self) {
        self.exclusions.clear();
        self.groups.clear();
        self.inlines.clear();
        self.text_units.clear();
        self.whitespace.clear();
    }

    /// All stacks are back to their baseline (every pushed rule was popped).
    #[must_use]
    pub fn is_baseline(&self) -> bool {
        self.exclusions.is_empty()
            && self.groups.is_empty()
            && self.inlines.is_empty()
            && self.text_units.is_empty()
            && self.whitespace.is_empty()
    }

    // ------------------------------------------------------------------
    // Exclusion stack
    // ------------------------------------------------------------------

    /// Pushes an excluded-element rule.
    pub fn push_excluded(&mut self, name: &str) {
        self.exclusions
            .push(RuleEntry::new(name, RuleKind::Excluded, true));
    }

    /// Pushes an included-element rule (exception inside an excluded block,
    /// or the synthetic entry a text-unit adds under exclude-by-default).
    pub fn push_included(&mut self, name: &str) {
        self.exclusions
            .push(RuleEntry::new(name, RuleKind::Included, false));
    }

    /// Pops the top exclusion entry, checking the name.
    pub fn pop_excluded(&mut self, end_tag: &str, offset: usize) -> Result<RuleEntry> {
        pop_checked(&mut self.exclusions, end_tag, offset)
    }

    /// Pops the top exclusion entry without a name check. Used for the
    /// synthetic included entry pushed under exclude-by-default, which does
    /// not correspond to a rule of its own.
    pub fn pop_exclusion_unchecked(&mut self) -> Option<RuleEntry> {
        self.exclusions.pop()
    }

    /// Whether content at the current depth is excluded. The deepest
    /// excluded/included entry decides; with no entry the global
    /// exclude-by-default applies.
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        self.exclusions
            .last()
            .map_or(self.exclude_by_default, |entry| entry.effective)
    }

    // ------------------------------------------------------------------
    // Inline stack
    // ------------------------------------------------------------------

    /// Pushes an in-line rule ([`RuleKind::Inline`] or
    /// [`RuleKind::InlineExcluded`]).
    pub fn push_inline(&mut self, name: &str, kind: RuleKind) {
        let effective = self.is_inline_excluded() || kind == RuleKind::InlineExcluded;
        self.inlines.push(RuleEntry::new(name, kind, effective));
    }

    /// Pops the top in-line entry, checking the name.
    pub fn pop_inline(&mut self, end_tag: &str, offset: usize) -> Result<RuleEntry> {
        pop_checked(&mut self.inlines, end_tag, offset)
    }

    /// Whether the current in-line run is inside a protected
    /// ([`RuleKind::InlineExcluded`]) code.
    #[must_use]
    pub fn is_inline_excluded(&self) -> bool {
        self.inlines.last().is_some_and(|entry| entry.effective)
    }

    // ------------------------------------------------------------------
    // Group and text-unit stacks
    // ------------------------------------------------------------------

    /// Pushes a group rule.
    pub fn push_group(&mut self, name: &str) {
        self.groups.push(RuleEntry::new(name, RuleKind::Group, false));
    }

    /// Pops the top group entry, checking the name.
    pub fn pop_group(&mut self, end_tag: &str, offset: usize) -> Result<RuleEntry> {
        pop_checked(&mut self.groups, end_tag, offset)
    }

    /// Pushes a text-unit rule, capturing the element's id value if any.
    pub fn push_text_unit(&mut self, name: &str, id_value: Option<String>) {
        let mut entry = RuleEntry::new(name, RuleKind::TextUnit, false);
        entry.id_value = id_value;
        self.text_units.push(entry);
    }

    /// Pops the top text-unit entry, checking the name.
    pub fn pop_text_unit(&mut self, end_tag: &str, offset: usize) -> Result<RuleEntry> {
        pop_checked(&mut self.text_units, end_tag, offset)
    }

    // ------------------------------------------------------------------
    // Whitespace stack
    // ------------------------------------------------------------------

    /// Pushes a whitespace rule. With `applies` unset the entry is a no-op
    /// marker: it keeps its position for the matching pop but carries the
    /// state below it unchanged.
    pub fn push_preserve_whitespace(&mut self, name: &str, applies: bool, preserve: bool) {
        let effective = if applies {
            preserve
        } else {
            self.preserve_whitespace()
        };
        self.whitespace
            .push(RuleEntry::new(name, RuleKind::PreserveWhitespace, effective));
    }

    /// Pops the top whitespace entry, checking the name.
    pub fn pop_preserve_whitespace(&mut self, end_tag: &str, offset: usize) -> Result<RuleEntry> {
        pop_checked(&mut self.whitespace, end_tag, offset)
    }

    /// Pops the top whitespace entry only when its name matches; used for
    /// rules pushed from attribute handling (such as `xml:space`) that do
    /// not always line up with an element's own rule.
    pub fn pop_preserve_whitespace_if(&mut self, end_tag: &str) -> Option<RuleEntry> {
        if self
            .whitespace
            .last()
            .is_some_and(|entry| entry.name.eq_ignore_ascii_case(end_tag))
        {
            self.whitespace.pop()
        } else {
            None
        }
    }

    /// Whether whitespace is currently significant. Pure top-of-stack
    /// override; the global default applies below the deepest entry.
    #[must_use]
    pub fn preserve_whitespace(&self) -> bool {
        self.whitespace
            .last()
            .map_or(self.preserve_whitespace_default, |entry| entry.effective)
    }
}

/// Pops and checks the entry name against the end tag, case-insensitively.
fn pop_checked(stack: &mut Vec<RuleEntry>, end_tag: &str, offset: usize) -> Result<RuleEntry> {
    let entry = stack.pop().ok_or_else(|| Error::MismatchedTag {
        end_tag: end_tag.to_string(),
        start_tag: String::new(),
        offset,
    })?;
    if entry.name.eq_ignore_ascii_case(end_tag) {
        Ok(entry)
    } else {
        Err(Error::MismatchedTag {
            end_tag: end_tag.to_string(),
            start_tag: entry.name,
            offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn included_overrides_enclosing_excluded() {
        let mut state = RuleState::new(false, false);
        assert!(!state.is_excluded());
        state.push_excluded("excluded_tag");
        assert!(state.is_excluded());
        state.push_included("included_tag");
        assert!(!state.is_excluded());
        state.pop_excluded("included_tag", 0).unwrap();
        assert!(state.is_excluded());
        state.pop_excluded("excluded_tag", 0).unwrap();
        assert!(!state.is_excluded());
    }

    #[test]
    fn exclude_by_default_is_the_fallback() {
        let mut state = RuleState::new(false, true);
        assert!(state.is_excluded());
        state.push_included("p");
        assert!(!state.is_excluded());
        state.pop_exclusion_unchecked();
        assert!(state.is_excluded());
    }

    #[test]
    fn inline_exclusion_sticks_for_nested_inlines() {
        let mut state = RuleState::new(false, false);
        state.push_inline("ph", RuleKind::InlineExcluded);
        assert!(state.is_inline_excluded());
        state.push_inline("b", RuleKind::Inline);
        assert!(state.is_inline_excluded());
        state.pop_inline("b", 0).unwrap();
        state.pop_inline("ph", 0).unwrap();
        assert!(!state.is_inline_excluded());
    }

    #[test]
    fn whitespace_state_is_top_of_stack() {
        let mut state = RuleState::new(false, false);
        assert!(!state.preserve_whitespace());
        state.push_preserve_whitespace("pre", true, true);
        assert!(state.preserve_whitespace());
        // A no-op marker keeps the state below it.
        state.push_preserve_whitespace("span", false, false);
        assert!(state.preserve_whitespace());
        state.pop_preserve_whitespace("span", 0).unwrap();
        state.pop_preserve_whitespace("pre", 0).unwrap();
        assert!(!state.preserve_whitespace());
    }

    #[test]
    fn mismatched_pop_is_fatal() {
        let mut state = RuleState::new(false, false);
        state.push_group("table");
        let result = state.pop_group("div", 42);
        assert!(matches!(
            result,
            Err(Error::MismatchedTag { offset: 42, .. })
        ));
    }

    #[test]
    fn pop_names_are_case_insensitive() {
        let mut state = RuleState::new(false, false);
        state.push_text_unit("P", Some("intro".to_string()));
        let entry = state.pop_text_unit("p", 0).unwrap();
        assert_eq!(entry.id_value.as_deref(), Some("intro"));
    }

    #[test]
    fn stacks_return_to_baseline() {
        let mut state = RuleState::new(true, false);
        state.push_excluded("script");
        state.push_group("table");
        state.push_inline("b", RuleKind::Inline);
        state.push_text_unit("p", None);
        state.push_preserve_whitespace("pre", true, true);
        assert!(!state.is_baseline());
        state.pop_preserve_whitespace("pre", 0).unwrap();
        state.pop_text_unit("p", 0).unwrap();
        state.pop_inline("b", 0).unwrap();
        state.pop_group("table", 0).unwrap();
        state.pop_excluded("script", 0).unwrap();
        assert!(state.is_baseline());
        assert!(state.preserve_whitespace());
    }
}
