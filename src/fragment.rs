//! Coded text: plain text interleaved with in-line code references.
//!
//! A [`CodedText`] is an ordered sequence of plain-text runs and references
//! into a side list of [`Code`] objects. The reference carries its own
//! [`Marker`] because balancing can demote an opening or closing reference to
//! an isolated one (orphan tags) without touching the code itself.
//!
//! Closing codes may be appended with a pending id
//! ([`Code::PENDING_ID`]); [`CodedText::balance_markers`] resolves pairs
//! across the whole sequence once it is complete, since well-formed-ness can
//! only be checked globally.

use std::collections::HashMap;

use crate::code::{Code, TagRole};

/// How a code reference participates in the text it is embedded in.
///
/// The marker starts out mirroring the code's [`TagRole`] and may be rewritten
/// to [`Marker::Isolated`] during balancing when no partner exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Reference opens a paired span.
    Opening,
    /// Reference closes a paired span.
    Closing,
    /// Reference stands alone (placeholder, or an orphaned opening/closing).
    Isolated,
}

impl Marker {
    fn from_role(role: TagRole) -> Self {
        match role {
            TagRole::Opening => Marker::Opening,
            TagRole::Closing => Marker::Closing,
            TagRole::Placeholder => Marker::Isolated,
        }
    }
}

/// One element of a coded text sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A run of plain text.
    Plain(String),
    /// A reference to `codes[index]`, embedded with the given marker.
    Code {
        /// How the reference participates in the surrounding text.
        marker: Marker,
        /// Index into the code list (append order, not id order).
        index: usize,
    },
}

/// A run of text that may contain in-line codes.
///
/// Every code reference resolves to a valid position in the code list, and a
/// code is referenced at most once as opening and once as closing. The code
/// list is in append order; ids are allocated on append for opening and
/// placeholder codes and resolved during balancing for closing codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodedText {
    pub(crate) segments: Vec<Segment>,
    pub(crate) codes: Vec<Code>,
    pub(crate) last_code_id: i32,
    pub(crate) balanced: bool,
}

impl CodedText {
    /// Creates an empty coded text.
    #[must_use]
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            codes: Vec::new(),
            last_code_id: 0,
            balanced: true,
        }
    }

    /// Creates a coded text holding only plain text.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        let mut fragment = Self::new();
        fragment.append_text_owned(text.into());
        fragment
    }

    /// Appends plain text, merging with a trailing plain run if present.
    pub fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Plain(run)) = self.segments.last_mut() {
            run.push_str(text);
        } else {
            self.segments.push(Segment::Plain(text.to_string()));
        }
    }

    fn append_text_owned(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Plain(run)) = self.segments.last_mut() {
            run.push_str(&text);
        } else {
            self.segments.push(Segment::Plain(text));
        }
    }

    /// Appends an in-line code, allocating an id when needed.
    ///
    /// Opening and placeholder codes with a pending id receive the next
    /// sequential id. Closing codes keep the pending sentinel and mark the
    /// fragment for re-balancing; their id is resolved by
    /// [`balance_markers`](Self::balance_markers).
    ///
    /// Returns the index of the appended code.
    pub fn append_code(&mut self, mut code: Code) -> usize {
        let marker = Marker::from_role(code.tag_role);
        if code.has_pending_id() {
            if code.tag_role == TagRole::Closing {
                self.balanced = false;
            } else {
                self.last_code_id += 1;
                code.id = self.last_code_id;
            }
        } else if code.id > self.last_code_id {
            self.last_code_id = code.id;
        }
        self.push_code_ref(code, marker)
    }

    /// Appends a code with a pre-assigned id and an explicit marker.
    ///
    /// Used by codecs reconstructing a fragment from a notation where the
    /// marker and the code's tag role can differ (e.g. `<b3/>` is an opening
    /// code embedded as an isolated reference).
    pub fn push_code_ref(&mut self, code: Code, marker: Marker) -> usize {
        if code.has_pending_id() {
            self.balanced = false;
        } else if code.id > self.last_code_id {
            self.last_code_id = code.id;
        }
        self.codes.push(code);
        let index = self.codes.len() - 1;
        self.segments.push(Segment::Code { marker, index });
        index
    }

    /// The segment sequence.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The code list, in append order.
    #[must_use]
    pub fn codes(&self) -> &[Code] {
        &self.codes
    }

    /// The code at the given index.
    #[must_use]
    pub fn code(&self, index: usize) -> Option<&Code> {
        self.codes.get(index)
    }

    /// Mutable access to the code at the given index.
    pub fn code_mut(&mut self, index: usize) -> Option<&mut Code> {
        self.codes.get_mut(index)
    }

    /// True when the fragment holds at least one code.
    #[must_use]
    pub fn has_code(&self) -> bool {
        !self.codes.is_empty()
    }

    /// True when the fragment holds text. With `white_counts` set, whitespace
    /// counts as text; otherwise at least one non-whitespace character is
    /// required.
    #[must_use]
    pub fn has_text(&self, white_counts: bool) -> bool {
        self.segments.iter().any(|segment| match segment {
            Segment::Plain(run) => {
                white_counts || run.chars().any(|ch| !ch.is_whitespace())
            }
            Segment::Code { .. } => false,
        })
    }

    /// True when the fragment holds neither text nor codes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The plain-text projection: all plain runs joined, codes skipped.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        for segment in &self.segments {
            if let Segment::Plain(run) = segment {
                text.push_str(run);
            }
        }
        text
    }

    /// Highest code id currently allocated.
    #[must_use]
    pub fn last_code_id(&self) -> i32 {
        self.last_code_id
    }

    /// Index of the first opening or placeholder code with the given id.
    ///
    /// Balances the markers first so pending closing ids are resolved.
    pub fn index_of(&mut self, id: i32) -> Option<usize> {
        if !self.balanced {
            self.balance_markers();
        }
        self.codes
            .iter()
            .position(|code| code.tag_role != TagRole::Closing && code.id == id)
    }

    /// Index of the first closing code with the given id.
    ///
    /// Balances the markers first so pending closing ids are resolved.
    pub fn index_of_closing(&mut self, id: i32) -> Option<usize> {
        if !self.balanced {
            self.balance_markers();
        }
        self.codes
            .iter()
            .position(|code| code.tag_role == TagRole::Closing && code.id == id)
    }

    /// Replaces the content with a single plain run. Only valid when the
    /// fragment carries no codes.
    pub(crate) fn set_text(&mut self, text: String) {
        debug_assert!(!self.has_code());
        self.segments.clear();
        self.append_text_owned(text);
    }

    /// Pairs opening and closing codes and rewrites markers accordingly.
    ///
    /// Closing codes with a pending id receive the id of their matching
    /// opening, or a fresh id if they turn out to be orphans. Opening codes
    /// without a partner are demoted to isolated references. Overlapping
    /// spans of the same kind are resolved through a candidate search: the
    /// closing code inherits the opening's id but both stay isolated.
    ///
    /// Also resets the last-code-id to the highest id in use.
    pub fn balance_markers(&mut self) {
        // Sentinels for the closing-id scratch table.
        const MATCHED: i32 = -9999;
        const CANDIDATE: i32 = -88;

        self.last_code_id = 0;
        let mut closing_ids: Vec<i32> = self.codes.iter().map(|code| code.id).collect();
        for code in &self.codes {
            if code.id > self.last_code_id {
                self.last_code_id = code.id;
            }
        }

        for si in 0..self.segments.len() {
            let index = match self.segments[si] {
                Segment::Code { index, .. } => index,
                Segment::Plain(_) => continue,
            };
            let new_marker = match self.codes[index].tag_role {
                TagRole::Placeholder => Marker::Isolated,
                TagRole::Opening => {
                    self.balance_opening(index, &mut closing_ids, MATCHED, CANDIDATE)
                }
                TagRole::Closing => {
                    if closing_ids[index] == MATCHED {
                        Marker::Closing
                    } else if closing_ids[index] == Code::PENDING_ID {
                        // Orphan closing without an id: allocate a fresh one.
                        self.last_code_id += 1;
                        self.codes[index].id = self.last_code_id;
                        Marker::Isolated
                    } else {
                        Marker::Isolated
                    }
                }
            };
            self.segments[si] = Segment::Code {
                marker: new_marker,
                index,
            };
        }
        self.balanced = true;
    }

    /// Finds the closing partner for the opening code at `index`.
    fn balance_opening(
        &mut self,
        index: usize,
        closing_ids: &mut [i32],
        matched: i32,
        candidate_used: i32,
    ) -> Marker {
        let code_id = self.codes[index].id;
        let code_kind = self.codes[index].kind.clone();

        // First look for a closing code already carrying the same id and kind.
        for j in index + 1..self.codes.len() {
            if self.codes[j].tag_role == TagRole::Closing
                && self.codes[j].kind == code_kind
                && self.codes[j].id == code_id
                && closing_ids[j] != matched
            {
                closing_ids[j] = matched;
                return Marker::Opening;
            }
        }

        // Not found: balance by nesting depth, tracking one depth counter for
        // all codes and one for codes of this kind. A candidate closing is
        // remembered when spans of the same kind overlap.
        let mut found = false;
        let mut fixup_mode = false;
        let mut candidate: Option<usize> = None;
        let mut stack_all = 1i32;
        let mut stack_kind = 1i32;
        for j in index + 1..self.codes.len() {
            if self.codes[j].kind == code_kind {
                match self.codes[j].tag_role {
                    TagRole::Opening => {
                        stack_all += 1;
                        stack_kind += 1;
                    }
                    TagRole::Closing => {
                        stack_all -= 1;
                        stack_kind -= 1;
                        if fixup_mode {
                            // Searching for a closing code after overlap was
                            // detected.
                            if stack_kind == 0 && closing_ids[j] != matched {
                                candidate = Some(j);
                                break;
                            }
                            continue;
                        }
                        if stack_all == 0 {
                            if stack_kind == 0 && closing_ids[j] != matched {
                                self.codes[j].id = code_id;
                                closing_ids[j] = matched;
                                found = true;
                                break;
                            }
                            // Not the proper element order.
                            fixup_mode = true;
                        } else if stack_all > 0 {
                            if stack_kind == 0 && closing_ids[j] != matched {
                                candidate = Some(j);
                            }
                        } else {
                            // Past the proper spot.
                            if candidate.is_some() {
                                break;
                            }
                            if stack_kind == 0 && closing_ids[j] != matched {
                                candidate = Some(j);
                                break;
                            }
                            fixup_mode = true;
                        }
                    }
                    TagRole::Placeholder => {}
                }
            } else {
                match self.codes[j].tag_role {
                    TagRole::Opening => stack_all += 1,
                    TagRole::Closing => stack_all -= 1,
                    TagRole::Placeholder => {}
                }
                if stack_all == 0 {
                    fixup_mode = true;
                }
            }
        }

        if found {
            Marker::Opening
        } else {
            if let Some(j) = candidate {
                self.codes[j].id = code_id;
                closing_ids[j] = candidate_used;
            }
            Marker::Isolated
        }
    }

    /// Re-assigns sequential ids starting at `id_base`, following the order
    /// in which codes appear in the text. Closing codes inherit the new id of
    /// their opening. Returns the highest id assigned.
    pub fn renumber_codes(&mut self, id_base: i32) -> i32 {
        if !self.balanced {
            self.balance_markers();
        }
        let mut next = id_base;
        let mut renumbered: HashMap<i32, i32> = HashMap::new();
        for si in 0..self.segments.len() {
            let index = match self.segments[si] {
                Segment::Code { index, .. } => index,
                Segment::Plain(_) => continue,
            };
            match self.codes[index].tag_role {
                TagRole::Opening => {
                    renumbered.insert(self.codes[index].id, next);
                    self.codes[index].id = next;
                    next += 1;
                }
                TagRole::Placeholder => {
                    self.codes[index].id = next;
                    next += 1;
                }
                TagRole::Closing => {
                    if let Some(&new_id) = renumbered.get(&self.codes[index].id) {
                        self.codes[index].id = new_id;
                    } else {
                        self.codes[index].id = next;
                        next += 1;
                    }
                }
            }
        }
        self.last_code_id = next - 1;
        self.last_code_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opening(kind: &str, data: &str) -> Code {
        Code::new(TagRole::Opening, kind, data)
    }

    fn closing(kind: &str, data: &str) -> Code {
        Code::new(TagRole::Closing, kind, data)
    }

    fn placeholder(kind: &str, data: &str) -> Code {
        Code::new(TagRole::Placeholder, kind, data)
    }

    #[test]
    fn append_text_merges_runs() {
        let mut fragment = CodedText::new();
        fragment.append_text("Hello ");
        fragment.append_text("world");
        assert_eq!(fragment.segments().len(), 1);
        assert_eq!(fragment.plain_text(), "Hello world");
    }

    #[test]
    fn append_code_allocates_sequential_ids() {
        let mut fragment = CodedText::new();
        fragment.append_code(opening("bold", "<b>"));
        fragment.append_code(placeholder("image", "<img/>"));
        assert_eq!(fragment.codes()[0].id, 1);
        assert_eq!(fragment.codes()[1].id, 2);
        assert_eq!(fragment.last_code_id(), 2);
    }

    #[test]
    fn closing_code_resolves_to_opening_id() {
        let mut fragment = CodedText::new();
        fragment.append_code(opening("bold", "<b>"));
        fragment.append_text("bold");
        fragment.append_code(closing("bold", "</b>"));
        fragment.balance_markers();
        assert_eq!(fragment.codes()[0].id, fragment.codes()[1].id);
        assert_eq!(
            fragment.segments()[2],
            Segment::Code {
                marker: Marker::Closing,
                index: 1
            }
        );
    }

    #[test]
    fn orphan_opening_is_demoted_to_isolated() {
        let mut fragment = CodedText::new();
        fragment.append_code(opening("bold", "<b>"));
        fragment.append_text("never closed");
        fragment.balance_markers();
        assert_eq!(
            fragment.segments()[0],
            Segment::Code {
                marker: Marker::Isolated,
                index: 0
            }
        );
    }

    #[test]
    fn orphan_closing_gets_fresh_id() {
        let mut fragment = CodedText::new();
        fragment.append_text("text");
        fragment.append_code(closing("bold", "</b>"));
        fragment.balance_markers();
        assert_ne!(fragment.codes()[0].id, Code::PENDING_ID);
        assert_eq!(
            fragment.segments()[1],
            Segment::Code {
                marker: Marker::Isolated,
                index: 0
            }
        );
    }

    #[test]
    fn nested_pairs_of_same_kind_balance_by_depth() {
        let mut fragment = CodedText::new();
        fragment.append_code(opening("bold", "<b>")); // id 1
        fragment.append_code(opening("bold", "<b>")); // id 2
        fragment.append_text("x");
        fragment.append_code(closing("bold", "</b>"));
        fragment.append_code(closing("bold", "</b>"));
        fragment.balance_markers();
        // Inner close pairs with inner open, outer with outer.
        assert_eq!(fragment.codes()[2].id, 2);
        assert_eq!(fragment.codes()[3].id, 1);
    }

    #[test]
    fn index_lookup_distinguishes_roles() {
        let mut fragment = CodedText::new();
        fragment.append_code(opening("bold", "<b>"));
        fragment.append_text("x");
        fragment.append_code(closing("bold", "</b>"));
        assert_eq!(fragment.index_of(1), Some(0));
        assert_eq!(fragment.index_of_closing(1), Some(1));
        assert_eq!(fragment.index_of(9), None);
    }

    #[test]
    fn has_text_honors_whitespace_flag() {
        let mut fragment = CodedText::new();
        fragment.append_text("   ");
        assert!(fragment.has_text(true));
        assert!(!fragment.has_text(false));
        fragment.append_text("a");
        assert!(fragment.has_text(false));
    }

    #[test]
    fn renumber_codes_follows_text_order() {
        let mut fragment = CodedText::new();
        let mut first = opening("bold", "<b>");
        first.id = 7;
        fragment.push_code_ref(first, Marker::Opening);
        fragment.append_text("x");
        let mut close = closing("bold", "</b>");
        close.id = 7;
        fragment.push_code_ref(close, Marker::Closing);
        let mut lone = placeholder("image", "<img/>");
        lone.id = 3;
        fragment.push_code_ref(lone, Marker::Isolated);
        let last = fragment.renumber_codes(1);
        assert_eq!(fragment.codes()[0].id, 1);
        assert_eq!(fragment.codes()[1].id, 1);
        assert_eq!(fragment.codes()[2].id, 2);
        assert_eq!(last, 2);
    }
}
