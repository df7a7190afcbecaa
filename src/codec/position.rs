//! Position mapping between rendered notation offsets and plain content.
//!
//! Given a range expressed in character offsets of a rendered notation
//! string, finds the equivalent range in the plain-content character offsets
//! of the fragment. The mapper walks the fragment accumulating how many
//! notation characters each run and code renders as, using the same per-kind
//! formulas as the encoders, without materializing the rendered string.

use std::ops::Range;

use crate::codec::{generic, letter};
use crate::error::{Error, Result};
use crate::fragment::{CodedText, Segment};

/// Which notation the offsets refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    /// Generic numeric tags (`<1>`, `</1>`, `<2/>`).
    Generic,
    /// Letter-coded tags (`<g1>`, `</g1>`, `<x2/>`).
    Letter,
}

impl Notation {
    /// Rendered width, in characters, of the code reference at `index`.
    fn code_width(self, fragment: &CodedText, marker: crate::fragment::Marker, index: usize) -> usize {
        let Some(code) = fragment.code(index) else {
            return 0;
        };
        let tag = match self {
            Notation::Generic => generic::tag_for(code.id, code.tag_role, marker),
            Notation::Letter => letter::tag_for(code.id, code.tag_role, marker),
        };
        tag.chars().count()
    }
}

/// Maps a `[start, end)` range of rendered-notation character offsets to the
/// equivalent range of plain-content character offsets.
///
/// Fails with [`Error::InvalidPosition`] when an offset falls strictly inside
/// a code's rendered span (no plain-content equivalent exists) or past the
/// end of the content.
pub fn plain_range(
    fragment: &CodedText,
    notation: Notation,
    range: Range<usize>,
) -> Result<Range<usize>> {
    let mut notation_pos = 0usize;
    let mut plain_pos = 0usize;
    let mut start = if range.start == 0 { Some(0) } else { None };
    let mut end = if range.end == 0 { Some(0) } else { None };

    for segment in fragment.segments() {
        match segment {
            Segment::Plain(run) => {
                for _ch in run.chars() {
                    notation_pos += 1;
                    plain_pos += 1;
                    if notation_pos == range.start {
                        start = Some(plain_pos);
                    }
                    if notation_pos == range.end {
                        end = Some(plain_pos);
                    }
                }
            }
            Segment::Code { marker, index } => {
                notation_pos += notation.code_width(fragment, *marker, *index);
                // Offsets strictly inside the rendered tag are skipped over
                // and stay unresolved.
                if notation_pos == range.start {
                    start = Some(plain_pos);
                }
                if notation_pos == range.end {
                    end = Some(plain_pos);
                }
            }
        }
        if start.is_some() && end.is_some() {
            break;
        }
    }

    match (start, end) {
        (Some(start), Some(end)) => Ok(start..end),
        (None, _) => Err(Error::InvalidPosition(range.start)),
        (_, None) => Err(Error::InvalidPosition(range.end)),
    }
}
