//! Compiled regex patterns for the in-line notation codecs.
//!
//! All patterns are compiled once at startup using `LazyLock`. The tag
//! patterns are anchored (`^`) because the decoders match them against the
//! remaining unprocessed slice during a single forward scan.

#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

// =============================================================================
// Generic numeric notation: <1>, </1>, <2/>, <b3/>, <e3/>
// =============================================================================

/// Matches an opening tag `<N>` at the start of the slice.
pub static GENERIC_OPENING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<(\d+)>").expect("GENERIC_OPENING regex"));

/// Matches a closing tag `</N>` at the start of the slice.
pub static GENERIC_CLOSING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^</(\d+)>").expect("GENERIC_CLOSING regex"));

/// Matches an isolated placeholder tag `<N/>` at the start of the slice.
pub static GENERIC_ISOLATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<(\d+)/>").expect("GENERIC_ISOLATED regex"));

/// Matches an isolated-opening tag `<bN/>` at the start of the slice.
pub static GENERIC_ISOLATED_OPENING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<b(\d+)/>").expect("GENERIC_ISOLATED_OPENING regex"));

/// Matches an isolated-closing tag `<eN/>` at the start of the slice.
pub static GENERIC_ISOLATED_CLOSING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<e(\d+)/>").expect("GENERIC_ISOLATED_CLOSING regex"));

// =============================================================================
// Letter-coded notation: <g1>, </g1>, <x2/>, <b3/>, <e3/>
// =============================================================================

/// Matches an opening tag `<gN>` at the start of the slice.
pub static LETTER_OPENING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<g(\d+)>").expect("LETTER_OPENING regex"));

/// Matches a closing tag `</gN>` at the start of the slice.
pub static LETTER_CLOSING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^</g(\d+)>").expect("LETTER_CLOSING regex"));

/// Matches an isolated placeholder tag `<xN/>` at the start of the slice.
pub static LETTER_ISOLATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<x(\d+)/>").expect("LETTER_ISOLATED regex"));

// =============================================================================
// Letter-code escaping transform
//
// A literal occurrence of the scheme's own syntax inside content is shifted
// by one extra prefix letter on encode (<g1> becomes <gg1>, <x2/> becomes
// <xx2/>) and un-shifted on decode, so it cannot collide with a live code.
// =============================================================================

/// Matches a paired-tag spelling `<g…N>` or `</g…N>` anywhere (escape adds
/// one more `g`).
pub static LETTER_PAIRED_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)(g+\d+)>").expect("LETTER_PAIRED_ESCAPE regex"));

/// Matches an escaped paired-tag spelling `<gg…N>` or `</gg…N>` anywhere
/// (unescape strips one `g`).
pub static LETTER_PAIRED_UNESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)g(g+\d+)>").expect("LETTER_PAIRED_UNESCAPE regex"));

/// Matches an isolated-tag spelling `<x…N/>`, `<b…N/>`, or `<e…N/>` anywhere,
/// with a run of one repeated prefix letter (escape adds one more).
pub static LETTER_ISOLATED_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(x+|b+|e+)(\d+)/>").expect("LETTER_ISOLATED_ESCAPE regex"));

/// Matches an escaped isolated-tag spelling with at least two repeated prefix
/// letters (unescape strips one).
pub static LETTER_ISOLATED_UNESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(x{2,}|b{2,}|e{2,})(\d+)/>").expect("LETTER_ISOLATED_UNESCAPE regex")
});

// =============================================================================
// TM-interchange notation: <bpt i="1">, <ept i="1">, <ph x="2"/>, <it pos>
// =============================================================================

/// Matches a begin-paired tag `<bpt i="N" …>inner</bpt>` at the start of the
/// slice.
pub static INTERCHANGE_BPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^<bpt i="(\d+)"([^>]*)>(.*?)</bpt>"#).expect("INTERCHANGE_BPT regex")
});

/// Matches an end-paired tag `<ept i="N" …>inner</ept>` at the start of the
/// slice.
pub static INTERCHANGE_EPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^<ept i="(\d+)"([^>]*)>(.*?)</ept>"#).expect("INTERCHANGE_EPT regex")
});

/// Matches a placeholder tag `<ph x="N" …>inner</ph>` at the start of the
/// slice.
pub static INTERCHANGE_PH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^<ph x="(\d+)"([^>]*)>(.*?)</ph>"#).expect("INTERCHANGE_PH regex")
});

/// Matches an isolated tag `<it x="N" pos="begin|end" …>inner</it>` at the
/// start of the slice.
pub static INTERCHANGE_IT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^<it x="(\d+)" pos="(begin|end)"([^>]*)>(.*?)</it>"#)
        .expect("INTERCHANGE_IT regex")
});

/// Extracts a `type="…"` attribute from an attribute blob.
pub static TYPE_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"type="([^"]*)""#).expect("TYPE_ATTRIBUTE regex"));

// =============================================================================
// Whitespace normalization
// =============================================================================

/// Matches a run of whitespace-class characters to collapse.
pub static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\n\x0B\x0C]+").expect("WHITESPACE_RUN regex"));
