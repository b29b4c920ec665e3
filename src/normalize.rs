//! Text normalization for search keys.
//!
//! `normalize` turns display text into the canonical key stored in the
//! `*_norm` columns and computed for every incoming query: lowercase, no
//! diacritics, whitespace collapsed. It is total and idempotent, so the
//! same function serves both the write path and the query path.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Dash-like punctuation folded to a plain space, so "spider-man" and
/// "spider man" share a key.
const DASHES: &[char] = &[
    '-', '\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2015}',
];

/// Canonical search key for a piece of display text.
///
/// Lowercases, strips combining marks after NFD decomposition, folds
/// dash-like punctuation to spaces, and collapses whitespace runs.
/// Characters outside those rules pass through unchanged; the function
/// never fails. Empty and whitespace-only input both yield `""`.
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.to_lowercase().nfd() {
        if is_combining_mark(c) {
            continue;
        }
        let c = if DASHES.contains(&c) { ' ' } else { c };
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }
    out
}
