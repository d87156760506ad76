//! Size units for observations and char-boundary-safe slicing.
//!
//! Every budget in this crate is measured either in lines or in characters.
//! Lines are `'\n'`-separated segments, so an empty string is one line and a
//! trailing newline produces a final empty line. Characters are Unicode
//! scalar values, never bytes, which keeps multi-byte output from being cut
//! mid-codepoint.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The unit a limit is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Lines,
    Chars,
}

impl Unit {
    /// Size of `text` in this unit.
    pub fn count(self, text: &str) -> usize {
        match self {
            Unit::Lines => count_lines(text),
            Unit::Chars => count_chars(text),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Lines => "lines",
            Unit::Chars => "chars",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of `'\n'`-separated lines in `text`.
pub fn count_lines(text: &str) -> usize {
    text.split('\n').count()
}

/// Number of characters (Unicode scalar values) in `text`.
pub fn count_chars(text: &str) -> usize {
    text.chars().count()
}

/// The first `n` characters of `text`.
pub fn head_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => text.split_at(idx).0,
        None => text,
    }
}

/// The last `n` characters of `text`.
pub fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let total = count_chars(text);
    if n >= total {
        return text;
    }
    match text.char_indices().nth(total - n) {
        Some((idx, _)) => text.split_at(idx).1,
        None => "",
    }
}
