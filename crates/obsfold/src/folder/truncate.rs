//! Head truncation: keep the first `limit` units, drop the rest.
//!
//! The baseline folder. It preserves locality (the model sees the start of
//! the output) but throws away everything after the cut.

use crate::text::{Unit, head_chars};

use super::FoldOutcome;

/// Marker appended on its own line after truncated content.
pub const TRUNCATION_MARKER: &str = "[TRUNCATED]";

/// Keeps the first `limit` lines or characters verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TruncateFolder;

impl TruncateFolder {
    pub fn new() -> Self {
        Self
    }

    /// Keep the first `limit` units of `text` and append [`TRUNCATION_MARKER`].
    ///
    /// `hidden` is the number of units cut, which equals `excess` whenever
    /// the caller computed `excess` from the same text.
    pub fn fold(&self, text: &str, limit: usize, unit: Unit, excess: usize) -> FoldOutcome {
        let total = unit.count(text);
        if excess == 0 || total <= limit {
            return FoldOutcome::passthrough(text);
        }

        let kept = match unit {
            Unit::Lines => text.split('\n').take(limit).collect::<Vec<_>>().join("\n"),
            Unit::Chars => head_chars(text, limit).to_string(),
        };

        FoldOutcome {
            text: format!("{kept}\n{TRUNCATION_MARKER}"),
            hidden: total - limit,
        }
    }
}
