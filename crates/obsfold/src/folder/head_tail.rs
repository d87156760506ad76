//! Head + tail folding: show the start and the end, elide the middle.
//!
//! Preserves both locality (the beginning) and recency (the end). Suited to
//! log-like output where the first lines carry context and the last lines
//! carry the latest state.

use std::fmt;

use crate::error::ConfigError;
use crate::text::{Unit, head_chars, tail_chars};

use super::FoldOutcome;

/// Head share used when no ratio is given.
pub const DEFAULT_HEAD_RATIO: f64 = 0.6;

/// Splits the kept budget between the head and the tail of the output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadTailFolder {
    head_ratio: f64,
}

impl Default for HeadTailFolder {
    fn default() -> Self {
        Self {
            head_ratio: DEFAULT_HEAD_RATIO,
        }
    }
}

impl HeadTailFolder {
    /// `head_ratio` is the fraction of the budget given to the head and must
    /// lie strictly inside (0, 1).
    pub fn new(head_ratio: f64) -> Result<Self, ConfigError> {
        if !(head_ratio > 0.0 && head_ratio < 1.0) {
            return Err(ConfigError::RatioOutOfRange { value: head_ratio });
        }
        Ok(Self { head_ratio })
    }

    pub fn head_ratio(&self) -> f64 {
        self.head_ratio
    }

    /// `(head_n, tail_n)` for a budget of `limit` units. Either side may be 0.
    pub fn split(&self, limit: usize) -> (usize, usize) {
        let head = ((limit as f64 * self.head_ratio).round() as usize).min(limit);
        (head, limit - head)
    }

    pub fn fold(&self, text: &str, limit: usize, unit: Unit, excess: usize) -> FoldOutcome {
        let total = unit.count(text);
        if excess == 0 || total <= limit {
            return FoldOutcome::passthrough(text);
        }

        let (head_n, tail_n) = self.split(limit);
        let hidden = total - head_n - tail_n;
        let marker = format!("[... {hidden} {unit} elided ...]");

        let mut parts: Vec<&str> = Vec::new();
        match unit {
            Unit::Lines => {
                let lines: Vec<&str> = text.split('\n').collect();
                parts.extend_from_slice(&lines[..head_n]);
                parts.push(&marker);
                parts.extend_from_slice(&lines[total - tail_n..]);
            }
            Unit::Chars => {
                if head_n > 0 {
                    parts.push(head_chars(text, head_n));
                }
                parts.push(&marker);
                if tail_n > 0 {
                    parts.push(tail_chars(text, tail_n));
                }
            }
        }

        FoldOutcome {
            text: parts.join("\n"),
            hidden,
        }
    }
}

impl fmt::Display for HeadTailFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeadTailFolder(head_ratio={})", self.head_ratio)
    }
}
