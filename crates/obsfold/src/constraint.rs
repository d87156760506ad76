//! Observation constraints: how much tool output may reach the model.
//!
//! A constraint pairs a budget with a [`Folder`]. When output exceeds the
//! budget, the folder decides how to compress it; otherwise the output
//! passes through untouched. Constraints hold no counters, so the same
//! constraint always produces the same output for the same input.
//!
//! # Example
//!
//! ```
//! use obsfold::constraint::{Constraint, LineLimit};
//! use obsfold::folder::Folder;
//!
//! let naive = Constraint::from(LineLimit::new(3).unwrap());
//! let (text, stats) = naive.check_and_fold("a\nb\nc\nd\ne");
//! assert_eq!(text, "a\nb\nc\n[TRUNCATED]");
//! assert!(stats.was_limited);
//! assert_eq!(stats.lines_hidden, 2);
//!
//! let smart = LineLimit::new(50)
//!     .and_then(|c| c.with_folder(Folder::structure()))
//!     .unwrap();
//! assert_eq!(smart.max_lines(), 50);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{ConfigError, positive_limit};
use crate::folder::Folder;
use crate::text::{Unit, count_chars};

/// Characters per token used to turn a token budget into a character budget.
///
/// A fixed approximation rather than a tokenizer. Experiments compare runs
/// by this proxy, so it must stay constant.
pub const CHARS_PER_TOKEN: usize = 4;

/// Line budget used by [`LineLimit::default`].
pub const DEFAULT_MAX_LINES: usize = 200;

/// Character budget used by [`TokenBudget::default`] (~1000 tokens).
pub const DEFAULT_MAX_CHARS: usize = 4000;

static IDENTITY: Folder = Folder::Identity;

/// Per-observation record of what a constraint did.
///
/// Built fresh for every call and handed to the caller, which typically
/// attaches it to its trajectory log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldStats {
    /// Whether the budget was exceeded and the folder ran.
    pub was_limited: bool,
    /// Lines absent from the output (line constraints only).
    pub lines_hidden: usize,
    /// Characters absent from the output (character constraints only).
    pub chars_hidden: usize,
    /// Name of the constraint that produced this record.
    pub constraint_type: String,
    /// Name of the folder that ran, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Size of the original text in the constraint's unit.
    pub total_units: usize,
}

impl FoldStats {
    fn unlimited(constraint_type: &str, total_units: usize) -> Self {
        Self {
            was_limited: false,
            lines_hidden: 0,
            chars_hidden: 0,
            constraint_type: constraint_type.to_string(),
            folder: None,
            total_units,
        }
    }
}

/// Limit output to a number of lines.
#[derive(Debug, Clone)]
pub struct LineLimit {
    max_lines: usize,
    folder: Folder,
}

impl Default for LineLimit {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            folder: Folder::default(),
        }
    }
}

impl LineLimit {
    /// A line limit that truncates. Fails when `max_lines` is zero.
    pub fn new(max_lines: usize) -> Result<Self, ConfigError> {
        Self::checked(i64::try_from(max_lines).unwrap_or(i64::MAX))
    }

    /// Like [`new`](Self::new) but accepts a signed value from untrusted
    /// configuration, rejecting anything below one.
    pub fn checked(max_lines: i64) -> Result<Self, ConfigError> {
        Ok(Self {
            max_lines: positive_limit("max_lines", max_lines)?,
            folder: Folder::default(),
        })
    }

    /// Replace the folder. The identity folder is rejected.
    pub fn with_folder(mut self, folder: Folder) -> Result<Self, ConfigError> {
        if folder.is_identity() {
            return Err(ConfigError::IdentityFolderWithLimit {
                constraint: "LineLimit",
            });
        }
        self.folder = folder;
        Ok(self)
    }

    pub(crate) fn preset(max_lines: usize, folder: Folder) -> Self {
        Self { max_lines, folder }
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    pub fn folder(&self) -> &Folder {
        &self.folder
    }

    pub fn check_and_fold(&self, text: &str) -> (String, FoldStats) {
        apply_limit("LineLimit", Unit::Lines, self.max_lines, &self.folder, text)
    }
}

impl fmt::Display for LineLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LineLimit(max_lines={}, folder={})", self.max_lines, self.folder)
    }
}

/// Limit output to a number of characters, a proxy for tokens at
/// [`CHARS_PER_TOKEN`].
#[derive(Debug, Clone)]
pub struct TokenBudget {
    max_chars: usize,
    folder: Folder,
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            folder: Folder::default(),
        }
    }
}

impl TokenBudget {
    /// A character budget that truncates. Fails when `max_chars` is zero.
    pub fn new(max_chars: usize) -> Result<Self, ConfigError> {
        Self::checked(i64::try_from(max_chars).unwrap_or(i64::MAX))
    }

    /// A budget of `tokens` tokens, i.e. `tokens * CHARS_PER_TOKEN` chars.
    pub fn from_tokens(tokens: usize) -> Result<Self, ConfigError> {
        if tokens == 0 {
            return Err(ConfigError::NonPositiveLimit {
                param: "max_tokens",
                value: 0,
            });
        }
        Self::new(tokens.saturating_mul(CHARS_PER_TOKEN))
    }

    /// Like [`new`](Self::new) but accepts a signed value from untrusted
    /// configuration, rejecting anything below one.
    pub fn checked(max_chars: i64) -> Result<Self, ConfigError> {
        Ok(Self {
            max_chars: positive_limit("max_chars", max_chars)?,
            folder: Folder::default(),
        })
    }

    /// Replace the folder. The identity folder is rejected.
    pub fn with_folder(mut self, folder: Folder) -> Result<Self, ConfigError> {
        if folder.is_identity() {
            return Err(ConfigError::IdentityFolderWithLimit {
                constraint: "TokenBudget",
            });
        }
        self.folder = folder;
        Ok(self)
    }

    pub(crate) fn preset(max_chars: usize, folder: Folder) -> Self {
        Self { max_chars, folder }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// The budget expressed in approximate tokens.
    pub fn approx_tokens(&self) -> usize {
        self.max_chars / CHARS_PER_TOKEN
    }

    pub fn folder(&self) -> &Folder {
        &self.folder
    }

    pub fn check_and_fold(&self, text: &str) -> (String, FoldStats) {
        apply_limit("TokenBudget", Unit::Chars, self.max_chars, &self.folder, text)
    }
}

impl fmt::Display for TokenBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenBudget(max_chars={}, folder={})", self.max_chars, self.folder)
    }
}

/// Check `text` against `limit` and fold it if it is over.
fn apply_limit(
    constraint_type: &'static str,
    unit: Unit,
    limit: usize,
    folder: &Folder,
    text: &str,
) -> (String, FoldStats) {
    let total = unit.count(text);
    if total <= limit {
        trace!(constraint_type, total, limit, %unit, "within budget");
        return (text.to_string(), FoldStats::unlimited(constraint_type, total));
    }

    let excess = total - limit;
    let outcome = folder.fold(text, limit, unit, excess);
    debug!(
        constraint_type,
        folder = folder.name(),
        %unit,
        total,
        limit,
        hidden = outcome.hidden,
        "folded observation"
    );

    let (lines_hidden, chars_hidden) = match unit {
        Unit::Lines => (outcome.hidden, 0),
        Unit::Chars => (0, outcome.hidden),
    };
    let stats = FoldStats {
        was_limited: true,
        lines_hidden,
        chars_hidden,
        constraint_type: constraint_type.to_string(),
        folder: Some(folder.name().to_string()),
        total_units: total,
    };
    (outcome.text, stats)
}

/// The closed set of observation constraints.
#[derive(Debug, Clone)]
pub enum Constraint {
    LineLimit(LineLimit),
    TokenBudget(TokenBudget),
    /// Never limits. The baseline arm of an ablation.
    Unconstrained,
}

impl Constraint {
    /// Line limit with the default truncating folder.
    pub fn line_limit(max_lines: usize) -> Result<Self, ConfigError> {
        Ok(Constraint::LineLimit(LineLimit::new(max_lines)?))
    }

    /// Character budget with the default truncating folder.
    pub fn token_budget(max_chars: usize) -> Result<Self, ConfigError> {
        Ok(Constraint::TokenBudget(TokenBudget::new(max_chars)?))
    }

    pub fn unconstrained() -> Self {
        Constraint::Unconstrained
    }

    /// Return the text to show and a record of what happened.
    pub fn check_and_fold(&self, text: &str) -> (String, FoldStats) {
        match self {
            Constraint::LineLimit(c) => c.check_and_fold(text),
            Constraint::TokenBudget(c) => c.check_and_fold(text),
            Constraint::Unconstrained => (
                text.to_string(),
                FoldStats::unlimited(self.type_name(), count_chars(text)),
            ),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Constraint::LineLimit(_) => "LineLimit",
            Constraint::TokenBudget(_) => "TokenBudget",
            Constraint::Unconstrained => "Unconstrained",
        }
    }

    pub fn folder(&self) -> &Folder {
        match self {
            Constraint::LineLimit(c) => c.folder(),
            Constraint::TokenBudget(c) => c.folder(),
            Constraint::Unconstrained => &IDENTITY,
        }
    }

    /// The budget in [`unit`](Self::unit), or `None` when unconstrained.
    pub fn limit(&self) -> Option<usize> {
        match self {
            Constraint::LineLimit(c) => Some(c.max_lines()),
            Constraint::TokenBudget(c) => Some(c.max_chars()),
            Constraint::Unconstrained => None,
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            Constraint::LineLimit(_) => Unit::Lines,
            Constraint::TokenBudget(_) | Constraint::Unconstrained => Unit::Chars,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::LineLimit(c) => fmt::Display::fmt(c, f),
            Constraint::TokenBudget(c) => fmt::Display::fmt(c, f),
            Constraint::Unconstrained => f.write_str("Unconstrained()"),
        }
    }
}

impl From<LineLimit> for Constraint {
    fn from(c: LineLimit) -> Self {
        Constraint::LineLimit(c)
    }
}

impl From<TokenBudget> for Constraint {
    fn from(c: TokenBudget) -> Self {
        Constraint::TokenBudget(c)
    }
}
