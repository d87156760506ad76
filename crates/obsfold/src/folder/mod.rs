//! Folding strategies: how over-budget text is compressed.
//!
//! A [`Constraint`](crate::constraint::Constraint) decides *whether* text is
//! too large; a [`Folder`] decides *how* to shrink it. Keeping the two apart
//! lets an experiment hold the budget fixed and vary the strategy, or the
//! other way round.
//!
//! 1. **[`truncate`]**: first `limit` units plus a `[TRUNCATED]` marker.
//! 2. **[`head_tail`]**: first and last slices around an elision marker.
//! 3. **[`structure`]**: declaration lines only, bodies folded into markers.
//! 4. **Identity**: passthrough, used only by
//!    [`Constraint::Unconstrained`](crate::constraint::Constraint::Unconstrained).
//!
//! Folders hold no mutable state; one instance can serve any number of
//! concurrent pipelines.

pub mod head_tail;
pub mod structure;
pub mod truncate;

use std::fmt;

pub use head_tail::{DEFAULT_HEAD_RATIO, HeadTailFolder};
pub use structure::{StructureFolder, StructureRule};
pub use truncate::{TRUNCATION_MARKER, TruncateFolder};

use crate::error::ConfigError;
use crate::text::Unit;

/// Result of a single fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldOutcome {
    /// Text to show in place of the original.
    pub text: String,
    /// Original content absent from `text`, in the unit the fold ran in.
    /// Marker text is never counted.
    pub hidden: usize,
}

impl FoldOutcome {
    pub(crate) fn passthrough(text: &str) -> Self {
        Self {
            text: text.to_string(),
            hidden: 0,
        }
    }
}

/// The closed set of folding strategies.
#[derive(Debug, Clone)]
pub enum Folder {
    Truncate(TruncateFolder),
    HeadTail(HeadTailFolder),
    Structure(StructureFolder),
    Identity,
}

impl Default for Folder {
    fn default() -> Self {
        Folder::Truncate(TruncateFolder)
    }
}

impl Folder {
    pub fn truncate() -> Self {
        Folder::Truncate(TruncateFolder)
    }

    pub fn head_tail(head_ratio: f64) -> Result<Self, ConfigError> {
        Ok(Folder::HeadTail(HeadTailFolder::new(head_ratio)?))
    }

    /// Structure folder with the built-in rule set.
    pub fn structure() -> Self {
        Folder::Structure(StructureFolder::new())
    }

    /// Compress `text`, which is `excess` units over `limit`.
    ///
    /// An `excess` of zero means there is nothing to fold and the text is
    /// returned unchanged.
    pub fn fold(&self, text: &str, limit: usize, unit: Unit, excess: usize) -> FoldOutcome {
        match self {
            Folder::Truncate(f) => f.fold(text, limit, unit, excess),
            Folder::HeadTail(f) => f.fold(text, limit, unit, excess),
            Folder::Structure(f) => f.fold(text, limit, unit, excess),
            Folder::Identity => FoldOutcome::passthrough(text),
        }
    }

    /// Stable strategy name, as reported in fold statistics.
    pub fn name(&self) -> &'static str {
        match self {
            Folder::Truncate(_) => "TruncateFolder",
            Folder::HeadTail(_) => "HeadTailFolder",
            Folder::Structure(_) => "StructureFolder",
            Folder::Identity => "IdentityFolder",
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Folder::Identity)
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Folder::HeadTail(inner) => fmt::Display::fmt(inner, f),
            Folder::Structure(inner) => fmt::Display::fmt(inner, f),
            other => write!(f, "{}()", other.name()),
        }
    }
}

impl From<TruncateFolder> for Folder {
    fn from(folder: TruncateFolder) -> Self {
        Folder::Truncate(folder)
    }
}

impl From<HeadTailFolder> for Folder {
    fn from(folder: HeadTailFolder) -> Self {
        Folder::HeadTail(folder)
    }
}

impl From<StructureFolder> for Folder {
    fn from(folder: StructureFolder) -> Self {
        Folder::Structure(folder)
    }
}
