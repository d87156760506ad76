//! Observation constraints for tool-using agents.
//!
//! `obsfold` sits between a tool and the model that called it. Every tool
//! output passes through an [`ObservationPipeline`](pipeline::ObservationPipeline),
//! which checks it against a [`Constraint`](constraint::Constraint) (a line
//! limit, a character budget, or nothing at all) and, when it is too large,
//! compresses it with a [`Folder`](folder::Folder). The pipeline also counts
//! how often and how much was hidden so an experiment can relate navigation
//! behavior to the budget it ran under.
//!
//! # Getting started
//!
//! ```
//! use obsfold::prelude::*;
//!
//! let constraint = LineLimit::new(3)?.with_folder(Folder::head_tail(0.6)?)?;
//! let pipeline = ObservationPipeline::new(constraint.into());
//!
//! let mut messages = vec![
//!     Message::user("list the repo"),
//!     Message::tool_result("call_1", "a\nb\nc\nd\ne\nf\ng\nh"),
//! ];
//! let stats = pipeline.process_messages(&mut messages);
//!
//! assert!(stats[0].was_limited);
//! assert_eq!(
//!     messages[1].content.as_deref(),
//!     Some("a\nb\n[... 5 lines elided ...]\nh")
//! );
//! assert_eq!(pipeline.snapshot().truncation_count, 1);
//! # Ok::<(), obsfold::ConfigError>(())
//! ```
//!
//! # Where to find things
//!
//! - **Budgets:** [`LineLimit`](constraint::LineLimit),
//!   [`TokenBudget`](constraint::TokenBudget) and the closed
//!   [`Constraint`](constraint::Constraint) enum. Every call returns a
//!   [`FoldStats`](constraint::FoldStats) record.
//! - **Strategies:** [`folder::truncate`], [`folder::head_tail`] and
//!   [`folder::structure`].
//! - **Counting:** [`NavigationTelemetry`](telemetry::NavigationTelemetry)
//!   and its snapshot, metric and trajectory views.
//! - **Presets:** [`ToolProfile`](profile::ToolProfile) and
//!   [`FoldConfig`](config::FoldConfig) for JSON configuration files.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`constraint`] | Budgets, `FoldStats`, chars-per-token ratio |
//! | [`folder`] | Truncate, head/tail, structure and identity folders |
//! | [`telemetry`] | Per-episode counters, snapshots, metric names |
//! | [`pipeline`] | Per-observation driver and message processing |
//! | [`profile`] | `minimal`, `standard`, `power`, `unconstrained` presets |
//! | [`config`] | JSON configuration model and schema |
//! | [`text`] | Line and character counting, char-safe slicing |
//!
//! # Logging
//!
//! The crate logs through `tracing` and never installs a subscriber. Fold
//! decisions are emitted at `debug`, passthroughs at `trace`.

pub mod config;
pub mod constraint;
pub mod error;
pub mod folder;
pub mod pipeline;
pub mod prelude;
pub mod profile;
pub mod telemetry;
pub mod text;

use serde::{Deserialize, Serialize};

pub use error::ConfigError;

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in a host conversation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// A message in a host conversation.
///
/// Only the fields the pipeline reads are modelled; hosts with richer
/// message types map into this one at the boundary.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: Some(content.into()),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(content.into()),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: Some(content.into()),
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_call_id: Some(call_id.into()),
        }
    }

    /// Whether the pipeline constrains this message.
    pub fn is_tool_output(&self) -> bool {
        self.role == MessageRole::Tool
    }
}
