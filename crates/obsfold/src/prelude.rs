//! Convenience re-exports for common `obsfold` types.
//!
//! Meant to be glob-imported by hosts:
//!
//! ```
//! use obsfold::prelude::*;
//! ```
//!
//! This pulls in everything needed to build a pipeline and feed it tool
//! output: constraints, folders, profiles and the message types. Structure
//! rules, metric name constants and text helpers stay in their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{ConfigError, Message, MessageRole};

// ── Constraints and folders ─────────────────────────────────────────
pub use crate::constraint::{CHARS_PER_TOKEN, Constraint, FoldStats, LineLimit, TokenBudget};
pub use crate::folder::{FoldOutcome, Folder, HeadTailFolder, StructureFolder, TruncateFolder};
pub use crate::text::Unit;

// ── Runtime ─────────────────────────────────────────────────────────
pub use crate::pipeline::ObservationPipeline;
pub use crate::telemetry::{NavigationTelemetry, TelemetrySnapshot, TrajectoryStats};

// ── Presets and configuration ───────────────────────────────────────
pub use crate::config::FoldConfig;
pub use crate::profile::{ProfileName, ToolProfile};
