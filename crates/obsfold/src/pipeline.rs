//! The per-observation entry point for an interaction-loop host.
//!
//! An [`ObservationPipeline`] owns one constraint and one episode's
//! telemetry. The host calls [`process`](ObservationPipeline::process) (or
//! [`process_messages`](ObservationPipeline::process_messages)) for every
//! tool output, shows the returned text to the model, and stores the
//! returned [`FoldStats`] in its trajectory.
//!
//! Concurrent rollouts each need their own pipeline. Constraints are
//! stateless and can be cloned freely; the telemetry is not shared between
//! pipelines.
//!
//! # Example
//!
//! ```
//! use obsfold::pipeline::ObservationPipeline;
//! use obsfold::profile::ToolProfile;
//!
//! let pipeline = ObservationPipeline::from_profile(ToolProfile::standard());
//! let (text, stats) = pipeline.process("ls output\nfits easily");
//! assert_eq!(text, "ls output\nfits easily");
//! assert!(!stats.was_limited);
//! assert_eq!(pipeline.snapshot().tool_output_count, 1);
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::Message;
use crate::constraint::{Constraint, FoldStats};
use crate::profile::{DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_OUTPUT_LENGTH, ToolProfile};
use crate::telemetry::{NavigationTelemetry, TelemetrySnapshot, TrajectoryStats};

/// Wires a constraint to an episode's telemetry.
#[derive(Debug)]
pub struct ObservationPipeline {
    constraint: Constraint,
    telemetry: Arc<NavigationTelemetry>,
    max_iterations: u32,
    max_output_length: usize,
}

impl ObservationPipeline {
    /// A pipeline with the default loop budget.
    pub fn new(constraint: Constraint) -> Self {
        info!(%constraint, "observation pipeline initialized");
        Self {
            telemetry: Arc::new(NavigationTelemetry::new(constraint.type_name())),
            constraint,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_output_length: DEFAULT_MAX_OUTPUT_LENGTH,
        }
    }

    /// A pipeline carrying the profile's constraint and loop budget.
    pub fn from_profile(profile: ToolProfile) -> Self {
        info!(
            profile = %profile.name,
            constraint = %profile.constraint,
            max_iterations = profile.max_iterations,
            "observation pipeline initialized from profile"
        );
        Self {
            telemetry: Arc::new(NavigationTelemetry::new(profile.constraint.type_name())),
            constraint: profile.constraint,
            max_iterations: profile.max_iterations,
            max_output_length: profile.max_output_length,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_output_length(mut self, max_output_length: usize) -> Self {
        self.max_output_length = max_output_length;
        self
    }

    /// Constrain one tool output and count it.
    pub fn process(&self, raw: &str) -> (String, FoldStats) {
        let (text, stats) = self.constraint.check_and_fold(raw);
        self.telemetry.record(&stats);
        (text, stats)
    }

    /// Constrain every tool-result message in place.
    ///
    /// Messages from other roles, and tool messages without text content,
    /// are left alone and not counted. Returns the stats of each processed
    /// message in order.
    pub fn process_messages(&self, messages: &mut [Message]) -> Vec<FoldStats> {
        let mut all_stats = Vec::new();
        for msg in messages.iter_mut().filter(|m| m.is_tool_output()) {
            if let Some(content) = msg.content.as_mut() {
                let (text, stats) = self.process(content);
                *content = text;
                all_stats.push(stats);
            }
        }
        all_stats
    }

    /// Begin a new episode with fresh counters.
    ///
    /// Handles obtained from [`telemetry`](Self::telemetry) before the call
    /// keep the previous episode's totals.
    pub fn start_episode(&mut self) {
        debug!(previous = %self.telemetry.snapshot().to_log_string(), "starting new episode");
        self.telemetry = Arc::new(NavigationTelemetry::new(self.constraint.type_name()));
    }

    /// Shared handle to this episode's accumulator, for external pollers.
    pub fn telemetry(&self) -> Arc<NavigationTelemetry> {
        Arc::clone(&self.telemetry)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    pub fn trajectory_stats(&self) -> TrajectoryStats {
        self.telemetry.trajectory_stats()
    }

    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn max_output_length(&self) -> usize {
        self.max_output_length
    }
}
