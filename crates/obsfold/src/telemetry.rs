//! Per-episode counters for how often and how much output was folded.
//!
//! One [`NavigationTelemetry`] belongs to one rollout. The
//! [`ObservationPipeline`](crate::pipeline::ObservationPipeline) records into
//! it once per tool output; reporting code reads it through
//! [`snapshot`](NavigationTelemetry::snapshot),
//! [`metrics`](NavigationTelemetry::metrics) or
//! [`trajectory_stats`](NavigationTelemetry::trajectory_stats). Counters only
//! grow; a new episode gets a new accumulator.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::constraint::FoldStats;

/// Metric names exported by [`NavigationTelemetry::metrics`].
pub const METRIC_TRUNCATION_COUNT: &str = "nav_truncation_count";
pub const METRIC_LINES_HIDDEN: &str = "nav_lines_hidden";
pub const METRIC_CHARS_HIDDEN: &str = "nav_chars_hidden";
pub const METRIC_TOOL_OUTPUT_COUNT: &str = "nav_tool_output_count";
pub const METRIC_TRUNCATION_RATE: &str = "nav_truncation_rate";

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    tool_output_count: u64,
    truncation_count: u64,
    lines_hidden_total: u64,
    chars_hidden_total: u64,
}

/// Running totals for one episode.
///
/// Counters sit behind a mutex so a metrics poller on another thread can
/// take a consistent [`snapshot`](Self::snapshot) while the episode records.
#[derive(Debug)]
pub struct NavigationTelemetry {
    constraint_type: String,
    counters: Mutex<Counters>,
}

impl NavigationTelemetry {
    pub fn new(constraint_type: impl Into<String>) -> Self {
        Self {
            constraint_type: constraint_type.into(),
            counters: Mutex::new(Counters::default()),
        }
    }

    fn counters(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count one processed observation.
    pub fn record(&self, stats: &FoldStats) {
        let mut c = self.counters();
        c.tool_output_count += 1;
        if stats.was_limited {
            c.truncation_count += 1;
            c.lines_hidden_total += stats.lines_hidden as u64;
            c.chars_hidden_total += stats.chars_hidden as u64;
        }
    }

    /// Fraction of observations that were folded; 0 before any observation.
    pub fn truncation_rate(&self) -> f64 {
        let c = *self.counters();
        rate(c.truncation_count, c.tool_output_count)
    }

    pub fn constraint_type(&self) -> &str {
        &self.constraint_type
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let c = *self.counters();
        TelemetrySnapshot {
            tool_output_count: c.tool_output_count,
            truncation_count: c.truncation_count,
            truncation_rate: rate(c.truncation_count, c.tool_output_count),
            lines_hidden_total: c.lines_hidden_total,
            chars_hidden_total: c.chars_hidden_total,
            constraint_type: self.constraint_type.clone(),
        }
    }

    /// Running totals in the shape attached to each trajectory step.
    pub fn trajectory_stats(&self) -> TrajectoryStats {
        let c = *self.counters();
        TrajectoryStats {
            constraint_type: self.constraint_type.clone(),
            truncations_so_far: c.truncation_count,
            lines_hidden_so_far: c.lines_hidden_total,
            chars_hidden_so_far: c.chars_hidden_total,
            total_tool_outputs: c.tool_output_count,
        }
    }

    /// Named scalar metrics for a reporting backend.
    pub fn metrics(&self) -> Vec<(&'static str, f64)> {
        self.snapshot().metrics()
    }
}

fn rate(truncations: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        truncations as f64 / total as f64
    }
}

/// Point-in-time copy of an accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub tool_output_count: u64,
    pub truncation_count: u64,
    pub truncation_rate: f64,
    pub lines_hidden_total: u64,
    pub chars_hidden_total: u64,
    pub constraint_type: String,
}

impl TelemetrySnapshot {
    pub fn metrics(&self) -> Vec<(&'static str, f64)> {
        vec![
            (METRIC_TRUNCATION_COUNT, self.truncation_count as f64),
            (METRIC_LINES_HIDDEN, self.lines_hidden_total as f64),
            (METRIC_CHARS_HIDDEN, self.chars_hidden_total as f64),
            (METRIC_TOOL_OUTPUT_COUNT, self.tool_output_count as f64),
            (METRIC_TRUNCATION_RATE, self.truncation_rate),
        ]
    }

    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "{}: {}/{} outputs folded ({:.0}%), {} lines and {} chars hidden",
            self.constraint_type,
            self.truncation_count,
            self.tool_output_count,
            self.truncation_rate * 100.0,
            self.lines_hidden_total,
            self.chars_hidden_total,
        )
    }
}

/// Navigation totals attached to a single trajectory step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryStats {
    pub constraint_type: String,
    pub truncations_so_far: u64,
    pub lines_hidden_so_far: u64,
    pub chars_hidden_so_far: u64,
    pub total_tool_outputs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limited(lines: usize, chars: usize) -> FoldStats {
        FoldStats {
            was_limited: true,
            lines_hidden: lines,
            chars_hidden: chars,
            constraint_type: "LineLimit".into(),
            folder: Some("TruncateFolder".into()),
            total_units: 100,
        }
    }

    fn passed() -> FoldStats {
        FoldStats {
            was_limited: false,
            lines_hidden: 0,
            chars_hidden: 0,
            constraint_type: "LineLimit".into(),
            folder: None,
            total_units: 3,
        }
    }

    #[test]
    fn fresh_accumulator_is_zero() {
        let t = NavigationTelemetry::new("LineLimit");
        let snap = t.snapshot();
        assert_eq!(snap.tool_output_count, 0);
        assert_eq!(snap.truncation_count, 0);
        assert_eq!(snap.lines_hidden_total, 0);
        assert_eq!(snap.chars_hidden_total, 0);
        assert_eq!(t.truncation_rate(), 0.0);
        assert!(t.metrics().iter().all(|(_, v)| *v == 0.0));
    }

    #[test]
    fn record_accumulates_only_limited_totals() {
        let t = NavigationTelemetry::new("LineLimit");
        for _ in 0..5 {
            t.record(&limited(50, 0));
        }
        for _ in 0..15 {
            t.record(&passed());
        }
        let snap = t.snapshot();
        assert_eq!(snap.tool_output_count, 20);
        assert_eq!(snap.truncation_count, 5);
        assert_eq!(snap.lines_hidden_total, 250);
        assert!((snap.truncation_rate - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn hidden_counts_ignored_when_not_limited() {
        let t = NavigationTelemetry::new("TokenBudget");
        let mut stats = passed();
        stats.chars_hidden = 99;
        t.record(&stats);
        assert_eq!(t.snapshot().chars_hidden_total, 0);
    }

    #[test]
    fn metrics_use_stable_names() {
        let t = NavigationTelemetry::new("TokenBudget");
        t.record(&limited(0, 10_000));
        t.record(&passed());
        let metrics = t.metrics();
        let get = |name: &str| metrics.iter().find(|(n, _)| *n == name).map(|(_, v)| *v);
        assert_eq!(get("nav_truncation_count"), Some(1.0));
        assert_eq!(get("nav_lines_hidden"), Some(0.0));
        assert_eq!(get("nav_chars_hidden"), Some(10_000.0));
        assert_eq!(get("nav_tool_output_count"), Some(2.0));
        assert_eq!(get("nav_truncation_rate"), Some(0.5));
    }

    #[test]
    fn trajectory_stats_mirror_totals() {
        let t = NavigationTelemetry::new("LineLimit");
        t.record(&limited(150, 0));
        t.record(&limited(0, 0));
        t.record(&passed());
        assert_eq!(
            t.trajectory_stats(),
            TrajectoryStats {
                constraint_type: "LineLimit".into(),
                truncations_so_far: 2,
                lines_hidden_so_far: 150,
                chars_hidden_so_far: 0,
                total_tool_outputs: 3,
            }
        );
    }

    #[test]
    fn snapshot_readable_while_recording_elsewhere() {
        let t = Arc::new(NavigationTelemetry::new("LineLimit"));
        let writer = {
            let t = Arc::clone(&t);
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    t.record(&limited(1, 0));
                }
            })
        };
        for _ in 0..100 {
            let snap = t.snapshot();
            assert!(snap.truncation_count <= snap.tool_output_count);
            assert!((0.0..=1.0).contains(&snap.truncation_rate));
        }
        writer.join().unwrap();
        assert_eq!(t.snapshot().tool_output_count, 1000);
    }

    #[test]
    fn log_string_summarizes() {
        let t = NavigationTelemetry::new("LineLimit");
        t.record(&limited(10, 0));
        let log = t.snapshot().to_log_string();
        assert!(log.starts_with("LineLimit: 1/1 outputs folded (100%)"));
    }
}
