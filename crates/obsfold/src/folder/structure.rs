//! Structural folding: keep declaration lines, fold the bodies.
//!
//! Scans the output line by line and keeps only lines that look like
//! structure (function and type definitions, imports and includes, document
//! headers). Each run of dropped lines collapses into a single marker, so the
//! model receives a table of contents it can navigate with targeted queries
//! instead of a wall of cut-off text.
//!
//! Matching is a per-line regex heuristic, not a parser. The rule set is
//! open: callers can add rules for other structured formats or start from an
//! empty set.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::ConfigError;
use crate::text::{Unit, count_chars};

use super::FoldOutcome;
use super::truncate::TruncateFolder;

/// Built-in `(name, pattern)` pairs.
const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    ("python_def", r"^\s*(?:async\s+def|def|class)\s+\w+"),
    ("python_import", r"^\s*(?:import\s+\w|from\s+[\w.]+\s+import\b)"),
    ("js_def", r"^\s*(?:function\s+\w+|const\s+\w+\s*=|export\s+)"),
    (
        "rust_item",
        r"^\s*(?:pub(?:\([\w:]+\))?\s+)?(?:(?:async|unsafe|const|extern)\s+)*(?:(?:fn|struct|enum|trait|mod|type|union)\s+\w|impl\b)",
    ),
    ("rust_use", r"^\s*(?:pub(?:\([\w:]+\))?\s+)?use\s+\w"),
    ("go_decl", r"^(?:func|type|package)\s+"),
    (
        "type_def",
        r"^\s*(?:(?:public|private|protected|internal|abstract|sealed|static|final)\s+)*(?:interface|class|record)\s+\w+",
    ),
    ("c_include", r"^\s*#\s*include\b"),
    ("markdown_header", r"^#{1,6}\s+\S"),
    ("separator", r"^(?:---|\*\*\*|===)"),
];

static DEFAULT_RULES: LazyLock<Vec<StructureRule>> = LazyLock::new(|| {
    DEFAULT_PATTERNS
        .iter()
        .map(|(name, pattern)| {
            StructureRule::new(*name, pattern).expect("built-in structure pattern compiles")
        })
        .collect()
});

/// A named line pattern that marks a line as structural.
#[derive(Debug, Clone)]
pub struct StructureRule {
    name: String,
    pattern: Regex,
}

impl StructureRule {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            name: name.into(),
            pattern,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn matches(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }
}

/// Keeps structural lines and replaces every omitted run with a marker.
#[derive(Debug, Clone)]
pub struct StructureFolder {
    rules: Vec<StructureRule>,
}

impl Default for StructureFolder {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
        }
    }
}

impl StructureFolder {
    /// A folder with the built-in rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A folder with no rules. Until rules are added every fold falls back
    /// to truncation.
    pub fn without_defaults() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule. Fails if `pattern` is not a valid regex.
    pub fn with_rule(mut self, name: impl Into<String>, pattern: &str) -> Result<Self, ConfigError> {
        self.rules.push(StructureRule::new(name, pattern)?);
        Ok(self)
    }

    pub fn rules(&self) -> &[StructureRule] {
        &self.rules
    }

    /// Whether any rule matches `line`.
    pub fn is_structural(&self, line: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(line))
    }

    /// Fold `text` down to its structural lines.
    ///
    /// Structural lines are kept in order while the whole folded output fits
    /// in `limit`: kept lines, the fold markers between and around them, and
    /// in the chars unit the newlines joining them. When not even the first
    /// structural line fits, the fold falls back to [`TruncateFolder`] with
    /// the same arguments.
    ///
    /// In the lines unit, marker lines count as visible: `hidden` is the
    /// input line count minus every line of the output. In the chars unit,
    /// `hidden` is the input char count minus the chars of the kept lines and
    /// of the newlines between kept lines that were adjacent in the input.
    pub fn fold(&self, text: &str, limit: usize, unit: Unit, excess: usize) -> FoldOutcome {
        let total = unit.count(text);
        if excess == 0 || total <= limit {
            return FoldOutcome::passthrough(text);
        }

        let lines: Vec<&str> = text.split('\n').collect();
        let keep = self.select(&lines, limit, unit);

        if !keep.contains(&true) {
            debug!(total, limit, %unit, "no structural lines fit, falling back to truncation");
            return TruncateFolder.fold(text, limit, unit, excess);
        }

        let mut out: Vec<String> = Vec::new();
        let mut run = 0;
        for (line, kept) in lines.iter().zip(&keep) {
            if *kept {
                if run > 0 {
                    out.push(fold_marker(run));
                    run = 0;
                }
                out.push((*line).to_string());
            } else {
                run += 1;
            }
        }
        if run > 0 {
            out.push(fold_marker(run));
        }

        let hidden = match unit {
            Unit::Lines => lines.len().saturating_sub(out.len()),
            Unit::Chars => {
                let kept_chars: usize = lines
                    .iter()
                    .zip(&keep)
                    .filter(|(_, kept)| **kept)
                    .map(|(line, _)| count_chars(line))
                    .sum();
                let kept_joins = keep.windows(2).filter(|pair| pair[0] && pair[1]).count();
                total.saturating_sub(kept_chars + kept_joins)
            }
        };

        FoldOutcome {
            text: out.join("\n"),
            hidden,
        }
    }

    /// Greedily mark structural lines whose folded output, including the
    /// trailing marker it would need, still fits in `limit`.
    fn select(&self, lines: &[&str], limit: usize, unit: Unit) -> Vec<bool> {
        let mut keep = vec![false; lines.len()];
        // Size and item count of the output up to the last kept line.
        let mut size = 0;
        let mut items = 0;
        let mut last: Option<usize> = None;

        for (i, line) in lines.iter().enumerate() {
            if !self.is_structural(line) {
                continue;
            }
            let gap = last.map_or(i, |prev| i - prev - 1);
            let mut next_size = size + item_size(line, unit);
            let mut next_items = items + 1;
            if gap > 0 {
                next_size += item_size(&fold_marker(gap), unit);
                next_items += 1;
            }

            let trailing = lines.len() - i - 1;
            let (mut full_size, mut full_items) = (next_size, next_items);
            if trailing > 0 {
                full_size += item_size(&fold_marker(trailing), unit);
                full_items += 1;
            }
            if output_size(full_size, full_items, unit) > limit {
                break;
            }

            keep[i] = true;
            size = next_size;
            items = next_items;
            last = Some(i);
        }
        keep
    }
}

fn fold_marker(lines: usize) -> String {
    format!("[... {lines} lines folded ...]")
}

fn item_size(item: &str, unit: Unit) -> usize {
    match unit {
        Unit::Lines => 1,
        Unit::Chars => count_chars(item),
    }
}

/// Size of `items` output lines whose own sizes sum to `size`, once joined.
fn output_size(size: usize, items: usize, unit: Unit) -> usize {
    match unit {
        Unit::Lines => size,
        Unit::Chars => size + items.saturating_sub(1),
    }
}

impl fmt::Display for StructureFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StructureFolder(rules={})", self.rules.len())
    }
}
