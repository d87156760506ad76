//! Preset experiment profiles.
//!
//! A [`ToolProfile`] bundles a constraint with the loop budget it was tuned
//! for. The four presets span an ablation grid: `minimal`, `standard` and
//! `power` vary the budget (and strategy), `unconstrained` is the control.
//! Every call builds fresh values, so profiles never share state.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constraint::{Constraint, LineLimit, TokenBudget};
use crate::error::ConfigError;
use crate::folder::{Folder, HeadTailFolder, StructureFolder};

/// Iteration budget when none is configured (the `standard` value).
pub const DEFAULT_MAX_ITERATIONS: u32 = 50;

/// Output length when none is configured (the `standard` value).
pub const DEFAULT_MAX_OUTPUT_LENGTH: usize = 8192;

/// Names of the preset profiles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProfileName {
    Minimal,
    Standard,
    Power,
    Unconstrained,
}

impl ProfileName {
    pub const ALL: [ProfileName; 4] = [
        ProfileName::Minimal,
        ProfileName::Standard,
        ProfileName::Power,
        ProfileName::Unconstrained,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileName::Minimal => "minimal",
            ProfileName::Standard => "standard",
            ProfileName::Power => "power",
            ProfileName::Unconstrained => "unconstrained",
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownProfile {
                name: s.to_string(),
            })
    }
}

/// A constraint plus the loop budget it is meant to run with.
#[derive(Debug, Clone)]
pub struct ToolProfile {
    /// Preset name, or `"custom"` for profiles built from configuration.
    pub name: String,
    pub constraint: Constraint,
    /// Maximum interaction-loop iterations for the host.
    pub max_iterations: u32,
    /// Maximum model output length for the host.
    pub max_output_length: usize,
}

impl ToolProfile {
    /// Maximum search pressure: a 50-line window of signatures only.
    pub fn minimal() -> Self {
        Self {
            name: ProfileName::Minimal.to_string(),
            constraint: LineLimit::preset(50, Folder::Structure(StructureFolder::new())).into(),
            max_iterations: 100,
            max_output_length: 2048,
        }
    }

    /// Balanced default: a 200-line window with head truncation.
    pub fn standard() -> Self {
        Self {
            name: ProfileName::Standard.to_string(),
            constraint: LineLimit::preset(200, Folder::truncate()).into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_output_length: DEFAULT_MAX_OUTPUT_LENGTH,
        }
    }

    /// Generous budget: 16K chars (~4K tokens) with head + tail folding.
    pub fn power() -> Self {
        Self {
            name: ProfileName::Power.to_string(),
            constraint: TokenBudget::preset(16_000, Folder::HeadTail(HeadTailFolder::default()))
                .into(),
            max_iterations: 30,
            max_output_length: 16_384,
        }
    }

    /// Control group: no constraint at all.
    pub fn unconstrained() -> Self {
        Self {
            name: ProfileName::Unconstrained.to_string(),
            constraint: Constraint::Unconstrained,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_output_length: DEFAULT_MAX_OUTPUT_LENGTH,
        }
    }

    pub fn preset(name: ProfileName) -> Self {
        match name {
            ProfileName::Minimal => Self::minimal(),
            ProfileName::Standard => Self::standard(),
            ProfileName::Power => Self::power(),
            ProfileName::Unconstrained => Self::unconstrained(),
        }
    }

    /// Look up a preset by name.
    pub fn by_name(name: &str) -> Result<Self, ConfigError> {
        Ok(Self::preset(name.parse()?))
    }

    pub fn describe(&self) -> ProfileSummary {
        ProfileSummary {
            name: self.name.clone(),
            constraint_type: self.constraint.type_name().to_string(),
            constraint: self.constraint.to_string(),
            max_iterations: self.max_iterations,
            max_output_length: self.max_output_length,
        }
    }
}

/// Serializable description of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub name: String,
    pub constraint_type: String,
    pub constraint: String,
    pub max_iterations: u32,
    pub max_output_length: usize,
}
