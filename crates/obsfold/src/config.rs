//! JSON configuration files.
//!
//! [`FoldConfig`] is the on-disk form of a [`ToolProfile`]: either a preset
//! name or an explicit constraint, plus optional loop-budget overrides.
//!
//! ```json
//! { "profile": "minimal", "max_iterations": 80 }
//! ```
//!
//! ```json
//! {
//!   "constraint": {
//!     "kind": "line_limit",
//!     "max_lines": 80,
//!     "folder": { "kind": "head_tail", "head_ratio": 0.7 }
//!   }
//! }
//! ```
//!
//! Parsing only checks shape. Values are validated by
//! [`build`](FoldConfig::build), which returns the same [`ConfigError`]s as
//! the programmatic constructors.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constraint::{Constraint, LineLimit, TokenBudget};
use crate::error::{ConfigError, positive_limit};
use crate::folder::{DEFAULT_HEAD_RATIO, Folder, HeadTailFolder, StructureFolder};
use crate::profile::{DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_OUTPUT_LENGTH, ProfileName, ToolProfile};

/// Profile name given to profiles built from an explicit constraint.
pub const CUSTOM_PROFILE_NAME: &str = "custom";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FoldConfig {
    /// Preset to start from, resolved by [`build`](Self::build). Mutually
    /// exclusive with `constraint`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Explicit constraint. Mutually exclusive with `profile`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<ConstraintConfig>,
    /// Overrides the profile's iteration budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    /// Overrides the profile's output length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_length: Option<usize>,
}

/// Constraint section of a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintConfig {
    LineLimit {
        max_lines: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        folder: Option<FolderConfig>,
    },
    /// Exactly one of `max_chars` or `max_tokens`.
    TokenBudget {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_chars: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_tokens: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        folder: Option<FolderConfig>,
    },
    Unconstrained,
}

/// Folder section of a constraint. Omitted means truncate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FolderConfig {
    Truncate,
    HeadTail {
        #[serde(default = "default_head_ratio")]
        head_ratio: f64,
    },
    Structure {
        /// Additional line patterns treated as structural.
        #[serde(default)]
        extra_patterns: Vec<String>,
        /// Drop the built-in rules and use only `extra_patterns`.
        #[serde(default)]
        replace_defaults: bool,
    },
}

fn default_head_ratio() -> f64 {
    DEFAULT_HEAD_RATIO
}

impl FoldConfig {
    /// Read and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            origin: path.display().to_string(),
            source,
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            origin: "<inline>".to_string(),
            source,
        })
    }

    /// A config selecting a preset.
    pub fn for_profile(name: ProfileName) -> Self {
        Self {
            profile: Some(name.as_str().to_string()),
            ..Self::default()
        }
    }

    /// A config with an explicit constraint.
    pub fn for_constraint(constraint: ConstraintConfig) -> Self {
        Self {
            constraint: Some(constraint),
            ..Self::default()
        }
    }

    /// Validate and produce the profile this configuration describes.
    ///
    /// With neither `profile` nor `constraint` set, this is the `standard`
    /// preset. A `profile` naming no preset is [`ConfigError::UnknownProfile`].
    pub fn build(&self) -> Result<ToolProfile, ConfigError> {
        let mut profile = match (&self.profile, &self.constraint) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::ConflictingFields {
                    first: "profile",
                    second: "constraint",
                });
            }
            (Some(name), None) => ToolProfile::by_name(name)?,
            (None, Some(constraint)) => ToolProfile {
                name: CUSTOM_PROFILE_NAME.to_string(),
                constraint: constraint.build()?,
                max_iterations: DEFAULT_MAX_ITERATIONS,
                max_output_length: DEFAULT_MAX_OUTPUT_LENGTH,
            },
            (None, None) => ToolProfile::standard(),
        };

        if let Some(n) = self.max_iterations {
            profile.max_iterations = n;
        }
        if let Some(n) = self.max_output_length {
            profile.max_output_length = n;
        }

        debug!(
            profile = %profile.name,
            constraint = %profile.constraint,
            max_iterations = profile.max_iterations,
            "built profile from config"
        );
        Ok(profile)
    }

    /// JSON Schema for the configuration file format.
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(FoldConfig);
        serde_json::to_value(schema)
            .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
    }
}

impl ConstraintConfig {
    pub fn build(&self) -> Result<Constraint, ConfigError> {
        match self {
            ConstraintConfig::LineLimit { max_lines, folder } => {
                let limit = LineLimit::checked(*max_lines)?;
                let limit = match folder {
                    Some(folder) => limit.with_folder(folder.build()?)?,
                    None => limit,
                };
                Ok(limit.into())
            }
            ConstraintConfig::TokenBudget {
                max_chars,
                max_tokens,
                folder,
            } => {
                let budget = match (max_chars, max_tokens) {
                    (Some(_), Some(_)) => {
                        return Err(ConfigError::ConflictingFields {
                            first: "max_chars",
                            second: "max_tokens",
                        });
                    }
                    (Some(chars), None) => TokenBudget::checked(*chars)?,
                    (None, Some(tokens)) => {
                        TokenBudget::from_tokens(positive_limit("max_tokens", *tokens)?)?
                    }
                    (None, None) => TokenBudget::default(),
                };
                let budget = match folder {
                    Some(folder) => budget.with_folder(folder.build()?)?,
                    None => budget,
                };
                Ok(budget.into())
            }
            ConstraintConfig::Unconstrained => Ok(Constraint::Unconstrained),
        }
    }
}

impl FolderConfig {
    pub fn build(&self) -> Result<Folder, ConfigError> {
        match self {
            FolderConfig::Truncate => Ok(Folder::truncate()),
            FolderConfig::HeadTail { head_ratio } => {
                Ok(Folder::HeadTail(HeadTailFolder::new(*head_ratio)?))
            }
            FolderConfig::Structure {
                extra_patterns,
                replace_defaults,
            } => {
                let mut folder = if *replace_defaults {
                    StructureFolder::without_defaults()
                } else {
                    StructureFolder::new()
                };
                for (i, pattern) in extra_patterns.iter().enumerate() {
                    folder = folder.with_rule(format!("extra_{i}"), pattern)?;
                }
                Ok(Folder::Structure(folder))
            }
        }
    }
}
