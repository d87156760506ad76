//! Apply observation constraints to text from the command line.
//!
//! Folded text goes to stdout; logs and `--stats` go to stderr. Set
//! `OBSFOLD_LOG` (e.g. `OBSFOLD_LOG=obsfold=debug`) to see fold decisions.
//!
//! # Examples
//!
//! ```sh
//! # Fold a file with a preset
//! obsfold fold --input build.log --profile minimal
//!
//! # Explicit budget and strategy, stats as JSON on stderr
//! cargo test 2>&1 | obsfold fold --line-limit 40 --folder head-tail --stats
//!
//! # Compare every strategy on the same input
//! obsfold ablate --input src/lib.rs --budget 15
//!
//! # Inspect presets and the config file format
//! obsfold profiles
//! obsfold schema
//! ```

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use obsfold::config::{ConstraintConfig, FolderConfig};
use obsfold::prelude::*;
use tokio::io::AsyncReadExt;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "OBSFOLD_LOG";

/// Line budget used by `ablate` when none is given.
const DEFAULT_ABLATION_BUDGET: i64 = 15;

/// Apply observation constraints to text.
#[derive(Parser)]
#[command(name = "obsfold", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Constrain text from a file or stdin and print the result
    Fold(FoldArgs),
    /// Run the same input through every folding strategy
    Ablate(AblateArgs),
    /// Print every preset profile as JSON
    Profiles,
    /// Print the JSON Schema of the configuration file
    Schema,
}

#[derive(clap::Args)]
struct FoldArgs {
    /// Read from this file instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,

    // ── Constraint selection ───────────────────────────────────
    /// Preset profile
    #[arg(long, value_enum, conflicts_with_all = ["config", "line_limit", "token_budget"])]
    profile: Option<ProfileName>,

    /// JSON configuration file
    #[arg(long, conflicts_with_all = ["line_limit", "token_budget"])]
    config: Option<PathBuf>,

    /// Maximum lines to show
    #[arg(long, allow_negative_numbers = true, conflicts_with = "token_budget")]
    line_limit: Option<i64>,

    /// Maximum characters to show
    #[arg(long, allow_negative_numbers = true)]
    token_budget: Option<i64>,

    /// Strategy for over-budget text (with --line-limit or --token-budget)
    #[arg(long, value_enum)]
    folder: Option<FolderKind>,

    /// Head share of the budget (with --folder head-tail)
    #[arg(long)]
    head_ratio: Option<f64>,

    // ── Output ─────────────────────────────────────────────────
    /// Print the fold statistics as JSON on stderr
    #[arg(long)]
    stats: bool,
}

#[derive(clap::Args)]
struct AblateArgs {
    /// Read from this file instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,

    /// Line budget for the constrained arms
    #[arg(long, default_value_t = DEFAULT_ABLATION_BUDGET, allow_negative_numbers = true)]
    budget: i64,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FolderKind {
    Truncate,
    HeadTail,
    Structure,
}

impl FolderKind {
    fn to_config(self, head_ratio: Option<f64>) -> FolderConfig {
        match self {
            FolderKind::Truncate => FolderConfig::Truncate,
            FolderKind::HeadTail => FolderConfig::HeadTail {
                head_ratio: head_ratio.unwrap_or(obsfold::folder::DEFAULT_HEAD_RATIO),
            },
            FolderKind::Structure => FolderConfig::Structure {
                extra_patterns: Vec::new(),
                replace_defaults: false,
            },
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn read_input(path: Option<&Path>) -> Result<String, String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("failed to read {}: {e}", path.display())),
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            Ok(buf)
        }
    }
}

fn fold_config(args: &FoldArgs) -> Result<FoldConfig, String> {
    if args.head_ratio.is_some() && args.folder != Some(FolderKind::HeadTail) {
        return Err("--head-ratio requires --folder head-tail".to_string());
    }
    let folder = args.folder.map(|kind| kind.to_config(args.head_ratio));

    if let Some(path) = &args.config {
        if folder.is_some() {
            return Err("--folder cannot be combined with --config".to_string());
        }
        return FoldConfig::load(path).map_err(|e| e.to_string());
    }
    if let Some(name) = args.profile {
        if folder.is_some() {
            return Err("--folder cannot be combined with --profile".to_string());
        }
        return Ok(FoldConfig::for_profile(name));
    }

    let constraint = match (args.line_limit, args.token_budget) {
        (Some(max_lines), _) => ConstraintConfig::LineLimit { max_lines, folder },
        (None, Some(max_chars)) => ConstraintConfig::TokenBudget {
            max_chars: Some(max_chars),
            max_tokens: None,
            folder,
        },
        (None, None) if folder.is_some() => {
            return Err("--folder requires --line-limit or --token-budget".to_string());
        }
        (None, None) => return Ok(FoldConfig::default()),
    };
    Ok(FoldConfig::for_constraint(constraint))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("failed to serialize: {e}"))
}

// ── Subcommands ────────────────────────────────────────────────────

async fn fold(args: &FoldArgs) -> Result<String, String> {
    let profile = fold_config(args)?.build().map_err(|e| e.to_string())?;
    let input = read_input(args.input.as_deref()).await?;

    let pipeline = ObservationPipeline::from_profile(profile);
    let (text, stats) = pipeline.process(&input);
    debug!(summary = %pipeline.snapshot().to_log_string(), "fold complete");

    if args.stats {
        let json = serde_json::to_string(&stats)
            .map_err(|e| format!("failed to serialize stats: {e}"))?;
        eprintln!("{json}");
    }
    Ok(text)
}

/// Ablation arms in report order, each a label and its constraint.
fn ablation_arms(budget: i64) -> Result<Vec<(&'static str, Constraint)>, String> {
    let limited = |folder: Folder| -> Result<Constraint, String> {
        LineLimit::checked(budget)
            .and_then(|c| c.with_folder(folder))
            .map(Constraint::from)
            .map_err(|e| e.to_string())
    };
    let head_tail = Folder::head_tail(obsfold::folder::DEFAULT_HEAD_RATIO)
        .map_err(|e| e.to_string())?;
    Ok(vec![
        ("unconstrained", Constraint::Unconstrained),
        ("truncate", limited(Folder::truncate())?),
        ("head_tail", limited(head_tail)?),
        ("structure", limited(Folder::structure())?),
    ])
}

async fn ablate(args: &AblateArgs) -> Result<String, String> {
    let arms = ablation_arms(args.budget)?;
    let input = read_input(args.input.as_deref()).await?;

    // Each arm gets its own pipeline and telemetry.
    let handles = arms.into_iter().map(|(label, constraint)| {
        let input = input.clone();
        tokio::spawn(async move {
            let pipeline = ObservationPipeline::new(constraint);
            let (text, stats) = pipeline.process(&input);
            (label, pipeline.constraint().to_string(), text, stats)
        })
    });

    let mut out = String::new();
    for joined in futures::future::join_all(handles).await {
        let (label, description, text, stats) =
            joined.map_err(|e| format!("ablation task failed: {e}"))?;
        let stats_json = serde_json::to_string(&stats)
            .map_err(|e| format!("failed to serialize stats: {e}"))?;
        out.push_str(&format!("=== {label}: {description} ===\n"));
        out.push_str(&text);
        out.push_str(&format!("\n--- stats: {stats_json}\n\n"));
    }
    Ok(out)
}

fn profiles() -> Result<String, String> {
    let summaries: Vec<_> = ProfileName::ALL
        .into_iter()
        .map(|name| ToolProfile::preset(name).describe())
        .collect();
    Ok(format!("{}\n", to_json(&summaries)?))
}

fn schema() -> Result<String, String> {
    Ok(format!("{}\n", to_json(&FoldConfig::json_schema())?))
}

async fn run(cli: &Cli) -> Result<String, String> {
    match &cli.command {
        Command::Fold(args) => fold(args).await,
        Command::Ablate(args) => ablate(args).await,
        Command::Profiles => profiles(),
        Command::Schema => schema(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    match run(&cli).await {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
