//! Gitpulse CLI - mine git history into change metrics and effort estimates

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output
// - Exit codes are stable per error kind

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use gitpulse_core::pairs::SortOrder;
use gitpulse_core::{
    analyze_repository, exit_code_for, load_resolved, render_json, render_text, write_output,
    CancellationToken, CommitSpan, ExecutionPolicy, ResolvedConfig, SpanBound, TimeSelector,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "gitpulse")]
#[command(about = "Mines git history into per-commit change metrics and session-based effort estimates")]
#[command(version = env!("GITPULSE_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full analysis: developers, change metrics, and hours
    Analyze {
        /// Path to the git repository
        path: PathBuf,

        #[command(flatten)]
        span: SpanArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Path to config file (default: auto-discover in the repository)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Root directory for per-pair scratch trees
        #[arg(long)]
        temp_dir: Option<PathBuf>,

        /// Force serial execution (deterministic pair order)
        #[arg(long)]
        linear: bool,

        /// Traverse the span newest commit first
        #[arg(long)]
        latest_first: bool,

        /// Skip the root commit's pair
        #[arg(long)]
        skip_initial: bool,

        /// Skip pairs whose child is a merge commit
        #[arg(long)]
        skip_merge: bool,

        /// Skip the per-pair diff pipeline (hours and developers only)
        #[arg(long)]
        skip_metrics: bool,

        /// Unified-diff context width
        #[arg(long)]
        context: Option<u32>,
    },
    /// Effort estimation only (no diff pipeline)
    Hours {
        /// Path to the git repository
        path: PathBuf,

        #[command(flatten)]
        span: SpanArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Path to config file (default: auto-discover in the repository)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Session gap threshold in minutes (overrides config)
        #[arg(long)]
        max_diff: Option<u32>,

        /// Minutes attributed to each session's first commit (overrides config)
        #[arg(long)]
        first_add: Option<u32>,
    },
}

#[derive(clap::Args)]
struct SpanArgs {
    /// Span start: 'yyyy-MM-dd HH:mm' or a commit-ish
    #[arg(long)]
    since: Option<String>,

    /// Span end: 'yyyy-MM-dd HH:mm' or a commit-ish
    #[arg(long)]
    until: Option<String>,

    /// Take only the first N candidate commits
    #[arg(long)]
    limit: Option<usize>,

    /// Restrict to commits whose id starts with one of these prefixes
    #[arg(long = "sha")]
    shas: Vec<String>,

    /// Which signature timestamp bounds compare against
    #[arg(long, value_enum, default_value = "committer")]
    select: SelectorArg,
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Output file path (default: stdout)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SelectorArg {
    Author,
    Committer,
}

impl From<SelectorArg> for TimeSelector {
    fn from(arg: SelectorArg) -> TimeSelector {
        match arg {
            SelectorArg::Author => TimeSelector::Author,
            SelectorArg::Committer => TimeSelector::Committer,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let cancel = CancellationToken::new();

    if let Err(e) = run(cli, &cancel) {
        // Single-line summary; full context chain at debug verbosity
        if std::env::var_os("GITPULSE_DEBUG").is_some() {
            eprintln!("error: {:?}", e);
        } else {
            eprintln!("error: {:#}", e);
        }
        std::process::exit(exit_code_for(&e));
    }
}

fn run(cli: Cli, cancel: &CancellationToken) -> anyhow::Result<()> {
    match cli.command {
        Commands::Analyze {
            path,
            span,
            output,
            config,
            temp_dir,
            linear,
            latest_first,
            skip_initial,
            skip_merge,
            skip_metrics,
            context,
        } => {
            let mut resolved = load_resolved(config.as_deref(), &path)?;
            if let Some(dir) = temp_dir {
                resolved.temp_directory = dir;
            }
            if linear {
                resolved.execution_policy = ExecutionPolicy::Linear;
            }
            if skip_initial {
                resolved.skip_initial_commit = true;
            }
            if skip_merge {
                resolved.skip_merge_commits = true;
            }
            if skip_metrics {
                resolved.skip_git_metrics = true;
            }
            if let Some(context) = context {
                resolved.context_lines = context;
            }
            let order = if latest_first {
                SortOrder::LatestFirst
            } else {
                SortOrder::OldestFirst
            };
            run_analysis(&path, &span, order, &resolved, &output, cancel)
        }
        Commands::Hours {
            path,
            span,
            output,
            config,
            max_diff,
            first_add,
        } => {
            let mut resolved = load_resolved(config.as_deref(), &path)?;
            resolved.skip_git_metrics = true;
            if max_diff.is_some() || first_add.is_some() {
                let mut hours_type = resolved
                    .hours_types
                    .first()
                    .copied()
                    .unwrap_or_default();
                if let Some(max_diff) = max_diff {
                    hours_type.max_commit_diff = max_diff;
                }
                if let Some(first_add) = first_add {
                    hours_type.first_commit_add = first_add;
                }
                resolved.hours_types = vec![hours_type];
            }
            run_analysis(
                &path,
                &span,
                SortOrder::OldestFirst,
                &resolved,
                &output,
                cancel,
            )
        }
    }
}

fn run_analysis(
    path: &std::path::Path,
    span_args: &SpanArgs,
    order: SortOrder,
    config: &ResolvedConfig,
    output: &OutputArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let since = SpanBound::parse(span_args.since.as_deref()).context("parsing --since")?;
    let until = SpanBound::parse(span_args.until.as_deref()).context("parsing --until")?;
    let span = CommitSpan::new(since, until, span_args.select.into())
        .with_limit(span_args.limit)
        .with_sha_filter(span_args.shas.clone());

    let spinner = progress_spinner();
    let report = analyze_repository(path, &span, order, config, cancel);
    spinner.finish_and_clear();
    let report = report?;

    let rendered = match output.format {
        OutputFormat::Json => render_json(&report)?,
        OutputFormat::Text => render_text(&report),
    };

    match &output.output {
        Some(target) => {
            write_output(target, &rendered)?;
            eprintln!("wrote {}", target.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn progress_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("analyzing history...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
