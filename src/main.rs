use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use git_churn::config::{ChurnConfig, OutputFormat, PathFilter, RepoLocation};
use git_churn::diff::DiffAlgorithm;
use git_churn::evictor::RetentionMode;
use git_churn::history::HistoryOrder;
use git_churn::merge::MergePolicyKind;
use git_churn::{BlameOrchestrator, GixRepository, output};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const VERSION_STRING: &str = "git-churn version 0.1";

#[derive(Debug, clap::Parser)]
#[clap(
    name = "git-churn",
    about = "A fast tool for collecting code churn metrics from git repositories.",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[clap(subcommand)]
    subcommand: Option<Subcommands>,
    #[clap(flatten)]
    analyze: AnalyzeArgs,
}

#[derive(Debug, clap::Subcommand)]
enum Subcommands {
    /// Print the version number of git-churn
    Version,
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    /// Repository path or URL on which the churn metrics are computed
    #[clap(short, long, default_value = ".")]
    repo: String,
    /// Only compute churn for this file, or for files below this directory
    #[clap(short = 'f', long)]
    filepath: Option<String>,
    /// Revision to start from instead of HEAD
    #[clap(long)]
    rev: Option<String>,
    /// Stop before processing this commit
    #[clap(short, long)]
    stop_at: Option<String>,
    #[clap(short, long, default_value = "outputs")]
    outdir: PathBuf,
    /// Number of revisions whose line data is kept in memory
    #[clap(long, default_value_t = 20)]
    window: usize,
    /// Never keep revisions past the window; fail if a merge needs one
    #[clap(long)]
    strict_window: bool,
    #[clap(long, value_enum, default_value_t = MergePolicyArg::NearestUnmarked)]
    merge_policy: MergePolicyArg,
    #[clap(long, value_enum, default_value_t = DiffAlgorithmArg::Myers)]
    diff_algorithm: DiffAlgorithmArg,
    #[clap(long, value_enum, default_value_t = OrderArg::AuthorTime)]
    order: OrderArg,
    #[clap(long, value_enum, default_value_t = FormatArg::Json)]
    format: FormatArg,
    #[clap(long)]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum MergePolicyArg {
    /// Oldest parent whose message is not "Merge pull request"
    NearestUnmarked,
    /// Last listed parent whose message is not "Merge pull request"
    LastUnmarked,
    /// Always the first parent
    FirstParent,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DiffAlgorithmArg {
    Myers,
    MyersMinimal,
    Histogram,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OrderArg {
    /// Oldest author date first
    AuthorTime,
    /// Parents before children, then oldest author date
    Topological,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    /// One JSON array, closed when the run succeeds
    Json,
    /// One JSON record per line
    Jsonl,
}

impl AnalyzeArgs {
    fn into_config(self) -> ChurnConfig {
        ChurnConfig {
            repository: RepoLocation::parse(&self.repo),
            head: self.rev,
            path_filter: self.filepath.map(PathFilter::new),
            stop_at: self.stop_at,
            retention_window: self.window,
            retention: if self.strict_window {
                RetentionMode::Fixed
            } else {
                RetentionMode::Adaptive
            },
            merge_policy: match self.merge_policy {
                MergePolicyArg::NearestUnmarked => MergePolicyKind::NearestUnmarked,
                MergePolicyArg::LastUnmarked => MergePolicyKind::LastUnmarked,
                MergePolicyArg::FirstParent => MergePolicyKind::FirstParent,
            },
            diff_algorithm: match self.diff_algorithm {
                DiffAlgorithmArg::Myers => DiffAlgorithm::Myers,
                DiffAlgorithmArg::MyersMinimal => DiffAlgorithm::MyersMinimal,
                DiffAlgorithmArg::Histogram => DiffAlgorithm::Histogram,
            },
            order: match self.order {
                OrderArg::AuthorTime => HistoryOrder::AuthorTime,
                OrderArg::Topological => HistoryOrder::Topological,
            },
            output_dir: self.outdir,
            output_format: match self.format {
                FormatArg::Json => OutputFormat::JsonArray,
                FormatArg::Jsonl => OutputFormat::JsonLines,
            },
        }
    }
}

fn analyze_repo(config: &ChurnConfig, show_progress: bool) -> Result<()> {
    let mut repo = GixRepository::open(&config.repository)?;
    let output_file = output::output_path(
        &config.output_dir,
        config.output_format,
        chrono::Utc::now(),
    );
    let mut sink = output::open_file_sink(&output_file, config.output_format)
        .with_context(|| format!("Could not create {}", output_file.display()))?;

    let mut orchestrator = BlameOrchestrator::new(&mut repo, config);
    if show_progress {
        orchestrator = orchestrator.with_progress();
    }
    let summary = orchestrator
        .run(sink.as_mut())
        .context("Churn analysis failed")?;
    sink.finish()?;

    println!(
        "Wrote churn for {} commits (head {}) to {}",
        summary.records.len(),
        summary.head,
        output_file.display()
    );
    Ok(())
}

// Exit status of one invocation: 0 on success (including --help), 1 on any
// error.
fn run<I, T>(args: I) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match Cli::try_parse_from(args) {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return u8::from(e.use_stderr());
        }
    };

    let result = match args.subcommand {
        Some(Subcommands::Version) => {
            println!("{VERSION_STRING}");
            Ok(())
        }
        None => {
            let show_progress = !args.analyze.no_progress;
            analyze_repo(&args.analyze.into_config(), show_progress)
        }
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    ExitCode::from(run(std::env::args_os()))
}
