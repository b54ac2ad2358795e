//! rageval CLI: score a retrieval knowledge base against a gold-standard suite.
//!
//! Exits 0 only when the suite loads, every case runs, and the pass rate clears
//! the suite's required bar; exits 1 otherwise so build pipelines can gate on it.

mod output;

use clap::Parser;
use rageval_core::config::{ConfigOverrides, EvalConfig, load_config};
use rageval_core::{Evaluator, ReportWriter, SqliteKnowledgeBase};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// rageval: retrieval-quality evaluation for RAG knowledge bases
#[derive(Parser, Debug)]
#[command(name = "rageval", version, about, long_about = None)]
struct Cli {
    /// Suite definition (YAML or JSON); defaults to the configured suite path
    suite: Option<PathBuf>,

    /// Directory receiving the JSON report and summary
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// SQLite knowledge base to evaluate
    #[arg(short, long)]
    knowledge_base: Option<PathBuf>,

    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the full JSON report to stdout after the run
    #[arg(long)]
    json: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let overrides = ConfigOverrides {
        suite_path: cli.suite.clone(),
        output_dir: cli.output_dir.clone(),
        knowledge_base: cli.knowledge_base.clone(),
    };
    let config = match load_config(Some(workspace.as_path()), cli.config.as_deref(), Some(&overrides)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Guard must live until exit so buffered JSON log lines are flushed.
    let _log_guard = init_tracing(&cli, &config);

    if let Some(Commands::Config { action }) = &cli.command {
        return match handle_config(action, &config, &workspace) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        };
    }

    match run(&cli, &config, &workspace).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Set up tracing: human-readable stderr + JSON file logging.
fn init_tracing(cli: &Cli, config: &EvalConfig) -> tracing_appender::non_blocking::WorkerGuard {
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // Human-readable layer for stderr (always active)
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = config.log_dir.clone().unwrap_or_else(|| {
        rageval_core::config::project_dirs()
            .map(|d| d.data_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "rageval.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();
    guard
}

/// Resolve a configured path against the workspace unless it is absolute.
fn resolve(workspace: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

/// Execute the suite. Returns whether the run cleared the pass-rate bar.
async fn run(cli: &Cli, config: &EvalConfig, workspace: &Path) -> anyhow::Result<bool> {
    let suite_path = resolve(workspace, &config.suite_path);

    let mut evaluator = Evaluator::new();
    if let Err(e) = evaluator.load(&suite_path) {
        eprintln!("Failed to load test suite: {e}");
        return Ok(false);
    }
    let (required_pass_rate, reporting) = match evaluator.suite() {
        Some(suite) => (
            suite.test_config.required_pass_rate,
            suite.reporting.clone(),
        ),
        None => anyhow::bail!("evaluator lost its suite after loading"),
    };

    let kb_path = resolve(workspace, &config.knowledge_base);
    let kb = SqliteKnowledgeBase::open(&kb_path)
        .map_err(|e| anyhow::anyhow!("Cannot open knowledge base: {e}"))?;

    if !cli.quiet {
        println!("\n  Evaluating {} against {}\n", suite_path.display(), kb_path.display());
    }
    let quiet = cli.quiet;
    let outcome = evaluator
        .run_with_progress(&kb, |result| {
            if !quiet {
                println!("{}", output::case_line(result));
            }
        })
        .await
        .cloned();

    // Release the store whether or not the run succeeded.
    if let Err(e) = kb.close() {
        tracing::warn!(error = %e, "Failed to close knowledge base cleanly");
    }
    let report = outcome?;

    let writer = ReportWriter::new(resolve(workspace, &config.output_dir));
    let written = writer.write(&report, &reporting)?;
    for path in &written {
        tracing::info!(path = %path.display(), "Report written");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        println!("{}", output::summary_block(&report));
        if !written.is_empty() {
            println!("\n  Reports written to {}", writer.output_dir().display());
        }
    }

    // Every output mode, stderr.
    if let Some(warning) = output::pass_rate_warning(&report, required_pass_rate) {
        eprintln!("\n  {warning}");
    }

    Ok(report.meets_pass_rate(required_pass_rate))
}

fn handle_config(action: &ConfigAction, config: &EvalConfig, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let dir = workspace.join(".rageval");
            let path = dir.join("config.toml");
            if path.exists() {
                anyhow::bail!("{} already exists", path.display());
            }
            std::fs::create_dir_all(&dir)?;
            std::fs::write(&path, EvalConfig::default().to_toml_string()?)?;
            println!("Created {}", path.display());
        }
        ConfigAction::Show => {
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}
