mod cmd_analyze;
mod cmd_config;
mod cmd_errors;
mod cmd_extract;
mod cmd_outcome;
mod cmd_recommendations;
mod cmd_record;
mod cmd_resolve;
mod cmd_suggest;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use jeeves_ledger::JeevesPaths;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "jeeves",
    version,
    about = "Reference resolution and feedback bookkeeping for the Jeeves assistant"
)]
struct Cli {
    /// Base directory holding .jeeves/ (default: nearest ancestor with
    /// .jeeves/, else $JEEVES_HOME or the platform data dir)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract entities (paths, URLs, costs, times, pronouns...) from text
    Extract {
        text: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve pronouns in text against the given referents
    Resolve {
        text: String,
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        error: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        component: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Suggest commands for a message that did not match exactly
    Suggest {
        text: String,
        /// Maximum suggestions to show
        #[arg(long, default_value_t = 3)]
        limit: usize,
    },
    /// Append a row to the ledger
    Record {
        #[command(subcommand)]
        cmd: cmd_record::RecordCmd,
    },
    /// Show recorded plan/dev-task executions
    Outcome {
        #[command(subcommand)]
        cmd: cmd_outcome::OutcomeCmd,
    },
    /// Run batch analyses (scheduler entry point)
    Analyze {
        #[command(subcommand)]
        cmd: cmd_analyze::AnalyzeCmd,
    },
    /// Review optimizer recommendations
    Recommendations {
        #[command(subcommand)]
        cmd: cmd_recommendations::RecommendationsCmd,
    },
    /// Error frequencies and task success rates over a trailing window
    Errors {
        /// Window in days
        #[arg(long, default_value_t = 7)]
        days: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage .jeeves/config.json
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("JEEVES_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let paths = resolve_paths(cli.root.as_deref())?;

    match cli.cmd {
        Command::Extract { text, json } => cmd_extract::execute(&text, json),
        Command::Resolve {
            text,
            file,
            project,
            task,
            error,
            url,
            component,
            json,
        } => cmd_resolve::execute(
            &paths,
            &cmd_resolve::ResolveParams {
                text: &text,
                file: file.as_deref(),
                project: project.as_deref(),
                task: task.as_deref(),
                error: error.as_deref(),
                url: url.as_deref(),
                component: component.as_deref(),
                json,
            },
        ),
        Command::Suggest { text, limit } => cmd_suggest::execute(&paths, &text, limit),
        Command::Record { cmd } => cmd_record::run(cmd, &paths),
        Command::Outcome { cmd } => cmd_outcome::run(cmd, &paths),
        Command::Analyze { cmd } => cmd_analyze::run(cmd, &paths),
        Command::Recommendations { cmd } => cmd_recommendations::run(cmd, &paths),
        Command::Errors { days, json } => cmd_errors::execute(&paths, days, json),
        Command::Config { cmd } => cmd_config::run(cmd, &paths),
    }
}

/// `--root` wins, then the nearest ancestor of the cwd with `.jeeves/`,
/// then the per-user home.
fn resolve_paths(root: Option<&Path>) -> anyhow::Result<JeevesPaths> {
    if let Some(root) = root {
        return Ok(JeevesPaths::discover(root));
    }
    let cwd = std::env::current_dir()?;
    Ok(match JeevesPaths::find_root(&cwd) {
        Some(found) => JeevesPaths::discover(found),
        None => JeevesPaths::home(),
    })
}
