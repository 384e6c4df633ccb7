use clap::Subcommand;
use jeeves_learning::Recorder;
use jeeves_ledger::{JeevesConfig, JeevesPaths};

#[derive(Subcommand)]
pub enum OutcomeCmd {
    /// Show the most recent execution with per-step results
    Last {
        #[arg(long)]
        json: bool,
    },
    /// List recent executions, newest first
    Log {
        /// Rows to show (default: execution_log_limit from config)
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(cmd: OutcomeCmd, paths: &JeevesPaths) -> anyhow::Result<()> {
    let recorder = Recorder::open(paths)?;
    match cmd {
        OutcomeCmd::Last { json } => match recorder.last_execution_outcome() {
            Some(summary) if json => println!("{}", serde_json::to_string_pretty(&summary)?),
            Some(summary) => println!("{}", summary.rendered),
            None => println!("No executions recorded."),
        },
        OutcomeCmd::Log { limit, json } => {
            let limit = limit.unwrap_or_else(|| JeevesConfig::load(paths).execution_log_limit);
            let log = recorder.execution_log(limit);
            if log.is_empty() {
                println!("No executions recorded.");
                return Ok(());
            }
            if json {
                for rec in &log {
                    println!("{}", serde_json::to_string(rec)?);
                }
            } else {
                for rec in &log {
                    let ok = rec.outcome.steps.iter().filter(|s| s.success).count();
                    println!(
                        "{}  {:<8} {:<8} {}/{} steps  {}",
                        rec.ts,
                        rec.outcome.source.as_str(),
                        rec.outcome.outcome,
                        ok,
                        rec.outcome.steps.len(),
                        rec.outcome.task
                    );
                }
                println!("\n({} executions shown)", log.len());
            }
        }
    }
    Ok(())
}
