use std::io::Read;
use std::path::Path;

use clap::Subcommand;
use jeeves_core::{ExecutionOutcome, Trace};
use jeeves_learning::Recorder;
use jeeves_ledger::JeevesPaths;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum RecordCmd {
    /// Record a completed reasoning trace
    Task {
        trace_id: String,
        /// Classifier label (e.g. code_refactor)
        #[arg(long, default_value = "")]
        classification: String,
        /// Handler that ran (e.g. dev_task)
        #[arg(long, default_value = "")]
        action: String,
        /// Mark the trace as failed
        #[arg(long)]
        failed: bool,
        /// Classifier confidence in [0, 1]
        #[arg(long, default_value_t = 0.5)]
        confidence: f64,
        #[arg(long, default_value_t = 0)]
        iterations: u32,
    },
    /// Attach a test outcome to every task with this trace id
    TestResult {
        trace_id: String,
        /// Tests failed (default: passed)
        #[arg(long)]
        failed: bool,
    },
    /// Record an error occurrence
    Error {
        error_type: String,
        /// Linked learning/fix id
        #[arg(long)]
        learning_id: Option<String>,
    },
    /// Record one scenario run
    Scenario {
        scenario_id: String,
        #[arg(long)]
        failed: bool,
    },
    /// Record a response-time metric (sources: llm_call, message_handler)
    Metric { source: String, response_ms: u64 },
    /// Record a plan/dev-task execution from a JSON file ("-" for stdin)
    Execution { file: String },
}

// ── Dispatch ──

pub fn run(cmd: RecordCmd, paths: &JeevesPaths) -> anyhow::Result<()> {
    let recorder = Recorder::open(paths)?;
    let id = match cmd {
        RecordCmd::Task {
            trace_id,
            classification,
            action,
            failed,
            confidence,
            iterations,
        } => recorder.record_task(&Trace {
            trace_id,
            classification,
            action,
            success: !failed,
            confidence,
            iterations,
        }),
        RecordCmd::TestResult { trace_id, failed } => {
            let n = recorder.update_test_result(&trace_id, !failed);
            println!("{n} task(s) updated");
            return Ok(());
        }
        RecordCmd::Error {
            error_type,
            learning_id,
        } => recorder.record_error_occurrence(&error_type, learning_id.as_deref()),
        RecordCmd::Scenario {
            scenario_id,
            failed,
        } => recorder.record_scenario_run(&scenario_id, !failed),
        RecordCmd::Metric {
            source,
            response_ms,
        } => recorder.record_metric(&source, response_ms),
        RecordCmd::Execution { file } => {
            recorder.record_execution_outcome(&read_execution(Path::new(&file))?)
        }
    };
    match id {
        Some(id) => println!("{id}"),
        None => println!("(not recorded, see log)"),
    }
    Ok(())
}

fn read_execution(file: &Path) -> anyhow::Result<ExecutionOutcome> {
    let content = if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file)?
    };
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jeeves_core::Outcome;

    #[test]
    fn reads_execution_json() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("run.json");
        std::fs::write(
            &file,
            r#"{"source": "dev_task", "task": "add login", "outcome": "partial",
                "steps": [{"command": "npm test", "success": false, "exit_code": 1}]}"#,
        )
        .unwrap();
        let outcome = read_execution(&file).unwrap();
        assert_eq!(outcome.outcome, Outcome::Partial);
        assert_eq!(outcome.steps[0].exit_code, Some(1));
        assert!(outcome.summary.is_none());
    }

    #[test]
    fn record_then_query() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = JeevesPaths::discover(tmp.path());
        run(
            RecordCmd::Error {
                error_type: "timeout".into(),
                learning_id: None,
            },
            &paths,
        )
        .unwrap();
        let recorder = Recorder::open(&paths).unwrap();
        assert_eq!(recorder.error_frequencies(1), vec![("timeout".to_string(), 1)]);
    }
}
