//! Append-only recorder for reasoning tasks, error occurrences and the
//! plan/dev-task execution log.

use jeeves_core::clock::{days_before, format_rfc3339, new_id, now_rfc3339};
use jeeves_core::{ErrorOccurrence, ExecutionOutcome, ExecutionRecord, TaskRecord, Trace};
use jeeves_ledger::{JeevesPaths, SqliteStore, TaskTypeStats};
use serde::Serialize;
use time::OffsetDateTime;

use crate::classify::classify_task;

/// Captured step output is cut to this many characters before storage.
pub const OUTPUT_SNIPPET_CHARS: usize = 500;

/// The no-op action: declining a request is not a handler failure.
const REFUSE_ACTION: &str = "refuse";

/// Most recent execution plus a human-readable rendering of its steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionSummary {
    pub record: ExecutionRecord,
    pub rendered: String,
}

pub struct Recorder {
    store: SqliteStore,
}

impl Recorder {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    /// Open (creating if needed) the ledger under `paths`.
    pub fn open(paths: &JeevesPaths) -> anyhow::Result<Self> {
        paths.ensure_layout()?;
        Ok(Self::new(SqliteStore::open_or_create(&paths.ledger_db)?))
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    // ── Reasoning tasks ─────────────────────────────────────────────

    /// Persist one reasoning trace. Failed traces (other than refusals)
    /// also log a `handler_failure:{action}` error occurrence.
    pub fn record_task(&self, trace: &Trace) -> Option<String> {
        let task_type = classify_task(&trace.classification, &trace.action);
        let record = TaskRecord {
            id: new_id("task"),
            ts: now_rfc3339(),
            trace_id: trace.trace_id.clone(),
            task_type,
            classification: trace.classification.clone(),
            action: trace.action.clone(),
            success: trace.success,
            confidence_band: trace.confidence_band(),
            iterations: trace.iterations,
            test_passed: None,
        };
        let id = best_effort("record_task", self.store.insert_task(&record)).map(|()| record.id);

        if !trace.success && trace.action != REFUSE_ACTION {
            self.record_error_occurrence(&format!("handler_failure:{}", trace.action), None);
        }
        id
    }

    /// Set `test_passed` on every task row with this trace id. Returns the
    /// number of rows patched (0 on failure or unknown id).
    pub fn update_test_result(&self, trace_id: &str, passed: bool) -> usize {
        best_effort(
            "update_test_result",
            self.store.update_test_result(trace_id, passed),
        )
        .unwrap_or(0)
    }

    /// Per-task-type success and iteration stats over the last `since_days`.
    pub fn task_stats(&self, since_days: i64) -> Vec<TaskTypeStats> {
        best_effort(
            "task_stats",
            self.store.task_stats_since(&days_ago(since_days)),
        )
        .unwrap_or_default()
    }

    // ── Error occurrences ───────────────────────────────────────────

    pub fn record_error_occurrence(
        &self,
        error_type: &str,
        learning_id: Option<&str>,
    ) -> Option<String> {
        let error_type = error_type.trim();
        if error_type.is_empty() {
            tracing::debug!("skipping error occurrence with empty type");
            return None;
        }
        let occurrence = ErrorOccurrence {
            id: new_id("err"),
            ts: now_rfc3339(),
            error_type: error_type.to_string(),
            learning_id: learning_id.map(str::to_string),
        };
        best_effort(
            "record_error_occurrence",
            self.store.insert_error(&occurrence),
        )
        .map(|()| occurrence.id)
    }

    /// Occurrence counts per error type over the last `since_days`, most
    /// frequent first.
    pub fn error_frequencies(&self, since_days: i64) -> Vec<(String, u64)> {
        best_effort(
            "error_frequencies",
            self.store.error_counts_since(&days_ago(since_days)),
        )
        .unwrap_or_default()
    }

    // ── Execution log ───────────────────────────────────────────────

    pub fn record_execution_outcome(&self, outcome: &ExecutionOutcome) -> Option<String> {
        let mut outcome = outcome.clone();
        for step in &mut outcome.steps {
            if let Some(output) = step.output.as_mut() {
                if output.chars().count() > OUTPUT_SNIPPET_CHARS {
                    *output = output.chars().take(OUTPUT_SNIPPET_CHARS).collect();
                }
            }
        }
        let record = ExecutionRecord {
            id: new_id("exec"),
            ts: now_rfc3339(),
            outcome,
        };
        best_effort(
            "record_execution_outcome",
            self.store.insert_execution(&record),
        )
        .map(|()| record.id)
    }

    pub fn last_execution_outcome(&self) -> Option<ExecutionSummary> {
        let record = best_effort("last_execution_outcome", self.store.last_execution())??;
        let rendered = render_execution(&record);
        Some(ExecutionSummary { record, rendered })
    }

    /// The `limit` most recent executions, newest first.
    pub fn execution_log(&self, limit: usize) -> Vec<ExecutionRecord> {
        best_effort("execution_log", self.store.recent_executions(limit)).unwrap_or_default()
    }
}

/// Log and discard a store error.
pub(crate) fn best_effort<T>(op: &'static str, result: anyhow::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(op, error = %e, "ledger operation failed");
            None
        }
    }
}

fn days_ago(days: i64) -> String {
    window_start(OffsetDateTime::now_utc(), days)
}

/// Lower bound for a trailing window of `days` ending at `now`. A window
/// reaching past the representable range starts before every stored row.
pub(crate) fn window_start(now: OffsetDateTime, days: i64) -> String {
    match days_before(now, days) {
        Some(start) => format_rfc3339(start),
        None if days > 0 => {
            tracing::warn!(days, "window out of range, using all history");
            String::new()
        }
        None => {
            tracing::warn!(days, "window out of range, using now");
            format_rfc3339(now)
        }
    }
}

/// Header, one `✓`/`✗` line per step, then the summary if any.
pub fn render_execution(record: &ExecutionRecord) -> String {
    let o = &record.outcome;
    let mut lines = vec![format!(
        "Last {} run ({}) at {}: {}",
        o.source.as_str(),
        o.outcome,
        record.ts,
        o.task
    )];
    for step in &o.steps {
        if step.success {
            lines.push(format!("✓ {}", step.command));
        } else {
            let reason = step
                .error
                .clone()
                .or_else(|| step.exit_code.map(|c| format!("exit code {c}")))
                .unwrap_or_else(|| "failed".to_string());
            lines.push(format!("✗ {}: {reason}", step.command));
        }
    }
    if let Some(summary) = o.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        lines.push(format!("Summary: {summary}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use jeeves_core::{ExecutionSource, ExecutionStep, Outcome, TaskType};

    fn recorder() -> (tempfile::TempDir, Recorder) {
        let tmp = tempfile::tempdir().unwrap();
        let paths = JeevesPaths::discover(tmp.path());
        let rec = Recorder::open(&paths).unwrap();
        (tmp, rec)
    }

    fn trace(trace_id: &str, action: &str, success: bool) -> Trace {
        Trace {
            trace_id: trace_id.into(),
            classification: "code_refactor".into(),
            action: action.into(),
            success,
            confidence: 0.84,
            iterations: 3,
        }
    }

    fn step(command: &str, success: bool, error: Option<&str>) -> ExecutionStep {
        ExecutionStep {
            command: command.into(),
            cwd: Some("/srv/app".into()),
            success,
            exit_code: Some(if success { 0 } else { 1 }),
            output: None,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn record_task_classifies_and_bands() {
        let (_tmp, rec) = recorder();
        let id = rec.record_task(&trace("tr1", "dev_task", true)).unwrap();
        assert!(id.starts_with("task_"));

        let rows = rec.store().tasks_for_trace("tr1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].task_type, TaskType::Refactor);
        assert_eq!(rows[0].confidence_band, 8);
        assert_eq!(rows[0].iterations, 3);
        assert_eq!(rows[0].test_passed, None);
        assert!(rec.error_frequencies(1).is_empty());
    }

    #[test]
    fn failed_task_logs_handler_failure() {
        let (_tmp, rec) = recorder();
        rec.record_task(&trace("tr1", "dev_task", false));
        rec.record_task(&trace("tr2", "dev_task", false));
        assert_eq!(
            rec.error_frequencies(1),
            vec![("handler_failure:dev_task".to_string(), 2)]
        );
    }

    #[test]
    fn refusal_is_not_a_handler_failure() {
        let (_tmp, rec) = recorder();
        rec.record_task(&trace("tr1", "refuse", false));
        assert!(rec.error_frequencies(1).is_empty());
        assert_eq!(rec.store().tasks_for_trace("tr1").unwrap().len(), 1);
    }

    #[test]
    fn test_result_patches_all_matching_rows() {
        let (_tmp, rec) = recorder();
        rec.record_task(&trace("tr1", "dev_task", true));
        rec.record_task(&trace("tr1", "dev_task", true));
        assert_eq!(rec.update_test_result("tr1", false), 2);
        assert_eq!(rec.update_test_result("tr1", false), 2);
        assert_eq!(rec.update_test_result("nope", true), 0);
        let rows = rec.store().tasks_for_trace("tr1").unwrap();
        assert!(rows.iter().all(|r| r.test_passed == Some(false)));
    }

    #[test]
    fn task_stats_cover_recent_rows() {
        let (_tmp, rec) = recorder();
        rec.record_task(&trace("tr1", "dev_task", true));
        rec.record_task(&trace("tr2", "dev_task", false));
        let stats = rec.task_stats(7);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total, 2);
        assert_eq!(stats[0].succeeded, 1);
    }

    #[test]
    fn huge_windows_cover_all_history() {
        let (_tmp, rec) = recorder();
        rec.record_task(&trace("tr1", "dev_task", true));
        rec.record_error_occurrence("timeout", None);

        let stats = rec.task_stats(10_000_000);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total, 1);
        assert_eq!(
            rec.error_frequencies(i64::MAX),
            vec![("timeout".to_string(), 1)]
        );
    }

    #[test]
    fn blank_error_type_is_skipped() {
        let (_tmp, rec) = recorder();
        assert!(rec.record_error_occurrence("  ", None).is_none());
        assert!(rec
            .record_error_occurrence("timeout", Some("learn_1"))
            .is_some());
        let rows = rec.store().errors_of_type("timeout").unwrap();
        assert_eq!(rows[0].learning_id.as_deref(), Some("learn_1"));
    }

    #[test]
    fn execution_outcome_renders_steps() {
        let (_tmp, rec) = recorder();
        assert!(rec.last_execution_outcome().is_none());

        rec.record_execution_outcome(&ExecutionOutcome {
            source: ExecutionSource::Plan,
            task: "deploy dashboard".into(),
            steps: vec![
                step("git pull", true, None),
                step("docker compose up -d", false, Some("port 3000 in use")),
            ],
            outcome: Outcome::Partial,
            summary: Some("container did not start".into()),
        })
        .unwrap();

        let last = rec.last_execution_outcome().unwrap();
        assert_eq!(last.record.outcome.task, "deploy dashboard");
        let lines: Vec<&str> = last.rendered.lines().collect();
        assert!(lines[0].starts_with("Last plan run (partial)"));
        assert_eq!(lines[1], "✓ git pull");
        assert_eq!(lines[2], "✗ docker compose up -d: port 3000 in use");
        assert_eq!(lines[3], "Summary: container did not start");
    }

    #[test]
    fn output_snippet_is_truncated() {
        let (_tmp, rec) = recorder();
        let mut s = step("cargo build", true, None);
        s.output = Some("é".repeat(OUTPUT_SNIPPET_CHARS + 50));
        rec.record_execution_outcome(&ExecutionOutcome {
            source: ExecutionSource::DevTask,
            task: "build".into(),
            steps: vec![s],
            outcome: Outcome::Success,
            summary: None,
        });
        let log = rec.execution_log(5);
        let output = log[0].outcome.steps[0].output.as_deref().unwrap();
        assert_eq!(output.chars().count(), OUTPUT_SNIPPET_CHARS);
    }

    #[test]
    fn execution_log_is_newest_first_and_limited() {
        let (_tmp, rec) = recorder();
        for i in 0..3 {
            rec.record_execution_outcome(&ExecutionOutcome {
                source: ExecutionSource::DevTask,
                task: format!("task {i}"),
                steps: vec![step("make", true, None)],
                outcome: Outcome::Success,
                summary: None,
            });
        }
        let log = rec.execution_log(2);
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].outcome.task, "task 2");
        assert_eq!(log[1].outcome.task, "task 1");
    }

    #[test]
    fn render_falls_back_to_exit_code() {
        let record = ExecutionRecord {
            id: "exec_1".into(),
            ts: "2026-01-01T00:00:00Z".into(),
            outcome: ExecutionOutcome {
                source: ExecutionSource::DevTask,
                task: "lint".into(),
                steps: vec![step("cargo clippy", false, None)],
                outcome: Outcome::Failed,
                summary: None,
            },
        };
        let text = render_execution(&record);
        assert_eq!(
            text,
            "Last dev_task run (failed) at 2026-01-01T00:00:00Z: lint\n✗ cargo clippy: exit code 1"
        );
    }

    #[test]
    fn persistence_failures_are_swallowed() {
        let tmp = tempfile::tempdir().unwrap();
        // bare open: no schema, every write fails
        let store = SqliteStore::open(&tmp.path().join("broken.db")).unwrap();
        let rec = Recorder::new(store);

        assert!(rec.record_task(&trace("tr1", "dev_task", false)).is_none());
        assert_eq!(rec.update_test_result("tr1", true), 0);
        assert!(rec.record_error_occurrence("timeout", None).is_none());
        assert!(rec.error_frequencies(7).is_empty());
        assert!(rec.task_stats(7).is_empty());
        assert!(rec
            .record_execution_outcome(&ExecutionOutcome {
                source: ExecutionSource::Plan,
                task: "x".into(),
                steps: vec![],
                outcome: Outcome::Failed,
                summary: None,
            })
            .is_none());
        assert!(rec.last_execution_outcome().is_none());
        assert!(rec.execution_log(10).is_empty());
    }
}
