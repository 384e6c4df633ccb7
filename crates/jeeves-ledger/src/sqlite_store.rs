//! SQLite-backed storage for the Jeeves ledger.
//!
//! A single `ledger.db` in WAL mode holding append-only tables for reasoning
//! tasks, error occurrences, the execution log, scenario runs and performance
//! metrics, plus the optimizer's recommendations. Rows are never deleted.
//! The only in-place updates are `test_passed` on reasoning tasks and the
//! status of a recommendation.

use jeeves_core::{
    ErrorOccurrence, ExecutionOutcome, ExecutionRecord, ParseError, PerformanceMetric,
    Recommendation, RecommendationStatus, ScenarioRun, TaskRecord, TaskType,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection};
use std::path::Path;

const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS reasoning_tasks (
    rowid INTEGER PRIMARY KEY,
    id TEXT UNIQUE NOT NULL,
    ts TEXT NOT NULL,
    trace_id TEXT NOT NULL,
    task_type TEXT NOT NULL,
    classification TEXT NOT NULL DEFAULT '',
    action TEXT NOT NULL DEFAULT '',
    success BOOLEAN NOT NULL,
    confidence_band INTEGER NOT NULL,
    iterations INTEGER NOT NULL DEFAULT 0,
    test_passed BOOLEAN
);
CREATE INDEX IF NOT EXISTS idx_tasks_trace ON reasoning_tasks(trace_id);
CREATE INDEX IF NOT EXISTS idx_tasks_ts ON reasoning_tasks(ts);

CREATE TABLE IF NOT EXISTS error_occurrences (
    rowid INTEGER PRIMARY KEY,
    id TEXT UNIQUE NOT NULL,
    ts TEXT NOT NULL,
    error_type TEXT NOT NULL,
    learning_id TEXT
);
CREATE INDEX IF NOT EXISTS idx_errors_type_ts ON error_occurrences(error_type, ts);

CREATE TABLE IF NOT EXISTS execution_log (
    rowid INTEGER PRIMARY KEY,
    id TEXT UNIQUE NOT NULL,
    ts TEXT NOT NULL,
    source TEXT NOT NULL,
    task TEXT NOT NULL DEFAULT '',
    outcome TEXT NOT NULL,
    steps TEXT NOT NULL DEFAULT '[]',
    summary TEXT
);
CREATE INDEX IF NOT EXISTS idx_execution_ts ON execution_log(ts DESC);

CREATE TABLE IF NOT EXISTS scenario_runs (
    rowid INTEGER PRIMARY KEY,
    id TEXT UNIQUE NOT NULL,
    ts TEXT NOT NULL,
    scenario_id TEXT NOT NULL,
    passed BOOLEAN NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_runs_ts ON scenario_runs(ts DESC);

CREATE TABLE IF NOT EXISTS performance_metrics (
    rowid INTEGER PRIMARY KEY,
    id TEXT UNIQUE NOT NULL,
    ts TEXT NOT NULL,
    source TEXT NOT NULL,
    response_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_metrics_source_ts ON performance_metrics(source, ts);

CREATE TABLE IF NOT EXISTS performance_recommendations (
    rowid INTEGER PRIMARY KEY,
    id TEXT UNIQUE NOT NULL,
    ts TEXT NOT NULL,
    category TEXT NOT NULL,
    title TEXT NOT NULL,
    detail TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'pending',
    resolved_at TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_recs_pending_category
    ON performance_recommendations(category) WHERE status = 'pending';

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// Per-task-type aggregate over reasoning tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskTypeStats {
    pub task_type: TaskType,
    pub total: u64,
    pub succeeded: u64,
    pub avg_iterations: f64,
}

/// Count and mean response time for one metric source.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricStats {
    pub count: u64,
    pub avg_response_ms: Option<f64>,
}

/// SQLite-backed storage engine.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open an existing ledger.db without touching the schema.
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.apply_pragmas()?;
        Ok(store)
    }

    /// Open or create ledger.db with full schema.
    pub fn open_or_create(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.apply_pragmas()?;
        store.apply_schema()?;
        Ok(store)
    }

    fn apply_pragmas(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    fn apply_schema(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;
        Ok(())
    }

    // ── Reasoning tasks ─────────────────────────────────────────────

    /// Append a reasoning task row.
    pub fn insert_task(&self, task: &TaskRecord) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO reasoning_tasks (
                id, ts, trace_id, task_type, classification, action,
                success, confidence_band, iterations, test_passed
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                task.id,
                task.ts,
                task.trace_id,
                task.task_type.as_str(),
                task.classification,
                task.action,
                task.success,
                task.confidence_band,
                task.iterations,
                task.test_passed,
            ],
        )?;
        Ok(())
    }

    /// Patch `test_passed` on every row with this trace id. Returns the
    /// number of rows touched.
    pub fn update_test_result(&self, trace_id: &str, passed: bool) -> anyhow::Result<usize> {
        let n = self.conn.execute(
            "UPDATE reasoning_tasks SET test_passed = ?2 WHERE trace_id = ?1",
            params![trace_id, passed],
        )?;
        Ok(n)
    }

    pub fn tasks_for_trace(&self, trace_id: &str) -> anyhow::Result<Vec<TaskRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, ts, trace_id, task_type, classification, action,
                    success, confidence_band, iterations, test_passed
             FROM reasoning_tasks WHERE trace_id = ?1 ORDER BY ts, rowid",
        )?;
        let rows = stmt.query_map(params![trace_id], map_task_row)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("task query failed: {e}"))
    }

    pub fn task_stats_since(&self, since_ts: &str) -> anyhow::Result<Vec<TaskTypeStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT task_type, COUNT(*), SUM(CASE WHEN success THEN 1 ELSE 0 END),
                    AVG(iterations)
             FROM reasoning_tasks WHERE ts >= ?1
             GROUP BY task_type ORDER BY task_type",
        )?;
        let rows = stmt.query_map(params![since_ts], |row| {
            let task_type: String = row.get(0)?;
            Ok(TaskTypeStats {
                task_type: parse_column(0, &task_type)?,
                total: row.get(1)?,
                succeeded: row.get(2)?,
                avg_iterations: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("task stats query failed: {e}"))
    }

    // ── Error occurrences ───────────────────────────────────────────

    pub fn insert_error(&self, err: &ErrorOccurrence) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO error_occurrences (id, ts, error_type, learning_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![err.id, err.ts, err.error_type, err.learning_id],
        )?;
        Ok(())
    }

    /// Occurrences per error type since `since_ts`, most frequent first.
    pub fn error_counts_since(&self, since_ts: &str) -> anyhow::Result<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT error_type, COUNT(*) AS n FROM error_occurrences
             WHERE ts >= ?1 GROUP BY error_type ORDER BY n DESC, error_type",
        )?;
        let rows = stmt.query_map(params![since_ts], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("error count query failed: {e}"))
    }

    pub fn errors_of_type(&self, error_type: &str) -> anyhow::Result<Vec<ErrorOccurrence>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, ts, error_type, learning_id FROM error_occurrences
             WHERE error_type = ?1 ORDER BY ts, rowid",
        )?;
        let rows = stmt.query_map(params![error_type], |row| {
            Ok(ErrorOccurrence {
                id: row.get(0)?,
                ts: row.get(1)?,
                error_type: row.get(2)?,
                learning_id: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("error query failed: {e}"))
    }

    // ── Execution log ───────────────────────────────────────────────

    pub fn insert_execution(&self, rec: &ExecutionRecord) -> anyhow::Result<()> {
        let steps = serde_json::to_string(&rec.outcome.steps)?;
        self.conn.execute(
            "INSERT INTO execution_log (id, ts, source, task, outcome, steps, summary)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                rec.id,
                rec.ts,
                rec.outcome.source.as_str(),
                rec.outcome.task,
                rec.outcome.outcome.as_str(),
                steps,
                rec.outcome.summary,
            ],
        )?;
        Ok(())
    }

    /// Most recent execution log rows, newest first.
    pub fn recent_executions(&self, limit: usize) -> anyhow::Result<Vec<ExecutionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, ts, source, task, outcome, steps, summary
             FROM execution_log ORDER BY ts DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], map_execution_row)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("execution log query failed: {e}"))
    }

    pub fn last_execution(&self) -> anyhow::Result<Option<ExecutionRecord>> {
        Ok(self.recent_executions(1)?.into_iter().next())
    }

    // ── Scenario runs ───────────────────────────────────────────────

    pub fn insert_scenario_run(&self, run: &ScenarioRun) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO scenario_runs (id, ts, scenario_id, passed) VALUES (?1, ?2, ?3, ?4)",
            params![run.id, run.ts, run.scenario_id, run.passed],
        )?;
        Ok(())
    }

    /// The `limit` most recent runs, newest first.
    pub fn recent_scenario_runs(&self, limit: usize) -> anyhow::Result<Vec<ScenarioRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, ts, scenario_id, passed FROM scenario_runs
             ORDER BY ts DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(ScenarioRun {
                id: row.get(0)?,
                ts: row.get(1)?,
                scenario_id: row.get(2)?,
                passed: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("scenario run query failed: {e}"))
    }

    // ── Performance metrics ─────────────────────────────────────────

    pub fn insert_metric(&self, metric: &PerformanceMetric) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO performance_metrics (id, ts, source, response_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![metric.id, metric.ts, metric.source, metric.response_ms],
        )?;
        Ok(())
    }

    /// Aggregate metrics for `source` with `since_ts <= ts <= until_ts`.
    pub fn metric_stats_between(
        &self,
        source: &str,
        since_ts: &str,
        until_ts: &str,
    ) -> anyhow::Result<MetricStats> {
        let stats = self.conn.query_row(
            "SELECT COUNT(*), AVG(response_ms) FROM performance_metrics
             WHERE source = ?1 AND ts >= ?2 AND ts <= ?3",
            params![source, since_ts, until_ts],
            |row| {
                Ok(MetricStats {
                    count: row.get(0)?,
                    avg_response_ms: row.get(1)?,
                })
            },
        )?;
        Ok(stats)
    }

    // ── Recommendations ─────────────────────────────────────────────

    /// Insert a recommendation unless one with the same category is still
    /// pending. Returns whether a row was written.
    pub fn insert_recommendation_if_absent(&self, rec: &Recommendation) -> anyhow::Result<bool> {
        let n = self.conn.execute(
            "INSERT OR IGNORE INTO performance_recommendations
             (id, ts, category, title, detail, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                rec.id,
                rec.ts,
                rec.category,
                rec.title,
                rec.detail,
                rec.status.as_str()
            ],
        )?;
        Ok(n == 1)
    }

    pub fn pending_recommendations(&self) -> anyhow::Result<Vec<Recommendation>> {
        self.recommendations(Some(RecommendationStatus::Pending))
    }

    /// All recommendations (or those with `status`), oldest first.
    pub fn recommendations(
        &self,
        status: Option<RecommendationStatus>,
    ) -> anyhow::Result<Vec<Recommendation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, ts, category, title, detail, status
             FROM performance_recommendations
             WHERE ?1 IS NULL OR status = ?1
             ORDER BY ts, rowid",
        )?;
        let rows = stmt.query_map(params![status.map(|s| s.as_str())], |row| {
            let status: String = row.get(5)?;
            Ok(Recommendation {
                id: row.get(0)?,
                ts: row.get(1)?,
                category: row.get(2)?,
                title: row.get(3)?,
                detail: row.get(4)?,
                status: parse_column(5, &status)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("recommendation query failed: {e}"))
    }

    /// Move a pending recommendation to `status`. Returns false if no pending
    /// row has this id.
    pub fn set_recommendation_status(
        &self,
        id: &str,
        status: RecommendationStatus,
        ts: &str,
    ) -> anyhow::Result<bool> {
        let n = self.conn.execute(
            "UPDATE performance_recommendations SET status = ?2, resolved_at = ?3
             WHERE id = ?1 AND status = 'pending'",
            params![id, status.as_str(), ts],
        )?;
        Ok(n > 0)
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        // Merge WAL back into main DB so users see a single file when idle.
        let _ = self
            .conn
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);");
    }
}

// ── Row helpers ─────────────────────────────────────────────────────

fn parse_column<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = ParseError>,
{
    value
        .parse()
        .map_err(|e: ParseError| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn map_task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRecord> {
    let task_type: String = row.get(3)?;
    Ok(TaskRecord {
        id: row.get(0)?,
        ts: row.get(1)?,
        trace_id: row.get(2)?,
        task_type: parse_column(3, &task_type)?,
        classification: row.get(4)?,
        action: row.get(5)?,
        success: row.get(6)?,
        confidence_band: row.get(7)?,
        iterations: row.get(8)?,
        test_passed: row.get(9)?,
    })
}

fn map_execution_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExecutionRecord> {
    let source: String = row.get(2)?;
    let outcome: String = row.get(4)?;
    let steps_str: String = row.get(5)?;
    let steps = serde_json::from_str(&steps_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    Ok(ExecutionRecord {
        id: row.get(0)?,
        ts: row.get(1)?,
        outcome: ExecutionOutcome {
            source: parse_column(2, &source)?,
            task: row.get(3)?,
            outcome: parse_column(4, &outcome)?,
            steps,
            summary: row.get(6)?,
        },
    })
}
