use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

// ── Entities ──

/// Structured signals pulled out of one message. Every list is always
/// present; order follows a left-to-right scan of the text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub file_paths: Vec<String>,
    pub projects: Vec<String>,
    pub urls: Vec<String>,
    pub costs: Vec<String>,
    pub time_refs: Vec<String>,
    pub code_refs: Vec<String>,
    pub negations: Vec<String>,
    pub pronouns: Vec<String>,
    pub has_negation: bool,
    pub has_pronouns: bool,
}

// ── Referents ──

/// Category of thing a pronoun can stand for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentKind {
    File,
    Project,
    Task,
    Error,
    Component,
    Url,
}

/// Most recently mentioned referent per category for one conversation.
/// A field is either `None` or a non-empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMentioned {
    pub file: Option<String>,
    pub project: Option<String>,
    pub task: Option<String>,
    pub error: Option<String>,
    pub component: Option<String>,
    pub url: Option<String>,
}

impl LastMentioned {
    pub fn get(&self, kind: ReferentKind) -> Option<&str> {
        match kind {
            ReferentKind::File => self.file.as_deref(),
            ReferentKind::Project => self.project.as_deref(),
            ReferentKind::Task => self.task.as_deref(),
            ReferentKind::Error => self.error.as_deref(),
            ReferentKind::Component => self.component.as_deref(),
            ReferentKind::Url => self.url.as_deref(),
        }
    }

    /// Set a referent. Blank values are ignored; returns whether anything changed.
    pub fn set(&mut self, kind: ReferentKind, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        let slot = match kind {
            ReferentKind::File => &mut self.file,
            ReferentKind::Project => &mut self.project,
            ReferentKind::Task => &mut self.task,
            ReferentKind::Error => &mut self.error,
            ReferentKind::Component => &mut self.component,
            ReferentKind::Url => &mut self.url,
        };
        *slot = Some(value.to_string());
        true
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ── Fuzzy matching ──

/// Best "did you mean" candidate for a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyMatch {
    pub command_id: String,
    /// Similarity in `[0, 1]`.
    pub confidence: f64,
    /// The example or alias phrase that matched.
    pub matched_text: String,
}

// ── Reasoning traces ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Develop,
    Review,
    Fix,
    Refactor,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::Develop,
        TaskType::Review,
        TaskType::Fix,
        TaskType::Refactor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Develop => "develop",
            TaskType::Review => "review",
            TaskType::Fix => "fix",
            TaskType::Refactor => "refactor",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "develop" => Ok(TaskType::Develop),
            "review" => Ok(TaskType::Review),
            "fix" => Ok(TaskType::Fix),
            "refactor" => Ok(TaskType::Refactor),
            other => Err(ParseError::TaskType(other.to_string())),
        }
    }
}

/// One reasoning/task cycle as reported by the task orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub trace_id: String,
    /// Classifier label for the incoming request (e.g. "code_refactor").
    pub classification: String,
    /// Handler/action chosen for the request.
    pub action: String,
    pub success: bool,
    /// Classifier confidence in `[0, 1]`.
    pub confidence: f64,
    #[serde(default)]
    pub iterations: u32,
}

impl Trace {
    /// Confidence rescaled to the stored 1..=10 band.
    pub fn confidence_band(&self) -> u8 {
        let conf = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        ((conf * 10.0).round() as u8).clamp(1, 10)
    }
}

/// A persisted reasoning task row. Immutable except for `test_passed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub ts: String,
    pub trace_id: String,
    pub task_type: TaskType,
    pub classification: String,
    pub action: String,
    pub success: bool,
    pub confidence_band: u8,
    pub iterations: u32,
    pub test_passed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorOccurrence {
    pub id: String,
    pub ts: String,
    pub error_type: String,
    pub learning_id: Option<String>,
}

// ── Execution log ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Partial,
    Failed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Partial => "partial",
            Outcome::Failed => "failed",
        }
    }

    /// Derive an overall outcome from step results: all ok → success,
    /// none ok → failed, otherwise partial. No steps counts as failed.
    pub fn from_steps(steps: &[ExecutionStep]) -> Self {
        let ok = steps.iter().filter(|s| s.success).count();
        if steps.is_empty() || ok == 0 {
            Outcome::Failed
        } else if ok == steps.len() {
            Outcome::Success
        } else {
            Outcome::Partial
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Outcome::Success),
            "partial" => Ok(Outcome::Partial),
            "failed" => Ok(Outcome::Failed),
            other => Err(ParseError::Outcome(other.to_string())),
        }
    }
}

/// Which orchestrator produced an execution log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionSource {
    Plan,
    DevTask,
}

impl ExecutionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionSource::Plan => "plan",
            ExecutionSource::DevTask => "dev_task",
        }
    }
}

impl FromStr for ExecutionSource {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plan" => Ok(ExecutionSource::Plan),
            "dev_task" => Ok(ExecutionSource::DevTask),
            other => Err(ParseError::Source(other.to_string())),
        }
    }
}

/// One command run as part of a plan or dev task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Captured output snippet (truncated before storage).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Input to the execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub source: ExecutionSource,
    pub task: String,
    pub steps: Vec<ExecutionStep>,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// A persisted execution log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: String,
    pub ts: String,
    #[serde(flatten)]
    pub outcome: ExecutionOutcome,
}

// ── Scenario runs and metrics ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioRun {
    pub id: String,
    pub ts: String,
    pub scenario_id: String,
    pub passed: bool,
}

/// Well-known metric sources.
pub mod metric_source {
    pub const LLM_CALL: &str = "llm_call";
    pub const MESSAGE_HANDLER: &str = "message_handler";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub id: String,
    pub ts: String,
    pub source: String,
    pub response_ms: u64,
}

// ── Analysis output ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl FromStr for Severity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(ParseError::Severity(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Every recent run passed: the scenario set may be too narrow.
    PerfectPassRate,
    /// One scenario dominates the recent runs.
    ScenarioConcentration,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::PerfectPassRate => "perfect_pass_rate",
            SignalKind::ScenarioConcentration => "scenario_concentration",
        }
    }
}

impl FromStr for SignalKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "perfect_pass_rate" => Ok(SignalKind::PerfectPassRate),
            "scenario_concentration" => Ok(SignalKind::ScenarioConcentration),
            other => Err(ParseError::SignalKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamingSignal {
    pub kind: SignalKind,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Pending,
    Resolved,
    Dismissed,
}

impl RecommendationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RecommendationStatus::Pending => "pending",
            RecommendationStatus::Resolved => "resolved",
            RecommendationStatus::Dismissed => "dismissed",
        }
    }
}

impl FromStr for RecommendationStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RecommendationStatus::Pending),
            "resolved" => Ok(RecommendationStatus::Resolved),
            "dismissed" => Ok(RecommendationStatus::Dismissed),
            other => Err(ParseError::RecommendationStatus(other.to_string())),
        }
    }
}

/// A tuning suggestion emitted by the optimizer. `category` is the dedup key
/// while the recommendation is pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub ts: String,
    pub category: String,
    pub title: String,
    pub detail: String,
    pub status: RecommendationStatus,
}
