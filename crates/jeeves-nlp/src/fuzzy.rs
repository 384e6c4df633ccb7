//! "Did you mean" matching of a message against the command registry.
//!
//! Plain Levenshtein distance over chars against every example and alias.
//! The registry is small and fixed, so the exhaustive scan is fine.

use jeeves_core::FuzzyMatch;
use serde::{Deserialize, Serialize};

/// Minimum similarity for a match to be reported.
pub const MATCH_THRESHOLD: f64 = 0.6;

/// Messages shorter than this (after trimming) never match.
const MIN_MESSAGE_CHARS: usize = 2;

/// One command the assistant can dispatch, with phrases users type for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl CommandSpec {
    pub fn new(id: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            examples: Vec::new(),
            aliases: Vec::new(),
        }
    }

    pub fn examples(mut self, examples: &[&str]) -> Self {
        self.examples.extend(examples.iter().map(|s| s.to_string()));
        self
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases.extend(aliases.iter().map(|s| s.to_string()));
        self
    }

    /// Examples first, then aliases.
    fn phrases(&self) -> impl Iterator<Item = &str> {
        self.examples
            .iter()
            .chain(self.aliases.iter())
            .map(|s| s.as_str())
    }
}

/// Ordered command registry. Iteration order decides ties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandRegistry {
    pub commands: Vec<CommandSpec>,
}

impl CommandRegistry {
    pub fn new(commands: Vec<CommandSpec>) -> Self {
        Self { commands }
    }

    /// Commands understood by the assistant out of the box.
    pub fn builtin() -> Self {
        Self::new(vec![
            CommandSpec::new("list_reminders", "List upcoming reminders")
                .examples(&["show my reminders", "list reminders", "what are my reminders"])
                .aliases(&["reminders"]),
            CommandSpec::new("set_reminder", "Create a reminder")
                .examples(&["remind me to", "set a reminder", "add a reminder"]),
            CommandSpec::new("homelab_status", "Summarize homelab health")
                .examples(&["homelab status", "how is the homelab", "server status"])
                .aliases(&["status"]),
            CommandSpec::new("list_containers", "List Docker containers")
                .examples(&["list containers", "show docker containers", "docker ps"]),
            CommandSpec::new("restart_service", "Restart a container or service")
                .examples(&["restart the service", "restart container"]),
            CommandSpec::new("disk_health", "Report SMART disk health")
                .examples(&["check disk health", "smart status", "how are the disks"]),
            CommandSpec::new("grafana_dashboard", "Link or snapshot a Grafana dashboard")
                .examples(&["show grafana", "open the dashboard"])
                .aliases(&["grafana"]),
            CommandSpec::new("home_assistant", "Control Home Assistant devices")
                .examples(&["turn off the lights", "turn on the lights", "set the thermostat"]),
            CommandSpec::new("list_projects", "List known projects")
                .examples(&["list projects", "show my projects"])
                .aliases(&["projects"]),
            CommandSpec::new("open_project", "Switch the active project")
                .examples(&["open project", "switch project", "work on project"]),
            CommandSpec::new("dev_task_status", "Report the coding agent's progress")
                .examples(&["what is the agent doing", "dev task status", "show task progress"]),
            CommandSpec::new("show_timeline", "Show the activity timeline")
                .examples(&["show my timeline", "what did i do today"])
                .aliases(&["timeline"]),
            CommandSpec::new("remember", "Store a fact or preference")
                .examples(&["remember that", "note that", "save a note"]),
            CommandSpec::new("send_notification", "Push a notification")
                .examples(&["notify me", "send a notification"]),
            CommandSpec::new("help", "Describe available commands")
                .examples(&["what can you do", "show commands"])
                .aliases(&["help", "commands"]),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&CommandSpec> {
        self.commands.iter().find(|c| c.id == id)
    }

    /// Best match across all commands, or `None` below threshold.
    pub fn fuzzy_match(&self, message: &str) -> Option<FuzzyMatch> {
        fuzzy_match(self, message)
    }

    /// Best match per command above threshold, highest first.
    pub fn suggestions(&self, message: &str, limit: usize) -> Vec<FuzzyMatch> {
        let Some(query) = normalize(message) else {
            return Vec::new();
        };
        let mut out: Vec<FuzzyMatch> = self
            .commands
            .iter()
            .filter_map(|cmd| best_for_command(cmd, &query))
            .collect();
        // stable sort keeps registry order among equal scores
        out.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        out.truncate(limit);
        out
    }

    /// One-line "did you mean" prompt for the best match.
    pub fn did_you_mean(&self, message: &str) -> Option<String> {
        let m = self.fuzzy_match(message)?;
        Some(format!(
            "Did you mean \"{}\"? ({}, {:.0}% match)",
            m.matched_text,
            m.command_id,
            m.confidence * 100.0
        ))
    }
}

/// Best-scoring example/alias across the registry with similarity >= 0.6.
/// Ties go to the first phrase encountered.
pub fn fuzzy_match(registry: &CommandRegistry, message: &str) -> Option<FuzzyMatch> {
    let query = normalize(message)?;
    let mut best: Option<FuzzyMatch> = None;
    for cmd in &registry.commands {
        if let Some(m) = best_for_command(cmd, &query) {
            if best.as_ref().map_or(true, |b| m.confidence > b.confidence) {
                best = Some(m);
            }
        }
    }
    if let Some(ref m) = best {
        tracing::debug!(command = %m.command_id, confidence = m.confidence, "fuzzy match");
    }
    best
}

fn best_for_command(cmd: &CommandSpec, query: &str) -> Option<FuzzyMatch> {
    let mut best: Option<FuzzyMatch> = None;
    for phrase in cmd.phrases() {
        let score = similarity(query, &phrase.trim().to_lowercase());
        if score < MATCH_THRESHOLD {
            continue;
        }
        if best.as_ref().map_or(true, |b| score > b.confidence) {
            best = Some(FuzzyMatch {
                command_id: cmd.id.clone(),
                confidence: score,
                matched_text: phrase.to_string(),
            });
        }
    }
    best
}

fn normalize(message: &str) -> Option<String> {
    let query = message.trim().to_lowercase();
    (query.chars().count() >= MIN_MESSAGE_CHARS).then_some(query)
}

/// Levenshtein edit distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// `1 - distance / max_len`, in `[0, 1]`. Either string empty gives 0
/// (two empty strings are not considered similar).
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    (1.0 - levenshtein(a, b) as f64 / max_len as f64).clamp(0.0, 1.0)
}
