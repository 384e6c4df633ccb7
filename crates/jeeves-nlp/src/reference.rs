//! Per-conversation pronoun resolution.
//!
//! Tracks the last referent seen per category (file, project, task, ...) and
//! substitutes pronoun phrases in later messages with those referents.

use std::collections::HashMap;
use std::sync::LazyLock;

use jeeves_core::{ExtractedEntities, LastMentioned, ReferentKind};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use ReferentKind::*;

/// Default inactivity window after which a session's referents are stale.
pub const DEFAULT_STALE_MINUTES: i64 = 30;

/// Pronoun vocabulary in resolution order, each with the referent categories
/// tried in priority order.
pub const PRONOUNS: &[(&str, &[ReferentKind])] = &[
    ("it", &[File, Task, Component]),
    ("this", &[File, Task, Component]),
    ("that", &[File, Error, Task]),
    ("the file", &[File]),
    ("the project", &[Project]),
    ("the error", &[Error]),
    ("the component", &[Component]),
    ("the task", &[Task]),
    ("the url", &[Url]),
    ("the link", &[Url]),
];

/// Any vocabulary phrase, case-insensitive, on word boundaries.
pub(crate) static PRONOUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = PRONOUNS
        .iter()
        .map(|(phrase, _)| regex::escape(phrase))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).unwrap()
});

static FILE_EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[A-Za-z0-9]{1,10}$").unwrap());

/// Sparse result of parsing one message, fed back into the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFields {
    pub resolved_path: Option<String>,
    pub target: Option<String>,
    pub category: Option<String>,
    pub action: Option<String>,
    pub error: Option<String>,
    pub url: Option<String>,
    pub component: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PronounResolution {
    pub pronoun: String,
    pub resolved_to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub original: String,
    pub resolved: String,
    pub had_pronouns: bool,
    pub resolutions: Vec<PronounResolution>,
}

/// Referent memory for one conversation session.
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    state: LastMentioned,
    last_updated: OffsetDateTime,
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self {
            state: LastMentioned::default(),
            last_updated: OffsetDateTime::now_utc(),
        }
    }

    /// Record referents from a parsed message. Rules apply independently,
    /// so one call may set several fields.
    pub fn update(&mut self, fields: &UpdateFields) {
        let target = non_blank(&fields.target);

        if let Some(path) = non_blank(&fields.resolved_path) {
            self.state.set(File, path);
        } else if let Some(t) = target.filter(|t| looks_like_file(t)) {
            self.state.set(File, t);
        }

        if let Some(t) = target {
            if fields.action.as_deref() == Some("open_project") {
                self.state.set(Project, t);
            }
            if fields.category.as_deref() == Some("prd") {
                self.state.set(Task, t);
            }
        }

        if let Some(err) = non_blank(&fields.error) {
            self.state.set(Error, err);
        }
        if let Some(url) = non_blank(&fields.url) {
            self.state.set(Url, url);
        }
        if let Some(component) = non_blank(&fields.component) {
            self.state.set(Component, component);
        }

        self.touch();
    }

    /// Remember the first file, URL and project seen in extracted entities.
    pub fn observe(&mut self, entities: &ExtractedEntities) {
        let mut changed = false;
        if let Some(f) = entities.file_paths.first() {
            changed |= self.state.set(File, f);
        }
        if let Some(u) = entities.urls.first() {
            changed |= self.state.set(Url, u);
        }
        if let Some(p) = entities.projects.first() {
            changed |= self.state.set(Project, p);
        }
        if changed {
            self.touch();
        }
    }

    /// Substitute every resolvable pronoun in `message`.
    ///
    /// All pronouns are replaced in a single pass, so referent text is never
    /// re-scanned for pronouns.
    pub fn resolve(&self, message: &str) -> Resolution {
        let found = found_pronouns(message);
        let mut resolutions = Vec::new();
        let mut substitutions: HashMap<&str, &str> = HashMap::new();

        for (phrase, _) in PRONOUNS.iter().filter(|(p, _)| found.contains(p)) {
            if let Some(referent) = self.get_resolution(phrase) {
                substitutions.insert(phrase, referent);
                resolutions.push(PronounResolution {
                    pronoun: phrase.to_string(),
                    resolved_to: referent.to_string(),
                });
            }
        }

        let resolved = if substitutions.is_empty() {
            message.to_string()
        } else {
            PRONOUN_RE
                .replace_all(message, |caps: &Captures| {
                    let matched = &caps[0];
                    substitutions
                        .get(matched.to_lowercase().as_str())
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| matched.to_string())
                })
                .into_owned()
        };

        if !resolutions.is_empty() {
            tracing::debug!(count = resolutions.len(), "resolved pronouns");
        }

        Resolution {
            original: message.to_string(),
            resolved,
            had_pronouns: !found.is_empty(),
            resolutions,
        }
    }

    /// Referent a pronoun would resolve to right now. Unknown phrases yield `None`.
    pub fn get_resolution(&self, pronoun: &str) -> Option<&str> {
        let key = pronoun.trim().to_lowercase();
        let (_, kinds) = PRONOUNS.iter().find(|(p, _)| *p == key)?;
        kinds.iter().find_map(|k| self.state.get(*k))
    }

    pub fn has_pronouns(&self, message: &str) -> bool {
        PRONOUN_RE.is_match(message)
    }

    /// Pronouns present in `message` that have no referent, in vocabulary order.
    pub fn unresolved_pronouns(&self, message: &str) -> Vec<String> {
        let found = found_pronouns(message);
        PRONOUNS
            .iter()
            .filter(|(p, _)| found.contains(p))
            .filter(|(p, _)| self.get_resolution(p).is_none())
            .map(|(p, _)| p.to_string())
            .collect()
    }

    /// Snapshot of the current referents.
    pub fn state(&self) -> LastMentioned {
        self.state.clone()
    }

    pub fn clear(&mut self) {
        self.state = LastMentioned::default();
        self.touch();
    }

    pub fn last_updated(&self) -> OffsetDateTime {
        self.last_updated
    }

    /// True when more than `threshold_minutes` have passed since the last
    /// `update`/`clear`. Staleness never clears state by itself.
    pub fn is_stale(&self, threshold_minutes: i64) -> bool {
        self.is_stale_at(OffsetDateTime::now_utc(), threshold_minutes)
    }

    pub fn is_stale_at(&self, now: OffsetDateTime, threshold_minutes: i64) -> bool {
        match threshold_minutes.checked_mul(60) {
            Some(secs) => now - self.last_updated > Duration::seconds(secs),
            // threshold past the Duration range
            None => threshold_minutes < 0,
        }
    }

    fn touch(&mut self) {
        self.last_updated = OffsetDateTime::now_utc();
    }
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn looks_like_file(target: &str) -> bool {
    FILE_EXTENSION_RE.is_match(target)
}

/// Distinct vocabulary phrases occurring in `message`.
fn found_pronouns(message: &str) -> Vec<&'static str> {
    let mut found = Vec::new();
    for m in PRONOUN_RE.find_iter(message) {
        let lower = m.as_str().to_lowercase();
        if let Some((phrase, _)) = PRONOUNS.iter().find(|(p, _)| *p == lower) {
            if !found.contains(phrase) {
                found.push(*phrase);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_file(file: &str) -> ReferenceResolver {
        let mut r = ReferenceResolver::new();
        r.update(&UpdateFields {
            resolved_path: Some(file.into()),
            ..Default::default()
        });
        r
    }

    #[test]
    fn no_pronouns_leaves_message_untouched() {
        let r = with_file("app.ts");
        let res = r.resolve("show my reminders");
        assert_eq!(res.resolved, res.original);
        assert!(!res.had_pronouns);
        assert!(res.resolutions.is_empty());
    }

    #[test]
    fn fix_it_resolves_to_last_file() {
        let r = with_file("app.ts");
        let res = r.resolve("fix it");
        assert_eq!(res.resolved, "fix app.ts");
        assert!(res.had_pronouns);
        assert_eq!(
            res.resolutions,
            vec![PronounResolution {
                pronoun: "it".into(),
                resolved_to: "app.ts".into()
            }]
        );
    }

    #[test]
    fn replaces_every_case_insensitive_occurrence() {
        let r = with_file("app.ts");
        let res = r.resolve("Open IT, test it, then commit It");
        assert_eq!(res.resolved, "Open app.ts, test app.ts, then commit app.ts");
        assert_eq!(res.resolutions.len(), 1);
    }

    #[test]
    fn word_boundaries_respected() {
        let r = with_file("app.ts");
        let res = r.resolve("edit item");
        assert_eq!(res.resolved, "edit item");
        assert!(!res.had_pronouns);
    }

    #[test]
    fn unresolvable_pronoun_kept_and_omitted() {
        let r = with_file("app.ts");
        let res = r.resolve("open the link and fix it");
        assert_eq!(res.resolved, "open the link and fix app.ts");
        assert!(res.had_pronouns);
        assert_eq!(res.resolutions.len(), 1);
        assert_eq!(r.unresolved_pronouns("open the link and fix it"), vec!["the link"]);
    }

    #[test]
    fn priority_order_per_pronoun() {
        let mut r = ReferenceResolver::new();
        r.update(&UpdateFields {
            target: Some("Reminder sync PRD".into()),
            category: Some("prd".into()),
            error: Some("ECONNREFUSED".into()),
            ..Default::default()
        });
        // no file yet: "it" falls through to task, "that" to error
        assert_eq!(r.get_resolution("it"), Some("Reminder sync PRD"));
        assert_eq!(r.get_resolution("that"), Some("ECONNREFUSED"));
        assert_eq!(r.get_resolution("The Error"), Some("ECONNREFUSED"));
        assert_eq!(r.get_resolution("the url"), None);
        assert_eq!(r.get_resolution("whatever"), None);
    }

    #[test]
    fn multiple_pronouns_resolved_independently() {
        let mut r = with_file("main.rs");
        r.update(&UpdateFields {
            target: Some("jeeves".into()),
            action: Some("open_project".into()),
            url: Some("https://grafana.local".into()),
            ..Default::default()
        });
        let res = r.resolve("build the project and post the url, then fix this");
        assert_eq!(
            res.resolved,
            "build jeeves and post https://grafana.local, then fix main.rs"
        );
        let pronouns: Vec<_> = res.resolutions.iter().map(|p| p.pronoun.as_str()).collect();
        assert_eq!(pronouns, vec!["this", "the project", "the url"]);
    }

    #[test]
    fn substituted_text_not_rescanned() {
        let mut r = ReferenceResolver::new();
        r.update(&UpdateFields {
            resolved_path: Some("notes on this.md".into()),
            ..Default::default()
        });
        let res = r.resolve("open it");
        assert_eq!(res.resolved, "open notes on this.md");
    }

    #[test]
    fn update_rules() {
        let mut r = ReferenceResolver::new();
        // target with extension counts as a file
        r.update(&UpdateFields {
            target: Some("docker-compose.yml".into()),
            ..Default::default()
        });
        assert_eq!(r.state().file.as_deref(), Some("docker-compose.yml"));

        // resolved path wins over target
        r.update(&UpdateFields {
            resolved_path: Some("/srv/app/main.py".into()),
            target: Some("other.py".into()),
            ..Default::default()
        });
        assert_eq!(r.state().file.as_deref(), Some("/srv/app/main.py"));

        // extensionless target without a matching action changes nothing
        r.update(&UpdateFields {
            target: Some("homelab".into()),
            ..Default::default()
        });
        let s = r.state();
        assert_eq!(s.file.as_deref(), Some("/srv/app/main.py"));
        assert!(s.project.is_none());
        assert!(s.task.is_none());

        // blank strings never become referents
        r.update(&UpdateFields {
            error: Some("  ".into()),
            ..Default::default()
        });
        assert!(r.state().error.is_none());
    }

    #[test]
    fn observe_entities() {
        let mut r = ReferenceResolver::new();
        r.observe(&crate::entities::extract(
            "see https://x.com and project homelab, file src/lib.rs",
        ));
        let s = r.state();
        assert_eq!(s.url.as_deref(), Some("https://x.com"));
        assert_eq!(s.project.as_deref(), Some("homelab"));
        assert_eq!(s.file.as_deref(), Some("src/lib.rs"));
    }

    #[test]
    fn abbreviation_does_not_become_the_file() {
        let mut r = ReferenceResolver::new();
        r.observe(&crate::entities::extract("restart the stack, e.g. plex and sonarr"));
        assert!(r.state().file.is_none());
        assert_eq!(r.resolve("fix it").resolved, "fix it");
    }

    #[test]
    fn clear_resets_everything() {
        let mut r = with_file("app.ts");
        r.clear();
        assert_eq!(r.state(), LastMentioned::default());
        assert!(r.resolve("fix it").resolutions.is_empty());
    }

    #[test]
    fn staleness_threshold_is_strict() {
        let r = with_file("app.ts");
        let t = r.last_updated();
        assert!(!r.is_stale_at(t + Duration::minutes(30), 30));
        assert!(r.is_stale_at(t + Duration::minutes(31), 30));
        assert!(!r.is_stale_at(t + Duration::days(365), i64::MAX));
        assert!(!r.is_stale(DEFAULT_STALE_MINUTES));
    }

    #[test]
    fn has_pronouns_detects_vocabulary() {
        let r = ReferenceResolver::new();
        assert!(r.has_pronouns("what about The Component?"));
        assert!(!r.has_pronouns("list containers"));
    }
}
