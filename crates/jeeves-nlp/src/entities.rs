//! Regex-based extraction of structured signals from free text.
//!
//! Each category scans the whole input independently; a substring may show
//! up in several categories (e.g. a backticked file name is both a code
//! reference and a file path).

use std::sync::LazyLock;

use jeeves_core::ExtractedEntities;
use regex::Regex;

use crate::reference::PRONOUN_RE;

/// Paths or bare file names with an extension. The leading delimiter is
/// consumed so the path itself is capture group 1.
static FILE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[\s"'`(\[,;])((?:~|\.{1,2})?/?(?:[\w.-]+/)*[\w-][\w.-]*\.[A-Za-z][A-Za-z0-9]{0,7})\b"#)
        .unwrap()
});

static PROJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bproject[:\s]+["'`]?([A-Za-z0-9][\w.-]*)"#).unwrap()
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'`)\]]+"#).unwrap());

static COST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\$\s?\d+(?:,\d{3})*(?:\.\d{1,2})?|\b\d+(?:\.\d+)?\s?(?:dollars?|bucks|usd|eur|euros?|cents?)\b",
    )
    .unwrap()
});

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    let day = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";
    Regex::new(&format!(
        r"(?i)\b(?:today|tonight|tomorrow|yesterday|(?:this|next|last)\s+(?:morning|afternoon|evening|night|weekend|week|month|year|{day})|in\s+\d+\s+(?:seconds?|secs?|minutes?|mins?|hours?|hrs?|days?|weeks?|months?)|at\s+\d{{1,2}}(?::\d{{2}})?(?:\s?(?:am|pm))?|\d{{1,2}}:\d{{2}}(?:\s?(?:am|pm))?|\d{{1,2}}\s?(?:am|pm)|on\s+(?:{day}))\b"
    ))
    .unwrap()
});

/// Backtick-quoted text (group 1) or a `name()` call (group 2).
static CODE_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`([^`\n]+)`|\b([A-Za-z_][A-Za-z0-9_]*(?:::[A-Za-z_][A-Za-z0-9_]*)*)\(\)").unwrap()
});

static NEGATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:do not|does not|did not|don't|doesn't|didn't|isn't|aren't|won't|can't|cannot|shouldn't|not|never|no|without|nothing|none)\b",
    )
    .unwrap()
});

static DESTRUCTIVE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(?:delete|remove|drop|destroy|wipe|purge|truncate|erase)\b",
        r"\brm\s+-[a-zA-Z]*[rf]",
        r"(?i)\bgit\s+push\b.*(?:--force\b|\s-f\b)",
        r"(?i)\bforce[- ]push",
        r"(?i)\bgit\s+reset\s+--hard\b",
        r"(?i)\bdrop\s+(?:table|database|schema)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Structural hints that a long message is a product requirements document.
static PRD_INDICATORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?m)^#{1,3}\s+\S",
        r"(?m)^\s*[-*]\s+\S",
        r"(?m)^\s*\d+[.)]\s+\S",
        r"(?i)\b(?:requirements?|user stor(?:y|ies)|acceptance criteria)\b",
        r"(?i)\b(?:must|should|shall)\b",
        r"(?im)^\s*(?:goals?|features?|scope|overview|background|non-goals?)\s*:",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const PRD_MIN_CHARS: usize = 200;
const PRD_MIN_INDICATORS: usize = 2;

static LEADING_VERB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:please|can\s+you|could\s+you)\s+)*([A-Za-z]+)").unwrap()
});

const ACTION_VERBS: &[&str] = &[
    "add", "build", "cancel", "check", "create", "delete", "deploy", "explain", "find", "fix",
    "implement", "list", "notify", "open", "refactor", "remind", "remove", "restart", "review",
    "run", "schedule", "search", "send", "show", "start", "stop", "summarize", "test", "update",
    "write",
];

/// Extract every entity category from `text`.
pub fn extract(text: &str) -> ExtractedEntities {
    let file_paths = captures(&FILE_PATH_RE, text, 1)
        .into_iter()
        .filter(|p| !is_abbreviation(p))
        .collect();
    let projects = captures(&PROJECT_RE, text, 1);
    let urls = URL_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']).to_string())
        .collect();
    let costs = matches(&COST_RE, text);
    let time_refs = matches(&TIME_RE, text);
    let code_refs = CODE_REF_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let negations: Vec<String> = NEGATION_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect();
    let pronouns: Vec<String> = PRONOUN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect();

    ExtractedEntities {
        file_paths,
        projects,
        urls,
        costs,
        time_refs,
        code_refs,
        has_negation: !negations.is_empty(),
        has_pronouns: !pronouns.is_empty(),
        negations,
        pronouns,
    }
}

/// Whether the text asks for something irreversible (delete, force-push, ...).
pub fn is_destructive(text: &str) -> bool {
    DESTRUCTIVE_PATTERNS.iter().any(|re| re.is_match(text))
}

/// Whether the text reads like a PRD: long enough and structured.
pub fn looks_like_prd(text: &str) -> bool {
    if text.chars().count() < PRD_MIN_CHARS {
        return false;
    }
    let hits = PRD_INDICATORS.iter().filter(|re| re.is_match(text)).count();
    hits >= PRD_MIN_INDICATORS
}

/// Leading action verb, skipping a polite prefix. `None` when the first word
/// is not a known action.
pub fn action_verb(text: &str) -> Option<String> {
    let word = LEADING_VERB_RE.captures(text)?.get(1)?.as_str().to_lowercase();
    ACTION_VERBS.contains(&word.as_str()).then_some(word)
}

/// Dotted single letters such as `e.g`, `i.e` or `U.S.A`.
fn is_abbreviation(candidate: &str) -> bool {
    candidate
        .split('.')
        .all(|part| part.len() == 1 && part.chars().all(|c| c.is_ascii_alphabetic()))
}

fn matches(re: &Regex, text: &str) -> Vec<String> {
    re.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

fn captures(re: &Regex, text: &str, group: usize) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|c| c.get(group))
        .map(|m| m.as_str().to_string())
        .collect()
}
