use std::sync::LazyLock;

use jeeves_core::TaskType;
use regex::Regex;

// Checked in this order; first match wins.
static REFACTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)refactor|restructur|reorganiz|clean[\s_-]?up|simplif|rename|extract[\s_-]method")
        .unwrap()
});
static REVIEW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)review|audit|inspect|analy[sz]|critique|\bcheck").unwrap()
});
static FIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfix|bug|broken|crash|repair|debug|hotfix|patch|\berror").unwrap()
});

/// Task type for a trace, from its classifier label and chosen action.
pub fn classify_task(classification: &str, action: &str) -> TaskType {
    let haystack = format!("{classification} {action}");
    if REFACTOR_RE.is_match(&haystack) {
        TaskType::Refactor
    } else if REVIEW_RE.is_match(&haystack) {
        TaskType::Review
    } else if FIX_RE.is_match(&haystack) {
        TaskType::Fix
    } else {
        TaskType::Develop
    }
}
