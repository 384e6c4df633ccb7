//! Performance optimizer: turns recent response-time metrics into tuning
//! recommendations. A category is proposed at most once while pending.

use jeeves_core::clock::{format_rfc3339, new_id, now_rfc3339};
use jeeves_core::{metric_source, PerformanceMetric, Recommendation, RecommendationStatus};
use jeeves_ledger::MetricStats;
use time::OffsetDateTime;

use crate::recorder::{best_effort, window_start, Recorder};

pub const MODEL_ROUTING: &str = "model_routing";
pub const CONTEXT_SIZE: &str = "context_size";

/// LLM call volume at which routing simple tasks elsewhere pays off.
pub const LLM_CALL_MIN: u64 = 20;
/// Mean message-handler latency above which context should be trimmed.
pub const SLOW_HANDLER_MS: f64 = 8000.0;

impl Recorder {
    pub fn record_metric(&self, source: &str, response_ms: u64) -> Option<String> {
        let metric = PerformanceMetric {
            id: new_id("met"),
            ts: now_rfc3339(),
            source: source.to_string(),
            response_ms,
        };
        best_effort("record_metric", self.store().insert_metric(&metric)).map(|()| metric.id)
    }

    /// Analyze the `window_days` up to and including `now` and store any
    /// new recommendations. Returns only the rows written by this call.
    pub fn optimize(&self, now: OffsetDateTime, window_days: i64) -> Vec<Recommendation> {
        let since = window_start(now, window_days);
        let until = format_rfc3339(now);
        let stats = |source: &str| {
            best_effort(
                "optimize",
                self.store().metric_stats_between(source, &since, &until),
            )
        };
        let (Some(llm), Some(handler)) = (
            stats(metric_source::LLM_CALL),
            stats(metric_source::MESSAGE_HANDLER),
        ) else {
            return Vec::new();
        };

        let mut created = Vec::new();
        for rec in plan_recommendations(llm, handler, &until) {
            match best_effort(
                "optimize",
                self.store().insert_recommendation_if_absent(&rec),
            ) {
                Some(true) => {
                    tracing::info!(category = %rec.category, id = %rec.id, "new recommendation");
                    created.push(rec);
                }
                Some(false) => {
                    tracing::debug!(category = %rec.category, "recommendation already pending");
                }
                None => {}
            }
        }
        created
    }

    pub fn pending_recommendations(&self) -> Vec<Recommendation> {
        best_effort(
            "pending_recommendations",
            self.store().pending_recommendations(),
        )
        .unwrap_or_default()
    }

    /// Close a pending recommendation as resolved or dismissed. Returns
    /// false for unknown ids, already-closed rows, or `Pending`.
    pub fn resolve_recommendation(&self, id: &str, status: RecommendationStatus) -> bool {
        if status == RecommendationStatus::Pending {
            return false;
        }
        best_effort(
            "resolve_recommendation",
            self.store()
                .set_recommendation_status(id, status, &now_rfc3339()),
        )
        .unwrap_or(false)
    }
}

/// Recommendations warranted by the given metric aggregates, stamped `ts`.
pub fn plan_recommendations(
    llm: MetricStats,
    handler: MetricStats,
    ts: &str,
) -> Vec<Recommendation> {
    let mut out = Vec::new();
    let pending = |category: &str, title: &str, detail: String| Recommendation {
        id: new_id("rec"),
        ts: ts.to_string(),
        category: category.to_string(),
        title: title.to_string(),
        detail,
        status: RecommendationStatus::Pending,
    };

    if llm.count >= LLM_CALL_MIN {
        out.push(pending(
            MODEL_ROUTING,
            "Route simple tasks to a faster model",
            format!(
                "{} LLM calls in the window; send classification and short replies to a cheaper model",
                llm.count
            ),
        ));
    }

    if let Some(avg) = handler.avg_response_ms.filter(|avg| *avg > SLOW_HANDLER_MS) {
        out.push(pending(
            CONTEXT_SIZE,
            "Trim conversation context",
            format!(
                "message handler averages {avg:.0} ms over {} messages; reduce history and memory injected per prompt",
                handler.count
            ),
        ));
    }

    out
}
