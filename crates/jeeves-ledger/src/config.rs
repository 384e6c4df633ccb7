//! Runtime configuration: `.jeeves/config.json` plus `JEEVES_*` env overrides.
//!
//! Only operational knobs live here. Heuristic thresholds (match threshold,
//! analysis floors) are constants in the crates that use them.

use serde::{Deserialize, Serialize};

use crate::paths::JeevesPaths;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JeevesConfig {
    /// Minutes of inactivity after which a resolver session is stale.
    pub stale_minutes: i64,
    /// Number of most recent scenario runs the anti-gaming check reads.
    pub gaming_window: usize,
    /// Trailing window for optimizer metrics.
    pub metrics_window_days: i64,
    /// Default row count for `outcome log`.
    pub execution_log_limit: usize,
}

impl Default for JeevesConfig {
    fn default() -> Self {
        Self {
            stale_minutes: 30,
            gaming_window: 100,
            metrics_window_days: 7,
            execution_log_limit: 10,
        }
    }
}

impl JeevesConfig {
    /// Load from `config.json` and apply env overrides. A missing or
    /// unparseable file yields defaults.
    pub fn load(paths: &JeevesPaths) -> Self {
        let mut config = match std::fs::read_to_string(&paths.config_json) {
            Ok(content) => Self::from_json(&content),
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    pub fn from_json(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unparseable config.json");
            Self::default()
        })
    }

    /// Apply `JEEVES_*` overrides read through `lookup`. Unparseable and
    /// non-positive values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<i64>().ok());

        if let Some(v) = parsed("JEEVES_STALE_MINUTES").filter(|v| *v > 0) {
            self.stale_minutes = v;
        }
        if let Some(v) = parsed("JEEVES_GAMING_WINDOW").filter(|v| *v > 0) {
            self.gaming_window = v as usize;
        }
        if let Some(v) = parsed("JEEVES_METRICS_WINDOW_DAYS").filter(|v| *v > 0) {
            self.metrics_window_days = v;
        }
    }
}
