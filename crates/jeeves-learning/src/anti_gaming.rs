//! Flags scenario-run histories that look tuned to pass rather than to test.

use std::collections::HashMap;

use jeeves_core::clock::{new_id, now_rfc3339};
use jeeves_core::{GamingSignal, ScenarioRun, Severity, SignalKind};

use crate::recorder::{best_effort, Recorder};

/// Below this many runs there is not enough history to judge.
pub const MIN_RUNS: usize = 10;
/// A perfect pass rate is only suspicious over at least this many runs.
pub const PERFECT_PASS_MIN_RUNS: usize = 20;
/// Share of all runs a single scenario may hold before it is flagged.
pub const CONCENTRATION_SHARE: f64 = 0.5;

impl Recorder {
    pub fn record_scenario_run(&self, scenario_id: &str, passed: bool) -> Option<String> {
        let run = ScenarioRun {
            id: new_id("run"),
            ts: now_rfc3339(),
            scenario_id: scenario_id.to_string(),
            passed,
        };
        best_effort("record_scenario_run", self.store().insert_scenario_run(&run)).map(|()| run.id)
    }

    /// Analyze the `window` most recent scenario runs.
    pub fn detect_gaming_signals(&self, window: usize) -> Vec<GamingSignal> {
        let runs = best_effort(
            "detect_gaming_signals",
            self.store().recent_scenario_runs(window),
        )
        .unwrap_or_default();
        gaming_signals(&runs)
    }
}

/// Signals for a set of runs. Empty when fewer than [`MIN_RUNS`].
pub fn gaming_signals(runs: &[ScenarioRun]) -> Vec<GamingSignal> {
    let total = runs.len();
    if total < MIN_RUNS {
        tracing::debug!(total, "too few scenario runs for gaming analysis");
        return Vec::new();
    }

    let passed = runs.iter().filter(|r| r.passed).count();
    let mut per_scenario: HashMap<&str, usize> = HashMap::new();
    for run in runs {
        *per_scenario.entry(run.scenario_id.as_str()).or_default() += 1;
    }

    let mut signals = Vec::new();

    if passed == total && total >= PERFECT_PASS_MIN_RUNS {
        signals.push(GamingSignal {
            kind: SignalKind::PerfectPassRate,
            severity: Severity::Medium,
            message: format!(
                "100% pass rate across {total} runs; scenario selection may be too narrow"
            ),
        });
    }

    // Deterministic pick among equal counts: lowest scenario id.
    let dominant = per_scenario
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)));
    if let Some((scenario, &count)) = dominant {
        if count as f64 / total as f64 > CONCENTRATION_SHARE {
            signals.push(GamingSignal {
                kind: SignalKind::ScenarioConcentration,
                severity: Severity::Low,
                message: format!(
                    "scenario '{scenario}' accounts for {count} of {total} runs; possible overfitting"
                ),
            });
        }
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use jeeves_ledger::JeevesPaths;

    fn runs(spec: &[(&str, bool)]) -> Vec<ScenarioRun> {
        spec.iter()
            .enumerate()
            .map(|(i, (scenario, passed))| ScenarioRun {
                id: format!("run_{i}"),
                ts: format!("2026-01-01T00:00:{i:02}.000000Z"),
                scenario_id: scenario.to_string(),
                passed: *passed,
            })
            .collect()
    }

    #[test]
    fn perfect_pass_rate_over_even_spread() {
        let names = ["a", "b", "c", "d", "e"];
        let spec: Vec<(&str, bool)> = (0..25).map(|i| (names[i % 5], true)).collect();
        let signals = gaming_signals(&runs(&spec));
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::PerfectPassRate);
        assert_eq!(signals[0].severity, Severity::Medium);
    }

    #[test]
    fn below_floor_is_silent() {
        let spec: Vec<(&str, bool)> = (0..9).map(|_| ("a", true)).collect();
        assert!(gaming_signals(&runs(&spec)).is_empty());
    }

    #[test]
    fn perfect_rate_needs_twenty_runs() {
        let names = ["a", "b", "c"];
        let spec: Vec<(&str, bool)> = (0..19).map(|i| (names[i % 3], true)).collect();
        assert!(gaming_signals(&runs(&spec)).is_empty());
    }

    #[test]
    fn concentration_is_strictly_more_than_half() {
        // exactly half: no signal
        let mut spec: Vec<(&str, bool)> = (0..5).map(|_| ("a", false)).collect();
        spec.extend((0..5).map(|_| ("b", true)));
        assert!(gaming_signals(&runs(&spec)).is_empty());

        spec.push(("a", true));
        let signals = gaming_signals(&runs(&spec));
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::ScenarioConcentration);
        assert_eq!(signals[0].severity, Severity::Low);
        assert!(signals[0].message.contains("'a'"));
    }

    #[test]
    fn both_signals_can_fire() {
        let spec: Vec<(&str, bool)> = (0..20).map(|i| (if i < 15 { "a" } else { "b" }, true)).collect();
        let kinds: Vec<SignalKind> = gaming_signals(&runs(&spec)).iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SignalKind::PerfectPassRate, SignalKind::ScenarioConcentration]
        );
    }

    #[test]
    fn detect_reads_only_the_window() {
        let tmp = tempfile::tempdir().unwrap();
        let rec = Recorder::open(&JeevesPaths::discover(tmp.path())).unwrap();
        for i in 0..25 {
            rec.record_scenario_run(["a", "b", "c", "d", "e"][i % 5], true).unwrap();
        }
        assert_eq!(rec.detect_gaming_signals(100).len(), 1);
        // 15 most recent runs: still above the floor but below 20
        assert!(rec.detect_gaming_signals(15).is_empty());
        assert!(rec.detect_gaming_signals(5).is_empty());
    }
}
