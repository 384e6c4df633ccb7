use clap::Subcommand;
use jeeves_core::GamingSignal;
use jeeves_learning::Recorder;
use jeeves_ledger::{JeevesConfig, JeevesPaths};
use time::OffsetDateTime;

#[derive(Subcommand)]
pub enum AnalyzeCmd {
    /// Look for signs the scenario suite is being gamed
    Gaming {
        /// Recent runs to analyze (default: gaming_window from config)
        #[arg(long)]
        window: Option<usize>,
    },
    /// Turn recent metrics into tuning recommendations
    Optimize,
    /// Run every analysis
    All,
}

/// Analysis failures are reported, never returned: the scheduler calling
/// this must keep running.
pub fn run(cmd: AnalyzeCmd, paths: &JeevesPaths) -> anyhow::Result<()> {
    let config = JeevesConfig::load(paths);
    let recorder = match Recorder::open(paths) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("analysis skipped: {e}");
            return Ok(());
        }
    };
    match cmd {
        AnalyzeCmd::Gaming { window } => {
            gaming(&recorder, window.unwrap_or(config.gaming_window));
        }
        AnalyzeCmd::Optimize => optimize(&recorder, &config),
        AnalyzeCmd::All => {
            gaming(&recorder, config.gaming_window);
            optimize(&recorder, &config);
        }
    }
    Ok(())
}

fn gaming(recorder: &Recorder, window: usize) {
    let signals = recorder.detect_gaming_signals(window);
    tracing::info!(window, signals = signals.len(), "gaming analysis done");
    if signals.is_empty() {
        println!("gaming: nothing anomalous");
    }
    for s in &signals {
        println!("{}", format_signal(s));
    }
}

fn optimize(recorder: &Recorder, config: &JeevesConfig) {
    let created = recorder.optimize(OffsetDateTime::now_utc(), config.metrics_window_days);
    if created.is_empty() {
        println!("optimize: no new recommendations");
    }
    for rec in &created {
        println!("optimize: [{}] {} ({})", rec.category, rec.title, rec.id);
    }
}

fn format_signal(s: &GamingSignal) -> String {
    format!(
        "gaming: [{}] {}: {}",
        s.severity.as_str(),
        s.kind.as_str(),
        s.message
    )
}
