use clap::Subcommand;
use jeeves_core::RecommendationStatus;
use jeeves_learning::Recorder;
use jeeves_ledger::JeevesPaths;

#[derive(Subcommand)]
pub enum RecommendationsCmd {
    /// List pending recommendations
    List {
        #[arg(long)]
        json: bool,
    },
    /// Mark a recommendation as acted upon
    Resolve { id: String },
    /// Dismiss a recommendation without acting on it
    Dismiss { id: String },
}

pub fn run(cmd: RecommendationsCmd, paths: &JeevesPaths) -> anyhow::Result<()> {
    let recorder = Recorder::open(paths)?;
    match cmd {
        RecommendationsCmd::List { json } => {
            let pending = recorder.pending_recommendations();
            if json {
                println!("{}", serde_json::to_string_pretty(&pending)?);
            } else if pending.is_empty() {
                println!("No pending recommendations.");
            } else {
                for rec in &pending {
                    println!("{}  [{}] {}", rec.id, rec.category, rec.title);
                    if !rec.detail.is_empty() {
                        println!("    {}", rec.detail);
                    }
                }
            }
            Ok(())
        }
        RecommendationsCmd::Resolve { id } => close(&recorder, &id, RecommendationStatus::Resolved),
        RecommendationsCmd::Dismiss { id } => {
            close(&recorder, &id, RecommendationStatus::Dismissed)
        }
    }
}

fn close(recorder: &Recorder, id: &str, status: RecommendationStatus) -> anyhow::Result<()> {
    if !recorder.resolve_recommendation(id, status) {
        anyhow::bail!("no pending recommendation with id {id}");
    }
    println!("{id} {}", status.as_str());
    Ok(())
}
