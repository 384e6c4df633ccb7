use jeeves_learning::Recorder;
use jeeves_ledger::JeevesPaths;

/// `jeeves errors [--days N]`
pub fn execute(paths: &JeevesPaths, days: i64, json: bool) -> anyhow::Result<()> {
    let recorder = Recorder::open(paths)?;
    let errors = recorder.error_frequencies(days);
    let stats = recorder.task_stats(days);

    if json {
        let tasks: Vec<serde_json::Value> = stats
            .iter()
            .map(|s| {
                serde_json::json!({
                    "task_type": s.task_type,
                    "total": s.total,
                    "succeeded": s.succeeded,
                    "avg_iterations": s.avg_iterations,
                })
            })
            .collect();
        let out = serde_json::json!({
            "days": days,
            "errors": errors.iter().map(|(t, n)| serde_json::json!({"error_type": t, "count": n})).collect::<Vec<_>>(),
            "tasks": tasks,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Errors, last {days} day(s):");
    if errors.is_empty() {
        println!("  (none)");
    }
    for (error_type, count) in &errors {
        println!("  {count:>5}  {error_type}");
    }

    println!("Tasks, last {days} day(s):");
    if stats.is_empty() {
        println!("  (none)");
    }
    for s in &stats {
        let rate = if s.total == 0 {
            0.0
        } else {
            s.succeeded as f64 * 100.0 / s.total as f64
        };
        println!(
            "  {:<9} {:>4} runs  {:>5.1}% ok  {:.1} avg iterations",
            s.task_type.as_str(),
            s.total,
            rate,
            s.avg_iterations
        );
    }
    Ok(())
}
