use jeeves_ledger::JeevesPaths;
use jeeves_nlp::{CommandRegistry, CommandSpec};
use serde::Deserialize;

/// Accepted `commands.json` shapes: a bare array of commands, or the
/// serialized registry `{"commands": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CommandsFile {
    List(Vec<CommandSpec>),
    Registry(CommandRegistry),
}

/// `jeeves suggest <text>`
pub fn execute(paths: &JeevesPaths, text: &str, limit: usize) -> anyhow::Result<()> {
    let registry = load_registry(paths)?;
    let suggestions = registry.suggestions(text, limit);
    if suggestions.is_empty() {
        println!("No close match.");
        return Ok(());
    }
    if let Some(hint) = registry.did_you_mean(text) {
        println!("{hint}");
    }
    for m in &suggestions {
        println!(
            "{:<20} {:>4.0}%  \"{}\"",
            m.command_id,
            m.confidence * 100.0,
            m.matched_text
        );
    }
    Ok(())
}

/// `.jeeves/commands.json` if present, else the built-in command set.
pub fn load_registry(paths: &JeevesPaths) -> anyhow::Result<CommandRegistry> {
    if !paths.commands_json.exists() {
        return Ok(CommandRegistry::builtin());
    }
    let content = std::fs::read_to_string(&paths.commands_json)?;
    Ok(match serde_json::from_str(&content)? {
        CommandsFile::List(commands) => CommandRegistry::new(commands),
        CommandsFile::Registry(registry) => registry,
    })
}
