use std::io::Write;
use std::path::Path;

use clap::Subcommand;
use jeeves_ledger::{JeevesConfig, JeevesPaths};

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (e.g. stale_minutes)
        key: String,
        /// Config value (number/string/bool)
        value: String,
    },
    /// Get the effective value of a config key
    Get {
        /// Config key
        key: String,
    },
    /// List effective config values (file plus JEEVES_* overrides)
    List,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, paths: &JeevesPaths) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value } => set(paths, &key, &value),
        ConfigCmd::Get { key } => get(paths, &key),
        ConfigCmd::List => list(paths),
    }
}

// ── Command Implementations ──

/// Read `.jeeves/config.json` as a raw map. Missing file is an empty map.
fn read_config(path: &Path) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    if !path.exists() {
        return Ok(serde_json::Map::new());
    }
    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str(&content)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

/// Write through a uniquely named temp file in the same directory, then
/// persist over `path`.
fn write_config(
    path: &Path,
    config: &serde_json::Map<String, serde_json::Value>,
) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    std::fs::create_dir_all(parent)?;
    let json = serde_json::to_string_pretty(config)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(json.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// Parse a string value into an appropriate JSON value (bool/number/string).
fn parse_value(s: &str) -> serde_json::Value {
    match s {
        "true" => serde_json::Value::Bool(true),
        "false" => serde_json::Value::Bool(false),
        _ => {
            if let Ok(n) = s.parse::<i64>() {
                serde_json::Value::Number(n.into())
            } else if let Ok(f) = s.parse::<f64>() {
                serde_json::json!(f)
            } else {
                serde_json::Value::String(s.to_string())
            }
        }
    }
}

fn effective(paths: &JeevesPaths) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    match serde_json::to_value(JeevesConfig::load(paths))? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

/// `jeeves config set <key> <value>`
pub fn set(paths: &JeevesPaths, key: &str, value: &str) -> anyhow::Result<()> {
    if !effective(paths)?.contains_key(key) {
        anyhow::bail!("unknown config key: {key}");
    }
    paths.ensure_layout()?;
    let mut config = read_config(&paths.config_json)?;
    config.insert(key.to_string(), parse_value(value));
    if let Err(e) =
        serde_json::from_value::<JeevesConfig>(serde_json::Value::Object(config.clone()))
    {
        anyhow::bail!("invalid value for {key}: {e}");
    }
    write_config(&paths.config_json, &config)?;
    println!("{key} = {value}");
    Ok(())
}

/// Note shown when values come from defaults because `.jeeves/` is missing.
fn defaults_note(paths: &JeevesPaths) -> Option<String> {
    (!paths.is_initialized()).then(|| {
        format!(
            "(no .jeeves/ at {}, showing defaults and JEEVES_* overrides)",
            paths.root.display()
        )
    })
}

/// `jeeves config get <key>`
pub fn get(paths: &JeevesPaths, key: &str) -> anyhow::Result<()> {
    if let Some(note) = defaults_note(paths) {
        eprintln!("{note}");
    }
    match effective(paths)?.get(key) {
        Some(val) => println!("{val}"),
        None => anyhow::bail!("unknown config key: {key}"),
    }
    Ok(())
}

/// `jeeves config list`
pub fn list(paths: &JeevesPaths) -> anyhow::Result<()> {
    if let Some(note) = defaults_note(paths) {
        eprintln!("{note}");
    }
    for (k, v) in &effective(paths)? {
        println!("{k} = {v}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_types() {
        assert_eq!(parse_value("true"), serde_json::Value::Bool(true));
        assert_eq!(parse_value("42"), serde_json::json!(42));
        assert_eq!(parse_value("0.5"), serde_json::json!(0.5));
        assert_eq!(parse_value("warn"), serde_json::json!("warn"));
    }

    #[test]
    fn set_writes_and_preserves_other_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = JeevesPaths::discover(tmp.path());
        set(&paths, "execution_log_limit", "25").unwrap();
        set(&paths, "gaming_window", "50").unwrap();

        let raw = read_config(&paths.config_json).unwrap();
        assert_eq!(raw.get("execution_log_limit"), Some(&serde_json::json!(25)));
        assert_eq!(raw.get("gaming_window"), Some(&serde_json::json!(50)));
        assert_eq!(JeevesConfig::load(&paths).execution_log_limit, 25);
    }

    #[test]
    fn write_leaves_no_temp_files() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = JeevesPaths::discover(tmp.path());
        set(&paths, "stale_minutes", "45").unwrap();
        set(&paths, "stale_minutes", "50").unwrap();

        let names: Vec<String> = std::fs::read_dir(&paths.jeeves_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["config.json"]);
        let raw = read_config(&paths.config_json).unwrap();
        assert_eq!(raw.get("stale_minutes"), Some(&serde_json::json!(50)));
    }

    #[test]
    fn defaults_note_until_initialized() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = JeevesPaths::discover(tmp.path());
        assert!(defaults_note(&paths).unwrap().contains("no .jeeves/"));
        assert!(list(&paths).is_ok());
        set(&paths, "gaming_window", "50").unwrap();
        assert!(defaults_note(&paths).is_none());
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = JeevesPaths::discover(tmp.path());
        assert!(set(&paths, "nudge_cooldown", "5").is_err());
        assert!(set(&paths, "execution_log_limit", "lots").is_err());
        assert!(!paths.config_json.exists());
    }
}
