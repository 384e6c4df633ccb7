use std::path::{Path, PathBuf};

/// All well-known paths under `.jeeves/`.
#[derive(Debug, Clone)]
pub struct JeevesPaths {
    pub root: PathBuf,
    pub jeeves_dir: PathBuf,
    pub ledger_db: PathBuf,
    pub config_json: PathBuf,
    pub commands_json: PathBuf,
}

impl JeevesPaths {
    /// Derive all paths from a base directory. Pure computation, no I/O.
    pub fn discover(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let jeeves_dir = root.join(".jeeves");
        Self {
            ledger_db: jeeves_dir.join("ledger.db"),
            config_json: jeeves_dir.join("config.json"),
            commands_json: jeeves_dir.join("commands.json"),
            jeeves_dir,
            root,
        }
    }

    /// Paths under the per-user base directory.
    pub fn home() -> Self {
        Self::discover(base_dir())
    }

    /// Create `.jeeves/`. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.jeeves_dir)?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.jeeves_dir.is_dir()
    }

    /// Walk up from `start` looking for a directory containing `.jeeves/`.
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut cur = start.to_path_buf();
        loop {
            if cur.join(".jeeves").is_dir() {
                return Some(cur);
            }
            if !cur.pop() {
                return None;
            }
        }
    }
}

/// Per-user base directory: `$JEEVES_HOME`, else the platform data dir,
/// else `~`, else the current directory.
fn base_dir() -> PathBuf {
    if let Some(home) = std::env::var_os("JEEVES_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("jeeves")
    } else if let Some(home) = dirs::home_dir() {
        home
    } else {
        PathBuf::from(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_builds_correct_paths() {
        let p = JeevesPaths::discover("/tmp/base");
        assert_eq!(p.jeeves_dir, PathBuf::from("/tmp/base/.jeeves"));
        assert_eq!(p.ledger_db, PathBuf::from("/tmp/base/.jeeves/ledger.db"));
        assert_eq!(p.config_json, PathBuf::from("/tmp/base/.jeeves/config.json"));
        assert_eq!(
            p.commands_json,
            PathBuf::from("/tmp/base/.jeeves/commands.json")
        );
    }

    #[test]
    fn ensure_layout_and_find_root() {
        let tmp = tempfile::tempdir().unwrap();
        let p = JeevesPaths::discover(tmp.path());
        assert!(!p.is_initialized());
        p.ensure_layout().unwrap();
        assert!(p.is_initialized());

        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(JeevesPaths::find_root(&nested), Some(tmp.path().to_path_buf()));
    }
}
