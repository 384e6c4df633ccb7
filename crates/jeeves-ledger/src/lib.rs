pub mod config;
pub mod paths;
pub mod sqlite_store;

pub use config::JeevesConfig;
pub use paths::JeevesPaths;
pub use sqlite_store::{MetricStats, SqliteStore, TaskTypeStats};
