//! Feedback bookkeeping: what ran, how it went, and what to tune next.
//!
//! Every public entry point on [`Recorder`] is best-effort. Store failures are
//! logged at `warn` and surface as `None`, an empty list or `false`; they
//! never reach the caller's primary operation.

pub mod anti_gaming;
pub mod classify;
pub mod optimizer;
pub mod recorder;

pub use anti_gaming::gaming_signals;
pub use classify::classify_task;
pub use optimizer::plan_recommendations;
pub use recorder::{ExecutionSummary, Recorder};
