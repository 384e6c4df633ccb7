//! Timestamp and id helpers shared by every crate.
//!
//! All persisted timestamps are RFC 3339 UTC strings with a fixed
//! microsecond fraction, so lexical order matches chronological order.

use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};

const SECONDS_PER_DAY: i64 = 86_400;

/// Current UTC time formatted as RFC 3339.
pub fn now_rfc3339() -> String {
    format_rfc3339(OffsetDateTime::now_utc())
}

/// Format a timestamp as `YYYY-MM-DDTHH:MM:SS.ffffffZ` in UTC.
pub fn format_rfc3339(ts: OffsetDateTime) -> String {
    ts.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
        ))
        .unwrap_or_default()
}

/// `now` minus `days` whole days, or `None` when that falls outside the
/// representable range.
pub fn days_before(now: OffsetDateTime, days: i64) -> Option<OffsetDateTime> {
    let secs = days.checked_mul(SECONDS_PER_DAY)?;
    now.checked_sub(Duration::seconds(secs))
}

/// New row id: `<prefix>_<ulid>` (e.g. `task_01jk...`).
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", ulid::Ulid::new().to_string().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn format_is_fixed_width_utc() {
        let ts = datetime!(2026-03-01 10:00:00.5 +02:00);
        assert_eq!(format_rfc3339(ts), "2026-03-01T08:00:00.500000Z");
        let whole = datetime!(2026-03-01 08:00:00 UTC);
        assert_eq!(format_rfc3339(whole), "2026-03-01T08:00:00.000000Z");
        assert!(format_rfc3339(whole) < format_rfc3339(ts));
    }

    #[test]
    fn now_has_fixed_width() {
        let s = now_rfc3339();
        assert_eq!(s.len(), "2026-03-01T08:00:00.000000Z".len());
        assert!(s.ends_with('Z'));
    }

    #[test]
    fn days_before_subtracts_whole_days() {
        let now = datetime!(2026-03-08 12:00:00 UTC);
        assert_eq!(days_before(now, 7), Some(datetime!(2026-03-01 12:00:00 UTC)));
        assert_eq!(days_before(now, 0), Some(now));
    }

    #[test]
    fn days_before_out_of_range_is_none() {
        let now = datetime!(2026-03-08 12:00:00 UTC);
        assert_eq!(days_before(now, 10_000_000), None);
        assert_eq!(days_before(now, i64::MAX), None);
        assert_eq!(days_before(now, i64::MIN), None);
    }

    #[test]
    fn ids_are_prefixed_and_unique() {
        let a = new_id("task");
        let b = new_id("task");
        assert!(a.starts_with("task_"));
        assert_eq!(a.len(), "task_".len() + 26);
        assert_ne!(a, b);
    }
}
