use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// `<prefix>-<unix seconds>`. Two calls within the same second collide.
pub fn timestamp_branch_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{prefix}-{}", at.timestamp())
}

/// `<prefix>-<unix seconds>-<seq>`.
pub fn sequenced_branch_name(prefix: &str, at: DateTime<Utc>, seq: u64) -> String {
    format!("{}-{seq}", timestamp_branch_name(prefix, at))
}

/// Fresh branch name, unique within this process.
pub fn next_branch_name(prefix: &str) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    sequenced_branch_name(prefix, Utc::now(), seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_names_differ_across_seconds() {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let t1 = Utc.timestamp_opt(1_700_000_001, 0).unwrap();
        assert_eq!(timestamp_branch_name("auto-fix", t0), "auto-fix-1700000000");
        assert_ne!(timestamp_branch_name("auto-fix", t0), timestamp_branch_name("auto-fix", t1));
    }

    #[test]
    fn test_timestamp_names_collide_within_a_second() {
        let early = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let late = Utc.timestamp_opt(1_700_000_000, 999_000_000).unwrap();
        assert_eq!(
            timestamp_branch_name("auto-fix", early),
            timestamp_branch_name("auto-fix", late)
        );
    }

    #[test]
    fn test_sequence_separates_same_second() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(sequenced_branch_name("auto-fix", at, 3), "auto-fix-1700000000-3");
        assert_ne!(
            sequenced_branch_name("auto-fix", at, 0),
            sequenced_branch_name("auto-fix", at, 1)
        );
    }

    #[test]
    fn test_next_branch_name_is_unique_in_process() {
        let names: std::collections::HashSet<String> =
            (0..100).map(|_| next_branch_name("auto-fix")).collect();
        assert_eq!(names.len(), 100);
        assert!(names.iter().all(|n| n.starts_with("auto-fix-")));
    }
}
