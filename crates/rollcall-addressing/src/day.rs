//! Day bucket arithmetic.
//!
//! A "day" is a bucket of 86 400 seconds counted from the Unix epoch.
//! Buckets key the one-check-in-per-day rule: whatever wall-clock
//! timezone a participant lives in, the ledger's bucket is the one that
//! counts.

/// Seconds in one day bucket.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Day bucket for a Unix timestamp: `floor(epoch_seconds / 86400)`.
///
/// Pre-epoch timestamps clamp to bucket 0.
pub fn day_index(epoch_seconds: i64) -> u64 {
    if epoch_seconds <= 0 {
        0
    } else {
        (epoch_seconds / SECONDS_PER_DAY) as u64
    }
}

/// First second of a day bucket.
pub fn day_start(day: u64) -> i64 {
    day as i64 * SECONDS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_change_at_midnight() {
        assert_eq!(day_index(0), 0);
        assert_eq!(day_index(86_399), 0);
        assert_eq!(day_index(86_400), 1);
        assert_eq!(day_index(86_401), 1);
    }

    #[test]
    fn pre_epoch_clamps_to_zero() {
        assert_eq!(day_index(-1), 0);
        assert_eq!(day_index(i64::MIN), 0);
    }

    #[test]
    fn day_start_inverts_day_index() {
        for day in [0u64, 1, 19_000, 20_123] {
            assert_eq!(day_index(day_start(day)), day);
            assert_eq!(day_index(day_start(day) + SECONDS_PER_DAY - 1), day);
        }
    }
}
