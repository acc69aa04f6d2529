/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Milliseconds in one hour
pub const HOUR_MILLIS: i64 = 3_600_000;

/// Whole hours between `now` and a future timestamp.
///
/// Floor semantics: 47.9 hours out is 47, so a 48-hour window check
/// rejects anything short of the full 48 hours. Negative when the
/// timestamp has passed.
pub fn hours_until(target_millis: i64, now: i64) -> i64 {
    (target_millis - now).div_euclid(HOUR_MILLIS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours_until_floor() {
        let now = 1_000_000_000_000;
        assert_eq!(hours_until(now + 48 * HOUR_MILLIS, now), 48);
        assert_eq!(hours_until(now + 48 * HOUR_MILLIS - 1, now), 47);
        assert_eq!(hours_until(now + HOUR_MILLIS / 2, now), 0);
    }

    #[test]
    fn test_hours_until_past_is_negative() {
        let now = 1_000_000_000_000;
        assert_eq!(hours_until(now - HOUR_MILLIS / 2, now), -1);
        assert_eq!(hours_until(now - 3 * HOUR_MILLIS, now), -3);
    }
}
