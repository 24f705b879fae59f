use std::time::Duration;

/// Bounded exponential backoff: `base * 2^(attempt - 1)`, capped at
/// `max_millis`. Attempt counting starts at 1.
pub fn backoff_delay(base_millis: i64, attempt: u32, max_millis: i64) -> Duration {
    let base = base_millis.max(1);
    let doublings = attempt.saturating_sub(1).min(32);
    let delay = base.saturating_mul(1_i64 << doublings).min(max_millis.max(base));
    Duration::from_millis(delay as u64)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_doubles_up_to_the_cap() {
        assert_eq!(backoff_delay(250, 1, 10_000), Duration::from_millis(250));
        assert_eq!(backoff_delay(250, 2, 10_000), Duration::from_millis(500));
        assert_eq!(backoff_delay(250, 3, 10_000), Duration::from_millis(1_000));
        assert_eq!(backoff_delay(250, 7, 10_000), Duration::from_millis(10_000));
        assert_eq!(backoff_delay(250, 63, 10_000), Duration::from_millis(10_000));
    }

    #[test]
    fn it_never_goes_below_the_base() {
        assert_eq!(backoff_delay(500, 1, 100), Duration::from_millis(500));
        assert_eq!(backoff_delay(0, 1, 100), Duration::from_millis(1));
    }
}
