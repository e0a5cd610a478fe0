//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Calculate exponential backoff delay with jitter.
///
/// `attempt` is 1-based: attempt 1 waits `base`, attempt 2 waits `2 * base`,
/// and so on, capped at `max`. Up to 10% jitter is added on top.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let base_ms = base.as_millis() as u64;
    let max_ms = max.as_millis() as u64;

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let base = Duration::from_secs(30);
        let max = Duration::from_secs(900);

        let b1 = calculate_backoff(1, base, max);
        assert!(b1 >= Duration::from_secs(30) && b1 < Duration::from_secs(33));

        let b2 = calculate_backoff(2, base, max);
        assert!(b2 >= Duration::from_secs(60));

        let capped = calculate_backoff(20, base, max);
        assert!(capped >= max && capped < Duration::from_secs(990));
    }

    #[test]
    fn test_zero_base_is_immediate() {
        assert_eq!(calculate_backoff(3, Duration::ZERO, Duration::ZERO), Duration::ZERO);
        assert_eq!(calculate_backoff(0, Duration::from_secs(1), Duration::from_secs(5)), Duration::ZERO);
    }
}
