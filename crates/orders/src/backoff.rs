//! Retry backoff schedule for the optimistic strategy.

use std::time::Duration;

/// Largest doubling applied to the base delay, bounding the schedule no
/// matter how high `max_attempts` is configured.
const MAX_SHIFT: u32 = 10;

/// Delay before retry number `attempt` (1-based count of failed attempts so
/// far): `base * 2^attempt`, capped at `base * 2^MAX_SHIFT`. No jitter; the
/// schedule is deterministic.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(MAX_SHIFT))
}
