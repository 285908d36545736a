//! Billing math for call sessions.
//!
//! Cost is computed client-side from the reported duration and the
//! per-minute rate agreed at call creation. Partial minutes round up:
//! a 125 second call at rate 20 bills 3 minutes, cost 60.

/// Number of minutes billed for a call of the given duration.
pub fn billable_minutes(duration_secs: u32) -> u32 {
    duration_secs.div_ceil(60)
}

/// Total cost of a call: `ceil(duration / 60) * rate`.
pub fn call_cost(duration_secs: u32, rate_per_minute: u32) -> u64 {
    u64::from(billable_minutes(duration_secs)) * u64::from(rate_per_minute)
}
