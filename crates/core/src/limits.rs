//! Fixed limits and timing constants for the consultation core.
//!
//! # Usage Note
//!
//! Constants used at runtime: `TRIAL_DURATION_SECS`, `TRIAL_WARNING_SECS`,
//! `RING_TIMEOUT_SECS`, `TERMINAL_RETENTION_HOURS`.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so the string-length and rate caps are duplicated there. Keep both in
//! sync when modifying.

// === Trial Window ===

/// Free chat trial window per session, in seconds.
pub const TRIAL_DURATION_SECS: u64 = 60;

/// Countdown thresholds (seconds remaining) at which a warning is emitted.
pub const TRIAL_WARNING_SECS: [u32; 2] = [10, 5];

// === Call Timing ===

/// How long a session may sit in `calling`/`ringing` before the timeout
/// authority marks it missed.
pub const RING_TIMEOUT_SECS: i64 = 45;

/// Terminal sessions older than this are eligible for deletion.
pub const TERMINAL_RETENTION_HOURS: i64 = 24 * 30;

// === String Field Limits (chars) ===

/// User id max length.
pub const MAX_USER_ID_CHARS: usize = 64;

/// Display name max length.
pub const MAX_DISPLAY_NAME_CHARS: usize = 128;

/// Avatar URL max length.
pub const MAX_AVATAR_URL_CHARS: usize = 2048;

// === Billing ===

/// Per-minute rate cap, in whole currency units.
pub const MAX_RATE_PER_MINUTE: u32 = 100_000;
