//! Background authority workers for the consultation core.
//!
//! The clients coordinate best-effort; these workers are the server-side
//! authorities that clean up after them:
//! - Missed-call timeout (unanswered calls eventually go `missed`)
//! - Trial sweep (expired trials get disabled even if every client ticker died)
//! - Retention (old terminal sessions are deleted)

pub mod missed_call;
pub mod retention;
pub mod scheduler;
pub mod trial_sweep;

pub use missed_call::MissedCallWorker;
pub use retention::RetentionWorker;
pub use scheduler::{WorkerConfig, WorkerScheduler};
pub use trial_sweep::TrialSweepWorker;
