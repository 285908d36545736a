//! Trial timer configuration.

use serde::{Deserialize, Serialize};

use consult_core::limits::{TRIAL_DURATION_SECS, TRIAL_WARNING_SECS};

/// Free-trial timer configuration.
///
/// Defaults match production (60 second window, 1 second ticks, warnings
/// at 10 and 5 seconds remaining); tests shrink them to run sub-second
/// trials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Free window length in seconds.
    #[serde(default = "default_trial_secs")]
    pub trial_secs: u64,
    /// Ticker period in milliseconds.
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
    /// Seconds-remaining thresholds at which a warning event fires.
    #[serde(default = "default_warning_secs")]
    pub warning_secs: Vec<u32>,
}

fn default_trial_secs() -> u64 {
    TRIAL_DURATION_SECS
}

fn default_tick_millis() -> u64 {
    1000
}

fn default_warning_secs() -> Vec<u32> {
    TRIAL_WARNING_SECS.to_vec()
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            trial_secs: default_trial_secs(),
            tick_millis: default_tick_millis(),
            warning_secs: default_warning_secs(),
        }
    }
}

impl TrialConfig {
    /// Trial window as a chrono duration, for end-time stamping.
    pub fn trial_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.trial_secs as i64)
    }

    /// Ticker period as a std duration, for the interval timer.
    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_millis)
    }
}
