use serde::{Deserialize, Serialize};

use super::env_or;

fn d_tick_interval_sec() -> f64 {
    1.5
}

fn d_silence_threshold_sec() -> f64 {
    8.0
}

fn d_min_proactive_interval_sec() -> f64 {
    30.0
}

/// Idle/Proactive Scheduler timing (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How often the scheduler wakes up to re-check its conditions.
    #[serde(default = "d_tick_interval_sec")]
    pub tick_interval_sec: f64,
    /// Minimum time since either party last spoke before a proactive check
    /// is considered.
    #[serde(default = "d_silence_threshold_sec")]
    pub silence_threshold_sec: f64,
    /// Minimum time between two proactive checks for the same session.
    #[serde(default = "d_min_proactive_interval_sec")]
    pub min_proactive_interval_sec: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_sec: d_tick_interval_sec(),
            silence_threshold_sec: d_silence_threshold_sec(),
            min_proactive_interval_sec: d_min_proactive_interval_sec(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            tick_interval_sec: env_or("SCHEDULER_TICK_SEC", d_tick_interval_sec()),
            silence_threshold_sec: env_or("SILENCE_THRESHOLD_SEC", d_silence_threshold_sec()),
            min_proactive_interval_sec: env_or(
                "MIN_PROACTIVE_INTERVAL_SEC",
                d_min_proactive_interval_sec(),
            ),
        }
    }
}
