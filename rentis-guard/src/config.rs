use serde::{Deserialize, Serialize};

/// Abuse-guard thresholds. All integers, all overridable via environment
/// (the config loader maps `RENTIS__GUARD__RATE_LIMIT_MAX` etc. onto these
/// fields); defaults here are the production baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max: u32,
    #[serde(default = "default_rate_limit_window_sec")]
    pub rate_limit_window_sec: u64,
    #[serde(default = "default_identical_payload_max")]
    pub abuse_identical_payload_max: u32,
    #[serde(default = "default_failed_attempts_max")]
    pub abuse_failed_attempts_max: u32,
    #[serde(default = "default_abuse_window_sec")]
    pub abuse_window_sec: u64,
    #[serde(default = "default_auto_ban_duration_sec")]
    pub auto_ban_duration_sec: u64,
}

fn default_rate_limit_max() -> u32 {
    10
}
fn default_rate_limit_window_sec() -> u64 {
    60
}
fn default_identical_payload_max() -> u32 {
    3
}
fn default_failed_attempts_max() -> u32 {
    5
}
fn default_abuse_window_sec() -> u64 {
    600
}
fn default_auto_ban_duration_sec() -> u64 {
    24 * 60 * 60
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            rate_limit_max: default_rate_limit_max(),
            rate_limit_window_sec: default_rate_limit_window_sec(),
            abuse_identical_payload_max: default_identical_payload_max(),
            abuse_failed_attempts_max: default_failed_attempts_max(),
            abuse_window_sec: default_abuse_window_sec(),
            auto_ban_duration_sec: default_auto_ban_duration_sec(),
        }
    }
}
