//! Process-level renewal configuration.
//!
//! Thresholds, sweep interval and the default listing window are constants
//! of the running process, not per-request input. Loaded from
//! `{data_dir}/renewals/reminders.json`; any missing field takes its default.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{reminder_policy::ReminderPolicy, sweep::DEFAULT_SWEEP_INTERVAL};

pub const DEFAULT_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewalConfig {
    pub sweep_interval_secs: u64,
    /// Strictly descending day-thresholds; validated on load.
    pub thresholds: ReminderPolicy,
    /// Window for `GET /renewals/expiring` when `days` is absent or invalid.
    pub default_window_days: u32,
    pub sweep_enabled: bool,
    /// Bearer token required by the staff routes. `None` leaves them open.
    pub staff_token: Option<String>,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL.as_secs(),
            thresholds: ReminderPolicy::default(),
            default_window_days: DEFAULT_WINDOW_DAYS,
            sweep_enabled: true,
            staff_token: None,
        }
    }
}

impl RenewalConfig {
    /// Load from the data/ directory. A missing file means defaults.
    /// In tests, use RenewalConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/renewals/reminders.json");
        if !Path::new(&path).exists() {
            log::info!("{path} not found; using default renewal config");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid {path}: {e}"))?;
        if config.sweep_interval_secs == 0 {
            anyhow::bail!("Invalid {path}: sweep_interval_secs must be positive");
        }
        Ok(config)
    }

    pub fn default_test() -> Self {
        Self {
            sweep_enabled: false,
            ..Self::default()
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
