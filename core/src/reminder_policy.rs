//! Reminder policy — the descending set of day-thresholds.
//!
//! A threshold `t` is crossed once `days_to_expiry <= t`. Crossing is
//! monotonic, so every crossed-but-unsent threshold stays pending until the
//! ledger records it (catch-up), not only the most recently crossed one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{
    error::{RenewalError, RenewalResult},
    types::ThresholdDay,
};

pub const DEFAULT_THRESHOLDS: [ThresholdDay; 3] = [15, 7, 1];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ThresholdDay>", into = "Vec<ThresholdDay>")]
pub struct ReminderPolicy {
    thresholds: Vec<ThresholdDay>,
}

impl ReminderPolicy {
    /// Thresholds must be non-empty, strictly descending and unique.
    pub fn new(thresholds: Vec<ThresholdDay>) -> RenewalResult<Self> {
        if thresholds.is_empty() {
            return Err(RenewalError::InvalidThresholds(
                "at least one threshold is required".into(),
            ));
        }
        if let Some(pair) = thresholds.windows(2).find(|w| w[0] <= w[1]) {
            return Err(RenewalError::InvalidThresholds(format!(
                "thresholds must be strictly descending, found {} before {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &[ThresholdDay] {
        &self.thresholds
    }

    /// The largest threshold; also the sweep's evaluation window.
    pub fn max_threshold(&self) -> ThresholdDay {
        self.thresholds[0]
    }

    /// Thresholds already crossed at `days_to_expiry`, descending.
    pub fn crossed(&self, days_to_expiry: i64) -> impl Iterator<Item = ThresholdDay> + '_ {
        self.thresholds
            .iter()
            .copied()
            .filter(move |&t| days_to_expiry <= i64::from(t))
    }

    /// Crossed thresholds not yet in `sent`, descending.
    pub fn pending(&self, days_to_expiry: i64, sent: &BTreeSet<ThresholdDay>) -> Vec<ThresholdDay> {
        self.crossed(days_to_expiry)
            .filter(|t| !sent.contains(t))
            .collect()
    }

    /// Threshold a staff-triggered reminder is filed under when none is given:
    /// the tightest crossed tier, or the most lenient tier if none is crossed.
    pub fn manual_threshold(&self, days_to_expiry: i64) -> ThresholdDay {
        self.crossed(days_to_expiry)
            .last()
            .unwrap_or_else(|| self.max_threshold())
    }
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
        }
    }
}

impl TryFrom<Vec<ThresholdDay>> for ReminderPolicy {
    type Error = RenewalError;

    fn try_from(thresholds: Vec<ThresholdDay>) -> RenewalResult<Self> {
        Self::new(thresholds)
    }
}

impl From<ReminderPolicy> for Vec<ThresholdDay> {
    fn from(policy: ReminderPolicy) -> Self {
        policy.thresholds
    }
}
