//! Manual trigger — staff ask for one policy's reminder now.
//!
//! Shares the sweep's ledger contract, so a manual trigger racing a sweep
//! tick on the same pair still leaves exactly one record.

use serde::Serialize;

use crate::{
    engine::RenewalEngine,
    error::{RenewalError, RenewalResult},
    ledger::RecordOutcome,
    types::{PolicyId, ThresholdDay},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualNotification {
    pub policy_id:      PolicyId,
    pub threshold:      ThresholdDay,
    pub days_to_expiry: i64,
    /// False when the ledger already held the pair and nothing was sent.
    pub dispatched:     bool,
    pub outcome:        RecordOutcome,
}

impl RenewalEngine {
    /// Notify one policy. With no `threshold`, the tightest crossed tier is
    /// used, falling back to the most lenient tier when none is crossed yet.
    pub fn notify_policy(
        &self,
        policy_id: PolicyId,
        threshold: Option<ThresholdDay>,
    ) -> RenewalResult<ManualNotification> {
        let policy = self
            .source
            .current_policy(policy_id)?
            .filter(|p| p.is_notifiable())
            .ok_or(RenewalError::NotFound { policy_id })?;

        let expiry = policy.expiry(self.clock.now());
        let threshold =
            threshold.unwrap_or_else(|| self.reminders.manual_threshold(expiry.days_to_expiry));

        let already_sent = self
            .ledger
            .sent_thresholds(&[policy_id])?
            .get(&policy_id)
            .is_some_and(|days| days.contains(&threshold));
        if already_sent {
            log::info!("manual: policy {policy_id} reminder {threshold}d already sent; skipping");
            return Ok(ManualNotification {
                policy_id,
                threshold,
                days_to_expiry: expiry.days_to_expiry,
                dispatched: false,
                outcome: RecordOutcome::AlreadyPresent,
            });
        }

        let outcome = self.dispatch_and_record(&policy, expiry, threshold)?;
        log::info!(
            "manual: policy {policy_id} reminder {threshold}d sent ({} days to expiry)",
            expiry.days_to_expiry
        );
        Ok(ManualNotification {
            policy_id,
            threshold,
            days_to_expiry: expiry.days_to_expiry,
            dispatched: true,
            outcome,
        })
    }
}
