//! Renewal evaluator — which policies are expiring and which reminders are
//! still owed.
//!
//! One evaluation reads the policy source once and the ledger once; ledger
//! lookups for every candidate are batched into a single call.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::{
    error::RenewalResult,
    expiry::Expiry,
    ledger::NotificationLedger,
    policy::{Policy, PolicySource},
    reminder_policy::ReminderPolicy,
    types::ThresholdDay,
};

/// Derived per evaluation; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringPolicyView {
    pub policy:         Policy,
    pub expiry_date:    NaiveDate,
    pub days_to_expiry: i64,
    #[serde(rename = "remindersSent")]
    pub sent_thresholds: Vec<ThresholdDay>,
    #[serde(rename = "pendingReminders")]
    pub pending_thresholds: Vec<ThresholdDay>,
}

impl ExpiringPolicyView {
    pub fn expiry(&self) -> Expiry {
        Expiry {
            date: self.expiry_date,
            days_to_expiry: self.days_to_expiry,
        }
    }
}

pub struct RenewalEvaluator<'a> {
    source:    &'a dyn PolicySource,
    ledger:    &'a dyn NotificationLedger,
    reminders: &'a ReminderPolicy,
}

impl<'a> RenewalEvaluator<'a> {
    pub fn new(
        source: &'a dyn PolicySource,
        ledger: &'a dyn NotificationLedger,
        reminders: &'a ReminderPolicy,
    ) -> Self {
        Self { source, ledger, reminders }
    }

    /// Policies with `days_to_expiry` in `[0, window_days]`, soonest expiry
    /// first (ties by policy id).
    pub fn list_expiring(
        &self,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> RenewalResult<Vec<ExpiringPolicyView>> {
        let candidates: Vec<(Policy, Expiry)> = self
            .source
            .active_policies()?
            .into_iter()
            .filter(Policy::is_notifiable)
            .map(|policy| {
                let expiry = policy.expiry(now);
                (policy, expiry)
            })
            .filter(|(_, expiry)| expiry.within_window(window_days))
            .collect();

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<_> = candidates.iter().map(|(p, _)| p.id).collect();
        let sent = self.ledger.sent_thresholds(&ids)?;
        let none = BTreeSet::new();

        let mut views: Vec<ExpiringPolicyView> = candidates
            .into_iter()
            .map(|(policy, expiry)| {
                let sent_for = sent.get(&policy.id).unwrap_or(&none);
                self.view(policy, expiry, sent_for)
            })
            .collect();

        views.sort_by(|a, b| {
            a.expiry_date
                .cmp(&b.expiry_date)
                .then(a.policy.id.cmp(&b.policy.id))
        });
        Ok(views)
    }

    /// Pure: combine one policy's expiry with what the ledger says was sent.
    pub fn view(
        &self,
        policy: Policy,
        expiry: Expiry,
        sent: &BTreeSet<ThresholdDay>,
    ) -> ExpiringPolicyView {
        ExpiringPolicyView {
            pending_thresholds: self.reminders.pending(expiry.days_to_expiry, sent),
            sent_thresholds: sent.iter().rev().copied().collect(),
            expiry_date: expiry.date,
            days_to_expiry: expiry.days_to_expiry,
            policy,
        }
    }
}
