//! Notification ledger — the append-only record of reminders already sent.
//!
//! RULE: at most one record per (policy_id, reminder_day), ever.
//!
//! `record_sent` is insert-if-absent. Two callers racing on the same pair
//! both succeed; exactly one sees `Inserted`, the other `AlreadyPresent`.
//! The SQLite store enforces this with a uniqueness constraint and the
//! in-memory ledger with a check-and-set under its lock, so both backends
//! honour the same contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::{
    error::{RenewalError, RenewalResult},
    types::{PolicyId, ThresholdDay},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    Inserted,
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub policy_id:    PolicyId,
    pub reminder_day: ThresholdDay,
    pub sent_at:      DateTime<Utc>,
}

/// Sent thresholds keyed by policy. Policies with nothing sent are absent.
pub type SentThresholds = HashMap<PolicyId, BTreeSet<ThresholdDay>>;

pub trait NotificationLedger: Send + Sync {
    /// Batched read: one call covers every id in `policy_ids`.
    fn sent_thresholds(&self, policy_ids: &[PolicyId]) -> RenewalResult<SentThresholds>;

    /// Insert-if-absent. Never errors because the pair already exists.
    fn record_sent(
        &self,
        policy_id: PolicyId,
        reminder_day: ThresholdDay,
        sent_at: DateTime<Utc>,
    ) -> RenewalResult<RecordOutcome>;

    /// Audit rows for one policy, highest reminder day first.
    fn records_for(&self, policy_id: PolicyId) -> RenewalResult<Vec<NotificationRecord>>;
}

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    records: Mutex<BTreeMap<(PolicyId, ThresholdDay), DateTime<Utc>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> RenewalResult<MutexGuard<'_, BTreeMap<(PolicyId, ThresholdDay), DateTime<Utc>>>> {
        self.records
            .lock()
            .map_err(|_| RenewalError::Upstream("in-memory ledger lock poisoned".into()))
    }
}

impl NotificationLedger for InMemoryLedger {
    fn sent_thresholds(&self, policy_ids: &[PolicyId]) -> RenewalResult<SentThresholds> {
        let records = self.lock()?;
        let mut sent = SentThresholds::new();
        for &policy_id in policy_ids {
            let days: BTreeSet<ThresholdDay> = records
                .range((policy_id, ThresholdDay::MIN)..=(policy_id, ThresholdDay::MAX))
                .map(|(&(_, day), _)| day)
                .collect();
            if !days.is_empty() {
                sent.insert(policy_id, days);
            }
        }
        Ok(sent)
    }

    fn record_sent(
        &self,
        policy_id: PolicyId,
        reminder_day: ThresholdDay,
        sent_at: DateTime<Utc>,
    ) -> RenewalResult<RecordOutcome> {
        let mut records = self.lock()?;
        if records.contains_key(&(policy_id, reminder_day)) {
            return Ok(RecordOutcome::AlreadyPresent);
        }
        records.insert((policy_id, reminder_day), sent_at);
        Ok(RecordOutcome::Inserted)
    }

    fn records_for(&self, policy_id: PolicyId) -> RenewalResult<Vec<NotificationRecord>> {
        let records = self.lock()?;
        Ok(records
            .range((policy_id, ThresholdDay::MIN)..=(policy_id, ThresholdDay::MAX))
            .rev()
            .map(|(&(policy_id, reminder_day), &sent_at)| NotificationRecord {
                policy_id,
                reminder_day,
                sent_at,
            })
            .collect())
    }
}
