//! Shared fixtures for the renewal integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use renewal_core::{
    clock::FixedClock,
    dispatch::{DispatchError, DispatchReceipt, NotificationDispatcher, ReminderMessage},
    engine::RenewalEngine,
    error::{RenewalError, RenewalResult},
    ledger::{InMemoryLedger, NotificationLedger, NotificationRecord, RecordOutcome, SentThresholds},
    policy::{InMemoryPolicySource, Policy, PolicyHolder, PolicyStatus},
    reminder_policy::ReminderPolicy,
    store::{NewPolicy, RenewalStore},
    types::{PolicyId, ThresholdDay},
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Every test evaluates at this instant unless it moves the clock.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
}

pub fn today() -> NaiveDate {
    now().date_naive()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// An active, current policy whose end date is `days` after `today()`.
pub fn policy_expiring_in(id: PolicyId, days: i64) -> Policy {
    Policy {
        id,
        policy_number: format!("POL-{id:05}"),
        insurance_type: "auto".into(),
        start_date: date(2024, 6, 1),
        end_date: Some(today() + Duration::days(days)),
        status: PolicyStatus::Active,
        is_current: true,
        holder: PolicyHolder {
            user_id: id,
            full_name: format!("Holder {id}"),
            email: format!("holder{id}@example.com"),
            phone: None,
        },
    }
}

/// Records every message; fails for the listed policy ids.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub sent:    Mutex<Vec<(PolicyId, ThresholdDay)>>,
    failing_for: Mutex<HashSet<PolicyId>>,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, policy_id: PolicyId) {
        self.failing_for.lock().unwrap().insert(policy_id);
    }

    pub fn recover(&self, policy_id: PolicyId) {
        self.failing_for.lock().unwrap().remove(&policy_id);
    }

    pub fn sends(&self) -> Vec<(PolicyId, ThresholdDay)> {
        self.sent.lock().unwrap().clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn dispatch(&self, message: &ReminderMessage) -> Result<DispatchReceipt, DispatchError> {
        if self.failing_for.lock().unwrap().contains(&message.policy_id) {
            return Err(DispatchError("provider rejected the message".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((message.policy_id, message.threshold));
        Ok(DispatchReceipt {
            message_id: format!("msg-{}-{}", message.policy_id, message.threshold),
        })
    }
}

/// Wraps a ledger and counts batched reads.
#[derive(Default)]
pub struct CountingLedger {
    pub inner: InMemoryLedger,
    pub reads: AtomicUsize,
}

impl CountingLedger {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl NotificationLedger for CountingLedger {
    fn sent_thresholds(&self, policy_ids: &[PolicyId]) -> RenewalResult<SentThresholds> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.sent_thresholds(policy_ids)
    }

    fn record_sent(
        &self,
        policy_id: PolicyId,
        reminder_day: ThresholdDay,
        sent_at: DateTime<Utc>,
    ) -> RenewalResult<RecordOutcome> {
        self.inner.record_sent(policy_id, reminder_day, sent_at)
    }

    fn records_for(&self, policy_id: PolicyId) -> RenewalResult<Vec<NotificationRecord>> {
        self.inner.records_for(policy_id)
    }
}

/// A ledger whose database has gone away. Writes always fail; reads fail
/// too when `reads_fail` is set.
pub struct DownLedger {
    pub reads_fail: bool,
}

impl NotificationLedger for DownLedger {
    fn sent_thresholds(&self, _policy_ids: &[PolicyId]) -> RenewalResult<SentThresholds> {
        if self.reads_fail {
            return Err(RenewalError::Upstream("ledger database unreachable".into()));
        }
        Ok(SentThresholds::new())
    }

    fn record_sent(
        &self,
        _policy_id: PolicyId,
        _reminder_day: ThresholdDay,
        _sent_at: DateTime<Utc>,
    ) -> RenewalResult<RecordOutcome> {
        Err(RenewalError::Upstream("ledger database unreachable".into()))
    }

    fn records_for(&self, _policy_id: PolicyId) -> RenewalResult<Vec<NotificationRecord>> {
        Err(RenewalError::Upstream("ledger database unreachable".into()))
    }
}

/// Engine over in-memory policies and the given ledger.
pub fn engine_with_ledger(
    policies: Vec<Policy>,
    ledger: Arc<dyn NotificationLedger>,
) -> (Arc<RenewalEngine>, Arc<RecordingDispatcher>) {
    let dispatcher = RecordingDispatcher::new();
    let engine = Arc::new(RenewalEngine::new(
        Arc::new(InMemoryPolicySource::new(policies)),
        ledger,
        dispatcher.clone(),
        ReminderPolicy::default(),
        Arc::new(FixedClock::new(now())),
    ));
    (engine, dispatcher)
}

pub struct Harness {
    pub engine:     Arc<RenewalEngine>,
    pub ledger:     Arc<InMemoryLedger>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub clock:      Arc<FixedClock>,
}

/// In-memory source and ledger, default thresholds [15, 7, 1].
pub fn harness(policies: Vec<Policy>) -> Harness {
    let ledger = Arc::new(InMemoryLedger::new());
    let dispatcher = RecordingDispatcher::new();
    let clock = Arc::new(FixedClock::new(now()));
    let engine = Arc::new(RenewalEngine::new(
        Arc::new(InMemoryPolicySource::new(policies)),
        ledger.clone(),
        dispatcher.clone(),
        ReminderPolicy::default(),
        clock.clone(),
    ));
    Harness {
        engine,
        ledger,
        dispatcher,
        clock,
    }
}

pub struct StoreHarness {
    pub engine:     Arc<RenewalEngine>,
    pub store:      Arc<RenewalStore>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub clock:      Arc<FixedClock>,
}

pub fn migrated_store() -> RenewalStore {
    let store = RenewalStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

/// Insert an active, current policy ending `days` after `today()`.
pub fn seed_policy(store: &RenewalStore, number: &str, end_in_days: Option<i64>) -> PolicyId {
    let user_id = store
        .insert_user(&format!("Holder {number}"), &format!("{number}@example.com"), None)
        .expect("insert user");
    let type_id = store.insert_insurance_type("auto").expect("insert type");
    store
        .insert_policy(&NewPolicy {
            policy_number: number.to_string(),
            user_id,
            insurance_type_id: type_id,
            start_date: date(2024, 6, 1),
            end_date: end_in_days.map(|d| today() + Duration::days(d)),
            status: PolicyStatus::Active,
            is_current: true,
        })
        .expect("insert policy")
}

/// SQLite store as both policy source and ledger.
pub fn store_harness(store: RenewalStore) -> StoreHarness {
    let store = Arc::new(store);
    let dispatcher = RecordingDispatcher::new();
    let clock = Arc::new(FixedClock::new(now()));
    let engine = Arc::new(RenewalEngine::new(
        store.clone(),
        store.clone(),
        dispatcher.clone(),
        ReminderPolicy::default(),
        clock.clone(),
    ));
    StoreHarness {
        engine,
        store,
        dispatcher,
        clock,
    }
}
