//! The renewal engine — owns every collaborator the reminder flow needs.
//!
//! FLOW (sweep and manual trigger alike):
//!   1. Policy source   → candidate policies
//!   2. Evaluator       → expiry + pending thresholds (batched ledger read)
//!   3. Dispatcher      → send
//!   4. Ledger          → record, insert-if-absent
//!
//! RULES:
//!   - No lock is held across evaluate → dispatch → record.
//!   - A ledger record is written only after a successful dispatch.
//!   - Concurrency safety rests on the ledger contract alone.
//!
//! The sweep lives in sweep.rs, the manual trigger in manual.rs.

use std::sync::Arc;

use crate::{
    clock::{Clock, SystemClock},
    dispatch::{LogDispatcher, NotificationDispatcher, ReminderMessage},
    error::{RenewalError, RenewalResult},
    evaluator::{ExpiringPolicyView, RenewalEvaluator},
    expiry::Expiry,
    ledger::{NotificationLedger, RecordOutcome},
    policy::{Policy, PolicySource},
    reminder_policy::ReminderPolicy,
    store::RenewalStore,
    types::ThresholdDay,
};

pub struct RenewalEngine {
    pub(crate) source:     Arc<dyn PolicySource>,
    pub(crate) ledger:     Arc<dyn NotificationLedger>,
    pub(crate) dispatcher: Arc<dyn NotificationDispatcher>,
    pub(crate) reminders:  ReminderPolicy,
    pub(crate) clock:      Arc<dyn Clock>,
}

impl RenewalEngine {
    pub fn new(
        source: Arc<dyn PolicySource>,
        ledger: Arc<dyn NotificationLedger>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        reminders: ReminderPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            ledger,
            dispatcher,
            reminders,
            clock,
        }
    }

    /// Wire an engine over one SQLite store (policy source and ledger),
    /// the logging dispatcher and the system clock.
    pub fn build(store: Arc<RenewalStore>, reminders: ReminderPolicy) -> Self {
        Self::new(
            store.clone(),
            store,
            Arc::new(LogDispatcher),
            reminders,
            Arc::new(SystemClock),
        )
    }

    pub fn evaluator(&self) -> RenewalEvaluator<'_> {
        RenewalEvaluator::new(self.source.as_ref(), self.ledger.as_ref(), &self.reminders)
    }

    /// Expiring policies within `window_days`, evaluated at the clock's now.
    pub fn list_expiring(&self, window_days: u32) -> RenewalResult<Vec<ExpiringPolicyView>> {
        self.evaluator().list_expiring(window_days, self.clock.now())
    }

    /// Send one reminder, then record it. A failed send records nothing.
    pub(crate) fn dispatch_and_record(
        &self,
        policy: &Policy,
        expiry: Expiry,
        threshold: ThresholdDay,
    ) -> RenewalResult<RecordOutcome> {
        let message = ReminderMessage::compose(policy, expiry, threshold);
        let receipt = self
            .dispatcher
            .dispatch(&message)
            .map_err(|e| RenewalError::Dispatch {
                policy_id: policy.id,
                threshold,
                reason: e.to_string(),
            })?;

        let outcome = self
            .ledger
            .record_sent(policy.id, threshold, self.clock.now())?;
        if outcome == RecordOutcome::AlreadyPresent {
            // Another trigger recorded this pair between our read and write.
            log::warn!(
                "policy {} reminder {}d already recorded (message {} was a duplicate send)",
                policy.id,
                threshold,
                receipt.message_id
            );
        } else {
            log::debug!(
                "policy {} reminder {}d recorded (message {})",
                policy.id,
                threshold,
                receipt.message_id
            );
        }
        Ok(outcome)
    }
}
