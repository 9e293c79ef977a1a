//! The durable notification ledger.
//!
//! `policy_notifications` is unique on (policy_id, reminder_day); an insert
//! that hits the constraint is a no-op and reports `AlreadyPresent`.

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter};

use super::RenewalStore;
use crate::{
    error::RenewalResult,
    ledger::{NotificationLedger, NotificationRecord, RecordOutcome, SentThresholds},
    types::{PolicyId, ThresholdDay},
};

/// Stay under SQLite's historical 999 bound-parameter limit.
const IN_CLAUSE_CHUNK: usize = 500;

impl NotificationLedger for RenewalStore {
    fn sent_thresholds(&self, policy_ids: &[PolicyId]) -> RenewalResult<SentThresholds> {
        let mut sent = SentThresholds::new();
        if policy_ids.is_empty() {
            return Ok(sent);
        }

        let conn = self.conn()?;
        for chunk in policy_ids.chunks(IN_CLAUSE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT policy_id, reminder_day FROM policy_notifications
                 WHERE policy_id IN ({placeholders})"
            ))?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, PolicyId>(0)?, row.get::<_, ThresholdDay>(1)?))
            })?;
            for row in rows {
                let (policy_id, day) = row?;
                sent.entry(policy_id).or_default().insert(day);
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
        let inserted = self.conn()?.execute(
            "INSERT INTO policy_notifications (policy_id, reminder_day, sent_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(policy_id, reminder_day) DO NOTHING",
            params![policy_id, reminder_day, sent_at],
        )?;
        Ok(if inserted > 0 {
            RecordOutcome::Inserted
        } else {
            RecordOutcome::AlreadyPresent
        })
    }

    fn records_for(&self, policy_id: PolicyId) -> RenewalResult<Vec<NotificationRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT policy_id, reminder_day, sent_at FROM policy_notifications
             WHERE policy_id = ?1
             ORDER BY reminder_day DESC",
        )?;
        let rows = stmt.query_map(params![policy_id], |row| {
            Ok(NotificationRecord {
                policy_id:    row.get(0)?,
                reminder_day: row.get(1)?,
                sent_at:      row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

impl RenewalStore {
    // ── Test / summary helpers ────────────────────────────────────────

    /// Total ledger rows across all policies.
    pub fn notification_count(&self) -> RenewalResult<i64> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM policy_notifications",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
