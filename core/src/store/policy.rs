//! Policy reads over `active_policy_view`, plus the inserts used to seed
//! demo data and tests. The engine itself never writes policy rows.

use chrono::NaiveDate;
use rusqlite::{params, types::Type, OptionalExtension, Row};

use super::RenewalStore;
use crate::{
    error::RenewalResult,
    policy::{Policy, PolicyHolder, PolicySource, PolicyStatus},
    types::PolicyId,
};

const POLICY_COLUMNS: &str = "id, policy_number, insurance_type, start_date, end_date,
                              status, is_current, user_id, full_name, email, phone";

/// A policy row to insert.
#[derive(Debug, Clone)]
pub struct NewPolicy {
    pub policy_number:     String,
    pub user_id:           i64,
    pub insurance_type_id: i64,
    pub start_date:        NaiveDate,
    pub end_date:          Option<NaiveDate>,
    pub status:            PolicyStatus,
    pub is_current:        bool,
}

fn policy_from_row(row: &Row<'_>) -> rusqlite::Result<Policy> {
    let status: String = row.get(5)?;
    let status = status
        .parse::<PolicyStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    Ok(Policy {
        id:             row.get(0)?,
        policy_number:  row.get(1)?,
        insurance_type: row.get(2)?,
        start_date:     row.get(3)?,
        end_date:       row.get(4)?,
        status,
        is_current:     row.get::<_, i32>(6)? != 0,
        holder: PolicyHolder {
            user_id:   row.get(7)?,
            full_name: row.get(8)?,
            email:     row.get(9)?,
            phone:     row.get(10)?,
        },
    })
}

impl RenewalStore {
    // ── Seeding ────────────────────────────────────────────────

    pub fn insert_user(&self, full_name: &str, email: &str, phone: Option<&str>) -> RenewalResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (full_name, email, phone) VALUES (?1, ?2, ?3)",
            params![full_name, email, phone],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert an insurance type, or return the id of the existing one.
    pub fn insert_insurance_type(&self, name: &str) -> RenewalResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO insurance_types (name) VALUES (?1)
             ON CONFLICT(name) DO NOTHING",
            params![name],
        )?;
        let id = conn.query_row(
            "SELECT id FROM insurance_types WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn insert_policy(&self, p: &NewPolicy) -> RenewalResult<PolicyId> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO policies (
                policy_number, user_id, insurance_type_id, start_date, end_date,
                status, is_current
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                p.policy_number,
                p.user_id,
                p.insurance_type_id,
                p.start_date,
                p.end_date,
                p.status.as_str(),
                if p.is_current { 1 } else { 0 },
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn set_policy_status(&self, policy_id: PolicyId, status: PolicyStatus) -> RenewalResult<()> {
        self.conn()?.execute(
            "UPDATE policies SET status = ?1 WHERE id = ?2",
            params![status.as_str(), policy_id],
        )?;
        Ok(())
    }
}

impl PolicySource for RenewalStore {
    fn active_policies(&self) -> RenewalResult<Vec<Policy>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {POLICY_COLUMNS} FROM active_policy_view"))?;
        let rows = stmt.query_map([], policy_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn current_policy(&self, policy_id: PolicyId) -> RenewalResult<Option<Policy>> {
        let conn = self.conn()?;
        let policy = conn
            .query_row(
                &format!("SELECT {POLICY_COLUMNS} FROM active_policy_view WHERE id = ?1"),
                params![policy_id],
                policy_from_row,
            )
            .optional()?;
        Ok(policy)
    }
}
