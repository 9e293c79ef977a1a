//! Policy snapshots and the read-only policy source.
//!
//! Policies belong to the policy-management domain. The renewal engine only
//! reads them, and only considers rows that are both active and the current
//! version.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{
    error::RenewalResult,
    expiry::{self, Expiry},
    types::PolicyId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Pending,
    Active,
    Lapsed,
    Cancelled,
    Expired,
}

impl PolicyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending   => "pending",
            Self::Active    => "active",
            Self::Lapsed    => "lapsed",
            Self::Cancelled => "cancelled",
            Self::Expired   => "expired",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown policy status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for PolicyStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending"   => Ok(Self::Pending),
            "active"    => Ok(Self::Active),
            "lapsed"    => Ok(Self::Lapsed),
            "cancelled" => Ok(Self::Cancelled),
            "expired"   => Ok(Self::Expired),
            other       => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyHolder {
    pub user_id:   i64,
    pub full_name: String,
    pub email:     String,
    pub phone:     Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id:             PolicyId,
    pub policy_number:  String,
    pub insurance_type: String,
    pub start_date:     NaiveDate,
    pub end_date:       Option<NaiveDate>,
    pub status:         PolicyStatus,
    pub is_current:     bool,
    pub holder:         PolicyHolder,
}

impl Policy {
    /// Active and the current version.
    pub fn is_notifiable(&self) -> bool {
        self.status == PolicyStatus::Active && self.is_current
    }

    pub fn expiry(&self, now: DateTime<Utc>) -> Expiry {
        expiry::compute(self.start_date, self.end_date, now)
    }
}

/// Read-only access to active, current policies.
pub trait PolicySource: Send + Sync {
    /// Every active, current policy, in no particular order.
    fn active_policies(&self) -> RenewalResult<Vec<Policy>>;

    /// The active, current policy with this id, if any.
    fn current_policy(&self, policy_id: PolicyId) -> RenewalResult<Option<Policy>>;
}

/// A fixed set of policy snapshots, returned in insertion order.
/// Used by tests and local demos in place of the policy database.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPolicySource {
    policies: Vec<Policy>,
}

impl InMemoryPolicySource {
    pub fn new(policies: Vec<Policy>) -> Self {
        Self { policies }
    }
}

impl PolicySource for InMemoryPolicySource {
    fn active_policies(&self) -> RenewalResult<Vec<Policy>> {
        Ok(self
            .policies
            .iter()
            .filter(|p| p.is_notifiable())
            .cloned()
            .collect())
    }

    fn current_policy(&self, policy_id: PolicyId) -> RenewalResult<Option<Policy>> {
        Ok(self
            .policies
            .iter()
            .find(|p| p.id == policy_id && p.is_notifiable())
            .cloned())
    }
}
