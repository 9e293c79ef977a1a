use thiserror::Error;

use crate::types::{PolicyId, ThresholdDay};

#[derive(Error, Debug)]
pub enum RenewalError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Policy {policy_id} not found or not current")]
    NotFound { policy_id: PolicyId },

    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    #[error("Dispatch failed for policy {policy_id} at {threshold} days: {reason}")]
    Dispatch {
        policy_id: PolicyId,
        threshold: ThresholdDay,
        reason:    String,
    },

    #[error("Invalid reminder thresholds: {0}")]
    InvalidThresholds(String),
}

impl RenewalError {
    /// True when the policy source or the ledger could not be reached.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Upstream(_))
    }
}

pub type RenewalResult<T> = Result<T, RenewalError>;
