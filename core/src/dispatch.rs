//! Notification dispatch.
//!
//! Delivery providers are out of scope; `LogDispatcher` stands in for one by
//! logging the composed reminder and handing back a receipt. Retry and
//! backoff belong to a real dispatcher, not to the sweep.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    expiry::Expiry,
    policy::Policy,
    types::{PolicyId, ThresholdDay},
};

/// A renewal reminder ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderMessage {
    pub policy_id:      PolicyId,
    pub policy_number:  String,
    pub recipient_name: String,
    pub recipient:      String,
    pub expiry_date:    NaiveDate,
    pub days_to_expiry: i64,
    pub threshold:      ThresholdDay,
    pub subject:        String,
    pub body:           String,
}

impl ReminderMessage {
    pub fn compose(policy: &Policy, expiry: Expiry, threshold: ThresholdDay) -> Self {
        let subject = format!(
            "Your {} policy {} expires on {}",
            policy.insurance_type, policy.policy_number, expiry.date
        );
        let when = match expiry.days_to_expiry {
            d if d < 0 => format!("expired {} day(s) ago", -d),
            0          => "expires today".to_string(),
            1          => "expires tomorrow".to_string(),
            d          => format!("expires in {d} days"),
        };
        let body = format!(
            "Dear {}, your {} policy {} {} ({}). Please contact us to renew your coverage.",
            policy.holder.full_name, policy.insurance_type, policy.policy_number, when, expiry.date
        );
        Self {
            policy_id: policy.id,
            policy_number: policy.policy_number.clone(),
            recipient_name: policy.holder.full_name.clone(),
            recipient: policy.holder.email.clone(),
            expiry_date: expiry.date,
            days_to_expiry: expiry.days_to_expiry,
            threshold,
            subject,
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReceipt {
    pub message_id: String,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct DispatchError(pub String);

pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, message: &ReminderMessage) -> Result<DispatchReceipt, DispatchError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

impl NotificationDispatcher for LogDispatcher {
    fn dispatch(&self, message: &ReminderMessage) -> Result<DispatchReceipt, DispatchError> {
        if message.recipient.trim().is_empty() {
            return Err(DispatchError(format!(
                "policy {} has no contact address",
                message.policy_number
            )));
        }
        let message_id = Uuid::new_v4().to_string();
        log::info!(
            "renewal reminder {message_id} -> {} [{}d tier]: {}",
            message.recipient,
            message.threshold,
            message.subject
        );
        Ok(DispatchReceipt { message_id })
    }
}
