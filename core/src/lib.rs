//! renewal-core: renewal reminder scheduling for insurance policies.
//!
//! A policy approaching expiry receives one reminder per configured
//! threshold (e.g. 15, 7 and 1 days out). Reminders are driven by an
//! unattended sweep and by staff on demand; the notification ledger makes
//! sure each (policy, threshold) pair is recorded at most once.

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod expiry;
pub mod http;
pub mod ledger;
pub mod manual;
pub mod policy;
pub mod reminder_policy;
pub mod store;
pub mod sweep;
pub mod types;
