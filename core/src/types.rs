//! Shared primitive types used across the renewal engine.

/// Primary key of a policy row.
pub type PolicyId = i64;

/// Days before expiry at which a reminder tier becomes due.
pub type ThresholdDay = u32;
