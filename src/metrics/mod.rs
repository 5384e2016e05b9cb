//! Counters and estimators for observing the reconciler's behavior over time.

pub mod collector;
pub mod printer;
