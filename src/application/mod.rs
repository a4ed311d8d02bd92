//! Application layer: the workflow that turns validated donation
//! submissions into durable, exactly-once ledger records.

pub mod orchestrator;
