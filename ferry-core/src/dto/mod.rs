//! DTOs for client/orchestrator communication

pub mod run;
