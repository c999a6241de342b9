//! Domain types shared between the orchestrator and clients

pub mod config;
pub mod run;
pub mod step;
