//! Ferry Core
//!
//! Core types and abstractions for the Ferry repository-merge system.
//!
//! This crate contains:
//! - Domain types: Core business entities (MergeConfiguration, PipelineRun, StepRecord)
//! - Selection engine: Pattern matching and copy-plan computation
//! - DTOs: Data transfer objects for client/orchestrator communication

pub mod domain;
pub mod dto;
pub mod selection;
