//! Storage interfaces
//!
//! Persistence is an external collaborator; the orchestrator only defines the
//! shape it needs and ships in-memory implementations. A database-backed
//! store plugs in behind the same traits.

pub mod run;
pub mod settings;

use thiserror::Error;

/// Failure in a storage backend
#[derive(Debug, Error)]
#[error("repository error: {0}")]
pub struct RepositoryError(pub String);
