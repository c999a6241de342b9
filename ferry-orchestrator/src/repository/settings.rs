//! User settings store
//!
//! Injected read/write interface; the engine records the last-used
//! configuration at run start instead of keeping ambient state.

use std::collections::HashMap;

use async_trait::async_trait;
use ferry_core::domain::config::MergeConfiguration;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::repository::RepositoryError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSettings {
    pub last_configuration: Option<MergeConfiguration>,
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Option<UserSettings>, RepositoryError>;
    async fn save(&self, user_id: &str, settings: UserSettings) -> Result<(), RepositoryError>;
}

/// In-memory settings store
#[derive(Default)]
pub struct MemorySettingsStore {
    inner: RwLock<HashMap<String, UserSettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self, user_id: &str) -> Result<Option<UserSettings>, RepositoryError> {
        Ok(self.inner.read().await.get(user_id).cloned())
    }

    async fn save(&self, user_id: &str, settings: UserSettings) -> Result<(), RepositoryError> {
        self.inner
            .write()
            .await
            .insert(user_id.to_string(), settings);
        Ok(())
    }
}
