use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::repository::UserMapRepository;

/// Volatile mapping; lost on restart.
#[derive(Default)]
pub struct InMemoryRepository {
    users: RwLock<BTreeMap<String, i64>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserMapRepository for InMemoryRepository {
    async fn insert(&self, registration: &str, device_id: i64) -> Result<(), AppError> {
        tracing::debug!(registration, device_id, "map: insert");
        self.users
            .write()
            .await
            .insert(registration.to_string(), device_id);
        Ok(())
    }

    async fn find(&self, registration: &str) -> Result<Option<i64>, AppError> {
        let found = self.users.read().await.get(registration).copied();
        tracing::debug!(registration, found = found.is_some(), "map: find");
        Ok(found)
    }

    async fn remove(&self, registration: &str) -> Result<bool, AppError> {
        let removed = self.users.write().await.remove(registration).is_some();
        tracing::debug!(registration, removed, "map: remove");
        Ok(removed)
    }

    async fn list(&self) -> Result<BTreeMap<String, i64>, AppError> {
        Ok(self.users.read().await.clone())
    }
}
