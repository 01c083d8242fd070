use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::AppError;

/// Maps caller registrations to the numeric ids the device assigned.
#[async_trait]
pub trait UserMapRepository: Send + Sync {
    async fn insert(&self, registration: &str, device_id: i64) -> Result<(), AppError>;
    async fn find(&self, registration: &str) -> Result<Option<i64>, AppError>;
    async fn remove(&self, registration: &str) -> Result<bool, AppError>;
    async fn list(&self) -> Result<BTreeMap<String, i64>, AppError>;
}
