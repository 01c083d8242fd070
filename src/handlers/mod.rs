pub mod health;
pub mod images;
pub mod users;

use crate::error::AppError;
use crate::AppState;

/// Resolve a registration to the device id recorded for it.
async fn lookup_user(state: &AppState, registration: &str) -> Result<i64, AppError> {
    state.repo.find(registration).await?.ok_or_else(|| {
        AppError::NotFound(format!(
            "User with registration {registration:?} not found in local mapping"
        ))
    })
}
