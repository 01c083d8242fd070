use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::lookup_user;
use crate::device::Record;
use crate::error::AppError;
use crate::models::user::{CreateUserRequest, CreateUserResponse, DetailResponse, UserMapResponse};
use crate::AppState;

/// POST /api/users — create the user on the device and remember its id.
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::warn!(handler = "create_user", error = %rejection, "Rejected request body");
        AppError::BadRequest(rejection.body_text())
    })?;
    tracing::info!(
        handler = "create_user",
        registration = ?body.registration,
        extra_fields = body.extra.len(),
        "Handler: POST /api/users"
    );

    let (registration, name) = body.required().map_err(|msg| {
        tracing::warn!(handler = "create_user", error = %msg, "Validation failed");
        AppError::BadRequest(msg)
    })?;

    tracing::debug!(handler = "create_user", "Dispatching to device.create_user");
    let device_id = state
        .device
        .lock()
        .await
        .create_user(&registration, &name, body.extra)
        .await?;
    tracing::debug!(handler = "create_user", device_id, "Device returned: user created");

    state.repo.insert(&registration, device_id).await?;

    tracing::info!(
        handler = "create_user",
        %registration,
        device_id,
        status = 201,
        "Responding: user created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            registration,
            device_user_id: device_id,
        }),
    ))
}

/// PUT /api/users/:registration — update fields of a mapped user.
pub async fn update_user(
    State(state): State<AppState>,
    Path(registration): Path<String>,
    body: Option<Json<Record>>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(handler = "update_user", %registration, "Handler: PUT /api/users/:registration");

    let device_id = lookup_user(&state, &registration).await?;

    let fields = body.map(|Json(fields)| fields).unwrap_or_default();
    if fields.is_empty() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }

    tracing::debug!(
        handler = "update_user",
        device_id,
        fields = fields.len(),
        "Dispatching to device.update_user"
    );
    state.device.lock().await.update_user(device_id, fields).await?;

    tracing::info!(handler = "update_user", %registration, status = 200, "Responding: user updated");
    Ok(Json(DetailResponse {
        detail: "User updated",
    }))
}

/// DELETE /api/users/:registration — remove the user from the device, then the mapping.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(registration): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(handler = "delete_user", %registration, "Handler: DELETE /api/users/:registration");

    let device_id = lookup_user(&state, &registration).await?;

    tracing::debug!(handler = "delete_user", device_id, "Dispatching to device.delete_user");
    state.device.lock().await.delete_user(device_id).await?;

    state.repo.remove(&registration).await?;

    tracing::info!(handler = "delete_user", %registration, status = 200, "Responding: user deleted");
    Ok(Json(DetailResponse {
        detail: "User deleted",
    }))
}

/// GET /api/users — the local registration to device id mapping.
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users = state.repo.list().await?;
    tracing::info!(handler = "list_users", count = users.len(), "Responding: user map");
    Ok(Json(UserMapResponse { users }))
}
