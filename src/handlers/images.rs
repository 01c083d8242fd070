use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    Json,
};

use super::lookup_user;
use crate::error::AppError;
use crate::models::user::DetailResponse;
use crate::AppState;

const FILE_FIELD: &str = "file";

/// POST /api/users/:registration/image — upload a facial photo from the
/// multipart field `file`.
pub async fn set_user_image(
    State(state): State<AppState>,
    Path(registration): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(
        handler = "set_user_image",
        %registration,
        "Handler: POST /api/users/:registration/image"
    );

    let device_id = lookup_user(&state, &registration).await?;

    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some(FILE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read image: {e}")))?;
            image = Some(bytes);
            break;
        }
    }

    let Some(image) = image else {
        return Err(AppError::BadRequest(
            "Image file not sent. Use the 'file' field.".into(),
        ));
    };
    if image.is_empty() {
        return Err(AppError::BadRequest("Image file is empty".into()));
    }

    tracing::debug!(
        handler = "set_user_image",
        device_id,
        bytes = image.len(),
        "Dispatching to device.set_user_image"
    );
    let reply = state
        .device
        .lock()
        .await
        .set_user_image(device_id, image.to_vec(), None, true)
        .await?;
    tracing::debug!(handler = "set_user_image", ?reply, "Device returned");

    tracing::info!(handler = "set_user_image", %registration, status = 200, "Responding: image uploaded");
    Ok(Json(DetailResponse {
        detail: "Image uploaded",
    }))
}
