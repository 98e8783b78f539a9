use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{debug, error, info, warn};

use super::extract::TaskId;
use super::tasks::find_task;
use crate::models::AppState;
use crate::storage::{file_extension, StorageClient};
use crate::types::{AppError, AppResult, ImageUrlResponse, UploadResponse};

const IMAGE_FIELD: &str = "image";
const NO_FILE_SELECTED: &str = "No file selected";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/tasks/{id}/upload_image", post(upload_task_image))
        .route("/api/tasks/{id}/image_url", get(get_image_url))
        .with_state(state)
}

struct ImagePart {
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

/// Oversized bodies keep their 413; anything else is a malformed request.
fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge("File exceeds the maximum upload size".to_string());
    }
    AppError::Validation(format!("{}: {}", context, e.body_text()))
}

/// Reads the first `image` part. Other parts are skipped.
async fn read_image_part(multipart: &mut Multipart) -> AppResult<ImagePart> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Invalid multipart payload", e))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            debug!("Skipping multipart field: {:?}", field.name());
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read file", e))?;

        return Ok(ImagePart {
            filename,
            content_type,
            data,
        });
    }

    Err(AppError::Validation(NO_FILE_SELECTED.to_string()))
}

async fn upload_task_image(
    State(state): State<AppState>,
    TaskId(id): TaskId,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<UploadResponse>> {
    let task = find_task(&state, id).await?;

    let mut multipart = multipart.map_err(|e| {
        debug!("Upload without a multipart body: {}", e);
        AppError::Validation(NO_FILE_SELECTED.to_string())
    })?;
    let part = read_image_part(&mut multipart).await?;

    if part.filename.is_empty() {
        return Err(AppError::Validation(NO_FILE_SELECTED.to_string()));
    }

    // Names without a dot are not checked against the whitelist.
    if let Some(ext) = file_extension(&part.filename) {
        if !state.storage.is_allowed_extension(&ext) {
            let allowed: Vec<&str> = state
                .storage
                .allowed_extensions()
                .iter()
                .map(String::as_str)
                .collect();
            return Err(AppError::Validation(format!(
                "Invalid file type. Allowed types: {}",
                allowed.join(", ")
            )));
        }
    }

    if let Some(old_key) = task.image_filename.as_deref() {
        if let Err(e) = state.storage.delete(old_key).await {
            warn!(task_id = id, key = old_key, "Could not delete previous image: {}", e);
        }
    }

    let key = StorageClient::generate_unique_key(&part.filename);
    let content_type = part
        .content_type
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| {
            mime_guess::from_path(&part.filename)
                .first_or_octet_stream()
                .to_string()
        });

    state
        .storage
        .upload(part.data, &key, &content_type)
        .await
        .map_err(|_| AppError::Storage("Failed to upload file".to_string()))?;

    let attached = match state.tasks.set_image(id, &key).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(AppError::NotFound("Task not found".to_string())),
        Err(e) => Err(e),
    };
    if let Err(e) = attached {
        // Do not leave the new object behind if the row was not updated.
        if let Err(delete_err) = state.storage.delete(&key).await {
            error!("Failed to roll back uploaded image {}: {}", key, delete_err);
        }
        return Err(e);
    }

    info!(task_id = id, key = %key, "Image attached to task");
    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        filename: key,
    }))
}

async fn get_image_url(
    State(state): State<AppState>,
    TaskId(id): TaskId,
) -> AppResult<Json<ImageUrlResponse>> {
    let task = find_task(&state, id).await?;

    let key = task
        .image_filename
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::NotFound("No file is attached to this task".to_string()))?;

    let url = state
        .storage
        .presigned_url(&key, state.config.storage.presigned_url_expiration)
        .await
        .ok_or_else(|| AppError::Storage("Failed to generate download URL".to_string()))?;

    Ok(Json(ImageUrlResponse { url }))
}
