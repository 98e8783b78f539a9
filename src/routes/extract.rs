// Request extractors that report failures as `AppError`

use axum::{
    extract::{FromRequest, FromRequestParts, Form, Path, Request},
    http::{header::CONTENT_TYPE, request::Parts},
};
use bytes::Bytes;

use crate::models::TaskInput;
use crate::types::AppError;

/// Integer task id from the path. Anything else is a 404, like an int route converter.
#[derive(Debug, Clone, Copy)]
pub struct TaskId(pub i32);

impl<S> FromRequestParts<S> for TaskId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::NotFound("Task not found".to_string()))?;
        Ok(TaskId(id))
    }
}

/// Validated create/update body, from JSON or an urlencoded form.
#[derive(Debug, Clone)]
pub struct TaskBody(pub TaskInput);

impl<S> FromRequest<S> for TaskBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with(mime::APPLICATION_WWW_FORM_URLENCODED.as_ref()));

        let input = if is_form {
            let Form(input) = Form::<TaskInput>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            input
        } else {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            if body.iter().all(u8::is_ascii_whitespace) {
                TaskInput::default()
            } else {
                serde_json::from_slice(&body)
                    .map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e)))?
            }
        };

        Ok(TaskBody(input.validated()?))
    }
}
