use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, warn};

use super::extract::{TaskBody, TaskId};
use crate::models::{AppState, Task};
use crate::types::{AppError, AppResult, MessageResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .with_state(state)
}

/// Loads a task or short-circuits with a 404.
pub(crate) async fn find_task(state: &AppState, id: i32) -> AppResult<Task> {
    state
        .tasks
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))
}

async fn list_tasks(State(state): State<AppState>) -> AppResult<Json<Vec<Task>>> {
    let tasks = state.tasks.list().await?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<AppState>,
    TaskBody(input): TaskBody,
) -> AppResult<(StatusCode, Json<Task>)> {
    let task = state.tasks.create(input.into_new_task()).await?;
    info!(task_id = task.id, "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<AppState>,
    TaskId(id): TaskId,
) -> AppResult<Json<Task>> {
    Ok(Json(find_task(&state, id).await?))
}

async fn update_task(
    State(state): State<AppState>,
    TaskId(id): TaskId,
    body: Result<TaskBody, AppError>,
) -> AppResult<Json<Task>> {
    let mut task = find_task(&state, id).await?;
    let TaskBody(input) = body?;
    input.apply_to(&mut task);
    let task = state
        .tasks
        .update_details(&task)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    TaskId(id): TaskId,
) -> AppResult<Json<MessageResponse>> {
    let task = find_task(&state, id).await?;

    // The row goes away even if the image cannot be removed.
    if let Some(key) = task.image_filename.as_deref() {
        if let Err(e) = state.storage.delete(key).await {
            warn!(task_id = id, key, "Leaving orphaned image after task delete: {}", e);
        }
    }

    if !state.tasks.delete(id).await? {
        return Err(AppError::NotFound("Task not found".to_string()));
    }

    info!(task_id = id, "Task deleted");
    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}
