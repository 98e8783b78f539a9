use async_trait::async_trait;
use sqlx::PgPool;

use super::TaskRepository;
use crate::models::{NewTask, Task};
use crate::types::AppResult;

const TASK_COLUMNS: &str = "id, title, description, is_completed, created_at, image_filename";

/// Postgres-backed task storage.
#[derive(Clone)]
pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn list(&self) -> AppResult<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    async fn get(&self, id: i32) -> AppResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn create(&self, task: NewTask) -> AppResult<Task> {
        let created = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, description, is_completed)
            VALUES ($1, $2, $3)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.is_completed)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(task_id = created.id, "Created task");
        Ok(created)
    }

    async fn update_details(&self, task: &Task) -> AppResult<Option<Task>> {
        let updated = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET title = $1, description = $2, is_completed = $3
            WHERE id = $4
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.is_completed)
        .bind(task.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn set_image(&self, id: i32, key: &str) -> AppResult<Option<Task>> {
        let updated = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET image_filename = $1 WHERE id = $2 RETURNING {TASK_COLUMNS}"
        ))
        .bind(key)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::info!(task_id = id, rows = result.rows_affected(), "Deleted task");
        Ok(result.rows_affected() > 0)
    }
}
