use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use crate::config::DatabaseConfig;
use crate::models::{NewTask, Task};
use crate::types::AppResult;
use anyhow::Result;
use tracing::info;

pub use operations::*;

pub mod operations;
#[cfg(test)]
pub mod memory;

/// Persistence operations for tasks.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// All tasks, newest first.
    async fn list(&self) -> AppResult<Vec<Task>>;

    async fn get(&self, id: i32) -> AppResult<Option<Task>>;

    async fn create(&self, task: NewTask) -> AppResult<Task>;

    /// Writes title, description and completion of `task`. `image_filename`
    /// is left alone. `None` when the row no longer exists.
    async fn update_details(&self, task: &Task) -> AppResult<Option<Task>>;

    /// Points the task at a new stored image key.
    async fn set_image(&self, id: i32, key: &str) -> AppResult<Option<Task>>;

    /// Returns false when no row had that id.
    async fn delete(&self, id: i32) -> AppResult<bool>;
}

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect(&config.url)
        .await?;

    // Test connection
    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await?;

    Ok(pool)
}

/// Creates the tasks table when it does not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id SERIAL PRIMARY KEY,
            title VARCHAR(255) NOT NULL,
            description TEXT,
            is_completed BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            image_filename VARCHAR(255)
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Tasks table is ready");
    Ok(())
}
