// In-process task repository used by handler tests

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use super::TaskRepository;
use crate::models::{NewTask, Task};
use crate::types::AppResult;

#[derive(Default)]
pub struct MemoryTaskRepository {
    rows: RwLock<Vec<Task>>,
    fail_writes: AtomicBool,
}

impl MemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Makes every later update fail as if the database went away.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), sqlx::Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for MemoryTaskRepository {
    async fn list(&self) -> AppResult<Vec<Task>> {
        let mut tasks = self.rows.read().await.clone();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    async fn get(&self, id: i32) -> AppResult<Option<Task>> {
        Ok(self.rows.read().await.iter().find(|t| t.id == id).cloned())
    }

    async fn create(&self, task: NewTask) -> AppResult<Task> {
        let mut rows = self.rows.write().await;
        let id = rows.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        // Spread timestamps so ordering does not depend on clock resolution.
        let created_at = Utc::now() + Duration::milliseconds(i64::from(id));
        let created = Task {
            id,
            title: task.title,
            description: task.description,
            is_completed: task.is_completed,
            created_at: Some(created_at),
            image_filename: None,
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn update_details(&self, task: &Task) -> AppResult<Option<Task>> {
        self.check_writable()?;
        let mut rows = self.rows.write().await;
        Ok(rows.iter_mut().find(|t| t.id == task.id).map(|row| {
            row.title = task.title.clone();
            row.description = task.description.clone();
            row.is_completed = task.is_completed;
            row.clone()
        }))
    }

    async fn set_image(&self, id: i32, key: &str) -> AppResult<Option<Task>> {
        self.check_writable()?;
        let mut rows = self.rows.write().await;
        Ok(rows.iter_mut().find(|t| t.id == id).map(|row| {
            row.image_filename = Some(key.to_string());
            row.clone()
        }))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|t| t.id != id);
        Ok(rows.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryTaskRepository, Task) {
        let repo = MemoryTaskRepository::new();
        let task = repo
            .create(NewTask {
                title: "Scan receipts".to_string(),
                description: Some(String::new()),
                is_completed: false,
            })
            .await
            .unwrap();
        (repo, task)
    }

    #[tokio::test]
    async fn test_details_update_leaves_image_alone() {
        let (repo, task) = seeded().await;

        // Read before an image lands, write back after it.
        let mut stale = repo.get(task.id).await.unwrap().unwrap();
        repo.set_image(task.id, "fresh.png").await.unwrap().unwrap();
        stale.title = "Scan all receipts".to_string();
        stale.is_completed = true;

        let updated = repo.update_details(&stale).await.unwrap().unwrap();
        assert_eq!(updated.title, "Scan all receipts");
        assert!(updated.is_completed);
        assert_eq!(updated.image_filename.as_deref(), Some("fresh.png"));
    }

    #[tokio::test]
    async fn test_image_update_leaves_details_alone() {
        let (repo, task) = seeded().await;

        let mut edited = task.clone();
        edited.title = "Renamed".to_string();
        repo.update_details(&edited).await.unwrap();

        let updated = repo.set_image(task.id, "new.png").await.unwrap().unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.image_filename.as_deref(), Some("new.png"));
    }

    #[tokio::test]
    async fn test_updates_on_missing_row() {
        let (repo, task) = seeded().await;
        assert!(repo.delete(task.id).await.unwrap());

        assert!(repo.update_details(&task).await.unwrap().is_none());
        assert!(repo.set_image(task.id, "late.png").await.unwrap().is_none());
    }
}
