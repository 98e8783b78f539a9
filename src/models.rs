use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::Config;
use crate::db::TaskRepository;
use crate::storage::StorageClient;
use crate::types::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<dyn TaskRepository>,
    pub storage: StorageClient,
    pub config: Config,
}

/// A persisted task. Serializes directly into the API representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub image_filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
}

/// Body accepted by the create and update endpoints.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TaskInput {
    #[validate(
        required(message = "Title is required"),
        length(min = 1, max = 255, message = "Title must be between 1 and 255 characters")
    )]
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_completed: Option<bool>,
}

impl TaskInput {
    /// Trims the title and runs field validation.
    pub fn validated(mut self) -> AppResult<Self> {
        self.title = self.title.map(|t| t.trim().to_string());
        self.validate().map_err(|errors| {
            let mut messages: Vec<String> = errors
                .field_errors()
                .into_iter()
                .flat_map(|(field, errs)| {
                    errs.iter().map(move |e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Invalid value for {}", field))
                    })
                })
                .collect();
            messages.sort();
            messages.dedup();
            AppError::Validation(messages.join("; "))
        })?;
        Ok(self)
    }

    /// Converts a validated input into an insertable task.
    pub fn into_new_task(self) -> NewTask {
        NewTask {
            title: self.title.unwrap_or_default(),
            description: Some(self.description.unwrap_or_default()),
            is_completed: self.is_completed.unwrap_or(false),
        }
    }

    /// Applies a validated input on top of an existing task. Omitted optional
    /// fields keep their previous values; the title is always replaced.
    pub fn apply_to(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = Some(description);
        }
        if let Some(is_completed) = self.is_completed {
            task.is_completed = is_completed;
        }
    }
}
