// Taskdeck - task management API with image attachments in object storage

pub mod config;
pub mod db;
pub mod models;
pub mod types;
pub mod storage;
pub mod routes;
pub mod middleware;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
pub use routes::create_router;
