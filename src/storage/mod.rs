//! Persistence ports and their backends.
//!
//! Stores know nothing about ownership: they are plain keyed collections.
//! Scoping every lookup to the caller happens in the task service.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Task, User};

mod memory;
mod sqlite;

pub use memory::InMemoryTaskStore;
pub use sqlite::{SqliteTaskStore, SqliteUserStore};

/// Keyed collection of tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Stores `task` under `task.id`. An existing entry with the same id is replaced.
    async fn insert(&self, task: Task) -> anyhow::Result<Task>;

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Task>>;

    /// All tasks, in no particular order.
    async fn list(&self) -> anyhow::Result<Vec<Task>>;

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Task>> {
        let mut tasks = self.list().await?;
        tasks.retain(|t| t.owner_id == owner_id);
        Ok(tasks)
    }

    /// Replaces the task stored under `id`. Returns `None` if there is none.
    async fn update(&self, id: Uuid, task: Task) -> anyhow::Result<Option<Task>>;

    /// Returns true if a task was removed.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// `email` is compared case-insensitively.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// `username` is compared case-insensitively.
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    /// Returns false, storing nothing, when the email or username is already taken.
    async fn insert(&self, user: User) -> anyhow::Result<bool>;
    /// Returns false if no user has `user.id`.
    async fn update(&self, user: User) -> anyhow::Result<bool>;
}
