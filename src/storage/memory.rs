use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::TaskStore;
use crate::models::Task;

/// Process-local task store. One lock guards the whole map; it is never held
/// across an `.await`.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: Task) -> anyhow::Result<Task> {
        self.tasks.write().insert(task.id, task.clone());
        Ok(task)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Task>> {
        Ok(self.tasks.read().get(&id).cloned())
    }

    async fn list(&self) -> anyhow::Result<Vec<Task>> {
        Ok(self.tasks.read().values().cloned().collect())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Task>> {
        Ok(self
            .tasks
            .read()
            .values()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, task: Task) -> anyhow::Result<Option<Task>> {
        let mut tasks = self.tasks.write();
        match tasks.get_mut(&id) {
            Some(slot) => {
                *slot = task.clone();
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.tasks.write().remove(&id).is_some())
    }
}
