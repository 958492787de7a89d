use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::error::{DomainError, DomainResult};
use crate::models::{NewTask, Task, TaskPatch, TaskStatus};
use crate::storage::TaskStore;
use crate::validation;

/// Task operations on behalf of a caller.
///
/// Every call takes the caller's id and only ever sees that caller's tasks:
/// a task owned by someone else behaves exactly like a task that does not
/// exist. Read-then-write operations are serialised so each one is applied
/// atomically with respect to the others.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    write_lock: Arc<Mutex<()>>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    #[instrument(name = "todo.service.create", skip(self, new_task), fields(owner_id = %owner_id))]
    pub async fn create(&self, owner_id: Uuid, new_task: NewTask) -> DomainResult<Task> {
        let errors = validation::validate_new_task(&new_task);
        if !errors.is_empty() {
            debug!(?errors, "rejected new task");
            return Err(DomainError::validation(errors));
        }

        let task = Task::new(Uuid::new_v4(), owner_id, new_task);
        let _guard = self.write_lock.lock().await;
        let stored = self.store.insert(task).await?;

        info!(task_id = %stored.id, "task created");
        Ok(stored)
    }

    #[instrument(name = "todo.service.get", skip(self), fields(owner_id = %owner_id, task_id = %id))]
    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> DomainResult<Task> {
        self.find_owned(owner_id, id).await
    }

    #[instrument(name = "todo.service.list", skip(self), fields(owner_id = %owner_id))]
    pub async fn list(
        &self,
        owner_id: Uuid,
        status: Option<TaskStatus>,
    ) -> DomainResult<Vec<Task>> {
        let mut tasks = self.store.list_by_owner(owner_id).await?;
        // Stores may filter by owner natively; never trust that they did.
        tasks.retain(|t| t.owner_id == owner_id && status.map_or(true, |s| t.status == s));

        debug!(count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    #[instrument(name = "todo.service.update", skip(self, patch), fields(owner_id = %owner_id, task_id = %id))]
    pub async fn update(&self, owner_id: Uuid, id: Uuid, patch: TaskPatch) -> DomainResult<Task> {
        let _guard = self.write_lock.lock().await;
        let mut task = self.find_owned(owner_id, id).await?;

        task.update(patch).map_err(|errors| {
            debug!(?errors, "rejected task update");
            DomainError::validation(errors)
        })?;

        let updated = self.persist(task).await?;
        info!("task updated");
        Ok(updated)
    }

    /// Returns false when the task is absent or owned by someone else.
    #[instrument(name = "todo.service.delete", skip(self), fields(owner_id = %owner_id, task_id = %id))]
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> DomainResult<bool> {
        let _guard = self.write_lock.lock().await;
        match self.find_owned(owner_id, id).await {
            Ok(_) => {}
            Err(DomainError::NotFound) => return Ok(false),
            Err(e) => return Err(e),
        }

        let deleted = self.store.delete(id).await?;
        info!(deleted, "task deleted");
        Ok(deleted)
    }

    #[instrument(name = "todo.service.set_status", skip(self), fields(owner_id = %owner_id, task_id = %id, status = %status))]
    pub async fn set_status(
        &self,
        owner_id: Uuid,
        id: Uuid,
        status: TaskStatus,
    ) -> DomainResult<Task> {
        let _guard = self.write_lock.lock().await;
        let mut task = self.find_owned(owner_id, id).await?;
        task.set_status(status);

        let updated = self.persist(task).await?;
        info!("task status changed");
        Ok(updated)
    }

    /// Two-state view of the status: completed tasks go back to pending,
    /// anything else becomes completed.
    #[instrument(name = "todo.service.toggle_completion", skip(self), fields(owner_id = %owner_id, task_id = %id))]
    pub async fn toggle_completion(&self, owner_id: Uuid, id: Uuid) -> DomainResult<Task> {
        let _guard = self.write_lock.lock().await;
        let mut task = self.find_owned(owner_id, id).await?;
        if task.is_completed() {
            task.mark_pending();
        } else {
            task.mark_completed();
        }

        let updated = self.persist(task).await?;
        info!(status = %updated.status, "task completion toggled");
        Ok(updated)
    }

    // --- helpers ---

    async fn find_owned(&self, owner_id: Uuid, id: Uuid) -> DomainResult<Task> {
        match self.store.get(id).await? {
            Some(task) if task.owner_id == owner_id => Ok(task),
            Some(_) => {
                debug!("task belongs to another owner");
                Err(DomainError::NotFound)
            }
            None => Err(DomainError::NotFound),
        }
    }

    async fn persist(&self, task: Task) -> DomainResult<Task> {
        self.store
            .update(task.id, task)
            .await?
            .ok_or(DomainError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryTaskStore, TaskStore};
    use proptest::prelude::*;

    fn setup() -> (TaskService, Arc<InMemoryTaskStore>) {
        let store = Arc::new(InMemoryTaskStore::new());
        (TaskService::new(store.clone()), store)
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.into(),
            ..NewTask::default()
        }
    }

    #[tokio::test]
    async fn create_trims_title_and_defaults_to_pending() {
        let (service, _) = setup();
        let owner = Uuid::new_v4();
        let longest = "t".repeat(200);

        for title in ["Buy milk", "  spaced out  ", longest.as_str()] {
            let task = service.create(owner, new_task(title)).await.unwrap();
            assert_eq!(task.title, title.trim());
            assert_eq!(task.owner_id, owner);
            assert_eq!(task.status, TaskStatus::Pending);
            assert_eq!(task.created_at, task.updated_at);
        }
    }

    #[tokio::test]
    async fn blank_title_is_rejected_without_storing() {
        let (service, store) = setup();
        for title in ["", "   ", "\t"] {
            let err = service
                .create(Uuid::new_v4(), new_task(title))
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn validation_errors_are_aggregated() {
        let (service, store) = setup();
        let err = service
            .create(
                Uuid::new_v4(),
                NewTask {
                    title: " ".into(),
                    description: Some("d".repeat(1001)),
                    due_date: None,
                },
            )
            .await
            .unwrap_err();

        match err {
            DomainError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("Expected Validation error, got {other:?}"),
        }
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn long_description_fails_on_update_and_keeps_task() {
        let (service, _) = setup();
        let owner = Uuid::new_v4();
        let task = service.create(owner, new_task("keep me")).await.unwrap();

        let err = service
            .update(
                owner,
                task.id,
                TaskPatch {
                    title: Some("changed".into()),
                    description: Some("x".repeat(1001)),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(service.get(owner, task.id).await.unwrap(), task);
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (service, _) = setup();
        let owner = Uuid::new_v4();
        let created = service
            .create(
                owner,
                NewTask {
                    title: "Dentist".into(),
                    description: Some("Tuesday".into()),
                    due_date: Some(chrono::Utc::now()),
                },
            )
            .await
            .unwrap();

        assert_eq!(service.get(owner, created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let (service, _) = setup();
        let owner = Uuid::new_v4();
        let created = service.create(owner, new_task("Read book")).await.unwrap();

        let updated = service
            .update(
                owner,
                created.id,
                TaskPatch {
                    title: Some("Read two books".into()),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();

        let fetched = service.get(owner, created.id).await.unwrap();
        assert_eq!(fetched, updated);
        assert_eq!(fetched.title, "Read two books");
        assert_eq!(fetched.description, created.description);
        assert_eq!(fetched.status, created.status);
        assert_eq!(fetched.created_at, created.created_at);
        assert_eq!(fetched.owner_id, owner);
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        let (service, _) = setup();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let task = service.create(a, new_task("A's secret")).await.unwrap();

        assert!(matches!(
            service.get(b, task.id).await,
            Err(DomainError::NotFound)
        ));
        assert!(service.list(b, None).await.unwrap().is_empty());
        assert!(matches!(
            service
                .update(
                    b,
                    task.id,
                    TaskPatch {
                        title: Some("hijacked".into()),
                        ..TaskPatch::default()
                    }
                )
                .await,
            Err(DomainError::NotFound)
        ));
        assert!(matches!(
            service.set_status(b, task.id, TaskStatus::Completed).await,
            Err(DomainError::NotFound)
        ));
        assert!(!service.delete(b, task.id).await.unwrap());

        assert_eq!(service.get(a, task.id).await.unwrap(), task);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let (service, _) = setup();
        let owner = Uuid::new_v4();
        let first = service.create(owner, new_task("one")).await.unwrap();
        service.create(owner, new_task("two")).await.unwrap();
        service.create(Uuid::new_v4(), new_task("other")).await.unwrap();
        service
            .set_status(owner, first.id, TaskStatus::Completed)
            .await
            .unwrap();

        assert_eq!(service.list(owner, None).await.unwrap().len(), 2);
        let done = service
            .list(owner, Some(TaskStatus::Completed))
            .await
            .unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, first.id);
        assert!(service
            .list(owner, Some(TaskStatus::InProgress))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn any_status_can_reach_any_status() {
        let (service, _) = setup();
        let owner = Uuid::new_v4();
        let task = service.create(owner, new_task("cycle")).await.unwrap();

        for from in TaskStatus::ALL {
            for to in TaskStatus::ALL {
                let before = service.set_status(owner, task.id, from).await.unwrap();
                let after = service.set_status(owner, task.id, to).await.unwrap();
                assert_eq!(after.status, to);
                assert!(after.updated_at > before.updated_at);
            }
        }
    }

    #[tokio::test]
    async fn toggle_maps_between_completed_and_pending() {
        let (service, _) = setup();
        let owner = Uuid::new_v4();
        let task = service.create(owner, new_task("flip")).await.unwrap();
        service
            .set_status(owner, task.id, TaskStatus::InProgress)
            .await
            .unwrap();

        let toggled = service.toggle_completion(owner, task.id).await.unwrap();
        assert_eq!(toggled.status, TaskStatus::Completed);
        let toggled = service.toggle_completion(owner, task.id).await.unwrap();
        assert_eq!(toggled.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let (service, _) = setup();
        let owner = Uuid::new_v4();
        let id = Uuid::new_v4();

        assert!(matches!(service.get(owner, id).await, Err(DomainError::NotFound)));
        assert!(matches!(
            service.toggle_completion(owner, id).await,
            Err(DomainError::NotFound)
        ));
        assert!(!service.delete(owner, id).await.unwrap());
    }

    #[tokio::test]
    async fn buy_milk_scenario() {
        let (service, _) = setup();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let task = service.create(a, new_task("Buy milk")).await.unwrap();
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description, None);
        assert_eq!(task.status, TaskStatus::Pending);

        let task = service
            .update(
                a,
                task.id,
                TaskPatch {
                    description: Some("2%".into()),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description.as_deref(), Some("2%"));
        assert_eq!(task.status, TaskStatus::Pending);

        let completed = service
            .set_status(a, task.id, TaskStatus::Completed)
            .await
            .unwrap();
        assert_eq!(completed.status, TaskStatus::Completed);
        assert!(completed.updated_at > task.updated_at);

        assert!(matches!(service.get(b, task.id).await, Err(DomainError::NotFound)));

        assert!(service.delete(a, task.id).await.unwrap());
        assert!(matches!(service.get(a, task.id).await, Err(DomainError::NotFound)));
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    /// Visible text of up to 190 chars wrapped in up to 5 blanks on each side.
    fn padded_title() -> impl Strategy<Value = String> {
        ("[ \t]{0,5}", "\\PC{1,190}", "[ \t]{0,5}")
            .prop_filter("needs a visible character", |(_, core, _)| {
                !core.trim().is_empty()
            })
            .prop_map(|(left, core, right)| format!("{left}{core}{right}"))
    }

    fn blank_title() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop::sample::select(vec![' ', '\t', '\n', '\r', '\u{3000}']),
            0..20,
        )
        .prop_map(|chars| chars.into_iter().collect())
    }

    fn oversized_description() -> impl Strategy<Value = String> {
        prop::collection::vec(any::<char>(), 1001..3000)
            .prop_map(|chars| chars.into_iter().collect())
    }

    proptest! {
        #[test]
        fn visible_titles_are_stored_trimmed(title in padded_title()) {
            let rt = runtime();
            let (service, _) = setup();
            let owner = Uuid::new_v4();

            let task = rt.block_on(service.create(owner, new_task(&title))).unwrap();
            prop_assert_eq!(task.title.as_str(), title.trim());
            prop_assert_eq!(task.status, TaskStatus::Pending);
            let fetched = rt.block_on(service.get(owner, task.id)).unwrap();
            prop_assert_eq!(fetched, task);
        }

        #[test]
        fn blank_titles_never_reach_the_store(title in blank_title()) {
            let rt = runtime();
            let (service, store) = setup();

            let result = rt.block_on(service.create(Uuid::new_v4(), new_task(&title)));
            prop_assert!(matches!(result, Err(DomainError::Validation(_))));
            prop_assert!(rt.block_on(store.list()).unwrap().is_empty());
        }

        #[test]
        fn oversized_description_is_rejected_on_create(description in oversized_description()) {
            let rt = runtime();
            let (service, store) = setup();

            let result = rt.block_on(service.create(
                Uuid::new_v4(),
                NewTask {
                    title: "fine".into(),
                    description: Some(description),
                    due_date: None,
                },
            ));
            prop_assert!(matches!(result, Err(DomainError::Validation(_))));
            prop_assert!(rt.block_on(store.list()).unwrap().is_empty());
        }

        #[test]
        fn oversized_description_is_rejected_on_update(
            title in padded_title(),
            description in oversized_description(),
        ) {
            let rt = runtime();
            let (service, _) = setup();
            let owner = Uuid::new_v4();
            let task = rt.block_on(service.create(owner, new_task("keep me"))).unwrap();

            let result = rt.block_on(service.update(
                owner,
                task.id,
                TaskPatch {
                    title: Some(title),
                    description: Some(description),
                    ..TaskPatch::default()
                },
            ));
            prop_assert!(matches!(result, Err(DomainError::Validation(_))));
            prop_assert_eq!(rt.block_on(service.get(owner, task.id)).unwrap(), task);
        }

        #[test]
        fn status_sequences_always_apply(
            statuses in prop::collection::vec(prop::sample::select(TaskStatus::ALL.to_vec()), 1..30)
        ) {
            let rt = runtime();
            let (service, _) = setup();
            let owner = Uuid::new_v4();
            let mut previous = rt.block_on(service.create(owner, new_task("cycle"))).unwrap();

            for status in statuses {
                let next = rt.block_on(service.set_status(owner, previous.id, status)).unwrap();
                prop_assert_eq!(next.status, status);
                prop_assert!(next.updated_at > previous.updated_at);
                prop_assert_eq!(next.created_at, previous.created_at);
                previous = next;
            }
        }
    }
}
