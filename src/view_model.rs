//! In-memory mirror of the backend's task list.
//!
//! All mutations are applied only after the backend confirms them, and the
//! backend's copy of the task always wins over the local patch. Methods take
//! `&self` so a UI can have several calls in flight; the internal lock is
//! never held across an `.await`.
//!
//! Overlapping calls are not deduplicated. Two `update`s on the same id
//! resolve last-write-wins by response arrival. `load` responses carry a
//! sequence number and are dropped when a newer `load` was issued meanwhile.
//! An applied `load` replaces the whole list even if a mutation is still in
//! flight; the next reload reconciles.

use crate::backend::TaskBackend;
use crate::error::TaskError;
use crate::model::{Statistics, Task, TaskDraft, TaskFilter, TaskId, TaskPatch};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The list was replaced with this many tasks.
    Replaced(usize),
    /// A newer `load` was issued before this response arrived; nothing changed.
    Superseded,
}

#[derive(Debug, Default)]
struct Collection {
    tasks: Vec<Task>,
    loading: bool,
}

pub struct TaskViewModel<B> {
    backend: Arc<B>,
    token: String,
    state: Mutex<Collection>,
    load_seq: AtomicU64,
}

impl<B: TaskBackend> TaskViewModel<B> {
    pub fn new(backend: Arc<B>, token: impl Into<String>) -> Self {
        Self {
            backend,
            token: token.into(),
            state: Mutex::new(Collection::default()),
            load_seq: AtomicU64::new(0),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut Collection) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub async fn load(&self) -> Result<LoadOutcome, TaskError> {
        let ticket = self.load_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.with_state(|s| s.loading = true);
        debug!(ticket, "loading tasks");

        let result = self.backend.list_tasks(&self.token).await;

        self.with_state(|s| {
            let latest = self.load_seq.load(Ordering::SeqCst) == ticket;
            if latest {
                s.loading = false;
            }
            match result {
                Ok(tasks) if latest => {
                    let count = tasks.len();
                    s.tasks = tasks;
                    info!(count, "task list replaced");
                    Ok(LoadOutcome::Replaced(count))
                }
                Ok(_) => {
                    debug!(ticket, "discarding stale task list");
                    Ok(LoadOutcome::Superseded)
                }
                Err(e) => {
                    warn!(ticket, error = %e, "loading tasks failed");
                    Err(TaskError::Load(e))
                }
            }
        })
    }

    pub async fn add(&self, draft: TaskDraft) -> Result<Task, TaskError> {
        if draft.title.trim().is_empty() {
            return Err(TaskError::Validation("Task title must not be empty".to_string()));
        }

        let created = self
            .backend
            .create_task(&self.token, &draft)
            .await
            .map_err(|e| {
                warn!(error = %e, "creating task failed");
                TaskError::Create(e)
            })?;

        self.with_state(|s| {
            // A reload that finished in between may already carry the new task.
            match s.tasks.iter().position(|t| t.id == created.id) {
                Some(idx) => s.tasks[idx] = created.clone(),
                None => s.tasks.push(created.clone()),
            }
        });
        info!(id = created.id, "task created");
        Ok(created)
    }

    pub async fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Task, TaskError> {
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(TaskError::Validation("Task title must not be empty".to_string()));
        }

        let updated = self
            .backend
            .update_task(&self.token, id, &patch)
            .await
            .map_err(|e| {
                warn!(id, error = %e, "updating task failed");
                TaskError::Update(e)
            })?;

        self.with_state(|s| match s.tasks.iter().position(|t| t.id == id) {
            Some(idx) => s.tasks[idx] = updated.clone(),
            None => debug!(id, "updated task no longer listed, dropping result"),
        });
        Ok(updated)
    }

    /// Flips the completion flag of a listed task.
    pub async fn toggle(&self, id: TaskId) -> Result<Task, TaskError> {
        let status = self
            .with_state(|s| s.tasks.iter().find(|t| t.id == id).map(|t| t.status))
            .ok_or(TaskError::UnknownTask(id))?;
        self.update(id, TaskPatch::status(!status)).await
    }

    pub async fn remove(&self, id: TaskId) -> Result<(), TaskError> {
        self.backend
            .delete_task(&self.token, id)
            .await
            .map_err(|e| {
                warn!(id, error = %e, "deleting task failed");
                TaskError::Delete(e)
            })?;

        self.with_state(|s| s.tasks.retain(|t| t.id != id));
        info!(id, "task deleted");
        Ok(())
    }

    pub fn filtered_view(&self, filter: &TaskFilter) -> Vec<Task> {
        self.with_state(|s| filter.apply(&s.tasks))
    }

    pub fn statistics(&self) -> Statistics {
        self.with_state(|s| Statistics::from_tasks(&s.tasks))
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.with_state(|s| s.tasks.clone())
    }

    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.with_state(|s| s.tasks.iter().find(|t| t.id == id).cloned())
    }

    pub fn is_loading(&self) -> bool {
        self.with_state(|s| s.loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::fake_backend::{FakeBackend, Call, task};
    use crate::model::{Priority, StatusFilter};
    use tokio::sync::oneshot;

    fn model_with(backend: FakeBackend) -> (Arc<FakeBackend>, TaskViewModel<FakeBackend>) {
        let backend = Arc::new(backend);
        let vm = TaskViewModel::new(backend.clone(), "tok");
        (backend, vm)
    }

    async fn loaded(tasks: Vec<Task>) -> (Arc<FakeBackend>, TaskViewModel<FakeBackend>) {
        let backend = FakeBackend::default();
        backend.push_list(Ok(tasks));
        let (backend, vm) = model_with(backend);
        vm.load().await.unwrap();
        (backend, vm)
    }

    #[tokio::test]
    async fn load_replaces_collection() {
        let (backend, vm) = loaded(vec![task(1, "a", false), task(2, "b", true)]).await;
        assert_eq!(vm.tasks().len(), 2);
        assert!(!vm.is_loading());

        backend.push_list(Ok(vec![task(3, "c", false)]));
        assert_eq!(vm.load().await.unwrap(), LoadOutcome::Replaced(1));
        assert_eq!(vm.tasks(), vec![task(3, "c", false)]);
        assert_eq!(backend.calls()[0], Call::List("tok".to_string()));
    }

    #[tokio::test]
    async fn load_unauthorized_signals_logout() {
        let (backend, vm) = loaded(vec![task(1, "a", false)]).await;
        backend.push_list(Err(BackendError::Unauthorized));

        let err = vm.load().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(matches!(err, TaskError::Load(BackendError::Unauthorized)));
        assert_eq!(vm.tasks().len(), 1);
        assert!(!vm.is_loading());
    }

    #[tokio::test]
    async fn add_rejects_blank_title_without_network() {
        let (backend, vm) = loaded(vec![task(1, "a", false)]).await;
        let before = backend.calls().len();

        for title in ["", "   ", "\t\n"] {
            let err = vm.add(TaskDraft::new(title)).await.unwrap_err();
            assert!(matches!(err, TaskError::Validation(_)));
        }
        assert_eq!(vm.tasks().len(), 1);
        assert_eq!(backend.calls().len(), before);
    }

    #[tokio::test]
    async fn add_appends_canonical_task() {
        let (backend, vm) = loaded(vec![task(5, "existing", false)]).await;
        let canonical = task(1, "Buy milk", false);
        backend.push_create(Ok(canonical.clone()));

        let created = vm.add(TaskDraft::new("Buy milk")).await.unwrap();
        assert_eq!(created, canonical);
        assert_eq!(vm.tasks().len(), 2);
        assert_eq!(vm.tasks()[1], canonical);
    }

    #[tokio::test]
    async fn add_failure_leaves_collection() {
        let (backend, vm) = loaded(vec![task(5, "existing", false)]).await;
        backend.push_create(Err(BackendError::Network("connection refused".into())));

        let err = vm
            .add(TaskDraft::new("Buy milk").with_priority(Priority::High))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Create(BackendError::Network(_))));
        assert_eq!(vm.tasks(), vec![task(5, "existing", false)]);
    }

    #[tokio::test]
    async fn add_does_not_duplicate_an_already_listed_id() {
        let (backend, vm) = loaded(vec![task(1, "Buy milk", false)]).await;
        backend.push_create(Ok(task(1, "Buy milk", false)));
        vm.add(TaskDraft::new("Buy milk")).await.unwrap();
        assert_eq!(vm.tasks().len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_only_the_target() {
        let original = vec![task(1, "a", false), task(2, "b", false), task(3, "c", true)];
        let (backend, vm) = loaded(original.clone()).await;
        let mut canonical = task(1, "a (server)", true);
        canonical.description = Some("set by server".into());
        backend.push_update(Ok(canonical.clone()));

        let got = vm.update(1, TaskPatch::status(true)).await.unwrap();
        assert_eq!(got, canonical);

        let now = vm.tasks();
        assert_eq!(now[0], canonical);
        assert_eq!(now[1], original[1]);
        assert_eq!(now[2], original[2]);
        assert_eq!(
            backend.calls().last(),
            Some(&Call::Update(1, TaskPatch::status(true)))
        );
    }

    #[tokio::test]
    async fn update_of_unlisted_id_is_dropped() {
        let (backend, vm) = loaded(vec![task(1, "a", false)]).await;
        backend.push_update(Ok(task(9, "ghost", true)));

        vm.update(9, TaskPatch::status(true)).await.unwrap();
        assert_eq!(vm.tasks(), vec![task(1, "a", false)]);
    }

    #[tokio::test]
    async fn update_failure_keeps_last_known_good() {
        let (backend, vm) = loaded(vec![task(1, "a", false)]).await;
        backend.push_update(Err(BackendError::NotFound("Task not found".into())));

        let err = vm.update(1, TaskPatch::title("renamed")).await.unwrap_err();
        assert!(matches!(err, TaskError::Update(BackendError::NotFound(_))));
        assert_eq!(vm.tasks(), vec![task(1, "a", false)]);
    }

    #[tokio::test]
    async fn update_rejects_blank_title_locally() {
        let (backend, vm) = loaded(vec![task(1, "a", false)]).await;
        let before = backend.calls().len();
        let err = vm.update(1, TaskPatch::title("  ")).await.unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
        assert_eq!(backend.calls().len(), before);
    }

    #[tokio::test]
    async fn toggle_sends_inverted_status() {
        let (backend, vm) = loaded(vec![task(1, "a", true)]).await;
        backend.push_update(Ok(task(1, "a", false)));

        let got = vm.toggle(1).await.unwrap();
        assert!(!got.status);
        assert_eq!(
            backend.calls().last(),
            Some(&Call::Update(1, TaskPatch::status(false)))
        );

        assert_eq!(vm.toggle(42).await.unwrap_err(), TaskError::UnknownTask(42));
    }

    #[tokio::test]
    async fn remove_missing_id_still_calls_backend() {
        let (backend, vm) = loaded(vec![task(2, "b", false)]).await;
        backend.push_delete(Ok(()));

        vm.remove(1).await.unwrap();
        assert_eq!(vm.tasks().len(), 1);
        assert_eq!(backend.calls().last(), Some(&Call::Delete(1)));
    }

    #[tokio::test]
    async fn remove_drops_entry_and_failure_keeps_it() {
        let (backend, vm) = loaded(vec![task(1, "a", false), task(2, "b", false)]).await;
        backend.push_delete(Err(BackendError::Network("reset".into())));
        assert!(matches!(
            vm.remove(1).await.unwrap_err(),
            TaskError::Delete(BackendError::Network(_))
        ));
        assert_eq!(vm.tasks().len(), 2);

        backend.push_delete(Ok(()));
        vm.remove(1).await.unwrap();
        assert_eq!(vm.tasks(), vec![task(2, "b", false)]);
    }

    #[tokio::test]
    async fn views_are_snapshots() {
        let (backend, vm) = loaded(vec![task(1, "foobar", false), task(2, "x", true)]).await;
        let view = vm.filtered_view(&TaskFilter::new(StatusFilter::All, "foo"));
        let stats = vm.statistics();

        backend.push_delete(Ok(()));
        vm.remove(1).await.unwrap();

        assert_eq!(view.len(), 1);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.percentage, 50);
        assert_eq!(vm.statistics().total, 1);
    }

    #[tokio::test]
    async fn concurrent_updates_last_arrival_wins() {
        let (backend, vm) = loaded(vec![task(1, "a", false)]).await;
        let vm = Arc::new(vm);
        let (tx_first, rx_first) = oneshot::channel();
        let (tx_second, rx_second) = oneshot::channel();
        backend.gate_update("first", rx_first);
        backend.gate_update("second", rx_second);

        let first = tokio::spawn({
            let vm = vm.clone();
            async move { vm.update(1, TaskPatch::title("first")).await }
        });
        let second = tokio::spawn({
            let vm = vm.clone();
            async move { vm.update(1, TaskPatch::title("second")).await }
        });
        while backend.update_calls() < 2 {
            tokio::task::yield_now().await;
        }

        // Responses arrive in reverse issue order.
        tx_second.send(Ok(task(1, "second", false))).unwrap();
        second.await.unwrap().unwrap();
        assert_eq!(vm.get(1).unwrap().title, "second");

        tx_first.send(Ok(task(1, "first", false))).unwrap();
        first.await.unwrap().unwrap();
        assert_eq!(vm.get(1).unwrap().title, "first");
        assert_eq!(vm.tasks().len(), 1);
    }

    #[tokio::test]
    async fn stale_load_is_discarded() {
        let (backend, vm) = model_with(FakeBackend::default());
        let vm = Arc::new(vm);
        let (tx_old, rx_old) = oneshot::channel();
        let (tx_new, rx_new) = oneshot::channel();
        backend.gate_list(rx_old);
        backend.gate_list(rx_new);

        let a = tokio::spawn({
            let vm = vm.clone();
            async move { vm.load().await }
        });
        while backend.list_calls() < 1 {
            tokio::task::yield_now().await;
        }
        let b = tokio::spawn({
            let vm = vm.clone();
            async move { vm.load().await }
        });
        while backend.list_calls() < 2 {
            tokio::task::yield_now().await;
        }

        tx_new.send(Ok(vec![task(2, "fresh", false)])).unwrap();
        assert_eq!(b.await.unwrap().unwrap(), LoadOutcome::Replaced(1));
        assert!(!vm.is_loading());

        tx_old.send(Ok(vec![task(1, "stale", false)])).unwrap();
        assert_eq!(a.await.unwrap().unwrap(), LoadOutcome::Superseded);
        assert_eq!(vm.tasks(), vec![task(2, "fresh", false)]);
    }

    #[tokio::test]
    async fn applied_load_overrides_in_flight_mutation() {
        let (backend, vm) = loaded(vec![task(1, "a", false)]).await;
        let vm = Arc::new(vm);
        let (tx, rx) = oneshot::channel();
        backend.gate_update("renamed", rx);

        let pending = tokio::spawn({
            let vm = vm.clone();
            async move { vm.update(1, TaskPatch::title("renamed")).await }
        });
        while backend.update_calls() < 1 {
            tokio::task::yield_now().await;
        }

        tx.send(Ok(task(1, "renamed", false))).unwrap();
        pending.await.unwrap().unwrap();
        assert_eq!(vm.get(1).unwrap().title, "renamed");

        // A reload that was answered from an older server state undoes it.
        backend.push_list(Ok(vec![task(1, "a", false)]));
        vm.load().await.unwrap();
        assert_eq!(vm.get(1).unwrap().title, "a");
    }
}
