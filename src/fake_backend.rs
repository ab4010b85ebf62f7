//! Scripted in-process backend for unit tests.

use crate::backend::{AuthGrant, Credentials, Registration, TaskBackend};
use crate::error::BackendError;
use crate::model::{Priority, Task, TaskDraft, TaskId, TaskPatch};
use chrono::{TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::oneshot;

type Gate<T> = oneshot::Receiver<Result<T, BackendError>>;

pub fn task(id: TaskId, title: &str, status: bool) -> Task {
    Task {
        id,
        title: title.to_string(),
        description: None,
        status,
        priority: Priority::Medium,
        created: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(String),
    Create(TaskDraft),
    Update(TaskId, TaskPatch),
    Delete(TaskId),
    Login(Credentials),
    Register(Registration),
}

#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    list: Mutex<VecDeque<Result<Vec<Task>, BackendError>>>,
    list_gates: Mutex<VecDeque<Gate<Vec<Task>>>>,
    create: Mutex<VecDeque<Result<Task, BackendError>>>,
    update: Mutex<VecDeque<Result<Task, BackendError>>>,
    update_gates: Mutex<HashMap<String, Gate<Task>>>,
    delete: Mutex<VecDeque<Result<(), BackendError>>>,
    auth: Mutex<VecDeque<Result<AuthGrant, BackendError>>>,
}

impl FakeBackend {
    pub fn push_list(&self, r: Result<Vec<Task>, BackendError>) {
        self.list.lock().unwrap().push_back(r);
    }

    /// The next `list_tasks` call waits on `rx`. Gates are consumed before
    /// scripted results.
    pub fn gate_list(&self, rx: Gate<Vec<Task>>) {
        self.list_gates.lock().unwrap().push_back(rx);
    }

    pub fn push_create(&self, r: Result<Task, BackendError>) {
        self.create.lock().unwrap().push_back(r);
    }

    pub fn push_update(&self, r: Result<Task, BackendError>) {
        self.update.lock().unwrap().push_back(r);
    }

    /// An `update_task` whose patch sets this title waits on `rx`.
    pub fn gate_update(&self, title: &str, rx: Gate<Task>) {
        self.update_gates
            .lock()
            .unwrap()
            .insert(title.to_string(), rx);
    }

    pub fn push_delete(&self, r: Result<(), BackendError>) {
        self.delete.lock().unwrap().push_back(r);
    }

    pub fn push_auth(&self, r: Result<AuthGrant, BackendError>) {
        self.auth.lock().unwrap().push_back(r);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::List(_)))
    }

    pub fn update_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Update(..)))
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn unscripted<T>() -> Result<T, BackendError> {
        Err(BackendError::Network("no scripted response".to_string()))
    }
}

async fn wait<T>(gate: Gate<T>) -> Result<T, BackendError> {
    gate.await
        .unwrap_or_else(|_| Err(BackendError::Network("gate dropped".to_string())))
}

impl TaskBackend for FakeBackend {
    async fn list_tasks(&self, token: &str) -> Result<Vec<Task>, BackendError> {
        self.record(Call::List(token.to_string()));
        let gate = self.list_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            return wait(gate).await;
        }
        let next = self.list.lock().unwrap().pop_front();
        next.unwrap_or_else(Self::unscripted)
    }

    async fn create_task(&self, _token: &str, draft: &TaskDraft) -> Result<Task, BackendError> {
        self.record(Call::Create(draft.clone()));
        let next = self.create.lock().unwrap().pop_front();
        next.unwrap_or_else(Self::unscripted)
    }

    async fn update_task(
        &self,
        _token: &str,
        id: TaskId,
        patch: &TaskPatch,
    ) -> Result<Task, BackendError> {
        self.record(Call::Update(id, patch.clone()));
        let gate = patch
            .title
            .as_ref()
            .and_then(|t| self.update_gates.lock().unwrap().remove(t));
        if let Some(gate) = gate {
            return wait(gate).await;
        }
        let next = self.update.lock().unwrap().pop_front();
        next.unwrap_or_else(Self::unscripted)
    }

    async fn delete_task(&self, _token: &str, id: TaskId) -> Result<(), BackendError> {
        self.record(Call::Delete(id));
        let next = self.delete.lock().unwrap().pop_front();
        next.unwrap_or_else(Self::unscripted)
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant, BackendError> {
        self.record(Call::Login(credentials.clone()));
        let next = self.auth.lock().unwrap().pop_front();
        next.unwrap_or_else(Self::unscripted)
    }

    async fn register(&self, registration: &Registration) -> Result<AuthGrant, BackendError> {
        self.record(Call::Register(registration.clone()));
        let next = self.auth.lock().unwrap().pop_front();
        next.unwrap_or_else(Self::unscripted)
    }
}
