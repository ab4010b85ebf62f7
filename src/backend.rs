//! The contract the view-model and the session layer consume.
//!
//! [`RestClient`](crate::client::RestClient) is the HTTP implementation; tests
//! plug in scripted fakes.

use crate::error::BackendError;
use crate::model::{Task, TaskDraft, TaskId, TaskPatch};
use serde::Serialize;
use std::future::Future;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

/// Token issued by `/login` or `/register`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub token: String,
    pub username: String,
}

pub trait TaskBackend: Send + Sync {
    fn list_tasks(&self, token: &str) -> impl Future<Output = Result<Vec<Task>, BackendError>> + Send;

    fn create_task(
        &self,
        token: &str,
        draft: &TaskDraft,
    ) -> impl Future<Output = Result<Task, BackendError>> + Send;

    fn update_task(
        &self,
        token: &str,
        id: TaskId,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<Task, BackendError>> + Send;

    fn delete_task(
        &self,
        token: &str,
        id: TaskId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthGrant, BackendError>> + Send;

    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<AuthGrant, BackendError>> + Send;
}
