//! Error types shared by the backend client, the view-model and the session layer.

use crate::model::TaskId;
use std::io;
use thiserror::Error;

/// Failure reported by a [`TaskBackend`](crate::backend::TaskBackend).
///
/// Variants that carry a `String` hold the backend's `detail` message verbatim
/// when it sent one, so the UI can show it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// 401 on an authenticated call. The session must be dropped.
    #[error("session is no longer valid")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    UsernameTaken(String),

    /// Connection refused, reset, DNS failure or timeout.
    #[error("network error: {0}")]
    Network(String),

    #[error("server error ({status}): {detail}")]
    Server { status: u16, detail: String },

    /// The backend answered 2xx but the body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BackendError::Unauthorized)
    }

    /// Message supplied by the backend, if the failure carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            BackendError::NotFound(d)
            | BackendError::Validation(d)
            | BackendError::InvalidCredentials(d)
            | BackendError::UsernameTaken(d) => Some(d),
            BackendError::Server { detail, .. } => Some(detail),
            _ => None,
        }
    }
}

/// Failure of a [`TaskViewModel`](crate::view_model::TaskViewModel) operation.
///
/// Whatever the variant, the in-memory collection is exactly as it was
/// before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Rejected locally, no request was sent.
    #[error("{0}")]
    Validation(String),

    #[error("task {0} is not in the current list")]
    UnknownTask(TaskId),

    #[error("failed to load tasks: {0}")]
    Load(#[source] BackendError),

    #[error("failed to create task: {0}")]
    Create(#[source] BackendError),

    #[error("failed to update task: {0}")]
    Update(#[source] BackendError),

    #[error("failed to delete task: {0}")]
    Delete(#[source] BackendError),
}

impl TaskError {
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            TaskError::Load(e) | TaskError::Create(e) | TaskError::Update(e) | TaskError::Delete(e) => {
                Some(e)
            }
            TaskError::Validation(_) | TaskError::UnknownTask(_) => None,
        }
    }

    /// True when the backend rejected the bearer token; the caller should log out.
    pub fn is_unauthorized(&self) -> bool {
        self.backend().is_some_and(BackendError::is_unauthorized)
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no data directory available on this platform")]
    NoDataDir,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("could not persist session: {0}")]
    Storage(#[from] StorageError),
}
