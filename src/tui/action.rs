use crate::backend::{Credentials, Registration};
use crate::model::{Priority, TaskId};
use crate::view_model::TaskViewModel;
use std::sync::Arc;

/// Requests from the UI loop to the actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Login(Credentials),
    Register(Registration),
    Logout,
    /// A call made under session `n` came back 401.
    Invalidate(u64),
    Reload,
    CreateTask(String),
    ToggleTask(TaskId),
    EditTitle(TaskId, String),
    EditDescription(TaskId, String),
    SetPriority(TaskId, Priority),
    DeleteTask(TaskId),
    Quit,
}

/// Notifications from the actor back to the UI loop.
pub enum AppEvent<B> {
    SessionStarted {
        username: String,
        model: Arc<TaskViewModel<B>>,
    },
    LoggedOut(String),
    Status(String),
    Error(String),
}
