use crate::backend::TaskBackend;
use crate::error::{AuthError, TaskError};
use crate::model::{TaskDraft, TaskPatch};
use crate::session::{Session, SessionManager};
use crate::tui::action::{Action, AppEvent};
use crate::view_model::{LoadOutcome, TaskViewModel};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

/// Owns the session and the current view-model. Every backend call runs in
/// its own task so a slow request never blocks the next key press.
pub struct Actor<B> {
    sessions: SessionManager<B>,
    backend: Arc<B>,
    model: Option<Arc<TaskViewModel<B>>>,
    generation: u64,
    action_tx: mpsc::Sender<Action>,
    event_tx: mpsc::Sender<AppEvent<B>>,
    reload_interval: Duration,
}

impl<B: TaskBackend + 'static> Actor<B> {
    pub fn new(
        sessions: SessionManager<B>,
        backend: Arc<B>,
        action_tx: mpsc::Sender<Action>,
        event_tx: mpsc::Sender<AppEvent<B>>,
        reload_interval: Duration,
    ) -> Self {
        Self {
            sessions,
            backend,
            model: None,
            generation: 0,
            action_tx,
            event_tx,
            reload_interval,
        }
    }

    pub async fn run(mut self, mut action_rx: mpsc::Receiver<Action>) {
        if let Some(session) = self.sessions.current().cloned() {
            self.start_session(session).await;
        }

        let mut ticker = interval(self.reload_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                action = action_rx.recv() => match action {
                    None | Some(Action::Quit) => break,
                    Some(action) => self.handle(action).await,
                },
                _ = ticker.tick() => {
                    if self.model.is_some() {
                        debug!("periodic reload");
                        self.reload(false);
                    }
                }
            }
        }
        debug!("actor stopped");
    }

    async fn emit(&self, event: AppEvent<B>) {
        let _ = self.event_tx.send(event).await;
    }

    async fn handle(&mut self, action: Action) {
        match action {
            Action::Quit => {}
            Action::Login(credentials) => {
                self.emit(AppEvent::Status("Signing in...".to_string())).await;
                let result = self.sessions.login(&credentials).await;
                self.finish_auth(result).await;
            }
            Action::Register(registration) => {
                self.emit(AppEvent::Status("Creating account...".to_string()))
                    .await;
                let result = self.sessions.register(&registration).await;
                self.finish_auth(result).await;
            }
            Action::Logout => {
                self.end_session("Logged out.").await;
                if let Err(e) = self.sessions.logout() {
                    error!(error = %e, "could not clear stored token");
                }
            }
            Action::Invalidate(generation) => {
                // A late 401 from a session that is already gone.
                if generation != self.generation || self.model.is_none() {
                    return;
                }
                if let Err(e) = self.sessions.invalidate() {
                    error!(error = %e, "could not clear stored token");
                }
                self.end_session("Session expired, please log in again.")
                    .await;
            }
            Action::Reload => self.reload(true),
            Action::CreateTask(input) => {
                let draft = TaskDraft::from_smart_input(&input);
                self.spawn_op("Creating...", move |model| async move {
                    model.add(draft).await.map(|_| Some("Created.".to_string()))
                });
            }
            Action::ToggleTask(id) => {
                self.spawn_op("Syncing...", move |model| async move {
                    model.toggle(id).await.map(|_| Some("Synced.".to_string()))
                });
            }
            Action::EditTitle(id, title) => {
                self.spawn_op("Saving...", move |model| async move {
                    model
                        .update(id, TaskPatch::title(title))
                        .await
                        .map(|_| Some("Saved.".to_string()))
                });
            }
            Action::EditDescription(id, description) => {
                self.spawn_op("Saving...", move |model| async move {
                    model
                        .update(id, TaskPatch::description(description))
                        .await
                        .map(|_| Some("Saved.".to_string()))
                });
            }
            Action::SetPriority(id, priority) => {
                self.spawn_op("Updating priority...", move |model| async move {
                    model
                        .update(id, TaskPatch::priority(priority))
                        .await
                        .map(|_| Some("Updated.".to_string()))
                });
            }
            Action::DeleteTask(id) => {
                self.spawn_op("Deleting...", move |model| async move {
                    model.remove(id).await.map(|_| Some("Deleted.".to_string()))
                });
            }
        }
    }

    async fn finish_auth(&mut self, result: Result<Session, AuthError>) {
        match result {
            Ok(session) => self.start_session(session).await,
            Err(e) => self.emit(AppEvent::Error(e.to_string())).await,
        }
    }

    async fn start_session(&mut self, session: Session) {
        self.generation += 1;
        let model = Arc::new(TaskViewModel::new(self.backend.clone(), session.token));
        self.model = Some(model.clone());
        info!(username = %session.username, generation = self.generation, "session started");
        self.emit(AppEvent::SessionStarted {
            username: session.username,
            model,
        })
        .await;
        self.reload(true);
    }

    async fn end_session(&mut self, message: &str) {
        self.model = None;
        self.generation += 1;
        self.emit(AppEvent::LoggedOut(message.to_string())).await;
    }

    fn reload(&self, announce: bool) {
        let pending = if announce { "Loading tasks..." } else { "" };
        self.spawn_op(pending, move |model| async move {
            model.load().await.map(|outcome| match outcome {
                LoadOutcome::Replaced(n) if announce => Some(format!("Tasks: {}", n)),
                _ => None,
            })
        });
    }

    /// Runs `op` against the current model in the background and reports the
    /// outcome. A 401 is routed back to the actor as `Invalidate`.
    fn spawn_op<F, Fut>(&self, pending: &str, op: F)
    where
        F: FnOnce(Arc<TaskViewModel<B>>) -> Fut,
        Fut: Future<Output = Result<Option<String>, TaskError>> + Send + 'static,
    {
        let Some(model) = self.model.clone() else {
            let _ = self
                .event_tx
                .try_send(AppEvent::Error("Not logged in.".to_string()));
            return;
        };
        let event_tx = self.event_tx.clone();
        let action_tx = self.action_tx.clone();
        let generation = self.generation;
        if !pending.is_empty() {
            let _ = event_tx.try_send(AppEvent::Status(pending.to_string()));
        }
        let fut = op(model);
        tokio::spawn(async move {
            match fut.await {
                Ok(Some(msg)) => {
                    let _ = event_tx.send(AppEvent::Status(msg)).await;
                }
                Ok(None) => {}
                Err(e) if e.is_unauthorized() => {
                    let _ = action_tx.send(Action::Invalidate(generation)).await;
                }
                Err(e) => {
                    let _ = event_tx.send(AppEvent::Error(e.to_string())).await;
                }
            }
        });
    }
}
