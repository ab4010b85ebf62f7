//! Session lifecycle: login, register, logout, and the persisted `authToken`.

use crate::backend::{AuthGrant, Credentials, Registration, TaskBackend};
use crate::error::AuthError;
use crate::storage::{AUTH_TOKEN_KEY, LocalStorage};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::sync::Arc;
use tracing::{info, warn};

const FALLBACK_DISPLAY_NAME: &str = "User";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub username: String,
}

impl Session {
    /// Rebuilds a session from a stored token. The display name comes from the
    /// token payload when it looks like a JWT; nothing is verified here.
    pub fn from_token(token: impl Into<String>) -> Self {
        let token = token.into();
        let username = display_name_from_token(&token)
            .unwrap_or_else(|| FALLBACK_DISPLAY_NAME.to_string());
        Self { token, username }
    }
}

impl From<AuthGrant> for Session {
    fn from(grant: AuthGrant) -> Self {
        Self {
            token: grant.token,
            username: grant.username,
        }
    }
}

/// Reads the `sub` claim out of a JWT-shaped token without checking the signature.
pub fn display_name_from_token(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims
        .get("sub")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub struct SessionManager<B> {
    backend: Arc<B>,
    storage: LocalStorage,
    current: Option<Session>,
}

impl<B: TaskBackend> SessionManager<B> {
    pub fn new(backend: Arc<B>, storage: LocalStorage) -> Self {
        Self {
            backend,
            storage,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// Picks up a token persisted by an earlier run.
    pub fn restore(&mut self) -> Result<Option<Session>, AuthError> {
        let token = self.storage.get(AUTH_TOKEN_KEY)?.filter(|t| !t.is_empty());
        self.current = token.map(Session::from_token);
        if let Some(s) = &self.current {
            info!(username = %s.username, "restored session");
        }
        Ok(self.current.clone())
    }

    pub async fn login(&mut self, credentials: &Credentials) -> Result<Session, AuthError> {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return Err(AuthError::Validation(
                "Username and password are required".to_string(),
            ));
        }
        let grant = self.backend.login(credentials).await?;
        Ok(self.establish(grant))
    }

    pub async fn register(&mut self, registration: &Registration) -> Result<Session, AuthError> {
        if registration.username.trim().is_empty()
            || registration.email.trim().is_empty()
            || registration.password.is_empty()
        {
            return Err(AuthError::Validation(
                "Username, email and password are required".to_string(),
            ));
        }
        let grant = self.backend.register(registration).await?;
        Ok(self.establish(grant))
    }

    fn establish(&mut self, grant: AuthGrant) -> Session {
        if let Err(e) = self.storage.set(AUTH_TOKEN_KEY, &grant.token) {
            warn!(error = %e, "could not persist token, session will not survive a restart");
        }
        let session = Session::from(grant);
        info!(username = %session.username, "logged in");
        self.current = Some(session.clone());
        session
    }

    pub fn logout(&mut self) -> Result<(), AuthError> {
        if let Some(s) = self.current.take() {
            info!(username = %s.username, "logged out");
        }
        self.storage.remove(AUTH_TOKEN_KEY)?;
        Ok(())
    }

    /// Forced logout after the backend answered 401.
    pub fn invalidate(&mut self) -> Result<(), AuthError> {
        warn!("backend rejected the session token, logging out");
        self.logout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::fake_backend::{Call, FakeBackend};

    fn jwt_with(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload.as_bytes())
        )
    }

    fn manager() -> (tempfile::TempDir, Arc<FakeBackend>, SessionManager<FakeBackend>) {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FakeBackend::default());
        let manager = SessionManager::new(backend.clone(), LocalStorage::new(dir.path()));
        (dir, backend, manager)
    }

    #[test]
    fn decodes_sub_claim() {
        let token = jwt_with(r#"{"sub":"alice","exp":1700000000}"#);
        assert_eq!(display_name_from_token(&token).as_deref(), Some("alice"));
        assert_eq!(Session::from_token(token).username, "alice");
    }

    #[test]
    fn garbage_tokens_fall_back() {
        assert_eq!(display_name_from_token("opaque-token"), None);
        assert_eq!(display_name_from_token("a.!!!.c"), None);
        assert_eq!(display_name_from_token(&jwt_with(r#"{"exp":1}"#)), None);
        assert_eq!(Session::from_token("opaque").username, FALLBACK_DISPLAY_NAME);
    }

    #[tokio::test]
    async fn login_persists_token() {
        let (_dir, backend, mut manager) = manager();
        backend.push_auth(Ok(AuthGrant {
            token: "tok-1".into(),
            username: "alice".into(),
        }));

        let session = manager
            .login(&Credentials::new("alice", "secret"))
            .await
            .unwrap();
        assert_eq!(session.username, "alice");
        assert_eq!(manager.current(), Some(&session));
        assert_eq!(
            manager.storage().get(AUTH_TOKEN_KEY).unwrap().as_deref(),
            Some("tok-1")
        );
    }

    #[tokio::test]
    async fn blank_credentials_never_reach_backend() {
        let (_dir, backend, mut manager) = manager();
        let err = manager.login(&Credentials::new(" ", "x")).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));

        let reg = Registration {
            username: "bob".into(),
            email: "".into(),
            password: "pw".into(),
        };
        assert!(matches!(
            manager.register(&reg).await.unwrap_err(),
            AuthError::Validation(_)
        ));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn backend_detail_is_surfaced() {
        let (_dir, backend, mut manager) = manager();
        backend.push_auth(Err(BackendError::UsernameTaken(
            "Username already registered".into(),
        )));
        let reg = Registration {
            username: "bob".into(),
            email: "bob@example.com".into(),
            password: "pw".into(),
        };

        let err = manager.register(&reg).await.unwrap_err();
        assert_eq!(err.to_string(), "Username already registered");
        assert!(manager.current().is_none());
        assert_eq!(backend.calls(), vec![Call::Register(reg)]);
    }

    #[tokio::test]
    async fn restore_then_invalidate_clears_token() {
        let (dir, _backend, mut manager) = manager();
        let token = jwt_with(r#"{"sub":"carol"}"#);
        LocalStorage::new(dir.path())
            .set(AUTH_TOKEN_KEY, &token)
            .unwrap();

        let restored = manager.restore().unwrap().unwrap();
        assert_eq!(restored.username, "carol");
        assert_eq!(restored.token, token);

        manager.invalidate().unwrap();
        assert!(manager.current().is_none());
        assert_eq!(manager.storage().get(AUTH_TOKEN_KEY).unwrap(), None);
        assert_eq!(manager.restore().unwrap(), None);
    }
}
