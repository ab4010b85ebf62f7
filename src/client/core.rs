use crate::backend::{AuthGrant, Credentials, Registration, TaskBackend};
use crate::client::cert;
use crate::config::Config;
use crate::error::BackendError;
use crate::model::{Task, TaskDraft, TaskId, TaskPatch};

use anyhow::{Context, bail};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Request, StatusCode, Uri};
use http_body_util::BodyExt;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

type HttpsClient = Client<HttpsConnector<HttpConnector>, String>;

/// Which kind of call a response belongs to; decides how 400/401 are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Login,
    Register,
    Tasks,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Clone, Debug)]
pub struct RestClient {
    http: HttpsClient,
    base_url: String,
    timeout: Duration,
}

impl RestClient {
    pub fn new(url: &str, insecure: bool, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = url.trim().trim_end_matches('/').to_string();
        let uri: Uri = base_url
            .parse()
            .with_context(|| format!("invalid backend URL '{}'", url))?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            bail!("backend URL '{}' must include a scheme and host", url);
        }

        let tls_config = if insecure {
            cert::insecure_tls_config()
        } else {
            let https = uri.scheme_str() == Some("https");
            cert::native_tls_config(https).map_err(anyhow::Error::msg)?
        };

        let https_connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .build();

        let http = Client::builder(TokioExecutor::new()).build(https_connector);

        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            &config.base_url,
            config.allow_insecure_certs,
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<String>,
        endpoint: Endpoint,
    ) -> Result<Vec<u8>, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(&url)
            .header(ACCEPT, "application/json");
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder
            .body(body.unwrap_or_default())
            .map_err(|e| BackendError::Network(format!("could not build request: {}", e)))?;

        let exchange = async {
            let response = self
                .http
                .request(request)
                .await
                .map_err(|e| BackendError::Network(e.to_string()))?;
            let status = response.status();
            let bytes = response
                .into_body()
                .collect()
                .await
                .map_err(|e| BackendError::Network(e.to_string()))?
                .to_bytes();
            Ok::<_, BackendError>((status, bytes.to_vec()))
        };

        let (status, bytes) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                BackendError::Network(format!("request timed out after {:?}", self.timeout))
            })??;

        debug!(%method, path, status = status.as_u16(), "backend response");
        if status.is_success() {
            Ok(bytes)
        } else {
            let err = map_status(status, &bytes, endpoint);
            warn!(%method, path, status = status.as_u16(), error = %err, "backend rejected request");
            Err(err)
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<String>,
        endpoint: Endpoint,
    ) -> Result<T, BackendError> {
        let bytes = self.send(method, path, token, body, endpoint).await?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<String, BackendError> {
    serde_json::to_string(value).map_err(|e| BackendError::Decode(e.to_string()))
}

fn map_status(status: StatusCode, body: &[u8], endpoint: Endpoint) -> BackendError {
    let detail = extract_detail(status, body);
    match (status.as_u16(), endpoint) {
        (401, Endpoint::Login) => BackendError::InvalidCredentials(detail),
        (401, _) => BackendError::Unauthorized,
        (404, _) => BackendError::NotFound(detail),
        (400, Endpoint::Register) => BackendError::UsernameTaken(detail),
        (400 | 422, _) => BackendError::Validation(detail),
        (code, _) => BackendError::Server {
            status: code,
            detail,
        },
    }
}

/// Pulls the backend's `detail` out of an error body. Validation errors carry
/// a list of `{msg}` objects instead of a string.
fn extract_detail(status: StatusCode, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        match value.get("detail") {
            Some(serde_json::Value::String(s)) => return s.clone(),
            Some(serde_json::Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|i| i.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if !msgs.is_empty() {
                    return msgs.join("; ");
                }
            }
            _ => {}
        }
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if !text.is_empty() {
        return text;
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

impl TaskBackend for RestClient {
    async fn list_tasks(&self, token: &str) -> Result<Vec<Task>, BackendError> {
        let bytes = self
            .send(Method::GET, "/tasks", Some(token), None, Endpoint::Tasks)
            .await?;
        Task::list_from_json(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn create_task(&self, token: &str, draft: &TaskDraft) -> Result<Task, BackendError> {
        let bytes = self
            .send(
                Method::POST,
                "/tasks/add",
                Some(token),
                Some(to_body(draft)?),
                Endpoint::Tasks,
            )
            .await?;
        Task::from_json(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn update_task(
        &self,
        token: &str,
        id: TaskId,
        patch: &TaskPatch,
    ) -> Result<Task, BackendError> {
        let bytes = self
            .send(
                Method::PUT,
                &format!("/tasks/update/{}", id),
                Some(token),
                Some(to_body(patch)?),
                Endpoint::Tasks,
            )
            .await?;
        Task::from_json(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn delete_task(&self, token: &str, id: TaskId) -> Result<(), BackendError> {
        self.send(
            Method::DELETE,
            &format!("/tasks/delete/{}", id),
            Some(token),
            None,
            Endpoint::Tasks,
        )
        .await?;
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant, BackendError> {
        let resp: TokenResponse = self
            .send_json(
                Method::POST,
                "/login",
                None,
                Some(to_body(credentials)?),
                Endpoint::Login,
            )
            .await?;
        Ok(AuthGrant {
            token: resp.access_token,
            username: credentials.username.clone(),
        })
    }

    async fn register(&self, registration: &Registration) -> Result<AuthGrant, BackendError> {
        let resp: serde_json::Value = self
            .send_json(
                Method::POST,
                "/register",
                None,
                Some(to_body(registration)?),
                Endpoint::Register,
            )
            .await?;

        if let Some(token) = resp.get("access_token").and_then(|t| t.as_str()) {
            return Ok(AuthGrant {
                token: token.to_string(),
                username: registration.username.clone(),
            });
        }
        // Some deployments answer with the created user record; log in to get a token.
        debug!(username = %registration.username, "registered without token, logging in");
        self.login(&registration.credentials()).await
    }
}
