//! Thin client for the farm server's HTTP surface (§4.9): authenticates
//! once, then carries the signed session cookie on every later request.

use flagfarm_protocol::types::RemoteConfig;
use serde_json::json;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("request to server failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("authentication rejected by server")]
    AuthRejected,
    #[error("server did not set a session cookie")]
    NoSessionCookie,
}

pub struct RemoteSession {
    client: reqwest::Client,
    base_url: String,
    cookie: RwLock<String>,
}

impl RemoteSession {
    /// Logs in against `base_url` with `password`, retaining whatever
    /// `Set-Cookie` the server returns for all subsequent calls.
    pub async fn authenticate(base_url: &str, password: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let url = format!("{}/api/auth", base_url.trim_end_matches('/'));
        let response = client.post(&url).json(&json!({ "password": password })).send().await?;

        if !response.status().is_success() {
            return Err(RemoteError::AuthRejected);
        }

        let cookie = response
            .headers()
            .get(reqwest::header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).to_string())
            .ok_or(RemoteError::NoSessionCookie)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie: RwLock::new(cookie),
        })
    }

    async fn cookie_header(&self) -> String {
        self.cookie.read().await.clone()
    }

    /// Fetches the remote exploit/competition config (§4.9's `/api/config`).
    pub async fn fetch_config(&self) -> Result<RemoteConfig, RemoteError> {
        let url = format!("{}/api/config", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::COOKIE, self.cookie_header().await)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Uploads one wave's worth of captured flags for `exploit_name`.
    /// Returns `true` only on HTTP 200 — callers must keep buffered flags
    /// on any other outcome (at-least-once upload semantics, §4.7).
    pub async fn upload_flags(&self, exploit_name: &str, body: &serde_json::Value) -> Result<bool, RemoteError> {
        let url = format!("{}/api/flags/{}", self.base_url, exploit_name);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::COOKIE, self.cookie_header().await)
            .json(body)
            .send()
            .await?;
        Ok(response.status() == reqwest::StatusCode::OK)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn cookie(&self) -> String {
        self.cookie_header().await
    }
}
