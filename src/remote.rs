use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::snapshot::{SessionSnapshot, ShotRecord};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server rejected request: {0}")]
    Rejected(String),
}

/// A session as the remote dashboard reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteSession {
    pub session_id: String,
    #[serde(default)]
    pub shots_data: BTreeMap<String, ShotRecord>,
}

#[derive(Debug, Deserialize)]
struct ActiveSessionResponse {
    success: bool,
    session: Option<RemoteSession>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    success: bool,
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct HeartbeatBody<'a> {
    session_id: &'a str,
}

/// Remote half of the persistence gateway. Implementations own their own
/// connection and auth state; the sync worker is the only caller.
pub trait RemoteClient: Send {
    /// Push the full current snapshot to the sessions-create endpoint.
    fn upload(&mut self, snapshot: &SessionSnapshot) -> Result<(), RemoteError>;

    /// Ask which session the dashboard currently considers active, if any.
    fn fetch_active(&mut self) -> Result<Option<RemoteSession>, RemoteError>;

    /// Lightweight liveness signal.
    fn heartbeat(&mut self, session_id: &str) -> Result<(), RemoteError>;
}

/// HTTP implementation speaking the dashboard's JSON API. The bearer token
/// is cached until the next fetch attempt; a failed fetch clears it so a
/// revoked token is not reused indefinitely.
pub struct HttpRemoteClient {
    base_url: String,
    http: reqwest::blocking::Client,
    cached_token: Option<String>,
}

impl HttpRemoteClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("shotlog/0.1")
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
            cached_token: None,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Refresh the cached bearer token from the token endpoint. Any failure
    /// clears the cache and is reported to the caller for logging.
    fn refresh_token(&mut self) -> Result<Option<String>, RemoteError> {
        self.cached_token = None;
        let resp: TokenResponse = self
            .http
            .get(self.url("/api/plugin/token"))
            .send()?
            .error_for_status()?
            .json()?;
        if resp.success {
            self.cached_token = resp.token;
        }
        Ok(self.cached_token.clone())
    }

    /// Token for the next request: every use refreshes the cache, so a
    /// token revoked server-side stops being sent after one more attempt.
    fn bearer(&mut self) -> Option<String> {
        match self.refresh_token() {
            Ok(token) => token,
            Err(err) => {
                log::warn!("token fetch failed: {err}");
                None
            }
        }
    }
}

impl RemoteClient for HttpRemoteClient {
    fn upload(&mut self, snapshot: &SessionSnapshot) -> Result<(), RemoteError> {
        let mut req = self.http.post(self.url("/api/sessions")).json(snapshot);
        if let Some(token) = self.bearer() {
            req = req.bearer_auth(token);
        }
        let resp = req.send()?;
        if !resp.status().is_success() {
            return Err(RemoteError::Rejected(format!(
                "upload returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    fn fetch_active(&mut self) -> Result<Option<RemoteSession>, RemoteError> {
        let mut req = self.http.get(self.url("/api/sessions/active"));
        if let Some(token) = self.bearer() {
            req = req.bearer_auth(token);
        }
        let resp: ActiveSessionResponse = req.send()?.error_for_status()?.json()?;
        if !resp.success {
            return Err(RemoteError::Rejected("active-session query failed".into()));
        }
        Ok(resp.session)
    }

    fn heartbeat(&mut self, session_id: &str) -> Result<(), RemoteError> {
        self.http
            .post(self.url("/api/heartbeat"))
            .json(&HeartbeatBody { session_id })
            .send()?
            .error_for_status()?;
        Ok(())
    }
}
