//! v0 (legacy) session-id authentication.
//!
//! Grounded in `src/evohomeasync/auth.py::AbstractSessionManager`: POST
//! `{applicationId, username, password}` to `/WebAPI/api/session`, then
//! attach the returned `sessionId` as a `SessionId` header on every
//! subsequent request. The server never reports an explicit expiry for
//! the session id, so a 15 minute heuristic is used instead.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{APPLICATION_ID, AuthHeader, CredentialManager};
use crate::cache::{CacheEntry, CredentialStore, SessionCred};
use crate::error::{Result, TccError};

const SESSION_TTL_MINUTES: i64 = 15;

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
}

pub struct SessionManager {
    client_id: String,
    password: String,
    base_url: String,
    http: reqwest::Client,
    store: Arc<CredentialStore>,
    state: Mutex<Option<SessionCred>>,
}

impl SessionManager {
    pub fn new(
        client_id: impl Into<String>,
        password: impl Into<String>,
        base_url: impl Into<String>,
        http: reqwest::Client,
        store: Arc<CredentialStore>,
    ) -> Self {
        SessionManager {
            client_id: client_id.into(),
            password: password.into(),
            base_url: base_url.into(),
            http,
            store,
            state: Mutex::new(None),
        }
    }

    async fn request_session(&self) -> Result<SessionCred> {
        let url = format!("{}/WebAPI/api/session", self.base_url);
        log::info!("POST {url} (requesting new session)");

        let response = self
            .http
            .post(&url)
            .header(
                "Content-Type",
                "application/x-www-form-urlencoded; charset=utf-8",
            )
            .form(&[
                ("applicationId", APPLICATION_ID),
                ("username", &self.client_id),
                ("password", &self.password),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: SessionResponse = response
                .json()
                .await
                .map_err(|err| TccError::authentication_failed(Some(status.as_u16()), err.to_string()))?;
            let cred = SessionCred {
                session_id: body.session_id,
                session_id_expires: Utc::now() + Duration::minutes(SESSION_TTL_MINUTES),
            };
            return Ok(cred);
        }

        let status_code = status.as_u16();
        let body: Option<ErrorBody> = response.json().await.ok();
        if status_code == 401
            && body
                .as_ref()
                .and_then(|b| b.code.as_deref())
                .map(|c| c == "EmailOrPasswordIncorrect")
                .unwrap_or(false)
        {
            return Err(TccError::bad_user_credentials(
                Some(status_code),
                "username or password was rejected by the server",
            ));
        }
        if status_code == 429 {
            return Err(TccError::rate_limit_exceeded(
                Some(status_code),
                "session request rate limited",
            ));
        }
        Err(TccError::authentication_failed(
            Some(status_code),
            format!("session request failed with status {status_code}"),
        ))
    }
}

#[async_trait]
impl CredentialManager for SessionManager {
    async fn auth_header(&self) -> Result<AuthHeader> {
        let mut guard = self.state.lock().await;

        if guard.is_none() {
            if let Ok(entry) = self.store.load_for(&self.client_id).await {
                *guard = entry.session_id;
            }
        }

        let now = Utc::now();
        if !guard.as_ref().is_some_and(|cred| cred.is_valid(now)) {
            let cred = self.request_session().await?;
            self.store
                .save_for(
                    &self.client_id,
                    CacheEntry {
                        access_token: None,
                        session_id: Some(cred.clone()),
                    },
                )
                .await?;
            *guard = Some(cred);
        }

        Ok(AuthHeader {
            name: "SessionId",
            value: guard.as_ref().unwrap().session_id.clone(),
        })
    }

    async fn invalidate(&self) {
        *self.state.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ttl_is_fifteen_minutes() {
        assert_eq!(SESSION_TTL_MINUTES, 15);
    }
}
