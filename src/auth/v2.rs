//! v2 OAuth authentication.
//!
//! Grounded in `evohomeasync2/broker.py::Broker`: POST to the OAuth token
//! endpoint with `grant_type=refresh_token` when a refresh token is held,
//! falling back to `grant_type=password` when the refresh token is absent
//! or rejected with `invalid_grant`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{AuthHeader, CredentialManager};
use crate::cache::{CacheEntry, CredentialStore, OAuthCred};
use crate::error::{Result, TccError};

const TOKEN_SCOPE: &str = "EMEA-V1-Basic EMEA-V1-Anonymous";

/// The v2 API's Basic auth credential for `/Auth/OAuth/Token`, a distinct
/// application credential from v0's `APPLICATION_ID`
/// (`evohomeasync2/__init__.py::HEADER_AUTHORIZATION_BASIC`, a base64
/// blob that decodes to `4a231089-…:1a15cdb8-…`, not the v0 GUID).
const TOKEN_AUTH_BASIC: &str =
    "Basic NGEyMzEwODktZDJiNi00MWJkLWE1ZWItMTZhMGE0MjJiOTk5OjFhMTVjZGI4LTQyZGUtNDA3Yi1hZGQwLTA1OWY5MmM1MzBjYg==";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenError {
    error: Option<String>,
}

pub struct OAuthManager {
    client_id: String,
    password: String,
    base_url: String,
    http: reqwest::Client,
    store: Arc<CredentialStore>,
    state: Mutex<OAuthState>,
}

#[derive(Debug, Clone, Default)]
struct OAuthState {
    cred: Option<OAuthCred>,
    loaded_from_cache: bool,
}

impl OAuthManager {
    pub fn new(
        client_id: impl Into<String>,
        password: impl Into<String>,
        base_url: impl Into<String>,
        http: reqwest::Client,
        store: Arc<CredentialStore>,
    ) -> Self {
        OAuthManager {
            client_id: client_id.into(),
            password: password.into(),
            base_url: base_url.into(),
            http,
            store,
            state: Mutex::new(OAuthState::default()),
        }
    }

    fn token_url(&self) -> String {
        format!("{}/Auth/OAuth/Token", self.base_url)
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<Result<OAuthCred>> {
        let url = self.token_url();
        log::info!("POST {url} (grant_type={})", form[0].1);

        let response = self
            .http
            .post(&url)
            .header("Authorization", TOKEN_AUTH_BASIC)
            .header(
                "Content-Type",
                "application/x-www-form-urlencoded; charset=utf-8",
            )
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: TokenResponse = response
                .json()
                .await
                .map_err(|err| TccError::authentication_failed(Some(status.as_u16()), err.to_string()))?;
            return Ok(Ok(OAuthCred {
                access_token: body.access_token,
                access_token_expires: Utc::now() + Duration::seconds(body.expires_in),
                refresh_token: body.refresh_token,
            }));
        }

        let status_code = status.as_u16();
        let body: Option<TokenError> = response.json().await.ok();
        let is_invalid_grant = body
            .as_ref()
            .and_then(|b| b.error.as_deref())
            .map(|e| e == "invalid_grant")
            .unwrap_or(false);

        if status_code == 429 {
            return Ok(Err(TccError::rate_limit_exceeded(
                Some(status_code),
                "token request rate limited",
            )));
        }
        if status_code == 400 && is_invalid_grant {
            // Caller decides whether this means "retry with password" or
            // "credentials are wrong", depending on which grant this was.
            return Ok(Err(TccError::bad_user_credentials(
                Some(status_code),
                "invalid_grant",
            )));
        }
        Ok(Err(TccError::authentication_failed(
            Some(status_code),
            format!("token request failed with status {status_code}"),
        )))
    }

    async fn refresh_with_token(&self, refresh_token: &str) -> Result<OAuthCred> {
        self.post_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("scope", TOKEN_SCOPE),
        ])
        .await?
    }

    async fn login_with_password(&self) -> Result<OAuthCred> {
        match self
            .post_token(&[
                ("grant_type", "password"),
                ("Username", &self.client_id),
                ("Password", &self.password),
                ("scope", TOKEN_SCOPE),
            ])
            .await?
        {
            Ok(cred) => Ok(cred),
            Err(TccError::BadUserCredentials { status, .. }) => {
                Err(TccError::bad_user_credentials(status, "username or password was rejected by the server"))
            }
            Err(other) => Err(other),
        }
    }

    async fn basic_login(&self, state: &mut OAuthState) -> Result<OAuthCred> {
        if let Some(refresh_token) = state.cred.as_ref().map(|c| c.refresh_token.clone()) {
            match self.refresh_with_token(&refresh_token).await {
                Ok(cred) => return Ok(cred),
                Err(TccError::BadUserCredentials { .. }) => {
                    log::warn!("refresh_token rejected, falling back to username/password");
                    if let Some(cred) = state.cred.as_mut() {
                        cred.refresh_token.clear();
                    }
                }
                Err(other) => return Err(other),
            }
        }
        self.login_with_password().await
    }
}

#[async_trait]
impl CredentialManager for OAuthManager {
    async fn auth_header(&self) -> Result<AuthHeader> {
        let mut state = self.state.lock().await;

        if !state.loaded_from_cache {
            if let Ok(entry) = self.store.load_for(&self.client_id).await {
                state.cred = entry.access_token;
            }
            state.loaded_from_cache = true;
        }

        let now = Utc::now();
        if !state.cred.as_ref().is_some_and(|cred| cred.is_valid(now)) {
            let cred = self.basic_login(&mut state).await?;
            self.store
                .save_for(
                    &self.client_id,
                    CacheEntry {
                        access_token: Some(cred.clone()),
                        session_id: None,
                    },
                )
                .await?;
            state.cred = Some(cred);
        }

        Ok(AuthHeader {
            name: "Authorization",
            value: format!("bearer {}", state.cred.as_ref().unwrap().access_token),
        })
    }

    async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.cred = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_scope_matches_vendor_requirement() {
        assert_eq!(TOKEN_SCOPE, "EMEA-V1-Basic EMEA-V1-Anonymous");
    }

    #[test]
    fn v2_basic_auth_is_distinct_from_the_v0_application_id() {
        assert_eq!(
            TOKEN_AUTH_BASIC,
            "Basic NGEyMzEwODktZDJiNi00MWJkLWE1ZWItMTZhMGE0MjJiOTk5OjFhMTVjZGI4LTQyZGUtNDA3Yi1hZGQwLTA1OWY5MmM1MzBjYg=="
        );
        assert!(!TOKEN_AUTH_BASIC.contains(super::super::APPLICATION_ID));
    }
}
