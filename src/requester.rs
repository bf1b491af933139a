//! The authenticated request pipeline shared by the v0 and v2 clients.
//!
//! Injects a credential header, issues the HTTP call, classifies the
//! response, and retries exactly once if the server claims the credential
//! is no longer valid. Grounded in `src/evohomeasync/auth.py::Auth.request`
//! (the recursive-retry version this flattens into a bounded loop) and
//! `evohomeasync2/broker.py::Broker.get/put` (the status-to-error mapping).

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::CredentialManager;
use crate::error::{Result, TccError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
        }
    }
}

/// Body of a response, normalized to either JSON or raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

impl ResponseBody {
    pub fn into_json(self) -> Result<Value> {
        match self {
            ResponseBody::Json(v) => Ok(v),
            ResponseBody::Empty => Ok(Value::Null),
            ResponseBody::Text(t) => Err(TccError::invalid_schema(format!(
                "expected JSON response, got text: {t}"
            ))),
        }
    }
}

pub struct Requester {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialManager>,
}

impl Requester {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        credentials: Arc<dyn CredentialManager>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client configuration is valid");
        Requester {
            http,
            base_url: base_url.into(),
            credentials,
        }
    }

    pub async fn get(&self, path: &str) -> Result<ResponseBody> {
        self.request(Method::Get, path, None).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.get(path).await?.into_json()?;
        serde_json::from_value(body)
            .map_err(|err| TccError::invalid_schema(format!("GET {path}: {err}")))
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<ResponseBody> {
        self.request(Method::Put, path, Some(body)).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<ResponseBody> {
        self.request(Method::Post, path, Some(body)).await
    }

    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ResponseBody> {
        match self.attempt(method, path, body).await {
            Err(TccError::AuthenticationFailed { status, .. }) if status == Some(401) => {
                log::warn!("{path} returned 401, re-authenticating and retrying once");
                self.credentials.invalidate().await;
                self.attempt(method, path, body).await
            }
            other => other,
        }
    }

    async fn attempt(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ResponseBody> {
        let header = self.credentials.auth_header().await?;
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);

        log::debug!("{method:?} {url}");

        let mut builder = self
            .http
            .request(method.as_reqwest(), &url)
            .header(header.name, header.value);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status.as_u16() == 401 {
            return Err(TccError::authentication_failed(
                Some(401),
                "credential rejected by server",
            ));
        }
        if status.as_u16() == 429 {
            return Err(TccError::rate_limit_exceeded(
                Some(429),
                "rate limit exceeded",
            ));
        }
        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(TccError::api_request_failed(Some(status_code), message));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.contains("application/json") {
            let text = response.text().await?;
            if text.trim().is_empty() {
                return Ok(ResponseBody::Empty);
            }
            let value: Value = serde_json::from_str(&text)
                .map_err(|err| TccError::invalid_schema(format!("{path}: {err}")))?;
            log::info!("{method:?} {url} ({status}) = <json, {} bytes>", text.len());
            Ok(ResponseBody::Json(value))
        } else {
            let text = response.text().await?;
            log::debug!("{method:?} {url} ({status}) = {text}");
            if text.is_empty() {
                Ok(ResponseBody::Empty)
            } else {
                Ok(ResponseBody::Text(text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_body_into_json_rejects_text() {
        let body = ResponseBody::Text("plain".into());
        assert!(body.into_json().is_err());
    }

    #[test]
    fn empty_response_decodes_to_null() {
        let body = ResponseBody::Empty;
        assert_eq!(body.into_json().unwrap(), Value::Null);
    }
}
