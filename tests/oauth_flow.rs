//! HTTP-contract-level tests for the v2 OAuth state machine: refresh-first
//! with password-grant fallback on a rejected refresh token, and the
//! literal scenarios from `SPEC_FULL.md` §8.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tcc_client::auth::CredentialManager;
use tcc_client::auth::v2::OAuthManager;
use tcc_client::cache::{CacheEntry, CredentialStore, OAuthCred};
use tcc_client::error::TccError;

fn temp_cache_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("tcc-client-oauth-test-{label}-{}.json", std::process::id()))
}

fn manager(base_url: String, store: Arc<CredentialStore>) -> OAuthManager {
    OAuthManager::new("user@example.com", "hunter2", base_url, reqwest::Client::new(), store)
}

#[tokio::test]
async fn bad_v2_credentials_are_surfaced_and_cache_stays_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Auth/OAuth/Token"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;

    let cache_path = temp_cache_path("bad-creds");
    let store = Arc::new(CredentialStore::new(&cache_path));
    let mgr = manager(server.uri(), Arc::clone(&store));

    let err = mgr.auth_header().await.unwrap_err();
    assert!(matches!(err, TccError::BadUserCredentials { status: Some(400), .. }));

    let cached = store.load().await.unwrap();
    assert!(cached.is_empty(), "a rejected login must not create a cache entry");

    tokio::fs::remove_file(&cache_path).await.ok();
}

#[tokio::test]
async fn successful_login_populates_the_cache_for_this_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Auth/OAuth/Token"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A",
            "token_type": "bearer",
            "expires_in": 1799,
            "refresh_token": "R",
        })))
        .mount(&server)
        .await;

    let cache_path = temp_cache_path("success-login");
    let store = Arc::new(CredentialStore::new(&cache_path));
    let mgr = manager(server.uri(), Arc::clone(&store));

    let header = mgr.auth_header().await.unwrap();
    assert_eq!(header.value, "bearer A");

    let cached = store.load_for("user@example.com").await.unwrap();
    let cred = cached.access_token.expect("access_token must be cached");
    assert_eq!(cred.access_token, "A");
    assert_eq!(cred.refresh_token, "R");

    tokio::fs::remove_file(&cache_path).await.ok();
}

#[tokio::test]
async fn a_cached_refresh_token_is_used_before_any_password_grant() {
    let server = MockServer::start().await;
    // No password-grant mock is registered at all: if the manager ever
    // attempted one, wiremock would return its default 404 and the whole
    // call would fail instead of succeeding with the refreshed token.
    Mock::given(method("POST"))
        .and(path("/Auth/OAuth/Token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=R"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "NEW",
            "token_type": "bearer",
            "expires_in": 1799,
            "refresh_token": "R2",
        })))
        .mount(&server)
        .await;

    let cache_path = temp_cache_path("refresh-first");
    let store = Arc::new(CredentialStore::new(&cache_path));
    store
        .save_for(
            "user@example.com",
            CacheEntry {
                access_token: Some(OAuthCred {
                    access_token: "STALE".to_string(),
                    access_token_expires: Utc::now() - chrono::Duration::minutes(5),
                    refresh_token: "R".to_string(),
                }),
                session_id: None,
            },
        )
        .await
        .unwrap();

    let mgr = manager(server.uri(), Arc::clone(&store));
    let header = mgr.auth_header().await.unwrap();
    assert_eq!(header.value, "bearer NEW");

    tokio::fs::remove_file(&cache_path).await.ok();
}

#[tokio::test]
async fn a_rejected_refresh_token_falls_through_to_password_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Auth/OAuth/Token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Auth/OAuth/Token"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "FROM-PASSWORD",
            "token_type": "bearer",
            "expires_in": 1799,
            "refresh_token": "R-NEW",
        })))
        .mount(&server)
        .await;

    let cache_path = temp_cache_path("refresh-rejected");
    let store = Arc::new(CredentialStore::new(&cache_path));
    store
        .save_for(
            "user@example.com",
            CacheEntry {
                access_token: Some(OAuthCred {
                    access_token: "STALE".to_string(),
                    access_token_expires: Utc::now() - chrono::Duration::minutes(5),
                    refresh_token: "STALE-REFRESH".to_string(),
                }),
                session_id: None,
            },
        )
        .await
        .unwrap();

    let mgr = manager(server.uri(), Arc::clone(&store));
    let header = mgr.auth_header().await.unwrap();
    assert_eq!(header.value, "bearer FROM-PASSWORD");

    let cached = store.load_for("user@example.com").await.unwrap();
    assert_eq!(cached.access_token.unwrap().refresh_token, "R-NEW");

    tokio::fs::remove_file(&cache_path).await.ok();
}
