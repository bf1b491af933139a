//! Credential store: a JSON file, keyed by `client_id`, holding each user's
//! v0 session id and/or v2 OAuth tokens.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TccError};

/// Entries within this many seconds of expiry are treated as already
/// expired, to cover clock skew and in-flight request latency.
pub const EXPIRY_GUARD_SECS: i64 = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCred {
    pub session_id: String,
    pub session_id_expires: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthCred {
    pub access_token: String,
    pub access_token_expires: DateTime<Utc>,
    pub refresh_token: String,
}

impl SessionCred {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.session_id.is_empty()
            && now + chrono::Duration::seconds(EXPIRY_GUARD_SECS) < self.session_id_expires
    }
}

impl OAuthCred {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty()
            && now + chrono::Duration::seconds(EXPIRY_GUARD_SECS) < self.access_token_expires
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub access_token: Option<OAuthCred>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub session_id: Option<SessionCred>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let access_expired = self.access_token.as_ref().is_none_or(|c| !c.is_valid(now));
        let session_expired = self.session_id.as_ref().is_none_or(|c| !c.is_valid(now));
        access_expired && session_expired
    }
}

pub type CacheData = HashMap<String, CacheEntry>;

/// Remove entries whose credentials have all expired (within the guard
/// window). Mirrors "clean on save" from the source's cache-file handling.
pub fn clean(mut data: CacheData, now: DateTime<Utc>) -> CacheData {
    data.retain(|_, entry| {
        if entry.access_token.as_ref().is_some_and(|c| !c.is_valid(now)) {
            entry.access_token = None;
        }
        if entry.session_id.as_ref().is_some_and(|c| !c.is_valid(now)) {
            entry.session_id = None;
        }
        !entry.is_expired(now) && (entry.access_token.is_some() || entry.session_id.is_some())
    });
    data
}

/// File-backed credential store, one per process.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CredentialStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<CacheData> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(CacheData::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                log::warn!(
                    "credential cache at {} is corrupt, ignoring: {err}",
                    self.path.display()
                );
                CacheData::new()
            })),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(CacheData::new()),
            Err(err) => Err(TccError::Cache(err)),
        }
    }

    pub async fn save(&self, data: CacheData) -> Result<()> {
        let cleaned = clean(data, Utc::now());
        let bytes = serde_json::to_vec_pretty(&cleaned)
            .map_err(|err| TccError::invalid_schema(format!("cache serialize failed: {err}")))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(TccError::Cache)?;
        }
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(TccError::Cache)
    }

    pub async fn load_for(&self, client_id: &str) -> Result<CacheEntry> {
        Ok(self.load().await?.remove(client_id).unwrap_or_default())
    }

    /// Merges `entry`'s populated fields into the user's existing cache
    /// entry rather than replacing it outright, so saving a freshly
    /// acquired v2 access token doesn't clobber a v0 session id already
    /// cached for the same `client_id` (and vice versa).
    pub async fn save_for(&self, client_id: &str, entry: CacheEntry) -> Result<()> {
        let mut data = self.load().await?;
        let existing = data.remove(client_id).unwrap_or_default();
        data.insert(
            client_id.to_string(),
            CacheEntry {
                access_token: entry.access_token.or(existing.access_token),
                session_id: entry.session_id.or(existing.session_id),
            },
        );
        self.save(data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_oauth(expires_in_secs: i64) -> OAuthCred {
        OAuthCred {
            access_token: "token".into(),
            access_token_expires: Utc::now() + chrono::Duration::seconds(expires_in_secs),
            refresh_token: "refresh".into(),
        }
    }

    #[test]
    fn credential_within_guard_window_is_invalid() {
        let cred = make_oauth(10);
        assert!(!cred.is_valid(Utc::now()));
    }

    #[test]
    fn credential_beyond_guard_window_is_valid() {
        let cred = make_oauth(600);
        assert!(cred.is_valid(Utc::now()));
    }

    #[test]
    fn clean_purges_expired_entries() {
        let mut data = CacheData::new();
        data.insert(
            "user@example.com".into(),
            CacheEntry {
                access_token: Some(make_oauth(-5)),
                session_id: None,
            },
        );
        data.insert(
            "other@example.com".into(),
            CacheEntry {
                access_token: Some(make_oauth(600)),
                session_id: None,
            },
        );
        let cleaned = clean(data, Utc::now());
        assert!(!cleaned.contains_key("user@example.com"));
        assert!(cleaned.contains_key("other@example.com"));
    }

    #[tokio::test]
    async fn save_then_load_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("tcc-client-test-{}", std::process::id()));
        let path = dir.join("creds.json");
        let store = CredentialStore::new(&path);

        let mut data = CacheData::new();
        data.insert(
            "user@example.com".into(),
            CacheEntry {
                access_token: Some(make_oauth(600)),
                session_id: None,
            },
        );
        store.save(data).await.unwrap();

        let reloaded = store.load().await.unwrap();
        assert!(reloaded.contains_key("user@example.com"));

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn save_for_preserves_the_other_credential_kind_for_the_same_user() {
        let dir = std::env::temp_dir().join(format!("tcc-client-test-merge-{}", std::process::id()));
        let path = dir.join("creds.json");
        let store = CredentialStore::new(&path);

        store
            .save_for(
                "user@example.com",
                CacheEntry {
                    access_token: None,
                    session_id: Some(SessionCred {
                        session_id: "sess-1".into(),
                        session_id_expires: Utc::now() + chrono::Duration::minutes(15),
                    }),
                },
            )
            .await
            .unwrap();

        store
            .save_for(
                "user@example.com",
                CacheEntry {
                    access_token: Some(make_oauth(600)),
                    session_id: None,
                },
            )
            .await
            .unwrap();

        let entry = store.load_for("user@example.com").await.unwrap();
        assert!(entry.access_token.is_some());
        assert!(
            entry.session_id.is_some(),
            "v2 login must not evict the v0 session id already cached for this user"
        );

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn missing_cache_file_loads_as_empty() {
        let path = std::env::temp_dir().join("tcc-client-test-missing-file.json");
        tokio::fs::remove_file(&path).await.ok();
        let store = CredentialStore::new(&path);
        let data = store.load().await.unwrap();
        assert!(data.is_empty());
    }
}
