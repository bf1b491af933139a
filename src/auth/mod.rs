//! Credential acquisition and refresh.
//!
//! Two state machines share the same shape of problem (acquire, validate,
//! refresh, persist) but speak different wire protocols, so each is
//! implemented independently and exposed behind the same small trait. This
//! flattens what the source expresses as two unrelated classes
//! (`AbstractSessionManager` for v0, `Broker` for v2) into one seam the
//! requester (`crate::requester`) can depend on without branching on
//! which scheme is in play.

pub mod v0;
pub mod v2;

use async_trait::async_trait;

use crate::error::Result;

/// The v0 session API's application id
/// (`src/evohomeasync/auth.py::_APPLICATION_ID`). v2 has its own, distinct
/// Basic auth application credential; see `v2::TOKEN_AUTH_BASIC`.
pub const APPLICATION_ID: &str = "91db1612-73fd-4500-91b2-e63b069b185c";

/// A single HTTP header name/value pair to attach to an authenticated
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub name: &'static str,
    pub value: String,
}

/// Acquires and refreshes credentials for one authentication scheme.
///
/// Implementations must single-flight concurrent refreshes: only one
/// underlying HTTP authentication call should be in flight at a time per
/// manager instance.
#[async_trait]
pub trait CredentialManager: Send + Sync {
    /// Return the header needed to authenticate a request, authenticating
    /// or refreshing first if the current credential is missing or within
    /// its expiry guard window.
    async fn auth_header(&self) -> Result<AuthHeader>;

    /// Discard the current credential, forcing the next `auth_header`
    /// call to re-authenticate from scratch (used after a server
    /// rejects a request with 401 despite a locally-valid credential).
    async fn invalidate(&self);
}
