//! Async client library for the Resideo / Honeywell Total Connect Comfort
//! cloud API.
//!
//! Two coexisting clients share the credential-persistence and
//! request-execution core: [`v0`] speaks the legacy session-id API,
//! [`v2`] speaks the modern OAuth API.

pub mod auth;
pub mod cache;
pub mod command;
pub mod config;
pub mod error;
pub mod refresh;
pub mod requester;
pub mod schema;
pub mod tree;
pub mod v0;
pub mod v2;

pub use config::ClientConfig;
pub use error::{Result, TccError};
