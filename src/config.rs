//! Client-wide configuration record.
//!
//! Replaces the module-level debug flags and hard-coded hostname found in
//! the source this crate is modeled on with a value passed at construction
//! time.

use std::path::PathBuf;
use std::time::Duration;

/// Default TCC cloud hostname.
pub const DEFAULT_HOSTNAME: &str = "tccna.resideo.com";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration shared by the v0 and v2 clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub hostname: String,
    pub cache_file: PathBuf,
    pub request_timeout: Duration,
    pub obfuscate_logs: bool,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// The scheme-qualified base URL every request is built against.
    /// `hostname` is normally a bare host (`tccna.resideo.com`), in which
    /// case `https://` is assumed; tests may instead set it to a full
    /// `http://127.0.0.1:PORT` to point the client at a local mock server.
    pub fn base_url(&self) -> String {
        if self.hostname.starts_with("http://") || self.hostname.starts_with("https://") {
            self.hostname.clone()
        } else {
            format!("https://{}", self.hostname)
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            hostname: DEFAULT_HOSTNAME.to_string(),
            cache_file: std::env::temp_dir().join("tcc-client-credentials.json"),
            request_timeout: DEFAULT_TIMEOUT,
            obfuscate_logs: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    hostname: Option<String>,
    cache_file: Option<PathBuf>,
    request_timeout: Option<Duration>,
    obfuscate_logs: Option<bool>,
}

impl ClientConfigBuilder {
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn cache_file(mut self, cache_file: impl Into<PathBuf>) -> Self {
        self.cache_file = Some(cache_file.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn obfuscate_logs(mut self, obfuscate: bool) -> Self {
        self.obfuscate_logs = Some(obfuscate);
        self
    }

    pub fn build(self) -> ClientConfig {
        let default = ClientConfig::default();
        ClientConfig {
            hostname: self.hostname.unwrap_or(default.hostname),
            cache_file: self.cache_file.unwrap_or(default.cache_file),
            request_timeout: self.request_timeout.unwrap_or(default.request_timeout),
            obfuscate_logs: self.obfuscate_logs.unwrap_or(default.obfuscate_logs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_temp_dir() {
        let config = ClientConfig::default();
        assert_eq!(config.hostname, DEFAULT_HOSTNAME);
        assert!(config.obfuscate_logs);
    }

    #[test]
    fn base_url_assumes_https_for_a_bare_hostname() {
        let config = ClientConfig::builder().hostname("tccna.resideo.com").build();
        assert_eq!(config.base_url(), "https://tccna.resideo.com");
    }

    #[test]
    fn base_url_passes_through_an_explicit_scheme() {
        let config = ClientConfig::builder().hostname("http://127.0.0.1:9999").build();
        assert_eq!(config.base_url(), "http://127.0.0.1:9999");
    }

    #[test]
    fn builder_overrides_selected_fields_only() {
        let config = ClientConfig::builder()
            .hostname("example.test")
            .obfuscate_logs(false)
            .build();
        assert_eq!(config.hostname, "example.test");
        assert!(!config.obfuscate_logs);
        assert_eq!(config.request_timeout, DEFAULT_TIMEOUT);
    }
}
