//! Runtime configuration consumed by the client.

use serde::{Deserialize, Serialize};

use crate::error::{JirelError, Result};

/// Default number of records requested per search page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Default upper bound the server enforces per search call.
pub const DEFAULT_SERVER_PAGE_CAP: usize = 1000;

/// Client configuration. Values are consumed, never computed, by the
/// core: the page size is a request, the server cap is what the service
/// enforces regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub page_size: usize,
    pub server_page_cap: usize,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            server_page_cap: DEFAULT_SERVER_PAGE_CAP,
        }
    }

    /// Requested records per page; clamped to at least 1.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The server-enforced per-call maximum; clamped to at least 1.
    #[must_use]
    pub fn with_server_page_cap(mut self, cap: usize) -> Self {
        self.server_page_cap = cap.max(1);
        self
    }

    /// Configuration from the environment: `JIREL_URL` (required) and
    /// `JIREL_PAGE_SIZE` (optional).
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("JIREL_URL")
            .map_err(|_| JirelError::Config("JIREL_URL is not set".to_string()))?;
        let mut config = Self::new(base_url);
        if let Ok(raw) = std::env::var("JIREL_PAGE_SIZE") {
            let page_size = raw.parse().map_err(|_| {
                JirelError::Config(format!("JIREL_PAGE_SIZE is not a number: '{raw}'"))
            })?;
            config = config.with_page_size(page_size);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("https://jira.example.com");
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.server_page_cap, DEFAULT_SERVER_PAGE_CAP);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = ClientConfig::new("https://jira.example.com/");
        assert_eq!(config.base_url, "https://jira.example.com");
    }

    #[test]
    fn test_page_size_clamped() {
        let config = ClientConfig::new("x").with_page_size(0);
        assert_eq!(config.page_size, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = ClientConfig::new("x")
            .with_page_size(50)
            .with_server_page_cap(100);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.server_page_cap, 100);
    }
}
