//! The transport capability consumed by the client.
//!
//! The core never talks HTTP directly; it hands [`Request`]s to an
//! injected [`Transport`] and interprets [`Response`]s. Retry/backoff,
//! redirects and connection pooling are collaborator concerns that live
//! behind this seam.

pub mod http;
pub mod mock;

pub use http::HttpTransport;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// HTTP-equivalent request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// A request to the remote service, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl Request {
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    #[must_use]
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    #[must_use]
    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            body: Some(body),
        }
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: None,
        }
    }
}

/// A raw response: status code plus body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }

    /// The body as lossy UTF-8, for error messages.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport-level failure. Surfaced verbatim to callers; never retried
/// by this crate.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Credentials applied to each request before send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Anonymous,
    Basic { user: String, secret: String },
    Bearer(String),
}

impl Credentials {
    /// Basic credentials helper.
    #[must_use]
    pub fn basic(user: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::Basic {
            user: user.into(),
            secret: secret.into(),
        }
    }

    /// Credentials from `JIREL_USER`/`JIREL_TOKEN`: both set means basic
    /// auth, token alone means bearer, neither means anonymous.
    #[must_use]
    pub fn from_env() -> Self {
        let user = std::env::var("JIREL_USER").ok();
        let token = std::env::var("JIREL_TOKEN").ok();
        match (user, token) {
            (Some(user), Some(secret)) => Self::Basic { user, secret },
            (None, Some(token)) => Self::Bearer(token),
            _ => Self::Anonymous,
        }
    }
}

/// The injected request/response capability.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_helpers() {
        let req = Request::get("/rest/api/2/field");
        assert_eq!(req.method, Method::Get);
        assert!(req.body.is_none());

        let req = Request::post("/rest/api/2/search", serde_json::json!({"jql": "x"}));
        assert_eq!(req.method.as_str(), "POST");
        assert!(req.body.is_some());
    }

    #[test]
    fn test_response_success_range() {
        assert!(Response { status: 201, body: vec![] }.is_success());
        assert!(!Response { status: 404, body: vec![] }.is_success());
        assert!(!Response { status: 302, body: vec![] }.is_success());
    }

    #[test]
    fn test_response_json_decode() {
        let resp = Response {
            status: 200,
            body: br#"{"total": 3}"#.to_vec(),
        };
        let v: serde_json::Value = resp.json().unwrap();
        assert_eq!(v["total"], 3);

        let bad = Response {
            status: 200,
            body: b"not json".to_vec(),
        };
        assert!(bad.json::<serde_json::Value>().is_err());
    }
}
