#![allow(dead_code)]

use std::sync::{Arc, Once};

use serde_json::{Value, json};

use jirel::transport::mock::MockTransport;
use jirel::{ClientConfig, Jira};

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("jirel=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A client wired to a scripted transport, plus the transport handle for
/// scripting and request assertions.
pub struct TestClient {
    pub jira: Jira,
    pub transport: Arc<MockTransport>,
}

pub fn client() -> TestClient {
    client_with_config(ClientConfig::new("https://jira.test"))
}

pub fn client_with_config(config: ClientConfig) -> TestClient {
    init_test_logging();
    let transport = Arc::new(MockTransport::new());
    let jira = Jira::new(config, Arc::clone(&transport) as Arc<dyn jirel::Transport>);
    TestClient { jira, transport }
}

/// The field catalog body: two custom fields plus a system entry that
/// must be filtered out.
pub fn field_catalog() -> Value {
    json!([
        { "id": "summary", "name": "Summary", "custom": false },
        { "id": "customfield_10042", "name": "Severity", "custom": true },
        { "id": "customfield_10050", "name": "Story Points", "custom": true },
    ])
}

/// A wire issue record with the given key and fields.
pub fn remote_issue(key: &str, fields: Value) -> Value {
    json!({ "key": key, "fields": fields })
}

/// A minimal wire issue whose summary is derived from its key.
pub fn stub_issue(key: &str) -> Value {
    remote_issue(key, json!({ "summary": format!("issue {key}") }))
}

/// One page of search results.
pub fn search_page(start_at: usize, total: usize, issues: Vec<Value>) -> Value {
    json!({
        "startAt": start_at,
        "maxResults": issues.len(),
        "total": total,
        "issues": issues,
    })
}

/// Stub issues `PREFIX-<from>` through `PREFIX-<to>` inclusive.
pub fn stub_issues(prefix: &str, from: usize, to: usize) -> Vec<Value> {
    (from..=to).map(|n| stub_issue(&format!("{prefix}-{n}"))).collect()
}
