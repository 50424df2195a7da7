//! Create/update flow: minimal diffs, full-replacement relation sets,
//! label add operations, custom fields, and snapshot replacement from
//! the server's authoritative representation.

mod common;

use common::{client, field_catalog, remote_issue};
use pretty_assertions::assert_eq;
use serde_json::json;

use jirel::transport::Method;
use jirel::{CancellationToken, Issue, IssueKey, JirelError};

fn key(s: &str) -> IssueKey {
    s.parse().unwrap()
}

#[tokio::test]
async fn create_sends_full_initial_state() {
    let t = client();
    t.transport.enqueue_json(201, json!({ "id": "10000", "key": "TST-24" }));
    t.transport.enqueue_json(
        200,
        remote_issue("TST-24", json!({ "issuetype": { "id": "1" }, "summary": "S" })),
    );

    let cancel = CancellationToken::new();
    let mut issue = Issue::new("TST");
    issue.issue_type = Some("1".to_string());
    issue.summary = Some("S".to_string());
    t.jira.save(&mut issue, &cancel).await.unwrap();

    let requests = t.transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(requests[0].path, "/rest/api/2/issue");
    assert_eq!(
        requests[0].body.as_ref().unwrap(),
        &json!({
            "fields": {
                "project": { "key": "TST" },
                "issuetype": { "id": "1" },
                "summary": "S",
            }
        })
    );

    assert_eq!(issue.key().unwrap().as_str(), "TST-24");
    assert!(issue.is_saved());
}

#[tokio::test]
async fn followup_edit_sends_only_the_changed_field() {
    let t = client();
    t.transport.enqueue_json(
        200,
        remote_issue("TST-24", json!({ "issuetype": { "id": "1" }, "summary": "S" })),
    );

    let cancel = CancellationToken::new();
    let mut issue = t.jira.issue(&key("TST-24"), &cancel).await.unwrap();

    t.transport.enqueue_json(204, json!({}));
    t.transport.enqueue_json(
        200,
        remote_issue(
            "TST-24",
            json!({ "issuetype": { "id": "1" }, "summary": "S", "description": "d" }),
        ),
    );
    issue.description = Some("d".to_string());
    t.jira.save(&mut issue, &cancel).await.unwrap();

    let requests = t.transport.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].method, Method::Put);
    assert_eq!(requests[1].path, "/rest/api/2/issue/TST-24");
    assert_eq!(
        requests[1].body.as_ref().unwrap(),
        &json!({ "fields": { "description": "d" } })
    );
    assert_eq!(issue.description.as_deref(), Some("d"));
}

#[tokio::test]
async fn relation_change_sends_the_full_new_set() {
    let t = client();
    t.transport.enqueue_json(
        200,
        remote_issue("TST-5", json!({ "versions": [{ "name": "1.0" }] })),
    );

    let cancel = CancellationToken::new();
    let mut issue = t.jira.issue(&key("TST-5"), &cancel).await.unwrap();

    t.transport.enqueue_json(204, json!({}));
    t.transport.enqueue_json(
        200,
        remote_issue(
            "TST-5",
            json!({ "versions": [{ "name": "1.0" }, { "name": "2.0" }] }),
        ),
    );
    issue.affects_versions_mut().insert("2.0".to_string());
    t.jira.save(&mut issue, &cancel).await.unwrap();

    // The whole set goes out, never the {2.0} delta.
    let body = t.transport.requests()[1].body.clone().unwrap();
    assert_eq!(
        body,
        json!({ "fields": { "versions": [{ "name": "1.0" }, { "name": "2.0" }] } })
    );
}

#[tokio::test]
async fn label_additions_flush_as_add_operations() {
    let t = client();
    t.transport.enqueue_json(
        200,
        remote_issue("TST-6", json!({ "labels": ["existing"] })),
    );

    let cancel = CancellationToken::new();
    let mut issue = t.jira.issue(&key("TST-6"), &cancel).await.unwrap();

    t.transport.enqueue_json(204, json!({}));
    t.transport.enqueue_json(
        200,
        remote_issue("TST-6", json!({ "labels": ["existing", "urgent", "api"] })),
    );
    issue.add_labels(["urgent", "api"]);
    t.jira.save(&mut issue, &cancel).await.unwrap();

    let body = t.transport.requests()[1].body.clone().unwrap();
    assert_eq!(
        body,
        json!({ "update": { "labels": [{ "add": "urgent" }, { "add": "api" }] } })
    );

    // Refetched state carries the server's label list; nothing pending.
    assert_eq!(issue.labels(), ["existing", "urgent", "api"]);
    assert!(issue.pending_labels().is_empty());
}

#[tokio::test]
async fn custom_field_change_is_sent_under_its_resolved_id() {
    let t = client();
    t.transport.enqueue_json(200, field_catalog());
    t.transport.enqueue_json(
        200,
        remote_issue("TST-7", json!({ "customfield_10042": "minor" })),
    );

    let cancel = CancellationToken::new();
    let id = t.jira.resolve_custom_field("Severity", &cancel).await.unwrap();
    assert_eq!(id.as_str(), "customfield_10042");

    let mut issue = t.jira.issue(&key("TST-7"), &cancel).await.unwrap();
    assert_eq!(
        issue.custom_field("Severity").map(|v| format!("{v:?}")),
        Some("Text(\"minor\")".to_string())
    );

    t.transport.enqueue_json(204, json!({}));
    t.transport.enqueue_json(
        200,
        remote_issue("TST-7", json!({ "customfield_10042": "major" })),
    );
    issue.set_custom_field("Severity", "major");
    t.jira.save(&mut issue, &cancel).await.unwrap();

    let requests = t.transport.requests();
    // Catalog was fetched exactly once, up front.
    assert_eq!(requests.len(), 4);
    assert_eq!(
        requests[2].body.as_ref().unwrap(),
        &json!({ "fields": { "customfield_10042": "major" } })
    );
}

#[tokio::test]
async fn unchanged_issue_sends_nothing() {
    let t = client();
    t.transport.enqueue_json(
        200,
        remote_issue("TST-8", json!({ "summary": "S", "labels": ["a"] })),
    );

    let cancel = CancellationToken::new();
    let mut issue = t.jira.issue(&key("TST-8"), &cancel).await.unwrap();
    t.jira.save(&mut issue, &cancel).await.unwrap();

    // Only the original fetch went out; the empty update was skipped.
    assert_eq!(t.transport.requests().len(), 1);
    assert_eq!(t.transport.pending(), 0);
}

#[tokio::test]
async fn snapshot_is_replaced_by_server_representation() {
    let t = client();
    t.transport
        .enqueue_json(200, remote_issue("TST-9", json!({ "summary": "S" })));

    let cancel = CancellationToken::new();
    let mut issue = t.jira.issue(&key("TST-9"), &cancel).await.unwrap();

    t.transport.enqueue_json(204, json!({}));
    // The server normalizes the sent value.
    t.transport.enqueue_json(
        200,
        remote_issue("TST-9", json!({ "summary": "S", "assignee": { "name": "auto.assigned" } })),
    );
    issue.summary = Some("S".to_string());
    issue.assignee = Some("someone".to_string());
    t.jira.save(&mut issue, &cancel).await.unwrap();

    // State reflects what the server returned, not what was sent.
    assert_eq!(issue.assignee.as_deref(), Some("auto.assigned"));

    // A second save diffs against the refreshed snapshot: no changes.
    t.jira.save(&mut issue, &cancel).await.unwrap();
    assert_eq!(t.transport.requests().len(), 3);
}

#[tokio::test]
async fn conflicting_update_maps_to_stale_entity() {
    let t = client();
    t.transport
        .enqueue_json(200, remote_issue("TST-10", json!({ "summary": "S" })));

    let cancel = CancellationToken::new();
    let mut issue = t.jira.issue(&key("TST-10"), &cancel).await.unwrap();

    t.transport.enqueue_json(409, json!({ "errorMessages": ["conflict"] }));
    issue.summary = Some("S2".to_string());
    let err = t.jira.save(&mut issue, &cancel).await.unwrap_err();
    assert!(matches!(err, JirelError::StaleEntity { key } if key == "TST-10"));
}

#[tokio::test]
async fn key_project_mismatch_is_rejected_locally() {
    let t = client();
    t.transport
        .enqueue_json(200, remote_issue("TST-11", json!({ "summary": "S" })));

    let cancel = CancellationToken::new();
    let mut issue = t.jira.issue(&key("TST-11"), &cancel).await.unwrap();
    issue.project = "OTHER".to_string();
    issue.summary = Some("S2".to_string());

    let err = t.jira.save(&mut issue, &cancel).await.unwrap_err();
    assert!(matches!(err, JirelError::KeyMismatch { .. }));
    // Nothing was sent for the invalid save.
    assert_eq!(t.transport.requests().len(), 1);
}

#[tokio::test]
async fn missing_issue_maps_to_not_found() {
    let t = client();
    t.transport.enqueue_json(404, json!({ "errorMessages": ["Issue Does Not Exist"] }));

    let cancel = CancellationToken::new();
    let err = t.jira.issue(&key("TST-404"), &cancel).await.unwrap_err();
    assert!(err.is_not_found());
}
