//! Wire representations and the mapper between them and domain types.
//!
//! Read direction: REST payloads deserialize into `Remote*` DTOs and
//! [`issue_from_remote`] materializes an [`Issue`], capturing its
//! [`Snapshot`] in the same pass. Write direction: a [`ChangeSet`]
//! serializes through [`create_payload`] / [`update_payload`].
//!
//! Collection-valued field rules live here: relation fields map between
//! wire arrays of `{"name": ...}` objects and domain name sets, and a
//! field missing from the wire maps to an absent state, distinct from an
//! empty collection.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::diff::ChangeSet;
use crate::error::Result;
use crate::model::{
    Attachment, Comment, CustomField, CustomFieldValue, FieldId, FieldKey, FieldValue, Issue,
    IssueKey, RemoteLink, SystemField,
};
use crate::schema::FieldTable;

const CUSTOM_FIELD_PREFIX: &str = "customfield_";

// === Read DTOs ===

/// One issue as returned by the issue and search endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteIssue {
    pub key: String,
    #[serde(default)]
    pub fields: RemoteFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteFields {
    pub project: Option<RemoteProject>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub environment: Option<String>,
    pub assignee: Option<RemoteUser>,
    pub reporter: Option<RemoteUser>,
    pub issuetype: Option<RemoteRef>,
    pub priority: Option<RemoteRef>,
    pub resolution: Option<RemoteRef>,
    pub status: Option<RemoteRef>,
    pub duedate: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub versions: Option<Vec<RemoteNamed>>,
    #[serde(rename = "fixVersions")]
    pub fix_versions: Option<Vec<RemoteNamed>>,
    pub components: Option<Vec<RemoteNamed>>,
    pub labels: Option<Vec<String>>,
    pub attachment: Option<Vec<RemoteAttachment>>,
    /// Everything else, notably `customfield_*` entries.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProject {
    pub key: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUser {
    pub name: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

impl RemoteUser {
    fn into_name(self) -> Option<String> {
        self.name.or(self.display_name)
    }
}

/// An id/name reference (issue type, priority, resolution, status).
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteNamed {
    pub name: String,
}

/// One page of search results.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    #[serde(default, rename = "startAt")]
    pub start_at: usize,
    #[serde(default, rename = "maxResults")]
    pub max_results: usize,
    /// Total-count hint; absent when the service omits it.
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub issues: Vec<RemoteIssue>,
}

/// Response of a create call.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedIssue {
    pub key: String,
}

/// One entry of the field catalog (`GET /rest/api/2/field`).
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteField {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub custom: bool,
}

impl RemoteField {
    /// The catalog entry as a custom field definition, if it is one.
    #[must_use]
    pub fn into_custom(self) -> Option<CustomField> {
        self.custom.then(|| CustomField {
            id: FieldId::new(self.id),
            name: self.name,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteComment {
    pub id: String,
    pub author: Option<RemoteUser>,
    pub body: String,
    pub created: Option<String>,
}

/// Wrapper of the comment listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentPage {
    #[serde(default)]
    pub comments: Vec<RemoteComment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAttachment {
    pub id: String,
    pub filename: String,
    pub author: Option<RemoteUser>,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    pub created: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteLinkRecord {
    pub id: Option<u64>,
    pub object: RemoteLinkObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteLinkObject {
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
}

// === Read mapping ===

/// Materialize a domain issue from its wire record, capturing the server
/// snapshot in the same pass. The snapshot belongs to this issue alone.
pub fn issue_from_remote(remote: RemoteIssue, table: &FieldTable) -> Result<Issue> {
    let key = IssueKey::new(remote.key)?;
    let fields = remote.fields;

    let project = fields
        .project
        .and_then(|p| p.key)
        .unwrap_or_else(|| key.project().to_string());

    let mut issue = Issue::new(project);
    issue.set_key(key);
    issue.summary = fields.summary;
    issue.description = fields.description;
    issue.environment = fields.environment;
    issue.assignee = fields.assignee.and_then(RemoteUser::into_name);
    issue.reporter = fields.reporter.and_then(RemoteUser::into_name);
    issue.issue_type = fields.issuetype.and_then(|r| r.id);
    issue.priority = fields.priority.and_then(|r| r.id);
    issue.resolution = fields.resolution.and_then(|r| r.id);
    issue.set_status(fields.status.and_then(|r| r.name));
    issue.due_date = fields.duedate.as_deref().and_then(parse_date);
    issue.set_timestamps(
        fields.created.as_deref().and_then(parse_instant),
        fields.updated.as_deref().and_then(parse_instant),
    );

    issue.set_relation_set(SystemField::AffectsVersions, named_set(fields.versions));
    issue.set_relation_set(SystemField::FixVersions, named_set(fields.fix_versions));
    issue.set_relation_set(SystemField::Components, named_set(fields.components));
    issue.set_labels(fields.labels.unwrap_or_default());

    for (wire_key, value) in fields.extra {
        if !wire_key.starts_with(CUSTOM_FIELD_PREFIX) || value.is_null() {
            continue;
        }
        let Some(custom) = custom_value_from_json(&value) else {
            continue;
        };
        let id = FieldId::new(wire_key);
        // Ids without a catalog entry keep their raw id as the domain
        // key, so a stale catalog never loses data.
        let name = table
            .display_name(&id)
            .map_or_else(|| id.as_str().to_string(), ToString::to_string);
        issue.set_custom_field(name, custom);
    }

    let snapshot = snapshot_of(&issue, table)?;
    issue.set_snapshot(snapshot);
    Ok(issue)
}

/// Capture the diff baseline from a freshly materialized issue.
pub(crate) fn snapshot_of(
    issue: &Issue,
    table: &FieldTable,
) -> Result<crate::model::Snapshot> {
    let mut snapshot = crate::model::Snapshot::default();
    for field in SystemField::DIFFABLE_SCALARS {
        if let Some(value) = issue.scalar_value(field) {
            snapshot.insert(FieldKey::System(field), value);
        }
    }
    for field in SystemField::RELATION_SETS {
        if let Some(set) = issue.relation_set(field) {
            snapshot.insert(FieldKey::System(field), FieldValue::Set(set.clone()));
        }
    }
    for (name, value) in issue.custom_fields() {
        let id = table.resolve_required(name)?;
        snapshot.insert(FieldKey::Custom(id), FieldValue::Custom(value.clone()));
    }
    Ok(snapshot)
}

pub fn comment_from_remote(remote: RemoteComment) -> Comment {
    Comment {
        id: remote.id,
        author: remote.author.and_then(RemoteUser::into_name),
        body: remote.body,
        created: remote.created.as_deref().and_then(parse_instant),
    }
}

pub fn attachment_from_remote(remote: RemoteAttachment) -> Attachment {
    Attachment {
        id: remote.id,
        filename: remote.filename,
        author: remote.author.and_then(RemoteUser::into_name),
        size: remote.size,
        mime_type: remote.mime_type,
        created: remote.created.as_deref().and_then(parse_instant),
    }
}

pub fn remote_link_from_remote(remote: RemoteLinkRecord) -> RemoteLink {
    RemoteLink {
        id: remote.id,
        url: remote.object.url,
        title: remote.object.title,
        summary: remote.object.summary,
    }
}

fn named_set(values: Option<Vec<RemoteNamed>>) -> Option<BTreeSet<String>> {
    values.map(|v| v.into_iter().map(|n| n.name).collect())
}

fn custom_value_from_json(value: &Value) -> Option<CustomFieldValue> {
    match value {
        Value::String(s) => Some(CustomFieldValue::Text(s.clone())),
        Value::Number(n) => n.as_f64().map(CustomFieldValue::Number),
        Value::Array(items) => {
            let options = items.iter().filter_map(option_text).collect();
            Some(CustomFieldValue::Options(options))
        }
        Value::Object(_) => option_text(value).map(CustomFieldValue::Text),
        _ => None,
    }
}

fn option_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("value")
            .or_else(|| map.get("name"))
            .and_then(Value::as_str)
            .map(ToString::to_string),
        _ => None,
    }
}

/// Timestamps arrive either RFC 3339 or in the service's
/// `2024-03-09T17:05:00.000+0000` form; both normalize to UTC.
pub(crate) fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

// === Write mapping ===

/// Serialize a create change set into the service's create JSON.
#[must_use]
pub fn create_payload(changes: &ChangeSet) -> Value {
    json!({ "fields": fields_object(changes) })
}

/// Serialize an update change set into the service's partial-update
/// JSON: changed fields replace, label additions append.
#[must_use]
pub fn update_payload(changes: &ChangeSet) -> Value {
    let mut payload = serde_json::Map::new();
    if !changes.fields().is_empty() {
        payload.insert("fields".to_string(), fields_object(changes));
    }
    if !changes.label_additions().is_empty() {
        let adds: Vec<Value> = changes
            .label_additions()
            .iter()
            .map(|label| json!({ "add": label }))
            .collect();
        payload.insert("update".to_string(), json!({ "labels": adds }));
    }
    Value::Object(payload)
}

fn fields_object(changes: &ChangeSet) -> Value {
    let mut fields = serde_json::Map::new();
    for (key, value) in changes.fields() {
        fields.insert(key.wire_name().to_string(), field_value_json(key, value.as_ref()));
    }
    Value::Object(fields)
}

fn field_value_json(key: &FieldKey, value: Option<&FieldValue>) -> Value {
    let Some(value) = value else {
        return Value::Null;
    };
    match (key, value) {
        (FieldKey::System(field), value) => system_value_json(*field, value),
        (FieldKey::Custom(_), FieldValue::Custom(custom)) => custom_value_json(custom),
        (FieldKey::Custom(_), FieldValue::Text(s)) => json!(s),
        (FieldKey::Custom(_), other) => json!(format!("{other:?}")),
    }
}

fn system_value_json(field: SystemField, value: &FieldValue) -> Value {
    match (field, value) {
        (SystemField::Project, FieldValue::Text(key)) => json!({ "key": key }),
        (
            SystemField::Type | SystemField::Priority | SystemField::Resolution,
            FieldValue::Text(id),
        ) => json!({ "id": id }),
        (SystemField::Assignee | SystemField::Reporter, FieldValue::Text(name)) => {
            json!({ "name": name })
        }
        (SystemField::DueDate, FieldValue::Date(date)) => {
            json!(date.format("%Y-%m-%d").to_string())
        }
        (
            SystemField::AffectsVersions | SystemField::FixVersions | SystemField::Components,
            FieldValue::Set(set),
        ) => {
            let named: Vec<Value> = set.iter().map(|name| json!({ "name": name })).collect();
            Value::Array(named)
        }
        (SystemField::Labels, FieldValue::List(labels)) => json!(labels),
        (_, FieldValue::Text(s)) => json!(s),
        (_, other) => json!(format!("{other:?}")),
    }
}

fn custom_value_json(value: &CustomFieldValue) -> Value {
    match value {
        CustomFieldValue::Text(s) => json!(s),
        CustomFieldValue::Number(n) => json!(n),
        CustomFieldValue::Options(options) => json!(options),
    }
}

/// Payload for creating a remote link on an issue.
#[must_use]
pub fn remote_link_payload(url: &str, title: &str, summary: Option<&str>) -> Value {
    let mut object = serde_json::Map::new();
    object.insert("url".to_string(), json!(url));
    object.insert("title".to_string(), json!(title));
    if let Some(summary) = summary {
        object.insert("summary".to_string(), json!(summary));
    }
    json!({ "object": Value::Object(object) })
}
