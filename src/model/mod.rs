//! Core domain types for `jirel`.
//!
//! This module defines the fundamental types used throughout the crate:
//! - `Issue` - the core work item, tracked against a server snapshot
//! - `IssueKey` - validated `PROJ-123` issue key
//! - `SystemField` / `FieldId` / `FieldKey` - field metadata and identity
//! - `FieldValue` / `CustomFieldValue` - typed field values
//! - `Snapshot` - last-known-server values, the diff baseline
//! - Catalog read types (`IssueType`, `ProjectVersion`, `Comment`, ...)

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::JirelError;

/// How a field's values behave: drives both JQL operator validation and
/// diff equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Free-text field; equality is expressed with the `~` match operator
    /// and ordering comparisons are rejected.
    Text,
    /// Exact-match scalar (names, ids, priorities).
    Keyword,
    /// Date or date-time field; values are normalized to UTC.
    Date,
    /// Multi-valued relation field; queried by membership, replaced as a
    /// whole set on update.
    Multi,
}

impl FieldKind {
    /// Whether `<`, `<=`, `>`, `>=` are expressible for this kind.
    #[must_use]
    pub const fn is_orderable(self) -> bool {
        matches!(self, Self::Keyword | Self::Date)
    }
}

/// Built-in issue fields known at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SystemField {
    Project,
    Type,
    Summary,
    Description,
    Environment,
    Assignee,
    Reporter,
    Priority,
    Resolution,
    Status,
    DueDate,
    Created,
    Updated,
    Labels,
    AffectsVersions,
    FixVersions,
    Components,
}

impl SystemField {
    /// The field's key in REST payloads.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Type => "issuetype",
            Self::Summary => "summary",
            Self::Description => "description",
            Self::Environment => "environment",
            Self::Assignee => "assignee",
            Self::Reporter => "reporter",
            Self::Priority => "priority",
            Self::Resolution => "resolution",
            Self::Status => "status",
            Self::DueDate => "duedate",
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Labels => "labels",
            Self::AffectsVersions => "versions",
            Self::FixVersions => "fixVersions",
            Self::Components => "components",
        }
    }

    /// The field's name in the JQL search language.
    #[must_use]
    pub const fn jql_name(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Type => "issuetype",
            Self::Summary => "summary",
            Self::Description => "description",
            Self::Environment => "environment",
            Self::Assignee => "assignee",
            Self::Reporter => "reporter",
            Self::Priority => "priority",
            Self::Resolution => "resolution",
            Self::Status => "status",
            Self::DueDate => "duedate",
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Labels => "labels",
            Self::AffectsVersions => "affectedVersion",
            Self::FixVersions => "fixVersion",
            Self::Components => "component",
        }
    }

    #[must_use]
    pub const fn kind(self) -> FieldKind {
        match self {
            Self::Summary | Self::Description | Self::Environment => FieldKind::Text,
            Self::Project
            | Self::Type
            | Self::Assignee
            | Self::Reporter
            | Self::Priority
            | Self::Resolution
            | Self::Status => FieldKind::Keyword,
            Self::DueDate | Self::Created | Self::Updated => FieldKind::Date,
            Self::Labels | Self::AffectsVersions | Self::FixVersions | Self::Components => {
                FieldKind::Multi
            }
        }
    }

    /// Scalar fields that participate in snapshot diffing on update.
    pub(crate) const DIFFABLE_SCALARS: [Self; 9] = [
        Self::Type,
        Self::Summary,
        Self::Description,
        Self::Environment,
        Self::Assignee,
        Self::Reporter,
        Self::Priority,
        Self::Resolution,
        Self::DueDate,
    ];

    /// The three replace-as-a-unit relation fields.
    pub(crate) const RELATION_SETS: [Self; 3] =
        [Self::AffectsVersions, Self::FixVersions, Self::Components];
}

impl fmt::Display for SystemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.jql_name())
    }
}

/// Stable internal identifier of a field, e.g. `customfield_10042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

const CUSTOM_FIELD_PREFIX: &str = "customfield_";

impl FieldId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for custom field number `n` (`customfield_{n}`).
    #[must_use]
    pub fn from_custom_number(n: u64) -> Self {
        Self(format!("{CUSTOM_FIELD_PREFIX}{n}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric part of a `customfield_NNNNN` id, used for `cf[NNNNN]`
    /// JQL emission. `None` for system field ids.
    #[must_use]
    pub fn custom_number(&self) -> Option<u64> {
        self.0
            .strip_prefix(CUSTOM_FIELD_PREFIX)
            .and_then(|n| n.parse().ok())
    }

    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.custom_number().is_some()
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a field in a snapshot or change set: either a built-in
/// system field or a schema-resolved custom field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldKey {
    System(SystemField),
    Custom(FieldId),
}

impl FieldKey {
    /// The field's key in REST payloads.
    #[must_use]
    pub fn wire_name(&self) -> &str {
        match self {
            Self::System(f) => f.wire_name(),
            Self::Custom(id) => id.as_str(),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System(s) => write!(f, "{s}"),
            Self::Custom(id) => write!(f, "{id}"),
        }
    }
}

/// A typed field value as carried in snapshots and change sets.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Set(BTreeSet<String>),
    List(Vec<String>),
    Custom(CustomFieldValue),
}

/// Value of an open-ended custom field.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomFieldValue {
    Text(String),
    Number(f64),
    Options(Vec<String>),
}

impl From<&str> for CustomFieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for CustomFieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<f64> for CustomFieldValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for CustomFieldValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<Vec<String>> for CustomFieldValue {
    fn from(v: Vec<String>) -> Self {
        Self::Options(v)
    }
}

static ISSUE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*-\d+$").expect("issue key regex"));

/// A validated, server-assigned issue key such as `TST-123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueKey(String);

impl IssueKey {
    pub fn new(key: impl Into<String>) -> Result<Self, JirelError> {
        let key = key.into();
        if ISSUE_KEY_RE.is_match(&key) {
            Ok(Self(key))
        } else {
            Err(JirelError::InvalidKey { key })
        }
    }

    /// The project prefix, e.g. `TST` for `TST-123`.
    #[must_use]
    pub fn project(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IssueKey {
    type Err = JirelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Last-known-server field values for one issue: the diff baseline.
///
/// Owned exclusively by the issue it describes; never mutated in place,
/// only replaced wholesale after a successful fetch or save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    values: BTreeMap<FieldKey, FieldValue>,
}

impl Snapshot {
    pub(crate) fn insert(&mut self, key: FieldKey, value: FieldValue) {
        self.values.insert(key, value);
    }

    pub(crate) fn get(&self, key: &FieldKey) -> Option<&FieldValue> {
        self.values.get(key)
    }
}

/// A work item, either unsaved (no key, no snapshot) or tracked against
/// a server snapshot.
///
/// Scalar fields are plain public `Option`s; relation sets auto-vivify
/// through their `_mut` accessors. Labels are add-only: additions queue
/// locally and flush as explicit add operations on save.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    key: Option<IssueKey>,
    /// Project key, fixed at creation; never part of an update diff.
    pub project: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub environment: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    /// Issue type id (e.g. `"1"`).
    pub issue_type: Option<String>,
    /// Priority id.
    pub priority: Option<String>,
    /// Resolution id.
    pub resolution: Option<String>,
    status: Option<String>,
    pub due_date: Option<NaiveDate>,
    created: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
    affects_versions: Option<BTreeSet<String>>,
    fix_versions: Option<BTreeSet<String>>,
    components: Option<BTreeSet<String>>,
    labels: Vec<String>,
    pending_labels: Vec<String>,
    custom_fields: BTreeMap<String, CustomFieldValue>,
    snapshot: Option<Snapshot>,
}

impl Issue {
    /// A new, unsaved issue in `project`. Saving it sends a full create
    /// payload; the server assigns the key.
    #[must_use]
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            key: None,
            project: project.into(),
            summary: None,
            description: None,
            environment: None,
            assignee: None,
            reporter: None,
            issue_type: None,
            priority: None,
            resolution: None,
            status: None,
            due_date: None,
            created: None,
            updated: None,
            affects_versions: None,
            fix_versions: None,
            components: None,
            labels: Vec::new(),
            pending_labels: Vec::new(),
            custom_fields: BTreeMap::new(),
            snapshot: None,
        }
    }

    /// Server-assigned key; `None` until the issue is first saved.
    #[must_use]
    pub const fn key(&self) -> Option<&IssueKey> {
        self.key.as_ref()
    }

    /// True once the issue has been saved (has a server snapshot).
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Workflow status name (server-assigned, read-only).
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    #[must_use]
    pub const fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    #[must_use]
    pub const fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }

    /// Labels as last loaded from the server.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Queue a label addition; flushed as an add operation on save.
    pub fn add_label(&mut self, label: impl Into<String>) {
        self.pending_labels.push(label.into());
    }

    /// Queue several label additions.
    pub fn add_labels<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending_labels.extend(labels.into_iter().map(Into::into));
    }

    /// Label additions queued since the last save.
    #[must_use]
    pub fn pending_labels(&self) -> &[String] {
        &self.pending_labels
    }

    #[must_use]
    pub const fn affects_versions(&self) -> Option<&BTreeSet<String>> {
        self.affects_versions.as_ref()
    }

    pub fn affects_versions_mut(&mut self) -> &mut BTreeSet<String> {
        self.affects_versions.get_or_insert_with(BTreeSet::new)
    }

    #[must_use]
    pub const fn fix_versions(&self) -> Option<&BTreeSet<String>> {
        self.fix_versions.as_ref()
    }

    pub fn fix_versions_mut(&mut self) -> &mut BTreeSet<String> {
        self.fix_versions.get_or_insert_with(BTreeSet::new)
    }

    #[must_use]
    pub const fn components(&self) -> Option<&BTreeSet<String>> {
        self.components.as_ref()
    }

    pub fn components_mut(&mut self) -> &mut BTreeSet<String> {
        self.components.get_or_insert_with(BTreeSet::new)
    }

    /// Set a custom field by display name (or raw `customfield_NNNNN` id).
    pub fn set_custom_field(&mut self, name: impl Into<String>, value: impl Into<CustomFieldValue>) {
        self.custom_fields.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn custom_field(&self, name: &str) -> Option<&CustomFieldValue> {
        self.custom_fields.get(name)
    }

    #[must_use]
    pub const fn custom_fields(&self) -> &BTreeMap<String, CustomFieldValue> {
        &self.custom_fields
    }

    // === crate-internal accessors for the diff engine and mapper ===

    pub(crate) const fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub(crate) fn set_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = Some(snapshot);
    }

    pub(crate) fn set_key(&mut self, key: IssueKey) {
        self.key = Some(key);
    }

    pub(crate) fn set_status(&mut self, status: Option<String>) {
        self.status = status;
    }

    pub(crate) fn set_timestamps(
        &mut self,
        created: Option<DateTime<Utc>>,
        updated: Option<DateTime<Utc>>,
    ) {
        self.created = created;
        self.updated = updated;
    }

    pub(crate) fn set_labels(&mut self, labels: Vec<String>) {
        self.labels = labels;
    }

    pub(crate) fn set_relation_set(&mut self, field: SystemField, values: Option<BTreeSet<String>>) {
        match field {
            SystemField::AffectsVersions => self.affects_versions = values,
            SystemField::FixVersions => self.fix_versions = values,
            SystemField::Components => self.components = values,
            _ => {}
        }
    }

    /// Current value of a diffable scalar field, typed for comparison.
    pub(crate) fn scalar_value(&self, field: SystemField) -> Option<FieldValue> {
        let text = |v: &Option<String>| v.clone().map(FieldValue::Text);
        match field {
            SystemField::Project => {
                if self.project.is_empty() {
                    None
                } else {
                    Some(FieldValue::Text(self.project.clone()))
                }
            }
            SystemField::Type => text(&self.issue_type),
            SystemField::Summary => text(&self.summary),
            SystemField::Description => text(&self.description),
            SystemField::Environment => text(&self.environment),
            SystemField::Assignee => text(&self.assignee),
            SystemField::Reporter => text(&self.reporter),
            SystemField::Priority => text(&self.priority),
            SystemField::Resolution => text(&self.resolution),
            SystemField::DueDate => self.due_date.map(FieldValue::Date),
            _ => None,
        }
    }

    /// Current value of one of the three relation-set fields.
    pub(crate) const fn relation_set(&self, field: SystemField) -> Option<&BTreeSet<String>> {
        match field {
            SystemField::AffectsVersions => self.affects_versions.as_ref(),
            SystemField::FixVersions => self.fix_versions.as_ref(),
            SystemField::Components => self.components.as_ref(),
            _ => None,
        }
    }
}

// === Catalog / read-model types ===

/// An issue type known to the server (e.g. Bug, Task).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subtask: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePriority {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStatus {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueResolution {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectVersion {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub released: bool,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectComponent {
    pub id: String,
    pub name: String,
}

/// A custom field definition from the server's field catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: FieldId,
    pub name: String,
}

/// An issue comment.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub author: Option<String>,
    pub body: String,
    pub created: Option<DateTime<Utc>>,
}

/// Attachment metadata. Byte streaming is a collaborator concern.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    pub author: Option<String>,
    pub size: u64,
    pub mime_type: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

/// A link from an issue to an external resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLink {
    pub id: Option<u64>,
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_key_valid() {
        let key = IssueKey::new("TST-123").unwrap();
        assert_eq!(key.project(), "TST");
        assert_eq!(key.as_str(), "TST-123");
        assert_eq!(key.to_string(), "TST-123");
    }

    #[test]
    fn test_issue_key_invalid() {
        for bad in ["tst-1", "TST", "TST-", "-1", "1-TST", "TST 1"] {
            assert!(IssueKey::new(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_issue_key_from_str() {
        let key: IssueKey = "PROJ_2-9".parse().unwrap();
        assert_eq!(key.project(), "PROJ_2");
    }

    #[test]
    fn test_field_id_custom_number() {
        let id = FieldId::from_custom_number(10042);
        assert_eq!(id.as_str(), "customfield_10042");
        assert_eq!(id.custom_number(), Some(10042));
        assert!(id.is_custom());

        let sys = FieldId::new("summary");
        assert_eq!(sys.custom_number(), None);
        assert!(!sys.is_custom());
    }

    #[test]
    fn test_field_kinds() {
        assert_eq!(SystemField::Summary.kind(), FieldKind::Text);
        assert_eq!(SystemField::DueDate.kind(), FieldKind::Date);
        assert_eq!(SystemField::AffectsVersions.kind(), FieldKind::Multi);
        assert_eq!(SystemField::Priority.kind(), FieldKind::Keyword);
        assert!(!FieldKind::Text.is_orderable());
        assert!(!FieldKind::Multi.is_orderable());
        assert!(FieldKind::Date.is_orderable());
    }

    #[test]
    fn test_jql_vs_wire_names() {
        assert_eq!(SystemField::AffectsVersions.wire_name(), "versions");
        assert_eq!(SystemField::AffectsVersions.jql_name(), "affectedVersion");
        assert_eq!(SystemField::Components.jql_name(), "component");
        assert_eq!(SystemField::Type.wire_name(), "issuetype");
    }

    #[test]
    fn test_relation_set_auto_vivify() {
        let mut issue = Issue::new("TST");
        assert!(issue.fix_versions().is_none());
        issue.fix_versions_mut().insert("2.0".to_string());
        assert_eq!(issue.fix_versions().unwrap().len(), 1);
    }

    #[test]
    fn test_new_issue_is_unsaved() {
        let issue = Issue::new("TST");
        assert!(issue.key().is_none());
        assert!(!issue.is_saved());
        assert!(issue.status().is_none());
    }

    #[test]
    fn test_pending_labels_queue() {
        let mut issue = Issue::new("TST");
        issue.add_label("backend");
        issue.add_labels(["urgent", "triaged"]);
        assert_eq!(issue.pending_labels(), ["backend", "urgent", "triaged"]);
        assert!(issue.labels().is_empty());
    }
}
