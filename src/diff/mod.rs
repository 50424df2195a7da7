//! Field-level change tracking.
//!
//! A [`ChangeSet`] is computed on demand at save time by comparing an
//! issue's current state against its server snapshot. No dirty flags:
//! mutation tracking lives in one place, here.
//!
//! Semantics per field class:
//! - scalar fields compare under field-typed equality and are sent only
//!   when changed; a value cleared to `None` is sent as an explicit null
//! - relation sets (affects-versions, fix-versions, components) are sent
//!   as the full current set whenever set-unequal to the snapshot; the
//!   remote service cannot express partial add/remove for them
//! - labels are add-only: queued additions are carried as explicit add
//!   operations and never diffed against the snapshot
//! - custom fields resolve their display names through the field table
//!   and compare per key
//!
//! With no snapshot (an unsaved issue) the change set is the entire
//! populated state, i.e. the create payload.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::{FieldKey, FieldValue, Issue, Snapshot, SystemField};
use crate::schema::FieldTable;

/// The minimal field-to-value mapping to send for one save operation.
///
/// Transient: built per save, discarded after serialization. A `None`
/// value means "clear this field".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    fields: BTreeMap<FieldKey, Option<FieldValue>>,
    label_additions: Vec<String>,
    create: bool,
}

impl ChangeSet {
    /// Compute the changes to send for `issue`.
    ///
    /// Pure and synchronous: `table` must already be populated; no
    /// network is touched and no request is formed on failure.
    pub fn between(
        snapshot: Option<&Snapshot>,
        issue: &Issue,
        table: &FieldTable,
    ) -> Result<Self> {
        snapshot.map_or_else(
            || Self::full_state(issue, table),
            |snapshot| Self::diff(snapshot, issue, table),
        )
    }

    fn full_state(issue: &Issue, table: &FieldTable) -> Result<Self> {
        let mut fields = BTreeMap::new();

        if let Some(project) = issue.scalar_value(SystemField::Project) {
            fields.insert(FieldKey::System(SystemField::Project), Some(project));
        }
        for field in SystemField::DIFFABLE_SCALARS {
            if let Some(value) = issue.scalar_value(field) {
                fields.insert(FieldKey::System(field), Some(value));
            }
        }
        for field in SystemField::RELATION_SETS {
            if let Some(set) = issue.relation_set(field) {
                fields.insert(
                    FieldKey::System(field),
                    Some(FieldValue::Set(set.clone())),
                );
            }
        }
        // On create, labels go out as a plain field; there is no prior
        // state to append to.
        if !issue.pending_labels().is_empty() {
            fields.insert(
                FieldKey::System(SystemField::Labels),
                Some(FieldValue::List(issue.pending_labels().to_vec())),
            );
        }
        for (name, value) in issue.custom_fields() {
            let id = table.resolve_required(name)?;
            fields.insert(
                FieldKey::Custom(id),
                Some(FieldValue::Custom(value.clone())),
            );
        }

        Ok(Self {
            fields,
            label_additions: Vec::new(),
            create: true,
        })
    }

    fn diff(snapshot: &Snapshot, issue: &Issue, table: &FieldTable) -> Result<Self> {
        let mut fields = BTreeMap::new();

        // Project and the server-owned fields (key, status, timestamps)
        // never participate in an update diff.
        for field in SystemField::DIFFABLE_SCALARS {
            let key = FieldKey::System(field);
            let current = issue.scalar_value(field);
            if current.as_ref() != snapshot.get(&key) {
                fields.insert(key, current);
            }
        }

        for field in SystemField::RELATION_SETS {
            let key = FieldKey::System(field);
            let current = issue
                .relation_set(field)
                .map(|set| FieldValue::Set(set.clone()));
            if current.as_ref() != snapshot.get(&key) {
                // Always the full replacement set, never a delta.
                fields.insert(key, current);
            }
        }

        for (name, value) in issue.custom_fields() {
            let key = FieldKey::Custom(table.resolve_required(name)?);
            let current = FieldValue::Custom(value.clone());
            if snapshot.get(&key) != Some(&current) {
                fields.insert(key, Some(current));
            }
        }

        Ok(Self {
            fields,
            label_additions: issue.pending_labels().to_vec(),
            create: false,
        })
    }

    /// True when nothing would be sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.label_additions.is_empty()
    }

    /// Whether this is a full create payload rather than an update diff.
    #[must_use]
    pub const fn is_create(&self) -> bool {
        self.create
    }

    /// The changed fields; `None` values clear the field on the server.
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<FieldKey, Option<FieldValue>> {
        &self.fields
    }

    /// Labels to append, as explicit add operations.
    #[must_use]
    pub fn label_additions(&self) -> &[String] {
        &self.label_additions
    }
}

impl Issue {
    /// The changes a save would send right now.
    pub fn changes(&self, table: &FieldTable) -> Result<ChangeSet> {
        ChangeSet::between(self.snapshot(), self, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JirelError;
    use crate::model::{CustomField, FieldId};

    fn table() -> FieldTable {
        FieldTable::from_fields([CustomField {
            id: FieldId::from_custom_number(10042),
            name: "Severity".to_string(),
        }])
    }

    fn snapshot_of(issue: &Issue, table: &FieldTable) -> Snapshot {
        let mut snapshot = Snapshot::default();
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
            let id = table.resolve_required(name).unwrap();
            snapshot.insert(FieldKey::Custom(id), FieldValue::Custom(value.clone()));
        }
        snapshot
    }

    #[test]
    fn test_unchanged_issue_yields_empty_changeset() {
        let mut issue = Issue::new("TST");
        issue.summary = Some("S".to_string());
        issue.affects_versions_mut().insert("1.0".to_string());
        let snapshot = snapshot_of(&issue, &table());

        let cs = ChangeSet::between(Some(&snapshot), &issue, &table()).unwrap();
        assert!(cs.is_empty());
        assert!(!cs.is_create());
    }

    #[test]
    fn test_scalar_change_only() {
        let mut issue = Issue::new("TST");
        issue.summary = Some("S".to_string());
        let snapshot = snapshot_of(&issue, &table());

        issue.description = Some("details".to_string());
        let cs = ChangeSet::between(Some(&snapshot), &issue, &table()).unwrap();

        assert_eq!(cs.fields().len(), 1);
        assert_eq!(
            cs.fields()
                .get(&FieldKey::System(SystemField::Description)),
            Some(&Some(FieldValue::Text("details".to_string())))
        );
    }

    #[test]
    fn test_cleared_scalar_sent_as_null() {
        let mut issue = Issue::new("TST");
        issue.assignee = Some("admin".to_string());
        let snapshot = snapshot_of(&issue, &table());

        issue.assignee = None;
        let cs = ChangeSet::between(Some(&snapshot), &issue, &table()).unwrap();
        assert_eq!(
            cs.fields().get(&FieldKey::System(SystemField::Assignee)),
            Some(&None)
        );
    }

    #[test]
    fn test_relation_change_sends_full_set() {
        let mut issue = Issue::new("TST");
        issue.affects_versions_mut().insert("1.0".to_string());
        let snapshot = snapshot_of(&issue, &table());

        issue.affects_versions_mut().insert("2.0".to_string());
        let cs = ChangeSet::between(Some(&snapshot), &issue, &table()).unwrap();

        let value = cs
            .fields()
            .get(&FieldKey::System(SystemField::AffectsVersions))
            .unwrap();
        let Some(FieldValue::Set(set)) = value else {
            panic!("expected full set, got {value:?}");
        };
        assert_eq!(
            set.iter().cloned().collect::<Vec<_>>(),
            vec!["1.0".to_string(), "2.0".to_string()]
        );
    }

    #[test]
    fn test_labels_are_add_operations_not_diffed() {
        let mut issue = Issue::new("TST");
        issue.summary = Some("S".to_string());
        let snapshot = snapshot_of(&issue, &table());

        issue.add_label("urgent");
        let cs = ChangeSet::between(Some(&snapshot), &issue, &table()).unwrap();

        assert!(cs.fields().is_empty());
        assert_eq!(cs.label_additions(), ["urgent"]);
        assert!(!cs.is_empty());
    }

    #[test]
    fn test_custom_field_change_keyed_by_id() {
        let mut issue = Issue::new("TST");
        issue.set_custom_field("Severity", "minor");
        let snapshot = snapshot_of(&issue, &table());

        issue.set_custom_field("Severity", "major");
        let cs = ChangeSet::between(Some(&snapshot), &issue, &table()).unwrap();

        let key = FieldKey::Custom(FieldId::from_custom_number(10042));
        assert!(cs.fields().contains_key(&key));
    }

    #[test]
    fn test_unresolvable_custom_field_fails() {
        let mut issue = Issue::new("TST");
        issue.set_custom_field("Ghost Field", "x");
        let err = ChangeSet::between(None, &issue, &table()).unwrap_err();
        assert!(matches!(err, JirelError::UnknownField { .. }));
    }

    #[test]
    fn test_create_is_full_state() {
        let mut issue = Issue::new("TST");
        issue.issue_type = Some("1".to_string());
        issue.summary = Some("S".to_string());
        issue.add_label("new");

        let cs = ChangeSet::between(None, &issue, &table()).unwrap();
        assert!(cs.is_create());
        assert!(
            cs.fields()
                .contains_key(&FieldKey::System(SystemField::Project))
        );
        assert!(cs.fields().contains_key(&FieldKey::System(SystemField::Type)));
        assert!(
            cs.fields()
                .contains_key(&FieldKey::System(SystemField::Summary))
        );
        // Labels ride along as a plain field on create.
        assert_eq!(
            cs.fields().get(&FieldKey::System(SystemField::Labels)),
            Some(&Some(FieldValue::List(vec!["new".to_string()])))
        );
        assert!(cs.label_additions().is_empty());
    }
}
