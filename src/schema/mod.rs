//! Custom-field schema resolution.
//!
//! The remote service identifies custom fields by stable ids
//! (`customfield_NNNNN`) while callers work with display names. The
//! [`FieldTable`] holds the name/id mapping in both directions; it is
//! built once from the server's field catalog and never mutated after.
//!
//! [`SchemaCache`] wraps the table in a `tokio::sync::OnceCell` so that
//! concurrent first-use coalesces into a single catalog fetch and a
//! failed fetch is not cached.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::{JirelError, Result};
use crate::model::{CustomField, FieldId};

/// Immutable display-name → field-id mapping with reverse lookup.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    by_name: HashMap<String, FieldId>,
    by_id: HashMap<FieldId, String>,
}

impl FieldTable {
    /// An empty table; sufficient for predicates and diffs that touch no
    /// custom fields.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from custom field definitions.
    #[must_use]
    pub fn from_fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = CustomField>,
    {
        let mut by_name = HashMap::new();
        let mut by_id = HashMap::new();
        for field in fields {
            by_name.insert(field.name.clone(), field.id.clone());
            by_id.insert(field.id, field.name);
        }
        Self { by_name, by_id }
    }

    /// Resolve a display name to its field id.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&FieldId> {
        self.by_name.get(name)
    }

    /// Resolve a display name, also accepting an already-resolved raw
    /// `customfield_NNNNN` id (so entities round-trip losslessly even
    /// when the catalog is stale).
    pub fn resolve_required(&self, name: &str) -> Result<FieldId> {
        if let Some(id) = self.by_name.get(name) {
            return Ok(id.clone());
        }
        let raw = FieldId::new(name);
        if raw.is_custom() {
            return Ok(raw);
        }
        Err(JirelError::unknown_field(name))
    }

    /// Reverse lookup: display name for a field id.
    #[must_use]
    pub fn display_name(&self, id: &FieldId) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    /// All known custom fields, ordered by display name.
    #[must_use]
    pub fn custom_fields(&self) -> Vec<CustomField> {
        let mut fields: Vec<CustomField> = self
            .by_name
            .iter()
            .map(|(name, id)| CustomField {
                id: id.clone(),
                name: name.clone(),
            })
            .collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Populate-once, read-many holder for the client's [`FieldTable`].
#[derive(Debug, Default)]
pub struct SchemaCache {
    cell: OnceCell<Arc<FieldTable>>,
}

impl SchemaCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached table, fetching via `populate` on first use. Concurrent
    /// callers before population collapse into one fetch; an `Err` from
    /// `populate` leaves the cell empty so a later call can retry.
    pub async fn get_or_fetch<F, Fut>(&self, populate: F) -> Result<Arc<FieldTable>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FieldTable>>,
    {
        let table = self
            .cell
            .get_or_try_init(|| async {
                let table = populate().await?;
                debug!(custom_fields = table.len(), "populated field table");
                Ok::<_, JirelError>(Arc::new(table))
            })
            .await?;
        Ok(Arc::clone(table))
    }

    /// The table, if already populated.
    #[must_use]
    pub fn get(&self) -> Option<Arc<FieldTable>> {
        self.cell.get().map(Arc::clone)
    }
}
