//! The async client facade: query, fetch, save, and catalog lookups.
//!
//! Every operation takes a `CancellationToken` as its final parameter.
//! Suspension happens only where a request is delegated to the
//! transport; translation and diff logic never await. Cancellation at a
//! suspension point surfaces [`JirelError::Cancelled`] without partial
//! state: nothing already fetched or mapped is invalidated.

mod search;

pub use search::SearchCursor;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{JirelError, Result};
use crate::jql::{self, Predicate};
use crate::model::{
    Attachment, Comment, CustomField, FieldId, Issue, IssuePriority, IssueResolution, IssueStatus,
    IssueType, IssueKey, ProjectComponent, ProjectVersion, RemoteLink,
};
use crate::schema::{FieldTable, SchemaCache};
use crate::transport::{Credentials, HttpTransport, Request, Response, Transport};
use crate::wire::{
    self, CommentPage, CreatedIssue, RemoteComment, RemoteField, RemoteIssue, RemoteLinkRecord,
};

/// A client for one Jira-style service.
///
/// Cheap to share by reference across tasks: the only state shared
/// between operations is the immutable field table, populated once.
pub struct Jira {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    schema: SchemaCache,
}

impl Jira {
    /// A client over an injected transport.
    #[must_use]
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            schema: SchemaCache::new(),
        }
    }

    /// Convenience constructor: HTTP transport with basic credentials.
    #[must_use]
    pub fn connect(
        base_url: impl Into<String>,
        user: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        let config = ClientConfig::new(base_url);
        let transport = HttpTransport::new(&config.base_url, Credentials::basic(user, secret));
        Self::new(config, Arc::new(transport))
    }

    /// Convenience constructor: HTTP transport without credentials.
    #[must_use]
    pub fn anonymous(base_url: impl Into<String>) -> Self {
        let config = ClientConfig::new(base_url);
        let transport = HttpTransport::new(&config.base_url, Credentials::Anonymous);
        Self::new(config, Arc::new(transport))
    }

    /// Client configured from `JIREL_URL` / `JIREL_USER` / `JIREL_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        let transport = HttpTransport::new(&config.base_url, Credentials::from_env());
        Ok(Self::new(config, Arc::new(transport)))
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Translate `predicate` and return a cursor over the matching
    /// issues. Translation failures surface here, before any search
    /// request is sent.
    pub async fn query(
        &self,
        predicate: &Predicate,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<SearchCursor<'_>> {
        let table = if predicate.references_custom_fields() {
            self.field_table(cancel).await?
        } else {
            self.table_or_empty()
        };
        let jql = jql::translate(predicate, &table)?;
        debug!(%jql, ?limit, "translated predicate");
        Ok(SearchCursor::new(self, jql, limit))
    }

    /// A cursor over a raw JQL string, for queries the predicate API
    /// does not cover.
    #[must_use]
    pub fn search(&self, jql: impl Into<String>, limit: Option<usize>) -> SearchCursor<'_> {
        SearchCursor::new(self, jql.into(), limit)
    }

    /// Fetch a single issue by key.
    pub async fn issue(&self, key: &IssueKey, cancel: &CancellationToken) -> Result<Issue> {
        let request = Request::get(format!("/rest/api/2/issue/{key}"));
        let response = self.send(request, cancel).await?;
        if response.status == 404 {
            return Err(JirelError::IssueNotFound {
                key: key.to_string(),
            });
        }
        if !response.is_success() {
            return Err(remote_error(&response));
        }
        let remote: RemoteIssue = response.json()?;
        wire::issue_from_remote(remote, &self.table_or_empty())
    }

    /// Create or update `issue`, dispatching on whether it has a server
    /// snapshot. An update with no changes sends nothing. After a
    /// successful write the entity's state and snapshot are replaced
    /// wholesale by the server's authoritative representation, which may
    /// differ from what was sent (normalization, defaults).
    pub async fn save(&self, issue: &mut Issue, cancel: &CancellationToken) -> Result<()> {
        if let Some(key) = issue.key() {
            if key.project() != issue.project {
                return Err(JirelError::KeyMismatch {
                    key: key.clone(),
                    project: issue.project.clone(),
                });
            }
        }

        let table = if issue.custom_fields().is_empty() {
            self.table_or_empty()
        } else {
            self.field_table(cancel).await?
        };
        let changes = issue.changes(&table)?;

        let key = if issue.is_saved() {
            let Some(key) = issue.key().cloned() else {
                return Err(JirelError::NotSaved);
            };
            if changes.is_empty() {
                debug!(key = %key, "no changes; skipping write");
                return Ok(());
            }
            let payload = wire::update_payload(&changes);
            let request = Request::put(format!("/rest/api/2/issue/{key}"), payload);
            let response = self.send(request, cancel).await?;
            match response.status {
                status if (200..300).contains(&status) => {}
                404 => {
                    return Err(JirelError::IssueNotFound {
                        key: key.to_string(),
                    });
                }
                // The service signalled a conflicting concurrent edit.
                // Otherwise this client is last-write-wins: it trusts
                // the local snapshot without a preflight version check.
                409 => {
                    return Err(JirelError::StaleEntity {
                        key: key.to_string(),
                    });
                }
                _ => return Err(remote_error(&response)),
            }
            debug!(key = %key, changed = changes.fields().len(), "updated issue");
            key
        } else {
            let payload = wire::create_payload(&changes);
            let response = self
                .send(Request::post("/rest/api/2/issue", payload), cancel)
                .await?;
            if !response.is_success() {
                return Err(remote_error(&response));
            }
            let created: CreatedIssue = response.json()?;
            let key = IssueKey::new(created.key)?;
            debug!(key = %key, "created issue");
            key
        };

        *issue = self.issue(&key, cancel).await?;
        Ok(())
    }

    /// Resolve a custom-field display name to its stable identifier,
    /// populating the field table on first use.
    pub async fn resolve_custom_field(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<FieldId> {
        let table = self.field_table(cancel).await?;
        table.resolve_required(name)
    }

    /// All custom fields known to the server.
    pub async fn custom_fields(&self, cancel: &CancellationToken) -> Result<Vec<CustomField>> {
        let table = self.field_table(cancel).await?;
        Ok(table.custom_fields())
    }

    /// Comments on an issue, oldest first.
    pub async fn comments(
        &self,
        key: &IssueKey,
        cancel: &CancellationToken,
    ) -> Result<Vec<Comment>> {
        let page: CommentPage = self
            .get_entity(key, format!("/rest/api/2/issue/{key}/comment"), cancel)
            .await?;
        Ok(page
            .comments
            .into_iter()
            .map(wire::comment_from_remote)
            .collect())
    }

    /// Append a comment to an issue.
    pub async fn add_comment(
        &self,
        key: &IssueKey,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<Comment> {
        let request = Request::post(
            format!("/rest/api/2/issue/{key}/comment"),
            serde_json::json!({ "body": body }),
        );
        let response = self.send(request, cancel).await?;
        if response.status == 404 {
            return Err(JirelError::IssueNotFound {
                key: key.to_string(),
            });
        }
        if !response.is_success() {
            return Err(remote_error(&response));
        }
        let remote: RemoteComment = response.json()?;
        Ok(wire::comment_from_remote(remote))
    }

    /// Remote links attached to an issue.
    pub async fn remote_links(
        &self,
        key: &IssueKey,
        cancel: &CancellationToken,
    ) -> Result<Vec<RemoteLink>> {
        let records: Vec<RemoteLinkRecord> = self
            .get_entity(key, format!("/rest/api/2/issue/{key}/remotelink"), cancel)
            .await?;
        Ok(records
            .into_iter()
            .map(wire::remote_link_from_remote)
            .collect())
    }

    /// Attach a remote link to an issue.
    pub async fn create_remote_link(
        &self,
        key: &IssueKey,
        url: &str,
        title: &str,
        summary: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let request = Request::post(
            format!("/rest/api/2/issue/{key}/remotelink"),
            wire::remote_link_payload(url, title, summary),
        );
        let response = self.send(request, cancel).await?;
        if response.status == 404 {
            return Err(JirelError::IssueNotFound {
                key: key.to_string(),
            });
        }
        if !response.is_success() {
            return Err(remote_error(&response));
        }
        Ok(())
    }

    /// Attachment metadata for an issue. Byte streaming is delegated to
    /// the transport's collaborators and out of scope here.
    pub async fn attachments(
        &self,
        key: &IssueKey,
        cancel: &CancellationToken,
    ) -> Result<Vec<Attachment>> {
        let remote: RemoteIssue = self
            .get_entity(
                key,
                format!("/rest/api/2/issue/{key}?fields=attachment"),
                cancel,
            )
            .await?;
        Ok(remote
            .fields
            .attachment
            .unwrap_or_default()
            .into_iter()
            .map(wire::attachment_from_remote)
            .collect())
    }

    pub async fn issue_types(&self, cancel: &CancellationToken) -> Result<Vec<IssueType>> {
        self.get_catalog("/rest/api/2/issuetype", cancel).await
    }

    pub async fn priorities(&self, cancel: &CancellationToken) -> Result<Vec<IssuePriority>> {
        self.get_catalog("/rest/api/2/priority", cancel).await
    }

    pub async fn resolutions(&self, cancel: &CancellationToken) -> Result<Vec<IssueResolution>> {
        self.get_catalog("/rest/api/2/resolution", cancel).await
    }

    pub async fn statuses(&self, cancel: &CancellationToken) -> Result<Vec<IssueStatus>> {
        self.get_catalog("/rest/api/2/status", cancel).await
    }

    pub async fn project_versions(
        &self,
        project: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProjectVersion>> {
        self.get_catalog(format!("/rest/api/2/project/{project}/versions"), cancel)
            .await
    }

    pub async fn project_components(
        &self,
        project: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProjectComponent>> {
        self.get_catalog(format!("/rest/api/2/project/{project}/components"), cancel)
            .await
    }

    // === internals ===

    /// The single suspension point: delegate to the transport, racing
    /// the cancellation token.
    pub(crate) async fn send(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        debug!(method = request.method.as_str(), path = %request.path, "sending request");
        // Biased: an already-cancelled token short-circuits before the
        // transport is touched.
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(JirelError::Cancelled),
            result = self.transport.send(request) => Ok(result?),
        }
    }

    /// The field table, fetched once per client from the field catalog.
    /// Concurrent first callers coalesce into a single fetch.
    pub(crate) async fn field_table(&self, cancel: &CancellationToken) -> Result<Arc<FieldTable>> {
        self.schema
            .get_or_fetch(|| async {
                let response = self.send(Request::get("/rest/api/2/field"), cancel).await?;
                if !response.is_success() {
                    return Err(remote_error(&response));
                }
                let fields: Vec<RemoteField> = response.json()?;
                Ok(FieldTable::from_fields(
                    fields.into_iter().filter_map(RemoteField::into_custom),
                ))
            })
            .await
    }

    /// The populated table if there is one; otherwise an empty table
    /// (custom fields then keep their raw wire ids, losslessly).
    pub(crate) fn table_or_empty(&self) -> Arc<FieldTable> {
        self.schema
            .get()
            .unwrap_or_else(|| Arc::new(FieldTable::empty()))
    }

    async fn get_entity<T: serde::de::DeserializeOwned>(
        &self,
        key: &IssueKey,
        path: String,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let response = self.send(Request::get(path), cancel).await?;
        if response.status == 404 {
            return Err(JirelError::IssueNotFound {
                key: key.to_string(),
            });
        }
        if !response.is_success() {
            return Err(remote_error(&response));
        }
        Ok(response.json()?)
    }

    async fn get_catalog<T: serde::de::DeserializeOwned>(
        &self,
        path: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let response = self.send(Request::get(path), cancel).await?;
        if !response.is_success() {
            return Err(remote_error(&response));
        }
        Ok(response.json()?)
    }
}

/// Fold a non-success response into a `Remote` error, parsing the
/// service's `errorMessages`/`errors` body leniently.
pub(crate) fn remote_error(response: &Response) -> JirelError {
    JirelError::Remote {
        status: response.status,
        message: error_message(response),
    }
}

fn error_message(response: &Response) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&response.body) {
        let mut parts = Vec::new();
        if let Some(messages) = value.get("errorMessages").and_then(|v| v.as_array()) {
            parts.extend(
                messages
                    .iter()
                    .filter_map(|m| m.as_str().map(ToString::to_string)),
            );
        }
        if let Some(errors) = value.get("errors").and_then(|v| v.as_object()) {
            parts.extend(
                errors
                    .iter()
                    .map(|(field, m)| format!("{field}: {}", m.as_str().unwrap_or_default())),
            );
        }
        if !parts.is_empty() {
            return parts.join("; ");
        }
    }
    response.text()
}
