//! Blocking mirror of the async client.
//!
//! Wraps [`crate::Jira`] in an owned current-thread runtime so callers
//! without an async context get the same surface, minus tokens and
//! `.await`. Do not use from inside an async runtime.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client;
use crate::client::SearchCursor;
use crate::config::ClientConfig;
use crate::error::{JirelError, Result};
use crate::jql::Predicate;
use crate::model::{
    Attachment, Comment, CustomField, FieldId, Issue, IssueKey, IssuePriority, IssueResolution,
    IssueStatus, IssueType, ProjectComponent, ProjectVersion, RemoteLink,
};
use crate::transport::Transport;

/// Blocking client over one Jira-style service.
pub struct Jira {
    inner: client::Jira,
    runtime: tokio::runtime::Runtime,
}

impl Jira {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self {
            inner: client::Jira::new(config, transport),
            runtime: runtime()?,
        })
    }

    pub fn connect(
        base_url: impl Into<String>,
        user: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            inner: client::Jira::connect(base_url, user, secret),
            runtime: runtime()?,
        })
    }

    pub fn anonymous(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            inner: client::Jira::anonymous(base_url),
            runtime: runtime()?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self {
            inner: client::Jira::from_env()?,
            runtime: runtime()?,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        self.inner.config()
    }

    /// Translate `predicate` and iterate the matching issues.
    pub fn query(&self, predicate: &Predicate, limit: Option<usize>) -> Result<SearchIter<'_>> {
        let cancel = CancellationToken::new();
        let cursor = self
            .runtime
            .block_on(self.inner.query(predicate, limit, &cancel))?;
        Ok(SearchIter {
            runtime: &self.runtime,
            cursor,
            cancel,
        })
    }

    /// Iterate the results of a raw JQL string.
    #[must_use]
    pub fn search(&self, jql: impl Into<String>, limit: Option<usize>) -> SearchIter<'_> {
        SearchIter {
            runtime: &self.runtime,
            cursor: self.inner.search(jql, limit),
            cancel: CancellationToken::new(),
        }
    }

    pub fn issue(&self, key: &IssueKey) -> Result<Issue> {
        self.block(self.inner.issue(key, &CancellationToken::new()))
    }

    pub fn save(&self, issue: &mut Issue) -> Result<()> {
        self.runtime
            .block_on(self.inner.save(issue, &CancellationToken::new()))
    }

    pub fn resolve_custom_field(&self, name: &str) -> Result<FieldId> {
        self.block(self.inner.resolve_custom_field(name, &CancellationToken::new()))
    }

    pub fn custom_fields(&self) -> Result<Vec<CustomField>> {
        self.block(self.inner.custom_fields(&CancellationToken::new()))
    }

    pub fn comments(&self, key: &IssueKey) -> Result<Vec<Comment>> {
        self.block(self.inner.comments(key, &CancellationToken::new()))
    }

    pub fn add_comment(&self, key: &IssueKey, body: &str) -> Result<Comment> {
        self.block(self.inner.add_comment(key, body, &CancellationToken::new()))
    }

    pub fn remote_links(&self, key: &IssueKey) -> Result<Vec<RemoteLink>> {
        self.block(self.inner.remote_links(key, &CancellationToken::new()))
    }

    pub fn create_remote_link(
        &self,
        key: &IssueKey,
        url: &str,
        title: &str,
        summary: Option<&str>,
    ) -> Result<()> {
        self.block(
            self.inner
                .create_remote_link(key, url, title, summary, &CancellationToken::new()),
        )
    }

    pub fn attachments(&self, key: &IssueKey) -> Result<Vec<Attachment>> {
        self.block(self.inner.attachments(key, &CancellationToken::new()))
    }

    pub fn issue_types(&self) -> Result<Vec<IssueType>> {
        self.block(self.inner.issue_types(&CancellationToken::new()))
    }

    pub fn priorities(&self) -> Result<Vec<IssuePriority>> {
        self.block(self.inner.priorities(&CancellationToken::new()))
    }

    pub fn resolutions(&self) -> Result<Vec<IssueResolution>> {
        self.block(self.inner.resolutions(&CancellationToken::new()))
    }

    pub fn statuses(&self) -> Result<Vec<IssueStatus>> {
        self.block(self.inner.statuses(&CancellationToken::new()))
    }

    pub fn project_versions(&self, project: &str) -> Result<Vec<ProjectVersion>> {
        self.block(
            self.inner
                .project_versions(project, &CancellationToken::new()),
        )
    }

    pub fn project_components(&self, project: &str) -> Result<Vec<ProjectComponent>> {
        self.block(
            self.inner
                .project_components(project, &CancellationToken::new()),
        )
    }

    fn block<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        self.runtime.block_on(fut)
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| JirelError::Config(format!("failed to build blocking runtime: {e}")))
}

/// Blocking iterator over search results, one page fetch at a time.
pub struct SearchIter<'a> {
    runtime: &'a tokio::runtime::Runtime,
    cursor: SearchCursor<'a>,
    cancel: CancellationToken,
}

impl SearchIter<'_> {
    /// The server's total-count hint, known after the first page.
    #[must_use]
    pub const fn total_hint(&self) -> Option<usize> {
        self.cursor.total_hint()
    }
}

impl Iterator for SearchIter<'_> {
    type Item = Result<Issue>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime
            .block_on(self.cursor.next_issue(&self.cancel))
            .transpose()
    }
}
