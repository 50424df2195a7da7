//! The paging coordinator over the search endpoint.

use std::collections::{HashSet, VecDeque};

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Jira, remote_error};
use crate::error::Result;
use crate::model::Issue;
use crate::transport::Request;
use crate::wire::{self, SearchPage};

/// A finite, forward-only, non-restartable sequence of search results.
///
/// Pages are fetched in strictly increasing offset order, one at a
/// time; issues within a fetched page are consumable before the next
/// page request is issued. Results are deduplicated by issue key across
/// page boundaries. A cancelled page fetch surfaces
/// [`Cancelled`](crate::JirelError::Cancelled) and leaves the cursor
/// intact: everything already yielded stays valid and the fetch may be
/// retried.
pub struct SearchCursor<'a> {
    jira: &'a Jira,
    jql: String,
    limit: Option<usize>,
    start_at: usize,
    yielded: usize,
    total: Option<usize>,
    exhausted: bool,
    seen: HashSet<String>,
    buffer: VecDeque<Issue>,
}

impl<'a> SearchCursor<'a> {
    pub(crate) fn new(jira: &'a Jira, jql: String, limit: Option<usize>) -> Self {
        Self {
            jira,
            jql,
            limit,
            start_at: 0,
            yielded: 0,
            total: None,
            exhausted: limit == Some(0),
            seen: HashSet::new(),
            buffer: VecDeque::new(),
        }
    }

    /// The translated query this cursor executes.
    #[must_use]
    pub fn jql(&self) -> &str {
        &self.jql
    }

    /// The server's total-count hint, known after the first page.
    #[must_use]
    pub const fn total_hint(&self) -> Option<usize> {
        self.total
    }

    /// The next issue, fetching the next page when the current one is
    /// drained. `Ok(None)` once the sequence is exhausted.
    pub async fn next_issue(&mut self, cancel: &CancellationToken) -> Result<Option<Issue>> {
        loop {
            if let Some(issue) = self.buffer.pop_front() {
                self.yielded += 1;
                if self.limit.is_some_and(|limit| self.yielded >= limit) {
                    self.exhausted = true;
                    self.buffer.clear();
                }
                return Ok(Some(issue));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page(cancel).await?;
        }
    }

    /// Drain the rest of the sequence.
    pub async fn collect_remaining(&mut self, cancel: &CancellationToken) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        while let Some(issue) = self.next_issue(cancel).await? {
            issues.push(issue);
        }
        Ok(issues)
    }

    async fn fetch_page(&mut self, cancel: &CancellationToken) -> Result<()> {
        let config = self.jira.config();
        // The configured page size is a request, not a guarantee; clamp
        // to the server cap and to however many records are still owed
        // under the local limit.
        let mut requested = config.page_size.min(config.server_page_cap);
        if let Some(limit) = self.limit {
            requested = requested.min(limit - self.yielded);
        }

        let body = json!({
            "jql": self.jql,
            "startAt": self.start_at,
            "maxResults": requested,
        });
        let response = self
            .jira
            .send(Request::post("/rest/api/2/search", body), cancel)
            .await?;
        if !response.is_success() {
            return Err(remote_error(&response));
        }
        let page: SearchPage = response.json()?;
        let received = page.issues.len();
        debug!(
            start_at = self.start_at,
            requested,
            received,
            total = ?page.total,
            "fetched search page"
        );

        self.total = page.total;
        self.start_at += received;

        let table = self.jira.table_or_empty();
        for remote in page.issues {
            // A record can reappear when server-side ordering shifts
            // between page fetches; yield each key once.
            if !self.seen.insert(remote.key.clone()) {
                continue;
            }
            self.buffer.push_back(wire::issue_from_remote(remote, &table)?);
        }

        self.exhausted = if received == 0 {
            true
        } else if let Some(total) = page.total {
            // The server may honor fewer records than requested; a short
            // page only means exhaustion once the reported total is
            // reached.
            self.start_at >= total
        } else {
            received < requested
        };
        Ok(())
    }
}
