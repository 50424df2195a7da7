//! `jirel` — a typed client for Jira-style issue trackers.
//!
//! Three things live here:
//!
//! - a **query translator**: a strongly-typed predicate tree compiled to
//!   JQL, with operator/type validation, literal escaping, and
//!   custom-field name resolution done locally before anything is sent
//! - a **paging coordinator**: [`SearchCursor`] walks the server-capped
//!   search endpoint in increasing offset order and yields a single
//!   ordered, deduplicated sequence honoring a caller limit
//! - a **field diff engine**: issues track a server [`Snapshot`] and
//!   saves send only what changed — full replacement sets for relation
//!   fields, explicit add operations for labels
//!
//! ```no_run
//! use jirel::{CancellationToken, Jira, SystemField};
//! use jirel::jql::field;
//!
//! # async fn run() -> jirel::Result<()> {
//! let jira = Jira::connect("https://jira.example.com", "admin", "secret");
//! let cancel = CancellationToken::new();
//!
//! let predicate = field(SystemField::Project)
//!     .eq("TST")
//!     .and(field(SystemField::AffectsVersions).contains_all(["1.0", "2.0"]));
//! let mut results = jira.query(&predicate, Some(10), &cancel).await?;
//! while let Some(mut issue) = results.next_issue(&cancel).await? {
//!     issue.description = Some("triaged".to_string());
//!     jira.save(&mut issue, &cancel).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Network transport is an injected capability ([`transport::Transport`]);
//! retry policy, authentication schemes beyond header application, and
//! attachment byte streaming are collaborator concerns.

pub mod blocking;
pub mod client;
pub mod config;
pub mod diff;
pub mod error;
pub mod jql;
pub mod model;
pub mod schema;
pub mod transport;
pub mod wire;

pub use client::{Jira, SearchCursor};
pub use config::ClientConfig;
pub use diff::ChangeSet;
pub use error::{JirelError, Result};
pub use jql::Predicate;
pub use model::{
    CustomFieldValue, FieldId, FieldKey, FieldValue, Issue, IssueKey, Snapshot, SystemField,
};
pub use schema::FieldTable;
pub use transport::{Credentials, Transport, TransportError};

// Re-exported so callers need not depend on tokio-util directly.
pub use tokio_util::sync::CancellationToken;
