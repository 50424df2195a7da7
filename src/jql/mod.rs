//! Typed predicate expressions and their JQL translation.
//!
//! Callers build a [`Predicate`] tree with the builder API and the
//! client compiles it to a JQL string at query time:
//!
//! ```
//! use jirel::jql::{field, custom};
//! use jirel::model::SystemField;
//!
//! let predicate = field(SystemField::Project)
//!     .eq("TST")
//!     .and(field(SystemField::AffectsVersions).contains_all(["1.0", "2.0"]))
//!     .and(custom("Severity").eq("major"));
//! ```
//!
//! Translation is pure and deterministic; invalid operator/field/type
//! combinations and unresolvable custom-field names are rejected here,
//! before any request is formed.

mod ast;
mod translate;

pub use ast::{CompareOp, Field, Predicate, Value, custom, field};
pub use translate::translate;
