//! Predicate expression tree and builder API.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

use crate::model::SystemField;

/// A field reference in a predicate: a known system field or a
/// custom-field display name resolved at translation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    System(SystemField),
    Custom(String),
}

impl From<SystemField> for Field {
    fn from(f: SystemField) -> Self {
        Self::System(f)
    }
}

/// Shorthand for referencing a field in the builder API.
pub fn field(f: impl Into<Field>) -> Field {
    f.into()
}

/// Shorthand for referencing a custom field by display name.
pub fn custom(name: impl Into<String>) -> Field {
    Field::Custom(name.into())
}

/// Comparison operator of a predicate leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
}

/// A literal value in a predicate leaf.
///
/// `LocalDateTime` carries a zone-less timestamp; its comparison
/// semantics are ambiguous across local/server zones, so the translator
/// rejects it. Convert to UTC first.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Instant(DateTime<Utc>),
    LocalDateTime(NaiveDateTime),
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Instant(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::Instant(v.with_timezone(&Utc))
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::LocalDateTime(v)
    }
}

/// A filter over issue fields, built by the caller and compiled to JQL
/// by [`translate`](super::translate).
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison {
        field: Field,
        op: CompareOp,
        value: Value,
    },
    /// Conjunctive membership: the entity's set for `field` contains ALL
    /// of `values`.
    MembershipAll { field: Field, values: Vec<Value> },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Field {
    fn cmp_with(self, op: CompareOp, value: impl Into<Value>) -> Predicate {
        Predicate::Comparison {
            field: self,
            op,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn eq(self, value: impl Into<Value>) -> Predicate {
        self.cmp_with(CompareOp::Eq, value)
    }

    #[must_use]
    pub fn ne(self, value: impl Into<Value>) -> Predicate {
        self.cmp_with(CompareOp::NotEq, value)
    }

    #[must_use]
    pub fn gt(self, value: impl Into<Value>) -> Predicate {
        self.cmp_with(CompareOp::Gt, value)
    }

    #[must_use]
    pub fn gte(self, value: impl Into<Value>) -> Predicate {
        self.cmp_with(CompareOp::GtEq, value)
    }

    #[must_use]
    pub fn lt(self, value: impl Into<Value>) -> Predicate {
        self.cmp_with(CompareOp::Lt, value)
    }

    #[must_use]
    pub fn lte(self, value: impl Into<Value>) -> Predicate {
        self.cmp_with(CompareOp::LtEq, value)
    }

    /// Membership test over a multi-valued field: every value must be
    /// present in the entity's set.
    #[must_use]
    pub fn contains_all<I, V>(self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::MembershipAll {
            field: self,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl Predicate {
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Whether any leaf references a custom field; used by the client to
    /// decide if the field table must be populated before translation.
    #[must_use]
    pub fn references_custom_fields(&self) -> bool {
        match self {
            Self::Comparison { field, .. } | Self::MembershipAll { field, .. } => {
                matches!(field, Field::Custom(_))
            }
            Self::And(l, r) | Self::Or(l, r) => {
                l.references_custom_fields() || r.references_custom_fields()
            }
        }
    }
}
