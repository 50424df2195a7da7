//! Compilation of predicate trees to JQL strings.

use crate::error::{JirelError, Result};
use crate::jql::ast::{CompareOp, Field, Predicate, Value};
use crate::model::FieldKind;
use crate::schema::FieldTable;

/// Compile a predicate tree to a JQL string.
///
/// Pure and deterministic: identical trees yield identical strings.
/// Unsupported operator/field/type combinations and unresolvable
/// custom-field names fail here, never at the remote service.
pub fn translate(predicate: &Predicate, table: &FieldTable) -> Result<String> {
    let mut out = String::new();
    emit(predicate, table, &mut out)?;
    Ok(out)
}

fn emit(predicate: &Predicate, table: &FieldTable, out: &mut String) -> Result<()> {
    match predicate {
        Predicate::And(left, right) => {
            emit(left, table, out)?;
            out.push_str(" and ");
            emit(right, table, out)
        }
        Predicate::Or(left, right) => {
            // Parenthesized so nested precedence never depends on the
            // service's parser.
            out.push('(');
            emit(left, table, out)?;
            out.push_str(" or ");
            emit(right, table, out)?;
            out.push(')');
            Ok(())
        }
        Predicate::Comparison { field, op, value } => {
            let resolved = resolve(field, table)?;
            emit_clause(&resolved, *op, value, out)
        }
        Predicate::MembershipAll { field, values } => {
            let resolved = resolve(field, table)?;
            if resolved.kind != FieldKind::Multi {
                return Err(JirelError::unsupported(format!(
                    "membership test on scalar field '{}'",
                    resolved.name
                )));
            }
            if values.is_empty() {
                return Err(JirelError::unsupported(format!(
                    "membership test on '{}' needs at least one value",
                    resolved.name
                )));
            }
            // Duplicate equality clauses on one multi-valued field are
            // conjunctive membership tests: the set must contain ALL of
            // the values, never "any of".
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    out.push_str(" and ");
                }
                emit_clause(&resolved, CompareOp::Eq, value, out)?;
            }
            Ok(())
        }
    }
}

struct ResolvedField {
    name: String,
    kind: FieldKind,
}

fn resolve(field: &Field, table: &FieldTable) -> Result<ResolvedField> {
    match field {
        Field::System(f) => Ok(ResolvedField {
            name: f.jql_name().to_string(),
            kind: f.kind(),
        }),
        Field::Custom(name) => {
            let id = table.resolve_required(name)?;
            let number = id
                .custom_number()
                .ok_or_else(|| JirelError::unknown_field(name.clone()))?;
            Ok(ResolvedField {
                name: format!("cf[{number}]"),
                kind: FieldKind::Keyword,
            })
        }
    }
}

fn emit_clause(
    field: &ResolvedField,
    op: CompareOp,
    value: &Value,
    out: &mut String,
) -> Result<()> {
    let token = operator_token(field, op)?;
    out.push_str(&field.name);
    out.push(' ');
    out.push_str(token);
    out.push(' ');
    emit_value(&field.name, value, out)
}

fn operator_token(field: &ResolvedField, op: CompareOp) -> Result<&'static str> {
    let token = match (field.kind, op) {
        // The search language reserves `=` for exact-match field types;
        // `~` is the equality form on free-text fields.
        (FieldKind::Text, CompareOp::Eq) => "~",
        (FieldKind::Text, CompareOp::NotEq) => "!~",
        (_, CompareOp::Eq) => "=",
        (_, CompareOp::NotEq) => "!=",
        (kind, op) if !kind.is_orderable() => {
            return Err(JirelError::unsupported(format!(
                "ordering comparison '{op:?}' on field '{}'",
                field.name
            )));
        }
        (_, CompareOp::Gt) => ">",
        (_, CompareOp::GtEq) => ">=",
        (_, CompareOp::Lt) => "<",
        (_, CompareOp::LtEq) => "<=",
    };
    Ok(token)
}

fn emit_value(field_name: &str, value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Text(s) => {
            quote_literal(s, out);
            Ok(())
        }
        Value::Number(n) => {
            out.push_str(&format!("{n}"));
            Ok(())
        }
        Value::Date(d) => {
            out.push_str(&format!("\"{}\"", d.format("%Y/%m/%d")));
            Ok(())
        }
        Value::Instant(dt) => {
            // Already normalized to UTC by construction.
            out.push_str(&format!("\"{}\"", dt.format("%Y/%m/%d %H:%M")));
            Ok(())
        }
        Value::LocalDateTime(_) => Err(JirelError::unsupported(format!(
            "date-time value for '{field_name}' has no time zone; convert to UTC first"
        ))),
    }
}

/// Append `s` as a double-quoted JQL string literal. Every character of
/// caller-supplied text lands inside the quotes escaped; injection into
/// the surrounding query is not possible.
fn quote_literal(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jql::{custom, field};
    use crate::model::{CustomField, FieldId, SystemField};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn table() -> FieldTable {
        FieldTable::from_fields([CustomField {
            id: FieldId::from_custom_number(10042),
            name: "Severity".to_string(),
        }])
    }

    #[test]
    fn test_keyword_equality() {
        let jql = translate(&field(SystemField::Project).eq("TST"), &table()).unwrap();
        assert_eq!(jql, "project = \"TST\"");
    }

    #[test]
    fn test_text_equality_uses_match_operator() {
        let jql = translate(&field(SystemField::Summary).eq("crash"), &table()).unwrap();
        assert_eq!(jql, "summary ~ \"crash\"");
    }

    #[test]
    fn test_conjunction_token() {
        let p = field(SystemField::Project)
            .eq("TST")
            .and(field(SystemField::Assignee).eq("admin"));
        assert_eq!(
            translate(&p, &table()).unwrap(),
            "project = \"TST\" and assignee = \"admin\""
        );
    }

    #[test]
    fn test_disjunction_parenthesized() {
        let p = field(SystemField::Priority)
            .eq("1")
            .or(field(SystemField::Priority).eq("2"));
        assert_eq!(
            translate(&p, &table()).unwrap(),
            "(priority = \"1\" or priority = \"2\")"
        );
    }

    #[test]
    fn test_membership_is_conjunctive() {
        let p = field(SystemField::AffectsVersions).contains_all(["1.0", "2.0"]);
        assert_eq!(
            translate(&p, &table()).unwrap(),
            "affectedVersion = \"1.0\" and affectedVersion = \"2.0\""
        );
    }

    #[test]
    fn test_membership_on_scalar_rejected() {
        let p = field(SystemField::Assignee).contains_all(["a", "b"]);
        let err = translate(&p, &table()).unwrap_err();
        assert!(matches!(err, JirelError::UnsupportedQuery { .. }));
    }

    #[test]
    fn test_ordering_on_text_rejected() {
        let p = field(SystemField::Summary).gt("a");
        let err = translate(&p, &table()).unwrap_err();
        assert!(matches!(err, JirelError::UnsupportedQuery { .. }));
    }

    #[test]
    fn test_ordering_on_multi_rejected() {
        let p = field(SystemField::Labels).lt("z");
        assert!(translate(&p, &table()).is_err());
    }

    #[test]
    fn test_custom_field_resolution() {
        let jql = translate(&custom("Severity").eq("major"), &table()).unwrap();
        assert_eq!(jql, "cf[10042] = \"major\"");
    }

    #[test]
    fn test_unknown_custom_field() {
        let err = translate(&custom("Nope").eq("x"), &table()).unwrap_err();
        assert!(matches!(err, JirelError::UnknownField { name } if name == "Nope"));
    }

    #[test]
    fn test_quote_and_backslash_escaped() {
        let jql = translate(
            &field(SystemField::Summary).eq("say \"hi\" \\ bye"),
            &table(),
        )
        .unwrap();
        assert_eq!(jql, "summary ~ \"say \\\"hi\\\" \\\\ bye\"");
    }

    #[test]
    fn test_date_emission() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let jql = translate(&field(SystemField::DueDate).lte(d), &table()).unwrap();
        assert_eq!(jql, "duedate <= \"2024/03/09\"");
    }

    #[test]
    fn test_instant_emitted_in_utc() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 9, 17, 5, 0).unwrap();
        let jql = translate(&field(SystemField::Created).gte(dt), &table()).unwrap();
        assert_eq!(jql, "created >= \"2024/03/09 17:05\"");
    }

    #[test]
    fn test_zoneless_datetime_rejected() {
        let local = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(17, 5, 0)
            .unwrap();
        let err = translate(&field(SystemField::Created).gte(local), &table()).unwrap_err();
        assert!(matches!(err, JirelError::UnsupportedQuery { .. }));
    }

    #[test]
    fn test_deterministic() {
        let build = || {
            field(SystemField::Project)
                .eq("TST")
                .and(field(SystemField::FixVersions).contains_all(["1.0", "2.0"]))
        };
        let a = translate(&build(), &table()).unwrap();
        let b = translate(&build(), &table()).unwrap();
        assert_eq!(a, b);
    }
}
