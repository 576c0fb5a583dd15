//! The composable predicate tree used for a statement's `WHERE` clause.

use crate::dialect::Dialect;
use crate::resolver::{self, ResolveContext};
use crate::value::Value;
use serde::de::{Error as DeError, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A predicate tree node: a single `field op value` comparison, or a group
/// of children joined by `AND`/`OR`.
///
/// Wire shape is polymorphic by runtime type: a `Value` leaf serializes as
/// the three-element array `[field, op, encoded-value]`; a `Group`
/// serializes as `{"or": bool, "conditions": [...]}`. Decoders distinguish
/// by inspecting whether the JSON node is an array or an object.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Value {
        field: String,
        op: String,
        value: Value,
    },
    Group {
        or: bool,
        children: Vec<Condition>,
    },
}

impl Condition {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Condition {
        Condition::Value {
            field: field.into(),
            op: "=".to_string(),
            value: value.into(),
        }
    }

    pub fn and(children: Vec<Condition>) -> Condition {
        Condition::Group {
            or: false,
            children,
        }
    }

    pub fn or(children: Vec<Condition>) -> Condition {
        Condition::Group {
            or: true,
            children,
        }
    }

    /// The union of every placeholder name (`%NAME%`) or back-reference
    /// (`#table:id#`) syntactically present in leaf values, in order of
    /// first appearance.
    pub fn required_variables(&self) -> IndexSet<String> {
        let mut out = IndexSet::new();
        self.collect_required_variables(&mut out);
        out
    }

    fn collect_required_variables(&self, out: &mut IndexSet<String>) {
        match self {
            Condition::Value { value, .. } => resolver::collect_variable_names(value, out),
            Condition::Group { children, .. } => {
                for child in children {
                    child.collect_required_variables(out);
                }
            }
        }
    }

    /// Renders this condition as a SQL fragment (without the leading `WHERE`).
    pub fn build(&self, dialect: &dyn Dialect, ctx: &ResolveContext) -> String {
        match self {
            Condition::Value { field, op, value } => {
                let resolved = resolver::substitute_value(value, ctx);
                let quoted_field = dialect.quote_ident(field);
                let op_trim = op.trim();
                if resolved.is_sql_null() {
                    if op_trim == "=" || op_trim == "==" {
                        return format!("{quoted_field} IS NULL");
                    }
                    if op_trim == "!=" || op_trim == "<>" {
                        return format!("{quoted_field} IS NOT NULL");
                    }
                }
                format!(
                    "{quoted_field} {op} {}",
                    render_sql_value(&resolved, dialect)
                )
            }
            Condition::Group { or, children } => {
                if children.len() == 1 {
                    return children[0].build(dialect, ctx);
                }
                let joiner = if *or { " OR " } else { " AND " };
                let rendered = children
                    .iter()
                    .map(|c| c.build(dialect, ctx))
                    .collect::<Vec<_>>()
                    .join(joiner);
                format!("( {rendered} )")
            }
        }
    }
}

/// Renders a single SQL literal: raw fragments emit verbatim, numbers emit
/// bare, everything else goes through [`Value::stringify`] with
/// single-quoting for text/timestamp and dialect byte literals. Shared by
/// predicate leaves and the statement renderer's parameter/column values.
pub(crate) fn render_sql_value(value: &Value, dialect: &dyn Dialect) -> String {
    if let Some(raw) = value.as_raw_fragment() {
        return raw.stringify();
    }
    match value {
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bytes(bytes) => dialect.render_bytes(bytes),
        Value::Null => "NULL".to_string(),
        Value::Text(_) | Value::Timestamp(_) => format!("'{}'", value.stringify()),
        other => other.stringify(),
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Condition::Value { field, op, value } => {
                (field, op, value.encode()).serialize(serializer)
            }
            Condition::Group { or, children } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("or", or)?;
                map.serialize_entry("conditions", children)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ConditionVisitor;

        impl<'de> Visitor<'de> for ConditionVisitor {
            type Value = Condition;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a [field, op, value] array or a {or, conditions} object")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Condition, A::Error> {
                let field: String = seq
                    .next_element()?
                    .ok_or_else(|| DeError::invalid_length(0, &"3"))?;
                let op: String = seq
                    .next_element()?
                    .ok_or_else(|| DeError::invalid_length(1, &"3"))?;
                let raw: serde_json::Value = seq
                    .next_element()?
                    .ok_or_else(|| DeError::invalid_length(2, &"3"))?;
                Ok(Condition::Value {
                    field,
                    op,
                    value: Value::decode(&raw),
                })
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut map: A,
            ) -> Result<Condition, A::Error> {
                let mut or = false;
                let mut children = Vec::new();
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "or" => or = map.next_value()?,
                        "conditions" => children = map.next_value()?,
                        _ => {
                            let _: serde::de::IgnoredAny = map.next_value()?;
                        }
                    }
                }
                Ok(Condition::Group { or, children })
            }
        }

        deserializer.deserialize_any(ConditionVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::GenericDialect;

    fn ctx() -> ResolveContext<'static> {
        ResolveContext::empty()
    }

    #[test]
    fn single_child_group_renders_without_parens() {
        let cond = Condition::and(vec![Condition::eq("serie", "tabs")]);
        assert_eq!(cond.build(&GenericDialect, &ctx()), "`serie` = 'tabs'");
    }

    #[test]
    fn nested_predicate_with_null_normalization() {
        let cond = Condition::and(vec![
            Condition::eq("serie", "tabs"),
            Condition::or(vec![
                Condition::eq("status", "free"),
                Condition::Value {
                    field: "status".to_string(),
                    op: "=".to_string(),
                    value: Value::Null,
                },
            ]),
        ]);
        assert_eq!(
            cond.build(&GenericDialect, &ctx()),
            "( `serie` = 'tabs' AND ( `status` = 'free' OR `status` IS NULL ) )"
        );
    }

    #[test]
    fn not_equal_null_becomes_is_not_null() {
        let cond = Condition::Value {
            field: "type".to_string(),
            op: "!=".to_string(),
            value: Value::Text("null".to_string()),
        };
        assert_eq!(cond.build(&GenericDialect, &ctx()), "`type` IS NOT NULL");
    }

    #[test]
    fn required_variables_collects_from_leaves() {
        let cond = Condition::and(vec![
            Condition::eq("a", "%FOO%"),
            Condition::eq("b", "#order:1#"),
        ]);
        let vars = cond.required_variables();
        assert!(vars.contains("FOO"));
        assert!(vars.contains("order:1"));
    }

    #[test]
    fn json_roundtrip_value_leaf() {
        let cond = Condition::eq("id", Value::Int(123));
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(json, serde_json::json!(["id", "=", 123]));
        let back: Condition = serde_json::from_value(json).unwrap();
        assert_eq!(back, cond);
    }

    #[test]
    fn json_roundtrip_group() {
        let cond = Condition::or(vec![Condition::eq("a", 1i64), Condition::eq("b", 2i64)]);
        let json = serde_json::to_value(&cond).unwrap();
        let back: Condition = serde_json::from_value(json).unwrap();
        assert_eq!(back, cond);
    }
}
