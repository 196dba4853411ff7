//! Criteria formatting: turning values and field maps into SQL text.

use crate::value::{Value, DATETIME_FORMAT};

/// Renders values and equality maps as literal SQL fragments.
///
/// Implement this for a store whose dialect quotes differently.
pub trait CriteriaFormatter {
    /// A single safely quoted literal.
    fn literal(&self, value: &Value) -> String;

    /// Comma-separated literals, without surrounding parentheses.
    fn literal_list(&self, values: &[Value]) -> String {
        values
            .iter()
            .map(|v| self.literal(v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Equality on every field, AND-ed. Null values compare with `IS NULL`.
    fn where_from_fields(&self, fields: &[(String, Value)]) -> String {
        fields
            .iter()
            .map(|(column, value)| match value {
                Value::Null => format!("{} IS NULL", column),
                other => format!("{} = {}", column, self.literal(other)),
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// ANSI-style formatter: strings in single quotes with embedded quotes doubled.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlFormatter;

impl CriteriaFormatter for SqlFormatter {
    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => quote(s),
            Value::List(items) => format!("({})", self.literal_list(items)),
            Value::DateTime(dt) => quote(&dt.format(DATETIME_FORMAT).to_string()),
        }
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::parse_datetime;

    #[test]
    fn test_literals() {
        let f = SqlFormatter;
        assert_eq!(f.literal(&Value::Null), "NULL");
        assert_eq!(f.literal(&Value::Int(-4)), "-4");
        assert_eq!(f.literal(&Value::Bool(true)), "TRUE");
        assert_eq!(f.literal(&Value::from("it's")), "'it''s'");
        assert_eq!(
            f.literal(&Value::DateTime(parse_datetime("2020-01-01").unwrap())),
            "'2020-01-01 00:00:00'"
        );
    }

    #[test]
    fn test_literal_list() {
        let values = vec![Value::Int(1), Value::from("a'b"), Value::Null];
        assert_eq!(SqlFormatter.literal_list(&values), "1, 'a''b', NULL");
    }

    #[test]
    fn test_where_from_fields() {
        let fields = vec![
            ("id".to_string(), Value::Int(7)),
            ("region".to_string(), Value::from("eu")),
            ("deleted".to_string(), Value::Null),
        ];
        assert_eq!(
            SqlFormatter.where_from_fields(&fields),
            "id = 7 AND region = 'eu' AND deleted IS NULL"
        );
    }
}
