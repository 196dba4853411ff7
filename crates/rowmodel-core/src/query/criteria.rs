//! Structured filter criteria.
//!
//! A [`Criteria`] is an ordered list of clauses joined by AND or OR. It renders
//! to SQL text through a [`CriteriaFormatter`] for stores that speak SQL, and
//! evaluates directly against a [`Row`] for stores that do not.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};
use crate::query::format::CriteriaFormatter;
use crate::value::{parse_datetime, Row, Value};

/// Comparison operators accepted in filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
}

impl CompareOp {
    /// SQL spelling of the operator.
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Like => "LIKE",
            CompareOp::NotLike => "NOT LIKE",
        }
    }
}

/// How clauses are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    fn separator(self) -> &'static str {
        match self {
            Combinator::And => " AND ",
            Combinator::Or => " OR ",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Single-column ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    /// Column to order by.
    pub column: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderClause {
    /// Parse `"name"` (ascending) or `"-name"` (descending).
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (column, direction) = match text.strip_prefix('-') {
            Some(rest) => (rest.trim(), OrderDirection::Desc),
            None => (text, OrderDirection::Asc),
        };
        if column.is_empty() {
            return None;
        }
        Some(Self {
            column: column.to_string(),
            direction,
        })
    }
}

impl fmt::Display for OrderClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        };
        write!(f, "{} {}", self.column, dir)
    }
}

/// One condition contributed to a criteria list.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `column <op> value`.
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    /// `column [NOT] IN (values...)`.
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// Equality on every listed field, AND-ed.
    FieldsEq(Vec<(String, Value)>),
}

impl Clause {
    /// Columns the clause reads.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Clause::Compare { column, .. } | Clause::In { column, .. } => vec![column.as_str()],
            Clause::FieldsEq(pairs) => pairs.iter().map(|(c, _)| c.as_str()).collect(),
        }
    }

    /// Parse a filter expression such as `"age >"` or `"status in"`.
    ///
    /// The expression names the column followed by one operator from a closed
    /// set. Membership operators require a non-empty list value.
    pub fn parse_filter(expression: &str, value: Value) -> Result<Self> {
        let trimmed = expression.trim();
        let lowered = trimmed.to_ascii_lowercase();

        let (suffix, kind) = FILTER_OPERATORS
            .iter()
            .find(|(suffix, _)| lowered.ends_with(*suffix))
            .copied()
            .ok_or_else(|| {
                Error::InvalidFilter(format!("no recognised operator in {:?}", expression))
            })?;

        let column = trimmed[..trimmed.len() - suffix.len()].trim();
        if column.is_empty() || !column.chars().all(is_column_char) {
            return Err(Error::InvalidFilter(format!(
                "invalid column in filter {:?}",
                expression
            )));
        }
        let column = column.to_string();

        match kind {
            FilterKind::Compare(op) => Ok(Clause::Compare { column, op, value }),
            FilterKind::In { negated } => match value {
                Value::List(values) if !values.is_empty() => Ok(Clause::In {
                    column,
                    values,
                    negated,
                }),
                other => Err(Error::InvalidFilter(format!(
                    "membership filter on `{}` needs a non-empty list, got {}",
                    column,
                    other.type_name()
                ))),
            },
        }
    }

    fn to_sql(&self, formatter: &dyn CriteriaFormatter) -> String {
        match self {
            // Only the comparand is quoted; the column and operator come from the parse.
            Clause::Compare { column, op, value } => format!(
                "{} {} {}",
                column,
                op.as_sql(),
                formatter.literal(&Value::Text(value.to_string()))
            ),
            Clause::In {
                column,
                values,
                negated,
            } => format!(
                "{} {}IN ({})",
                column,
                if *negated { "NOT " } else { "" },
                formatter.literal_list(values)
            ),
            Clause::FieldsEq(pairs) => formatter.where_from_fields(pairs),
        }
    }

    fn matches(&self, row: &Row) -> bool {
        match self {
            Clause::Compare { column, op, value } => {
                let Some(field) = row.get(column) else {
                    return false; // Missing field doesn't match
                };
                match op {
                    CompareOp::Eq => values_equal(field, value),
                    CompareOp::Ne => !values_equal(field, value),
                    CompareOp::Lt => ordering_is(field, value, Ordering::is_lt),
                    CompareOp::Le => ordering_is(field, value, Ordering::is_le),
                    CompareOp::Gt => ordering_is(field, value, Ordering::is_gt),
                    CompareOp::Ge => ordering_is(field, value, Ordering::is_ge),
                    CompareOp::Like => like_text(field, value),
                    CompareOp::NotLike => !like_text(field, value),
                }
            }
            Clause::In {
                column,
                values,
                negated,
            } => match row.get(column) {
                Some(field) => values.iter().any(|v| values_equal(field, v)) != *negated,
                None => *negated, // NULL is not in any set
            },
            Clause::FieldsEq(pairs) => pairs.iter().all(|(column, value)| {
                let field = row.get(column).unwrap_or(&Value::Null);
                values_equal(field, value)
            }),
        }
    }
}

#[derive(Clone, Copy)]
enum FilterKind {
    Compare(CompareOp),
    In { negated: bool },
}

// Longest suffix first so `>=` is not read as `=`.
const FILTER_OPERATORS: &[(&str, FilterKind)] = &[
    (" not like", FilterKind::Compare(CompareOp::NotLike)),
    (" not in", FilterKind::In { negated: true }),
    (" like", FilterKind::Compare(CompareOp::Like)),
    (" in", FilterKind::In { negated: false }),
    (">=", FilterKind::Compare(CompareOp::Ge)),
    ("<=", FilterKind::Compare(CompareOp::Le)),
    ("!=", FilterKind::Compare(CompareOp::Ne)),
    ("<>", FilterKind::Compare(CompareOp::Ne)),
    ("==", FilterKind::Compare(CompareOp::Eq)),
    ("=", FilterKind::Compare(CompareOp::Eq)),
    ("<", FilterKind::Compare(CompareOp::Lt)),
    (">", FilterKind::Compare(CompareOp::Gt)),
];

fn is_column_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Clauses joined by a single combinator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Criteria {
    clauses: Vec<Clause>,
    combinator: Combinator,
}

impl Criteria {
    /// Create criteria from clauses and a combinator.
    pub fn new(clauses: Vec<Clause>, combinator: Combinator) -> Self {
        Self {
            clauses,
            combinator,
        }
    }

    /// Equality on every listed field.
    pub fn fields_eq(pairs: Vec<(String, Value)>) -> Self {
        Self::new(vec![Clause::FieldsEq(pairs)], Combinator::And)
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Render as a SQL condition, or `None` when there is nothing to filter on.
    pub fn to_sql(&self, formatter: &dyn CriteriaFormatter) -> Option<String> {
        if self.clauses.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| clause.to_sql(formatter))
            .collect();
        Some(parts.join(self.combinator.separator()))
    }

    /// Evaluate against a row. Empty criteria match everything.
    pub fn matches(&self, row: &Row) -> bool {
        if self.clauses.is_empty() {
            return true;
        }
        match self.combinator {
            Combinator::And => self.clauses.iter().all(|c| c.matches(row)),
            Combinator::Or => self.clauses.iter().any(|c| c.matches(row)),
        }
    }
}

fn ordering_is(a: &Value, b: &Value, check: fn(Ordering) -> bool) -> bool {
    compare_values(a, b).map(check).unwrap_or(false)
}

fn like_text(field: &Value, pattern: &Value) -> bool {
    match (field, pattern) {
        (Value::Text(s), Value::Text(p)) => like_match(s, p),
        _ => false,
    }
}

/// Read text as an integer or float, for comparison against numeric columns.
fn numeric_text(text: &str) -> Option<Value> {
    let text = text.trim();
    text.parse::<i64>()
        .map(Value::Int)
        .ok()
        .or_else(|| text.parse::<f64>().ok().map(Value::Float))
}

/// Check if two values are equal, widening numbers and reading numeric and
/// date-time text.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
        (num @ (Value::Int(_) | Value::Float(_)), Value::Text(s))
        | (Value::Text(s), num @ (Value::Int(_) | Value::Float(_))) => {
            numeric_text(s).is_some_and(|parsed| values_equal(num, &parsed))
        }
        (Value::DateTime(dt), Value::Text(s)) | (Value::Text(s), Value::DateTime(dt)) => {
            parse_datetime(s) == Some(*dt)
        }
        _ => a == b,
    }
}

/// Compare two values, returning their ordering if comparable.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::Text(b)) => parse_datetime(b).map(|b| a.cmp(&b)),
        (Value::Text(a), Value::DateTime(b)) => parse_datetime(a).map(|a| a.cmp(b)),
        (Value::Int(_) | Value::Float(_), Value::Text(s)) => {
            numeric_text(s).and_then(|parsed| compare_values(a, &parsed))
        }
        (Value::Text(s), Value::Int(_) | Value::Float(_)) => {
            numeric_text(s).and_then(|parsed| compare_values(&parsed, b))
        }
        _ => None, // Incompatible types
    }
}

/// Match a string against a SQL LIKE pattern.
///
/// Supports:
/// - `%` matches zero or more characters
/// - `_` matches exactly one character
/// - `\\%` and `\\_` match the literal character
pub fn like_match(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let pattern = like_tokens(pattern);

    let (mut v, mut p) = (0, 0);
    // Position after the last `%` seen and the value index it is retried from.
    let mut retry: Option<(usize, usize)> = None;

    while v < value.len() {
        match pattern.get(p) {
            Some(LikeToken::Any) => {
                p += 1;
                retry = Some((p, v));
            }
            Some(LikeToken::One) => {
                p += 1;
                v += 1;
            }
            Some(LikeToken::Char(c)) if *c == value[v] => {
                p += 1;
                v += 1;
            }
            _ => match retry {
                Some((after_any, from)) => {
                    p = after_any;
                    v = from + 1;
                    retry = Some((after_any, v));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|t| *t == LikeToken::Any)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeToken {
    Any,
    One,
    Char(char),
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::Any,
            '_' => LikeToken::One,
            '\\' => LikeToken::Char(chars.next().unwrap_or('\\')),
            other => LikeToken::Char(other),
        });
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::format::SqlFormatter;
    use crate::value::make_row;

    #[test]
    fn test_parse_compare_filters() {
        let clause = Clause::parse_filter("age >", Value::Int(18)).unwrap();
        assert_eq!(
            clause,
            Clause::Compare {
                column: "age".into(),
                op: CompareOp::Gt,
                value: Value::Int(18),
            }
        );

        let clause = Clause::parse_filter("age>=", Value::Int(18)).unwrap();
        assert!(matches!(clause, Clause::Compare { op: CompareOp::Ge, .. }));

        let clause = Clause::parse_filter("name LIKE", Value::from("A%")).unwrap();
        assert!(matches!(clause, Clause::Compare { op: CompareOp::Like, .. }));

        let clause = Clause::parse_filter("name <>", Value::from("x")).unwrap();
        assert!(matches!(clause, Clause::Compare { op: CompareOp::Ne, .. }));
    }

    #[test]
    fn test_parse_membership_filters() {
        let clause = Clause::parse_filter("status in", Value::from(vec!["a", "b"])).unwrap();
        assert!(matches!(clause, Clause::In { negated: false, .. }));

        let clause = Clause::parse_filter("status not in", Value::from(vec!["a"])).unwrap();
        assert!(matches!(clause, Clause::In { negated: true, .. }));

        let err = Clause::parse_filter("status in", Value::List(vec![])).unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(_)));

        let err = Clause::parse_filter("status in", Value::from("a")).unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(_)));
    }

    #[test]
    fn test_parse_rejects_bad_expressions() {
        for expr in ["age", "age ~", "> 5", "age; DROP TABLE x; --", ""] {
            assert!(
                Clause::parse_filter(expr, Value::Int(1)).is_err(),
                "expected {:?} to be rejected",
                expr
            );
        }
    }

    #[test]
    fn test_column_named_like_operator() {
        // "main" ends in "in" but has no separating space.
        let err = Clause::parse_filter("main", Value::Int(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(_)));
    }

    #[test]
    fn test_and_criteria_sql() {
        let criteria = Criteria::new(
            vec![
                Clause::parse_filter("age >", Value::Int(18)).unwrap(),
                Clause::parse_filter("age <", Value::Int(65)).unwrap(),
            ],
            Combinator::And,
        );
        assert_eq!(
            criteria.to_sql(&SqlFormatter).as_deref(),
            Some("age > '18' AND age < '65'")
        );
    }

    #[test]
    fn test_or_criteria_sql_with_membership() {
        let criteria = Criteria::new(
            vec![
                Clause::parse_filter("name =", Value::from("O'Brien")).unwrap(),
                Clause::parse_filter("id in", Value::from(vec![1, 2, 3])).unwrap(),
            ],
            Combinator::Or,
        );
        assert_eq!(
            criteria.to_sql(&SqlFormatter).as_deref(),
            Some("name = 'O''Brien' OR id IN (1, 2, 3)")
        );
    }

    #[test]
    fn test_empty_criteria() {
        let criteria = Criteria::default();
        assert!(criteria.to_sql(&SqlFormatter).is_none());
        assert!(criteria.matches(&make_row([("x", 1)])));
    }

    #[test]
    fn test_fields_eq_matches() {
        let row = make_row([("id", Value::Int(3)), ("name", Value::from("Ada"))]);
        let hit = Criteria::fields_eq(vec![("id".into(), Value::Int(3))]);
        let miss = Criteria::fields_eq(vec![("id".into(), Value::Int(4))]);
        assert!(hit.matches(&row));
        assert!(!miss.matches(&row));
    }

    #[test]
    fn test_compare_matches() {
        let row = make_row([("age", 30)]);
        let adult = Criteria::new(
            vec![Clause::parse_filter("age >=", Value::Int(18)).unwrap()],
            Combinator::And,
        );
        let senior = Criteria::new(
            vec![Clause::parse_filter("age >", Value::Int(65)).unwrap()],
            Combinator::And,
        );
        assert!(adult.matches(&row));
        assert!(!senior.matches(&row));
    }

    #[test]
    fn test_or_matches() {
        let row = make_row([("status", "pending")]);
        let criteria = Criteria::new(
            vec![
                Clause::parse_filter("status =", Value::from("active")).unwrap(),
                Clause::parse_filter("status =", Value::from("pending")).unwrap(),
            ],
            Combinator::Or,
        );
        assert!(criteria.matches(&row));
    }

    #[test]
    fn test_datetime_text_comparison() {
        let dt = parse_datetime("2020-06-01 12:00:00").unwrap();
        let row = make_row([("created", Value::DateTime(dt))]);
        let criteria = Criteria::new(
            vec![Clause::parse_filter("created >", Value::from("2020-01-01")).unwrap()],
            Combinator::And,
        );
        assert!(criteria.matches(&row));
    }

    #[test]
    fn test_missing_field() {
        let row = make_row([("name", "Alice")]);
        let criteria = Criteria::new(
            vec![Clause::parse_filter("age =", Value::Int(30)).unwrap()],
            Combinator::And,
        );
        assert!(!criteria.matches(&row));
    }

    #[test]
    fn test_like_match() {
        assert!(like_match("alice@example.com", "alice%"));
        assert!(like_match("alice@example.com", "%example.com"));
        assert!(like_match("alice@example.com", "%ice%exam%"));
        assert!(like_match("A1B", "A_B"));
        assert!(!like_match("A1B", "__"));
        assert!(like_match("100%", "100\\%"));
        assert!(!like_match("1000", "100\\%"));
    }

    #[test]
    fn test_like_many_wildcards_fails_fast() {
        let value = "a".repeat(40);
        let pattern = format!("{}b", "%a".repeat(8));
        assert!(!like_match(&value, &pattern));
        assert!(like_match(&value, &"%a".repeat(8)));
        assert!(like_match("", "%%"));
        assert!(!like_match("", "_"));
    }

    #[test]
    fn test_numeric_text_comparand() {
        let row = make_row([("age", Value::Int(36)), ("score", Value::Float(2.5))]);
        for (expr, value, expected) in [
            ("age >", "18", true),
            ("age <", "18", false),
            ("age =", "36", true),
            ("age !=", "36", false),
            ("score >=", "2.5", true),
            ("age =", "thirty", false),
        ] {
            let criteria = Criteria::new(
                vec![Clause::parse_filter(expr, Value::from(value)).unwrap()],
                Combinator::And,
            );
            assert_eq!(criteria.matches(&row), expected, "{expr} {value:?}");
        }

        let ids = Criteria::new(
            vec![Clause::parse_filter("age in", Value::from(vec!["35", "36"])).unwrap()],
            Combinator::And,
        );
        assert!(ids.matches(&row));
        assert!(Criteria::fields_eq(vec![("age".into(), Value::from("36"))]).matches(&row));
    }

    #[test]
    fn test_order_clause() {
        let desc = OrderClause::parse("-name").unwrap();
        assert_eq!(desc.direction, OrderDirection::Desc);
        assert_eq!(desc.to_string(), "name DESC");

        let asc = OrderClause::parse("age").unwrap();
        assert_eq!(asc.to_string(), "age ASC");

        assert!(OrderClause::parse("").is_none());
        assert!(OrderClause::parse("-").is_none());
    }
}
