//! Row-store contract consumed by records and queries.
//!
//! The store executes selects, inserts, updates and deletes against whatever
//! backs it and hands back raw rows. Failures are boxed and propagated to the
//! caller as [`Error::Store`](crate::Error::Store) without retry.

mod memory;

pub use memory::{MemoryStore, DEFAULT_IDENTITY_COLUMN};

use crate::error::StoreError;
use crate::query::{Criteria, CriteriaFormatter, OrderClause};
use crate::value::{Row, Value};

/// A select request.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    /// Table to read.
    pub table: String,
    /// Row filter; `None` selects every row.
    pub criteria: Option<Criteria>,
    /// Single-column ordering.
    pub order: Option<OrderClause>,
    /// Maximum number of rows.
    pub limit: Option<usize>,
}

impl Select {
    /// Select every row of a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            criteria: None,
            order: None,
            limit: None,
        }
    }

    /// Set the criteria. Empty criteria are dropped.
    pub fn with_criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = (!criteria.is_empty()).then_some(criteria);
        self
    }

    /// Set the ordering.
    pub fn with_order(mut self, order: Option<OrderClause>) -> Self {
        self.order = order;
        self
    }

    /// Set the row limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render as a SQL `SELECT` statement.
    pub fn to_sql(&self, formatter: &dyn CriteriaFormatter) -> String {
        let mut sql = format!("SELECT * FROM {}", self.table);
        if let Some(condition) = self.criteria.as_ref().and_then(|c| c.to_sql(formatter)) {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }
        if let Some(order) = &self.order {
            sql.push_str(&format!(" ORDER BY {}", order));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        sql
    }
}

/// A row-oriented store.
pub trait RowStore {
    /// Return the rows matching a select request.
    fn select(&self, select: &Select) -> Result<Vec<Row>, StoreError>;

    /// Insert a row, returning its generated identifier.
    fn insert(&self, table: &str, values: Row) -> Result<Value, StoreError>;

    /// Overwrite the given columns on every row matching the criteria.
    fn update(&self, table: &str, criteria: &Criteria, values: Row) -> Result<(), StoreError>;

    /// Delete every row matching the criteria.
    fn delete(&self, table: &str, criteria: &Criteria) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Clause, Combinator, OrderClause, SqlFormatter};

    #[test]
    fn test_select_sql() {
        let criteria = Criteria::new(
            vec![Clause::parse_filter("age >", Value::Int(18)).unwrap()],
            Combinator::And,
        );
        let select = Select::new("Person")
            .with_criteria(criteria)
            .with_order(OrderClause::parse("-name"))
            .with_limit(10);

        assert_eq!(
            select.to_sql(&SqlFormatter),
            "SELECT * FROM Person WHERE age > '18' ORDER BY name DESC LIMIT 10"
        );
    }

    #[test]
    fn test_select_sql_unfiltered() {
        let select = Select::new("Person").with_criteria(Criteria::default());
        assert!(select.criteria.is_none());
        assert_eq!(select.to_sql(&SqlFormatter), "SELECT * FROM Person");
    }
}
