//! In-process row store.

use std::cmp::Ordering;
use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::trace;

use super::{RowStore, Select};
use crate::error::StoreError;
use crate::query::{compare_values, Criteria, OrderDirection};
use crate::value::{Row, Value};

/// Column that receives generated identifiers unless overridden per table.
pub const DEFAULT_IDENTITY_COLUMN: &str = "id";

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Row>,
    next_id: i64,
}

/// A row store kept entirely in memory.
///
/// Criteria are evaluated directly against stored rows. Inserts assign the
/// next integer identifier to the table's identity column when the row does
/// not carry one.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
    identity: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `column` as the identity column of `table`.
    pub fn with_identity(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.identity.insert(table.into(), column.into());
        self
    }

    /// Identity column of a table.
    pub fn identity_column(&self, table: &str) -> &str {
        self.identity
            .get(table)
            .map(String::as_str)
            .unwrap_or(DEFAULT_IDENTITY_COLUMN)
    }

    /// Number of rows currently stored in a table.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.lock().get(table).map_or(0, |t| t.rows.len())
    }

    /// Snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }
}

impl RowStore for MemoryStore {
    fn select(&self, select: &Select) -> Result<Vec<Row>, StoreError> {
        let tables = self.tables.lock();
        let Some(table) = tables.get(&select.table) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<Row> = table
            .rows
            .iter()
            .filter(|row| select.criteria.as_ref().map_or(true, |c| c.matches(row)))
            .cloned()
            .collect();

        if let Some(order) = &select.order {
            rows.sort_by(|a, b| {
                let ord = match (a.get(&order.column), b.get(&order.column)) {
                    (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                };
                match order.direction {
                    OrderDirection::Asc => ord,
                    OrderDirection::Desc => ord.reverse(),
                }
            });
        }

        if let Some(limit) = select.limit {
            rows.truncate(limit);
        }

        trace!(table = %select.table, rows = rows.len(), "Memory select");
        Ok(rows)
    }

    fn insert(&self, table: &str, mut values: Row) -> Result<Value, StoreError> {
        let column = self.identity_column(table).to_string();
        let mut tables = self.tables.lock();
        let entry = tables.entry(table.to_string()).or_default();

        let id = match values.get(&column) {
            Some(Value::Int(id)) => {
                if entry.rows.iter().any(|r| r.get(&column) == Some(&Value::Int(*id))) {
                    return Err(format!("duplicate {} {} in {}", column, id, table).into());
                }
                entry.next_id = entry.next_id.max(*id);
                *id
            }
            _ => {
                entry.next_id += 1;
                values.insert(column, Value::Int(entry.next_id));
                entry.next_id
            }
        };

        entry.rows.push(values);
        trace!(table, id, "Memory insert");
        Ok(Value::Int(id))
    }

    fn update(&self, table: &str, criteria: &Criteria, values: Row) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let Some(entry) = tables.get_mut(table) else {
            return Ok(());
        };

        let mut updated = 0usize;
        for row in entry.rows.iter_mut().filter(|row| criteria.matches(row)) {
            for (column, value) in &values {
                row.insert(column.clone(), value.clone());
            }
            updated += 1;
        }
        trace!(table, updated, "Memory update");
        Ok(())
    }

    fn delete(&self, table: &str, criteria: &Criteria) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if let Some(entry) = tables.get_mut(table) {
            let before = entry.rows.len();
            entry.rows.retain(|row| !criteria.matches(row));
            trace!(table, deleted = before - entry.rows.len(), "Memory delete");
        }
        Ok(())
    }
}
