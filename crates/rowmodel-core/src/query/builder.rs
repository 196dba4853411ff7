//! Fluent query builder over one record type.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::query::criteria::{Clause, Combinator, Criteria, OrderClause};
use crate::query::format::CriteriaFormatter;
use crate::record::Record;
use crate::schema::{schema_of, Model, Schema};
use crate::store::{RowStore, Select};
use crate::value::Value;

/// Row limit used until [`Query::limit`] accepts another value.
pub const DEFAULT_LIMIT: usize = 100;

/// Exclusive upper bound for [`Query::limit`].
pub const MAX_LIMIT: usize = 500;

/// Accumulates filters, an ordering and a limit for records of type `M`.
///
/// Builder methods never fail. The first invalid filter or ordering is
/// remembered and returned by [`select`](Query::select),
/// [`sql`](Query::sql) and [`execute`](Query::execute).
///
/// ```ignore
/// let adults = Record::<Person>::all()
///     .filter("age >", 18)
///     .filter("age <", 65)
///     .order("-name")
///     .limit(10)
///     .fetch(&store)?;
/// ```
pub struct Query<M: Model> {
    schema: Arc<Schema>,
    clauses: Vec<Clause>,
    order: Option<OrderClause>,
    limit: usize,
    error: Option<String>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Query<M> {
    /// An unfiltered query with the default limit.
    pub fn new() -> Self {
        Self {
            schema: schema_of::<M>(),
            clauses: Vec::new(),
            order: None,
            limit: DEFAULT_LIMIT,
            error: None,
            _model: PhantomData,
        }
    }

    fn defer(&mut self, message: String) {
        if self.error.is_none() {
            debug!(table = self.schema.table(), error = %message, "Deferred query error");
            self.error = Some(message);
        }
    }

    fn check_column(&mut self, column: &str) -> bool {
        if self.schema.has_field(column) {
            return true;
        }
        let message = format!("`{}` has no field named `{}`", self.schema.table(), column);
        self.defer(message);
        false
    }

    /// Add one clause, e.g. `filter("age >", 18)` or `filter("id in", vec![1, 2])`.
    pub fn filter(mut self, expression: &str, value: impl Into<Value>) -> Self {
        match Clause::parse_filter(expression, value.into()) {
            Ok(clause) => {
                let unknown = clause
                    .columns()
                    .into_iter()
                    .find(|column| !self.schema.has_field(column))
                    .map(str::to_string);
                match unknown {
                    Some(column) => {
                        self.check_column(&column);
                    }
                    None => self.clauses.push(clause),
                }
            }
            Err(Error::InvalidFilter(message)) => self.defer(message),
            Err(other) => self.defer(other.to_string()),
        }
        self
    }

    /// Order by one column; a leading `-` sorts descending.
    ///
    /// Only the latest call counts. A blank column is ignored.
    pub fn order(mut self, column: &str) -> Self {
        if let Some(order) = OrderClause::parse(column) {
            if self.check_column(&order.column) {
                self.order = Some(order);
            }
        }
        self
    }

    /// Cap the number of rows. Values outside `1..MAX_LIMIT` are ignored.
    pub fn limit(mut self, n: i64) -> Self {
        match usize::try_from(n) {
            Ok(n) if n > 0 && n < MAX_LIMIT => self.limit = n,
            _ => warn!(
                table = self.schema.table(),
                requested = n,
                kept = self.limit,
                "Ignoring out-of-range limit"
            ),
        }
        self
    }

    /// Limit the next execution will use.
    pub fn current_limit(&self) -> usize {
        self.limit
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn order_clause(&self) -> Option<&OrderClause> {
        self.order.as_ref()
    }

    /// The select request this query issues.
    pub fn select(&self, combinator: Combinator) -> Result<Select> {
        if let Some(message) = &self.error {
            return Err(Error::InvalidFilter(message.clone()));
        }
        Ok(Select::new(self.schema.table())
            .with_criteria(Criteria::new(self.clauses.clone(), combinator))
            .with_order(self.order.clone())
            .with_limit(self.limit))
    }

    /// SQL text of the select request.
    pub fn sql(&self, combinator: Combinator, formatter: &dyn CriteriaFormatter) -> Result<String> {
        Ok(self.select(combinator)?.to_sql(formatter))
    }

    /// Run the query.
    ///
    /// With `single` set and exactly one matching row the record comes back
    /// as [`Fetched::One`]; every other outcome is [`Fetched::Many`].
    #[instrument(skip(self, store), fields(table = %self.schema.table()))]
    pub fn execute<S>(self, store: &S, single: bool, combinator: Combinator) -> Result<Fetched<M>>
    where
        S: RowStore + ?Sized,
    {
        let select = self.select(combinator)?;
        let rows = store.select(&select).map_err(Error::Store)?;
        debug!(rows = rows.len(), "Query returned rows");

        let mut records = rows
            .iter()
            .map(Record::<M>::make)
            .collect::<Result<Vec<_>>>()?;

        if single && records.len() == 1 {
            if let Some(record) = records.pop() {
                return Ok(Fetched::One(record));
            }
        }
        Ok(Fetched::Many(records))
    }

    /// Run the query with AND-joined clauses and collect every record.
    pub fn fetch<S>(self, store: &S) -> Result<Vec<Record<M>>>
    where
        S: RowStore + ?Sized,
    {
        Ok(self.execute(store, false, Combinator::And)?.into_vec())
    }
}

impl<M: Model> Default for Query<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Clone for Query<M> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            clauses: self.clauses.clone(),
            order: self.order.clone(),
            limit: self.limit,
            error: self.error.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> std::fmt::Debug for Query<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("table", &self.schema.table())
            .field("clauses", &self.clauses)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("error", &self.error)
            .finish()
    }
}

/// Result of [`Query::execute`].
#[derive(Debug)]
pub enum Fetched<M: Model> {
    /// Exactly one row matched a single-record request.
    One(Record<M>),
    /// Every matching record, possibly none.
    Many(Vec<Record<M>>),
}

impl<M: Model> Fetched<M> {
    pub fn len(&self) -> usize {
        match self {
            Fetched::One(_) => 1,
            Fetched::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records as a vector.
    pub fn into_vec(self) -> Vec<Record<M>> {
        match self {
            Fetched::One(record) => vec![record],
            Fetched::Many(records) => records,
        }
    }

    /// The single record, if this is [`Fetched::One`].
    pub fn into_one(self) -> Option<Record<M>> {
        match self {
            Fetched::One(record) => Some(record),
            Fetched::Many(_) => None,
        }
    }
}
