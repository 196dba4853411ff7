//! rowmodel core - typed properties, schema binding, records and queries.
//!
//! Record types declare their fields once through [`Model`]; records are
//! persisted through any [`RowStore`] implementation.

pub mod config;
pub mod error;
pub mod key;
pub mod property;
pub mod query;
pub mod record;
pub mod schema;
pub mod store;
pub mod value;

pub use config::KeyConfig;
pub use error::{Error, Result, StoreError};
pub use key::KeyDeriver;
pub use property::{Property, PropertyError, PropertyKind, Size, SIZE_FACTOR};
pub use query::{
    Clause, Combinator, CompareOp, Criteria, CriteriaFormatter, Fetched, OrderClause,
    OrderDirection, Query, SqlFormatter, DEFAULT_LIMIT, MAX_LIMIT,
};
pub use record::{KeyLookup, Record};
pub use schema::{is_bound, schema_of, FieldDef, Model, Schema};
pub use store::{MemoryStore, RowStore, Select};
pub use value::{make_row, parse_datetime, Row, Value, DATETIME_FORMAT};
