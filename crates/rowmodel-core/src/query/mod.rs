//! Criteria construction and the fluent query builder.

mod builder;
mod criteria;
mod format;

pub use builder::{Fetched, Query, DEFAULT_LIMIT, MAX_LIMIT};
pub use criteria::{
    like_match, Clause, Combinator, CompareOp, Criteria, OrderClause, OrderDirection,
};
pub use format::{CriteriaFormatter, SqlFormatter};

pub(crate) use criteria::compare_values;
