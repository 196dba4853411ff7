//! Core error types.

use thiserror::Error;

use crate::property::PropertyError;

/// Boxed error returned by row-store collaborators.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Core model errors.
///
/// Not-found outcomes are never reported through this type: lookups return
/// `Ok(None)` and queries return an empty result set.
#[derive(Debug, Error)]
pub enum Error {
    /// A field was handed a value its property variant does not accept.
    #[error("invalid value for field `{field}`: {source}")]
    Validation {
        /// Field that rejected the value.
        field: String,
        /// Property-level reason.
        #[source]
        source: PropertyError,
    },

    /// The record type declares no primary-key field.
    #[error("`{table}` declares no primary key field")]
    NoPrimaryKey { table: String },

    /// A raw row handed to `make` lacks a declared field.
    #[error("row for `{table}` is missing field `{field}`")]
    MissingField { table: String, field: String },

    /// A field name that the record type never declared.
    #[error("`{table}` has no field named `{field}`")]
    UnknownField { table: String, field: String },

    /// A filter expression could not be turned into a clause.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serialized input had the wrong shape.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The row store failed; passed through untouched.
    #[error("store error: {0}")]
    Store(#[source] StoreError),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check whether this error came from the row store.
    pub fn is_store(&self) -> bool {
        matches!(self, Error::Store(_))
    }
}
