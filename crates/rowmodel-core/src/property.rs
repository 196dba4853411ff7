//! Typed, validated value containers bound to record fields.
//!
//! Every record field is backed by exactly one [`Property`]. A property holds
//! its current value in a variant-specific slot; `set` validates the incoming
//! value against the variant's accepted inputs and `get` returns an owned copy,
//! so two records can never observe each other's state through a property.

use std::fmt;
use std::sync::OnceLock;

use chrono::{Local, NaiveDateTime, Timelike};
use thiserror::Error;

use crate::value::{parse_datetime, Value};

/// Scale applied to [`Size::factor`] to obtain a column capacity hint.
pub const SIZE_FACTOR: u32 = 16;

/// Storage size hint for a property. Bookkeeping only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Size {
    Tiny,
    Small,
    Medium,
    #[default]
    Large,
    XLarge,
}

impl Size {
    /// Relative weight of the size class.
    pub fn factor(self) -> u32 {
        match self {
            Size::Tiny => 1,
            Size::Small => 2,
            Size::Medium => 4,
            Size::Large => 8,
            Size::XLarge => 16,
        }
    }

    /// Capacity hint in characters.
    pub fn capacity(self) -> u32 {
        self.factor() * SIZE_FACTOR
    }
}

/// Property variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Holds anything, no validation.
    Plain,
    /// Integer or null.
    Integer,
    /// String; null becomes the empty string.
    String,
    /// List; null becomes a fresh empty list.
    List,
    /// Date-time; defaults to the moment of first read.
    DateTime,
}

impl PropertyKind {
    /// Lowercase variant name.
    pub fn name(self) -> &'static str {
        match self {
            PropertyKind::Plain => "plain",
            PropertyKind::Integer => "integer",
            PropertyKind::String => "string",
            PropertyKind::List => "list",
            PropertyKind::DateTime => "datetime",
        }
    }

    fn empty_slot(self) -> Slot {
        match self {
            PropertyKind::Plain => Slot::Plain(Value::Null),
            PropertyKind::Integer => Slot::Integer(Some(0)),
            PropertyKind::String => Slot::String(String::new()),
            PropertyKind::List => Slot::List(Vec::new()),
            PropertyKind::DateTime => Slot::DateTime(OnceLock::new()),
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rejection raised by [`Property::set`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// The value's kind is outside the variant's accepted inputs.
    #[error("{kind} property cannot hold a {found} value")]
    WrongType {
        kind: PropertyKind,
        found: &'static str,
    },

    /// A date-time string matched neither accepted format.
    #[error("unrecognized date-time {0:?}, expected YYYY-MM-DD HH:MM:SS or YYYY-MM-DD")]
    BadDateTime(String),
}

/// Variant-specific storage.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Plain(Value),
    Integer(Option<i64>),
    String(String),
    List(Vec<Value>),
    // Written at most once between sets; an empty cell resolves to "now" on read.
    DateTime(OnceLock<NaiveDateTime>),
}

/// A typed value container for one record field.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    kind: PropertyKind,
    primary_key: bool,
    size: Size,
    slot: Slot,
}

impl Property {
    fn of(kind: PropertyKind) -> Self {
        Self {
            kind,
            primary_key: false,
            size: Size::default(),
            slot: kind.empty_slot(),
        }
    }

    /// Untyped property.
    pub fn plain() -> Self {
        Self::of(PropertyKind::Plain)
    }

    /// Integer property, default `0`.
    pub fn integer() -> Self {
        Self::of(PropertyKind::Integer)
    }

    /// String property, default `""`.
    pub fn string() -> Self {
        Self::of(PropertyKind::String)
    }

    /// List property, default empty.
    pub fn list() -> Self {
        Self::of(PropertyKind::List)
    }

    /// Date-time property, default "now" at first read.
    pub fn datetime() -> Self {
        Self::of(PropertyKind::DateTime)
    }

    /// Mark as part of the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Set the size hint.
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Current value.
    ///
    /// An unset date-time resolves to the current local time (whole seconds)
    /// and keeps that value for later reads.
    pub fn get(&self) -> Value {
        match &self.slot {
            Slot::Plain(v) => v.clone(),
            Slot::Integer(i) => i.map(Value::Int).unwrap_or(Value::Null),
            Slot::String(s) => Value::Text(s.clone()),
            Slot::List(items) => Value::List(items.clone()),
            Slot::DateTime(cell) => Value::DateTime(*cell.get_or_init(now)),
        }
    }

    /// Validate and store a value.
    pub fn set(&mut self, value: impl Into<Value>) -> Result<(), PropertyError> {
        let value = value.into();
        self.slot = match self.kind {
            PropertyKind::Plain => Slot::Plain(value),
            PropertyKind::Integer => Slot::Integer(self.validate_integer(value)?),
            PropertyKind::String => Slot::String(self.validate_string(value)?),
            PropertyKind::List => Slot::List(self.validate_list(value)?),
            PropertyKind::DateTime => Slot::DateTime(self.validate_datetime(value)?),
        };
        Ok(())
    }

    fn wrong_type(&self, value: &Value) -> PropertyError {
        PropertyError::WrongType {
            kind: self.kind,
            found: value.type_name(),
        }
    }

    fn validate_integer(&self, value: Value) -> Result<Option<i64>, PropertyError> {
        match value {
            Value::Int(i) => Ok(Some(i)),
            Value::Null => Ok(None),
            other => Err(self.wrong_type(&other)),
        }
    }

    fn validate_string(&self, value: Value) -> Result<String, PropertyError> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Null => Ok(String::new()),
            other => Err(self.wrong_type(&other)),
        }
    }

    fn validate_list(&self, value: Value) -> Result<Vec<Value>, PropertyError> {
        match value {
            Value::List(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(self.wrong_type(&other)),
        }
    }

    fn validate_datetime(&self, value: Value) -> Result<OnceLock<NaiveDateTime>, PropertyError> {
        let dt = match value {
            Value::Null => return Ok(OnceLock::new()),
            Value::Text(s) if s.is_empty() => return Ok(OnceLock::new()),
            Value::Text(s) => parse_datetime(&s).ok_or(PropertyError::BadDateTime(s))?,
            Value::DateTime(dt) => dt,
            other => return Err(self.wrong_type(&other)),
        };
        Ok(OnceLock::from(dt))
    }

    /// JSON form of the current value.
    pub fn to_serializable(&self) -> serde_json::Value {
        self.get().to_json()
    }

    /// A fresh property of the same variant, flags and size, in default state.
    ///
    /// Always allocates new backing storage.
    pub fn clone_empty(&self) -> Self {
        Self {
            kind: self.kind,
            primary_key: self.primary_key,
            size: self.size,
            slot: self.kind.empty_slot(),
        }
    }

    /// Mutable access to the backing list of a list property.
    pub fn list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.slot {
            Slot::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Value::Text(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(Property::plain().get(), Value::Null);
        assert_eq!(Property::integer().get(), Value::Int(0));
        assert_eq!(Property::string().get(), Value::Text(String::new()));
        assert_eq!(Property::list().get(), Value::List(vec![]));
        assert!(Property::datetime().get().as_datetime().is_some());
    }

    #[test]
    fn test_set_get_roundtrip() {
        let cases: Vec<(Property, Value)> = vec![
            (Property::plain(), Value::Float(1.5)),
            (Property::plain(), Value::Bool(false)),
            (Property::integer(), Value::Int(-7)),
            (Property::string(), Value::Text("hello".into())),
            (Property::list(), Value::List(vec![Value::Int(1), Value::from("a")])),
        ];

        for (mut prop, value) in cases {
            prop.set(value.clone()).unwrap();
            assert_eq!(prop.get(), value, "{} property", prop.kind());
        }
    }

    #[test]
    fn test_integer_rejects_non_integers() {
        let mut prop = Property::integer();

        for bad in [
            Value::from("12"),
            Value::Float(1.0),
            Value::List(vec![Value::Int(1)]),
        ] {
            let err = prop.set(bad.clone()).unwrap_err();
            assert_eq!(
                err,
                PropertyError::WrongType {
                    kind: PropertyKind::Integer,
                    found: bad.type_name(),
                }
            );
        }

        prop.set(Value::Null).unwrap();
        assert_eq!(prop.get(), Value::Null);
    }

    #[test]
    fn test_string_null_coerces_to_default() {
        let mut prop = Property::string();
        prop.set("x").unwrap();
        prop.set(Value::Null).unwrap();
        assert_eq!(prop.get(), Value::Text(String::new()));
    }

    #[test]
    fn test_string_error_names_type() {
        let mut prop = Property::string();
        let err = prop.set(5).unwrap_err();
        assert!(err.to_string().contains("integer"));
    }

    #[test]
    fn test_list_null_coerces_to_fresh_list() {
        let mut prop = Property::list();
        prop.set(vec![1, 2]).unwrap();
        prop.set(Value::Null).unwrap();
        assert_eq!(prop.get(), Value::List(vec![]));

        assert!(prop.set("nope").is_err());
    }

    #[test]
    fn test_clone_empty_never_aliases() {
        let template = Property::list().primary_key().with_size(Size::Small);
        let mut a = template.clone_empty();
        let b = template.clone_empty();

        a.list_mut().unwrap().push(Value::Int(1));

        assert_eq!(a.get(), Value::List(vec![Value::Int(1)]));
        assert_eq!(b.get(), Value::List(vec![]));
        assert_eq!(template.get(), Value::List(vec![]));
        assert!(b.is_primary_key());
        assert_eq!(b.size(), Size::Small);
    }

    #[test]
    fn test_datetime_forms_serialize_identically() {
        let mut full = Property::datetime();
        let mut date_only = Property::datetime();
        full.set("2020-01-01 00:00:00").unwrap();
        date_only.set("2020-01-01").unwrap();

        assert_eq!(full.to_serializable(), date_only.to_serializable());
        assert_eq!(
            full.to_serializable(),
            serde_json::json!("2020-01-01 00:00:00")
        );
    }

    #[test]
    fn test_datetime_rejects_garbage() {
        let mut prop = Property::datetime();
        assert_eq!(
            prop.set("yesterday").unwrap_err(),
            PropertyError::BadDateTime("yesterday".into())
        );
        assert!(prop.set(3).is_err());
    }

    #[test]
    fn test_datetime_default_is_stable_after_first_read() {
        let mut prop = Property::datetime();
        prop.set("").unwrap();
        let first = prop.get();
        let second = prop.get();
        assert_eq!(first, second);
    }

    #[test]
    fn test_datetime_clone_empty_resets() {
        let mut prop = Property::datetime();
        prop.set("1999-12-31 23:59:59").unwrap();
        let fresh = prop.clone_empty();
        assert_ne!(fresh.get(), prop.get());
    }

    #[test]
    fn test_size_capacity() {
        assert_eq!(Size::default(), Size::Large);
        assert_eq!(Size::Tiny.capacity(), 16);
        assert_eq!(Size::XLarge.capacity(), 256);
    }
}
