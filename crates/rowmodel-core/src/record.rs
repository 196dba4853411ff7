//! Record instances: construction, field access and persistence.

use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::key::KeyDeriver;
use crate::property::{Property, PropertyError};
use crate::query::{Criteria, Query};
use crate::schema::{schema_of, Model, Schema};
use crate::store::{RowStore, Select};
use crate::value::{Row, Value};

/// Primary-key lookup argument for [`Record::key`].
#[derive(Debug, Clone, PartialEq)]
pub enum KeyLookup {
    /// Bare value; only valid for types with exactly one primary-key field.
    Single(Value),
    /// Every primary-key field by name.
    Named(Vec<(String, Value)>),
}

impl KeyLookup {
    /// Build a named lookup.
    pub fn named<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        KeyLookup::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<Value> for KeyLookup {
    fn from(v: Value) -> Self {
        KeyLookup::Single(v)
    }
}

impl From<i64> for KeyLookup {
    fn from(v: i64) -> Self {
        KeyLookup::Single(Value::Int(v))
    }
}

impl From<i32> for KeyLookup {
    fn from(v: i32) -> Self {
        KeyLookup::Single(Value::from(v))
    }
}

impl From<&str> for KeyLookup {
    fn from(v: &str) -> Self {
        KeyLookup::Single(Value::from(v))
    }
}

impl From<String> for KeyLookup {
    fn from(v: String) -> Self {
        KeyLookup::Single(Value::Text(v))
    }
}

/// A live record of type `M`.
///
/// Each record owns one [`Property`] per declared field. Properties are
/// cloned empty from the schema templates at construction and never shared.
pub struct Record<M: Model> {
    schema: Arc<Schema>,
    properties: Vec<Property>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Record<M> {
    /// A blank record with every field at its default.
    pub fn new() -> Self {
        let schema = schema_of::<M>();
        let properties = schema.instantiate();
        Self {
            schema,
            properties,
            _model: PhantomData,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn table(&self) -> &str {
        self.schema.table()
    }

    pub fn primary_keys(&self) -> &[String] {
        self.schema.primary_keys()
    }

    fn position(&self, field: &str) -> Result<usize> {
        self.schema.position(field).ok_or_else(|| Error::UnknownField {
            table: self.table().to_string(),
            field: field.to_string(),
        })
    }

    /// The property backing a field.
    pub fn property(&self, field: &str) -> Option<&Property> {
        self.schema.position(field).map(|i| &self.properties[i])
    }

    /// Current value of a field.
    pub fn get(&self, field: &str) -> Result<Value> {
        let i = self.position(field)?;
        Ok(self.properties[i].get())
    }

    /// Validate and store a field value.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let i = self.position(field)?;
        self.properties[i]
            .set(value)
            .map_err(|source| Error::Validation {
                field: field.to_string(),
                source,
            })
    }

    /// Mutable access to a list field's items.
    pub fn list_mut(&mut self, field: &str) -> Result<&mut Vec<Value>> {
        let i = self.position(field)?;
        let kind = self.properties[i].kind();
        self.properties[i]
            .list_mut()
            .ok_or_else(|| Error::Validation {
                field: field.to_string(),
                source: PropertyError::WrongType {
                    kind,
                    found: "list",
                },
            })
    }

    /// Every field's current value.
    pub fn values(&self) -> Row {
        self.schema
            .fields()
            .iter()
            .zip(&self.properties)
            .map(|(def, prop)| (def.name.clone(), prop.get()))
            .collect()
    }

    /// Current values of the primary-key fields, in declaration order.
    pub fn primary_key_values(&self) -> Result<Vec<(String, Value)>> {
        let keys = self.primary_keys();
        if keys.is_empty() {
            return Err(Error::NoPrimaryKey {
                table: self.table().to_string(),
            });
        }
        keys.iter()
            .map(|k| Ok((k.clone(), self.get(k)?)))
            .collect()
    }

    /// Build a record from a raw row. Every declared field must be present.
    pub fn make(row: &Row) -> Result<Self> {
        let mut record = Self::new();
        let schema = Arc::clone(&record.schema);
        for (def, prop) in schema.fields().iter().zip(record.properties.iter_mut()) {
            let value = row.get(&def.name).ok_or_else(|| Error::MissingField {
                table: schema.table().to_string(),
                field: def.name.clone(),
            })?;
            prop.set(value.clone()).map_err(|source| Error::Validation {
                field: def.name.clone(),
                source,
            })?;
        }
        Ok(record)
    }

    /// Fetch the record with the given primary key.
    ///
    /// Returns `Ok(None)` when the lookup does not name exactly the declared
    /// primary-key fields, or when zero or several rows match.
    #[instrument(skip(store, lookup), fields(table = M::table()))]
    pub fn key<S>(store: &S, lookup: impl Into<KeyLookup>) -> Result<Option<Self>>
    where
        S: RowStore + ?Sized,
    {
        let schema = schema_of::<M>();
        let keys = schema.primary_keys();
        if keys.is_empty() {
            return Err(Error::NoPrimaryKey {
                table: schema.table().to_string(),
            });
        }

        let pairs = match lookup.into() {
            KeyLookup::Single(value) if keys.len() == 1 => vec![(keys[0].clone(), value)],
            KeyLookup::Single(_) => {
                debug!("Single-value lookup on a composite key");
                return Ok(None);
            }
            KeyLookup::Named(pairs) => {
                let supplied: BTreeSet<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
                let declared: BTreeSet<&str> = keys.iter().map(String::as_str).collect();
                if supplied.len() != pairs.len() || supplied != declared {
                    debug!(supplied = ?supplied, "Lookup fields do not match the primary key");
                    return Ok(None);
                }
                pairs
            }
        };

        let select = Select::new(schema.table()).with_criteria(Criteria::fields_eq(pairs));
        let rows = store.select(&select).map_err(Error::Store)?;
        match rows.as_slice() {
            [row] => Ok(Some(Self::make(row)?)),
            _ => {
                debug!(rows = rows.len(), "Key lookup found no unique row");
                Ok(None)
            }
        }
    }

    /// Update the stored row for this record's primary key, or insert a new one.
    ///
    /// On insert the primary-key fields are left out and the store's generated
    /// identifier is written back into the first primary-key field. Types with a
    /// composite key only get that first field filled.
    #[instrument(skip(self, store), fields(table = %self.schema.table()))]
    pub fn put<S>(&mut self, store: &S) -> Result<&mut Self>
    where
        S: RowStore + ?Sized,
    {
        let where_key = self.primary_key_values()?;
        let exists = Self::key(store, KeyLookup::Named(where_key.clone()))?.is_some();
        let mut values = self.values();

        if exists {
            store
                .update(self.table(), &Criteria::fields_eq(where_key), values)
                .map_err(Error::Store)?;
            debug!("Updated record");
        } else {
            for key in self.primary_keys() {
                values.remove(key);
            }
            let id = store.insert(self.table(), values).map_err(Error::Store)?;
            let first = self.primary_keys()[0].clone();
            debug!(id = %id, field = %first, "Inserted record");
            self.set(&first, id)?;
        }
        Ok(self)
    }

    /// Delete the stored row for this record's primary key.
    #[instrument(skip(self, store), fields(table = %self.schema.table()))]
    pub fn remove<S>(&self, store: &S) -> Result<()>
    where
        S: RowStore + ?Sized,
    {
        let where_key = self.primary_key_values()?;
        store
            .delete(self.table(), &Criteria::fields_eq(where_key))
            .map_err(Error::Store)?;
        debug!("Removed record");
        Ok(())
    }

    /// JSON object of every field's serialized value.
    pub fn dump(&self) -> Result<String> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .schema
            .fields()
            .iter()
            .zip(&self.properties)
            .map(|(def, prop)| (def.name.clone(), prop.to_serializable()))
            .collect();
        Ok(serde_json::to_string(&object)?)
    }

    /// Rebuild a record from [`dump`](Self::dump) output.
    ///
    /// Blank input yields `Ok(None)`.
    pub fn load(serialized: &str) -> Result<Option<Self>> {
        if serialized.trim().is_empty() {
            return Ok(None);
        }
        let json: serde_json::Value = serde_json::from_str(serialized)?;
        let serde_json::Value::Object(object) = json else {
            return Err(Error::Serialization(format!(
                "expected a JSON object for `{}`",
                M::table()
            )));
        };
        let row = object
            .iter()
            .map(|(k, v)| Ok((k.clone(), Value::from_json(v)?)))
            .collect::<Result<Row>>()?;
        Self::make(&row).map(Some)
    }

    /// A query over every record of this type.
    pub fn all() -> Query<M> {
        Query::new()
    }

    /// Cache key for `value`.
    pub fn make_key(deriver: &KeyDeriver, value: &str) -> String {
        deriver.make_key(value)
    }
}

impl<M: Model> Default for Record<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Clone for Record<M> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            properties: self.properties.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for Record<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.table())
            .field("values", &self.values())
            .finish()
    }
}

impl<M: Model> fmt::Display for Record<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ORM {} Model Object: {{", self.table())?;
        for (i, (def, prop)) in self.schema.fields().iter().zip(&self.properties).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", def.name, prop)?;
        }
        f.write_str("}")
    }
}
