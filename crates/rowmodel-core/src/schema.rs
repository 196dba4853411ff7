//! Record type schemas and the process-wide binding registry.
//!
//! A record type declares its fields once through [`Model::fields`]. The first
//! time the type is used, [`schema_of`] binds those declarations into an
//! immutable [`Schema`] (field order, name index, primary-key set) and caches
//! it for the life of the process. Every record of the type shares that
//! schema; none of them share property storage.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::property::Property;

/// A concrete record type.
///
/// Implemented on a marker type; records of the type are [`Record<Self>`].
///
/// ```ignore
/// struct Person;
///
/// impl Model for Person {
///     fn fields() -> Vec<FieldDef> {
///         vec![
///             FieldDef::new("id", Property::integer().primary_key()),
///             FieldDef::new("name", Property::string()),
///         ]
///     }
/// }
/// ```
///
/// [`Record<Self>`]: crate::record::Record
pub trait Model: 'static {
    /// Table identifier. Defaults to the type's name without its module path.
    fn table() -> &'static str {
        short_type_name::<Self>()
    }

    /// Field declarations, in column order.
    fn fields() -> Vec<FieldDef>;
}

/// A declared field: its name and the property template it is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Template cloned (empty) into every record.
    pub template: Property,
}

impl FieldDef {
    /// Create a new field declaration.
    pub fn new(name: impl Into<String>, template: Property) -> Self {
        Self {
            name: name.into(),
            template,
        }
    }
}

/// Immutable field table of one record type.
#[derive(Debug)]
pub struct Schema {
    table: String,
    fields: Vec<FieldDef>,
    index: HashMap<String, usize>,
    primary_keys: Vec<String>,
}

impl Schema {
    /// Bind a table name and field declarations.
    ///
    /// A repeated field name keeps its first declaration.
    pub fn bind(table: impl Into<String>, declared: Vec<FieldDef>) -> Self {
        let table = table.into();
        let mut fields = Vec::with_capacity(declared.len());
        let mut index = HashMap::with_capacity(declared.len());
        let mut primary_keys = Vec::new();

        for field in declared {
            if index.contains_key(&field.name) {
                warn!(table = %table, field = %field.name, "Duplicate field declaration ignored");
                continue;
            }
            if field.template.is_primary_key() {
                primary_keys.push(field.name.clone());
            }
            index.insert(field.name.clone(), fields.len());
            fields.push(field);
        }

        Self {
            table,
            fields,
            index,
            primary_keys,
        }
    }

    /// Table identifier.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Declared fields in order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Position of a field by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Check whether a field is declared.
    pub fn has_field(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Names of the primary-key fields, in declaration order.
    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    /// Fresh property storage for one record.
    pub fn instantiate(&self) -> Vec<Property> {
        self.fields.iter().map(|f| f.template.clone_empty()).collect()
    }
}

static REGISTRY: RwLock<BTreeMap<TypeId, Arc<Schema>>> = RwLock::new(BTreeMap::new());

/// Schema of `M`, binding it on first use.
///
/// Concurrent first calls bind exactly once; afterwards only the read lock is
/// taken.
pub fn schema_of<M: Model>() -> Arc<Schema> {
    let id = TypeId::of::<M>();
    if let Some(schema) = REGISTRY.read().get(&id) {
        return Arc::clone(schema);
    }

    let mut registry = REGISTRY.write();
    let schema = registry.entry(id).or_insert_with(|| {
        let schema = Schema::bind(M::table(), M::fields());
        debug!(
            table = schema.table(),
            fields = schema.fields().len(),
            primary_keys = ?schema.primary_keys(),
            "Bound record schema"
        );
        Arc::new(schema)
    });
    Arc::clone(schema)
}

/// Check whether `M` has been bound yet.
pub fn is_bound<M: Model>() -> bool {
    REGISTRY.read().contains_key(&TypeId::of::<M>())
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
