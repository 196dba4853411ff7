//! rowmodel - typed record models over a row-oriented store.
//!
//! # Example
//!
//! ```
//! use rowmodel::prelude::*;
//!
//! struct Person;
//!
//! impl Model for Person {
//!     fn fields() -> Vec<FieldDef> {
//!         vec![
//!             FieldDef::new("id", Property::integer().primary_key()),
//!             FieldDef::new("name", Property::string()),
//!             FieldDef::new("age", Property::integer()),
//!         ]
//!     }
//! }
//!
//! # fn main() -> rowmodel::Result<()> {
//! let store = MemoryStore::new();
//!
//! let mut ada = Record::<Person>::new();
//! ada.set("name", "Ada")?;
//! ada.set("age", 36)?;
//! ada.put(&store)?;
//!
//! let found = Record::<Person>::key(&store, 1)?.expect("stored");
//! assert_eq!(found.get("name")?, Value::from("Ada"));
//!
//! let adults = Record::<Person>::all().filter("age >", 18).fetch(&store)?;
//! assert_eq!(adults.len(), 1);
//! # Ok(())
//! # }
//! ```

pub use rowmodel_core::*;

/// Everything needed to declare and use a record type.
pub mod prelude {
    pub use rowmodel_core::{
        Combinator, Error, FieldDef, Fetched, KeyConfig, KeyDeriver, KeyLookup, MemoryStore,
        Model, Property, Record, RowStore, Size, Value,
    };
}
