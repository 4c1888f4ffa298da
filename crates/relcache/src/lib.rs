//! In-memory indexed record cache: ordered multi-field indexes, single-use
//! queries, and a relation layer that keeps foreign keys and cached links
//! consistent as records change.

#[macro_use]
mod macros;

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod obs;
pub mod record;
pub mod value;

///
/// CONSTANTS
///

/// Id attribute used when neither the mapper nor the store config names one.
pub const DEFAULT_ID_ATTRIBUTE: &str = "id";

///
/// Prelude
///
/// Domain vocabulary plus the store entry points.
///

pub mod prelude {
    pub use crate::{
        config::StoreConfig,
        db::{
            BetweenOptions, Collection, CollectionEvent, Direction, Filter, IndexField, Link,
            MapperDef, OnConflict, OrderBy, Relation, RelationOptions, Store,
        },
        error::InternalError,
        record,
        record::Record,
        value::Value,
    };
}
