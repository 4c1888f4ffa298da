pub mod collection;
pub mod index;
pub mod mapper;
pub mod notify;
pub mod query;
pub mod relation;
pub mod store;

pub use collection::{Collection, CollectionEvent, CollectionObserver, OnConflict};
pub use index::{BetweenOptions, Index, IndexField};
pub use mapper::{Mapper, MapperDef};
pub use query::{Direction, Filter, OrderBy, Query};
pub use relation::{Link, Relation, RelationKind, RelationOptions};
pub use store::Store;
