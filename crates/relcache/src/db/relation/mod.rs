//! Module: relation
//! Responsibility: association metadata between two mappers and the lookups
//! that resolve a record's related ids.
//! Does not own: the link side-table writes or relink sequencing (see `store`).

mod belongs_to;
mod has_many;
mod has_one;
mod link;

#[cfg(test)]
mod tests;

use crate::{
    db::{
        collection::Collection,
        mapper::{Accessor, Mapper, MapperRegistry},
        query::QueryError,
    },
    error::ErrorClass,
    record::Record,
    value::Value,
};
use std::{cell::OnceCell, collections::BTreeMap, fmt};
use thiserror::Error as ThisError;

pub use link::{Link, LinkKey, LinkTable};

///
/// RelationError
///

#[derive(Debug, ThisError)]
pub enum RelationError {
    #[error("relation to '{related}' is missing a local field")]
    MissingLocalField { related: String },

    #[error("{kind} relation to '{related}' requires a foreign key")]
    MissingForeignKey { kind: RelationKind, related: String },

    #[error(
        "hasMany relation to '{related}' requires one of foreign_key, local_keys or foreign_keys"
    )]
    MissingKeys { related: String },

    #[error("related mapper '{name}' is not defined")]
    UnknownMapper { name: String },

    #[error(
        "relation '{mapper}.{field}' has more than one inverse candidate: {}",
        candidates.join(", ")
    )]
    AmbiguousInverse {
        mapper: String,
        field: String,
        candidates: Vec<String>,
    },

    #[error("mapper '{mapper}' has no relation field '{field}'")]
    UnknownField { mapper: String, field: String },

    #[error("relation '{field}' is {kind}; wrong link cardinality")]
    Cardinality { field: String, kind: RelationKind },

    #[error("related record {id} not found in '{mapper}'")]
    TargetNotFound { mapper: String, id: Value },

    #[error("relation '{field}' has not been assigned to a mapper")]
    NotAssigned { field: String },

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl RelationError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::MissingLocalField { .. }
            | Self::MissingForeignKey { .. }
            | Self::MissingKeys { .. }
            | Self::UnknownMapper { .. }
            | Self::AmbiguousInverse { .. }
            | Self::Cardinality { .. } => ErrorClass::Unsupported,
            Self::UnknownField { .. } | Self::TargetNotFound { .. } => ErrorClass::NotFound,
            Self::NotAssigned { .. } => ErrorClass::InvariantViolation,
            Self::Query(err) => err.class(),
        }
    }
}

///
/// RelationKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RelationKind {
    BelongsTo,
    HasMany,
    HasOne,
}

impl RelationKind {
    #[must_use]
    pub const fn is_many(self) -> bool {
        matches!(self, Self::HasMany)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BelongsTo => "belongsTo",
            Self::HasMany => "hasMany",
            Self::HasOne => "hasOne",
        };
        write!(f, "{label}")
    }
}

///
/// RelationKeys
///
/// Where the key linking two records lives.
///
/// ForeignKey  → belongsTo: on the owner; hasMany/hasOne: on the related record
/// LocalKeys   → an id list on the owner
/// ForeignKeys → an id list on each related record, holding owner ids
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RelationKeys {
    ForeignKey(String),
    LocalKeys(String),
    ForeignKeys(String),
}

impl RelationKeys {
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::ForeignKey(field) | Self::LocalKeys(field) | Self::ForeignKeys(field) => field,
        }
    }
}

///
/// RelationOptions
///

#[derive(Clone, Debug, Default)]
pub struct RelationOptions {
    local_field: Option<String>,
    foreign_key: Option<String>,
    local_keys: Option<String>,
    foreign_keys: Option<String>,
}

impl RelationOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn local_field(mut self, field: impl Into<String>) -> Self {
        self.local_field = Some(field.into());
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, field: impl Into<String>) -> Self {
        self.foreign_key = Some(field.into());
        self
    }

    #[must_use]
    pub fn local_keys(mut self, field: impl Into<String>) -> Self {
        self.local_keys = Some(field.into());
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, field: impl Into<String>) -> Self {
        self.foreign_keys = Some(field.into());
        self
    }
}

///
/// Owner
///

#[derive(Clone, Debug)]
struct Owner {
    mapper: String,
    id_attribute: String,
}

///
/// Relation
///
/// One declared association, shared by every record of the owning mapper.
/// Only the owner (set once by `assign_to`) and the memoized inverse are
/// filled in after construction.
///

#[derive(Clone, Debug)]
pub struct Relation {
    kind: RelationKind,
    related: String,
    local_field: String,
    keys: RelationKeys,
    owner: Option<Owner>,
    inverse: OnceCell<Option<usize>>,
}

impl Relation {
    pub fn belongs_to(
        related: impl Into<String>,
        options: RelationOptions,
    ) -> Result<Self, RelationError> {
        Self::build(RelationKind::BelongsTo, related.into(), options)
    }

    pub fn has_many(
        related: impl Into<String>,
        options: RelationOptions,
    ) -> Result<Self, RelationError> {
        Self::build(RelationKind::HasMany, related.into(), options)
    }

    pub fn has_one(
        related: impl Into<String>,
        options: RelationOptions,
    ) -> Result<Self, RelationError> {
        Self::build(RelationKind::HasOne, related.into(), options)
    }

    fn build(
        kind: RelationKind,
        related: String,
        options: RelationOptions,
    ) -> Result<Self, RelationError> {
        let Some(local_field) = options.local_field else {
            return Err(RelationError::MissingLocalField { related });
        };

        let keys = match kind {
            RelationKind::BelongsTo | RelationKind::HasOne => options
                .foreign_key
                .map(RelationKeys::ForeignKey)
                .ok_or_else(|| RelationError::MissingForeignKey {
                    kind,
                    related: related.clone(),
                })?,
            RelationKind::HasMany => options
                .foreign_key
                .map(RelationKeys::ForeignKey)
                .or_else(|| options.local_keys.map(RelationKeys::LocalKeys))
                .or_else(|| options.foreign_keys.map(RelationKeys::ForeignKeys))
                .ok_or_else(|| RelationError::MissingKeys {
                    related: related.clone(),
                })?,
        };

        Ok(Self {
            kind,
            related,
            local_field,
            keys,
            owner: None,
            inverse: OnceCell::new(),
        })
    }

    ///
    /// ACCESSORS
    ///

    #[must_use]
    pub const fn kind(&self) -> RelationKind {
        self.kind
    }

    /// Name of the related mapper.
    #[must_use]
    pub fn related(&self) -> &str {
        &self.related
    }

    #[must_use]
    pub fn local_field(&self) -> &str {
        &self.local_field
    }

    #[must_use]
    pub const fn keys(&self) -> &RelationKeys {
        &self.keys
    }

    /// The foreign key field, when this relation is keyed by one.
    #[must_use]
    pub fn foreign_key(&self) -> Option<&str> {
        match &self.keys {
            RelationKeys::ForeignKey(field) => Some(field),
            _ => None,
        }
    }

    /// Name of the mapper this relation was assigned to.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_ref().map(|owner| owner.mapper.as_str())
    }

    /// Whether this relation points at `mapper`.
    #[must_use]
    pub fn is_associated_with(&self, mapper: &str) -> bool {
        self.related == mapper
    }

    ///
    /// SCHEMA
    ///

    /// Bind the relation to its owning mapper. Later calls are ignored.
    pub fn assign_to(&mut self, mapper: impl Into<String>, id_attribute: impl Into<String>) {
        if self.owner.is_none() {
            self.owner = Some(Owner {
                mapper: mapper.into(),
                id_attribute: id_attribute.into(),
            });
        }
    }

    /// Install the accessor entries for this relation: the local field and,
    /// for belongsTo, the raw foreign key.
    pub fn add_descriptor(&self, position: usize, accessors: &mut BTreeMap<String, Accessor>) {
        accessors.insert(self.local_field.clone(), Accessor::Link(position));

        if self.kind == RelationKind::BelongsTo
            && let RelationKeys::ForeignKey(field) = &self.keys
        {
            accessors.insert(field.clone(), Accessor::ForeignKey(position));
        }
    }

    pub fn get_relation<'r>(
        &self,
        registry: &'r MapperRegistry,
    ) -> Result<&'r Mapper, RelationError> {
        registry
            .get(&self.related)
            .ok_or_else(|| RelationError::UnknownMapper {
                name: self.related.clone(),
            })
    }

    ///
    /// KEYS
    ///

    /// Key value held by `holder`: the owner for belongsTo and local keys,
    /// the related record otherwise.
    #[must_use]
    pub fn get_foreign_key<'r>(&self, holder: &'r Record) -> &'r Value {
        holder.value(self.keys.field())
    }

    pub fn set_foreign_key(&self, holder: &mut Record, value: impl Into<Value>) {
        holder.set(self.keys.field(), value);
    }

    #[must_use]
    pub fn get_local_field<'t>(&self, links: &'t LinkTable, id: &Value) -> Option<&'t Link> {
        let owner = self.owner()?;
        links.link(owner, id, &self.local_field)
    }

    pub fn set_local_field(
        &self,
        links: &mut LinkTable,
        id: &Value,
        link: Link,
    ) -> Result<(), RelationError> {
        let owner = self.owner().ok_or_else(|| RelationError::NotAssigned {
            field: self.local_field.clone(),
        })?;
        links.cache(owner, id, &self.local_field, link);

        Ok(())
    }

    ///
    /// LOOKUP
    ///

    /// Resolve the related ids of `record` against the related collection.
    pub fn find_existing_links_for(
        &self,
        record: &Record,
        related: &Collection,
    ) -> Result<Link, RelationError> {
        match self.kind {
            RelationKind::BelongsTo => Ok(belongs_to::find_existing_link(self, record, related)),
            RelationKind::HasMany => {
                has_many::find_existing_links(self, self.owner_id(record)?, record, related)
            }
            RelationKind::HasOne => {
                has_one::find_existing_link(self, self.owner_id(record)?, related)
            }
        }
    }

    fn owner_id<'r>(&self, record: &'r Record) -> Result<&'r Value, RelationError> {
        self.owner
            .as_ref()
            .map(|owner| record.value(&owner.id_attribute))
            .ok_or_else(|| RelationError::NotAssigned {
                field: self.local_field.clone(),
            })
    }

    ///
    /// INVERSE
    ///

    /// The relation on the related mapper that points back at this one.
    /// Memoized once the related mapper is registered.
    pub fn get_inverse<'r>(
        &self,
        registry: &'r MapperRegistry,
    ) -> Result<Option<&'r Relation>, RelationError> {
        let related = self.get_relation(registry)?;

        if let Some(position) = self.inverse.get() {
            return Ok(position
                .and_then(|i| related.relations().get(i))
                .map(|relation| &**relation));
        }

        let position = self.find_inverse_relation(related)?;
        let _ = self.inverse.set(position);

        Ok(position
            .and_then(|i| related.relations().get(i))
            .map(|relation| &**relation))
    }

    /// Position of the inverse among `related`'s relations. A candidate points
    /// back at the owner, is not this relation, and has no foreign key or the
    /// same one. Exact foreign-key matches win; any remaining tie is an error.
    pub fn find_inverse_relation(&self, related: &Mapper) -> Result<Option<usize>, RelationError> {
        let owner = self.owner().ok_or_else(|| RelationError::NotAssigned {
            field: self.local_field.clone(),
        })?;

        let candidates: Vec<usize> = related
            .relations()
            .iter()
            .enumerate()
            .filter(|(_, other)| {
                other.is_associated_with(owner)
                    && !(related.name() == owner && other.local_field == self.local_field)
                    && (other.foreign_key().is_none() || other.foreign_key() == self.foreign_key())
            })
            .map(|(i, _)| i)
            .collect();

        let exact: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&i| {
                self.foreign_key().is_some()
                    && related.relations()[i].foreign_key() == self.foreign_key()
            })
            .collect();

        let tied = if exact.is_empty() { candidates } else { exact };
        match tied.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            _ => Err(RelationError::AmbiguousInverse {
                mapper: owner.to_string(),
                field: self.local_field.clone(),
                candidates: tied
                    .iter()
                    .map(|&i| related.relations()[i].local_field.clone())
                    .collect(),
            }),
        }
    }
}
