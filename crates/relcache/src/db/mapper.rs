//! Module: mapper
//! Responsibility: per record type schema (id attribute, relations,
//! tracked fields, instance methods) and the registry holding them.

use crate::{
    config::StoreConfig,
    db::{
        collection::{Collection, CollectionError, OnConflict, RecordMethod},
        index::{IndexField, KeyFn},
        relation::Relation,
    },
    record::Record,
    value::Value,
};
use derive_more::{Deref, DerefMut};
use std::{
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

///
/// Accessor
///
/// Field routed through a relation instead of a plain field write.
/// The payload is the relation's position on the mapper.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Accessor {
    Link(usize),
    ForeignKey(usize),
}

///
/// MapperDef
///
/// Builder for a mapper. Unset options fall back to the store config.
///

#[derive(Default)]
pub struct MapperDef {
    name: String,
    id_attribute: Option<String>,
    hash_code: Option<KeyFn>,
    relations: Vec<Relation>,
    indexes: Vec<(String, Vec<IndexField>)>,
    methods: Vec<(String, RecordMethod)>,
    untracked: BTreeSet<String>,
    track_changes: Option<bool>,
    on_conflict: Option<OnConflict>,
}

impl MapperDef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn id_attribute(mut self, field: impl Into<String>) -> Self {
        self.id_attribute = Some(field.into());
        self
    }

    /// Bucket identity for every index of the mapper's collection.
    #[must_use]
    pub fn hash_code(mut self, hash_code: impl Fn(&Record) -> Value + 'static) -> Self {
        self.hash_code = Some(Rc::new(hash_code));
        self
    }

    #[must_use]
    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    #[must_use]
    pub fn index(mut self, name: impl Into<String>, fields: Vec<IndexField>) -> Self {
        self.indexes.push((name.into(), fields));
        self
    }

    #[must_use]
    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Record) -> Value + 'static,
    ) -> Self {
        self.methods.push((name.into(), Rc::new(method)));
        self
    }

    /// Exclude a field from change notifications.
    #[must_use]
    pub fn untracked(mut self, field: impl Into<String>) -> Self {
        self.untracked.insert(field.into());
        self
    }

    #[must_use]
    pub const fn track_changes(mut self, track: bool) -> Self {
        self.track_changes = Some(track);
        self
    }

    #[must_use]
    pub const fn on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.on_conflict = Some(on_conflict);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve defaults, bind relations and build the empty collection.
    pub(crate) fn build(
        self,
        config: &StoreConfig,
    ) -> Result<(Mapper, Collection), CollectionError> {
        let id_attribute = self
            .id_attribute
            .unwrap_or_else(|| config.id_attribute.clone());

        let mut accessors = BTreeMap::new();
        let relations: Vec<Rc<Relation>> = self
            .relations
            .into_iter()
            .enumerate()
            .map(|(position, mut relation)| {
                relation.assign_to(&self.name, &id_attribute);
                relation.add_descriptor(position, &mut accessors);
                Rc::new(relation)
            })
            .collect();

        let mut collection = Collection::new(&self.name, &id_attribute)
            .with_hash_code(self.hash_code)
            .with_on_conflict(self.on_conflict.unwrap_or(config.on_conflict));
        for (name, fields) in self.indexes {
            collection.create_index(name, fields)?;
        }
        for (name, method) in self.methods {
            collection.define_method(name, move |record| method(record));
        }

        let mapper = Mapper {
            name: self.name,
            id_attribute,
            relations,
            accessors,
            untracked: self.untracked,
            track_changes: self.track_changes.unwrap_or(config.track_changes),
        };

        Ok((mapper, collection))
    }
}

///
/// Mapper
///

#[derive(Debug)]
pub struct Mapper {
    name: String,
    id_attribute: String,
    relations: Vec<Rc<Relation>>,
    accessors: BTreeMap<String, Accessor>,
    untracked: BTreeSet<String>,
    track_changes: bool,
}

impl Mapper {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    #[must_use]
    pub fn relations(&self) -> &[Rc<Relation>] {
        &self.relations
    }

    /// The relation installed on `field` as its local field.
    #[must_use]
    pub fn relation(&self, field: &str) -> Option<&Rc<Relation>> {
        match self.accessors.get(field) {
            Some(Accessor::Link(position)) => self.relations.get(*position),
            _ => None,
        }
    }

    #[must_use]
    pub fn accessor(&self, field: &str) -> Option<Accessor> {
        self.accessors.get(field).copied()
    }

    /// Whether writes to `field` schedule a change notification. Relation
    /// local fields never do.
    #[must_use]
    pub fn is_tracked(&self, field: &str) -> bool {
        self.track_changes
            && !self.untracked.contains(field)
            && !matches!(self.accessors.get(field), Some(Accessor::Link(_)))
    }
}

///
/// MapperRegistry
///

#[derive(Debug, Default, Deref, DerefMut)]
pub struct MapperRegistry(BTreeMap<String, Mapper>);

impl MapperRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(owner, relation)` pair whose relation points at `mapper`.
    pub fn relations_to(&self, mapper: &str) -> Vec<(String, Rc<Relation>)> {
        self.0
            .values()
            .flat_map(|owner| {
                owner
                    .relations
                    .iter()
                    .filter(|relation| relation.is_associated_with(mapper))
                    .map(|relation| (owner.name.clone(), Rc::clone(relation)))
            })
            .collect()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::relation::RelationOptions;

    fn post_def() -> MapperDef {
        MapperDef::new("post")
            .relation(
                Relation::belongs_to(
                    "author",
                    RelationOptions::new()
                        .local_field("author")
                        .foreign_key("author_id"),
                )
                .expect("relation"),
            )
            .untracked("views")
    }

    #[test]
    fn build_installs_accessors_and_defaults() {
        let (mapper, collection) = post_def().build(&StoreConfig::default()).expect("build");

        assert_eq!(mapper.id_attribute(), "id");
        assert_eq!(collection.name(), "post");
        assert_eq!(mapper.accessor("author"), Some(Accessor::Link(0)));
        assert_eq!(mapper.accessor("author_id"), Some(Accessor::ForeignKey(0)));
        assert_eq!(mapper.relations()[0].owner(), Some("post"));
    }

    #[test]
    fn tracked_fields_exclude_links_and_untracked() {
        let (mapper, _) = post_def().build(&StoreConfig::default()).expect("build");

        assert!(mapper.is_tracked("title"));
        assert!(mapper.is_tracked("author_id"));
        assert!(!mapper.is_tracked("author"));
        assert!(!mapper.is_tracked("views"));

        let (silent, _) = post_def()
            .track_changes(false)
            .build(&StoreConfig::default())
            .expect("build");
        assert!(!silent.is_tracked("title"));
    }

    #[test]
    fn registry_lists_relations_pointing_at_a_mapper() {
        let mut registry = MapperRegistry::new();
        let (mapper, _) = post_def().build(&StoreConfig::default()).expect("build");
        registry.insert(mapper.name().to_string(), mapper);

        let incoming = registry.relations_to("author");
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].0, "post");
        assert!(registry.relations_to("post").is_empty());
    }
}
