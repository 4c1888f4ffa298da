//! Module: store
//! Responsibility: the arena owner. One collection per mapper, the link
//! side-table, and the change scheduler, behind a record-level API.
//!
//! Every relation write funnels through `write`, which updates the owning
//! collection and then reconciles the cached links it may have invalidated.

mod reconcile;


use crate::{
    config::StoreConfig,
    db::{
        collection::{Collection, CollectionObserver, ConsistencyError},
        index::IndexField,
        mapper::{Accessor, Mapper, MapperDef, MapperRegistry},
        notify::{ChangeScheduler, Clock, SystemClock},
        relation::{Link, LinkTable, Relation, RelationError, RelationKeys, RelationKind},
    },
    error::{ErrorClass, InternalError},
    obs::sink::{self, MetricsEvent},
    record::{Changes, Record},
    value::Value,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    rc::Rc,
};
use thiserror::Error as ThisError;

///
/// StoreError
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("mapper '{name}' is already defined")]
    DuplicateMapper { name: String },

    #[error("mapper '{name}' not found")]
    UnknownMapper { name: String },

    #[error("record {id} not found in '{mapper}'")]
    RecordNotFound { mapper: String, id: Value },
}

impl StoreError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::DuplicateMapper { .. } => ErrorClass::Conflict,
            Self::UnknownMapper { .. } | Self::RecordNotFound { .. } => ErrorClass::NotFound,
        }
    }
}

///
/// Store
///

pub struct Store {
    config: StoreConfig,
    registry: MapperRegistry,
    collections: BTreeMap<String, Collection>,
    links: LinkTable,
    scheduler: ChangeScheduler<(String, Value)>,
}

impl Store {
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self::with_clock(config, Rc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(config: StoreConfig, clock: Rc<dyn Clock>) -> Self {
        let scheduler = ChangeScheduler::new(clock, config.notify_delay);

        Self {
            config,
            registry: MapperRegistry::new(),
            collections: BTreeMap::new(),
            links: LinkTable::new(),
            scheduler,
        }
    }

    pub fn from_toml(source: &str) -> Result<Self, InternalError> {
        Ok(Self::new(StoreConfig::from_toml(source)?))
    }

    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub const fn links(&self) -> &LinkTable {
        &self.links
    }

    pub fn mapper(&self, name: &str) -> Result<&Mapper, InternalError> {
        self.registry.get(name).ok_or_else(|| {
            StoreError::UnknownMapper {
                name: name.to_string(),
            }
            .into()
        })
    }

    pub fn mappers(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(String::as_str)
    }

    pub fn collection(&self, name: &str) -> Result<&Collection, InternalError> {
        self.collections.get(name).ok_or_else(|| {
            StoreError::UnknownMapper {
                name: name.to_string(),
            }
            .into()
        })
    }

    fn collection_mut(&mut self, name: &str) -> Result<&mut Collection, StoreError> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownMapper {
                name: name.to_string(),
            })
    }

    fn relation(&self, mapper: &str, field: &str) -> Result<Rc<Relation>, InternalError> {
        self.mapper(mapper)?
            .relation(field)
            .cloned()
            .ok_or_else(|| {
                RelationError::UnknownField {
                    mapper: mapper.to_string(),
                    field: field.to_string(),
                }
                .into()
            })
    }

    ///
    /// SCHEMA
    ///

    /// Register a mapper and create its collection. Inverse relations are
    /// checked against every mapper defined so far; foreign-key indexes are
    /// created on both sides when `index_foreign_keys` is set.
    pub fn define_mapper(&mut self, def: MapperDef) -> Result<(), InternalError> {
        let name = def.name().to_string();
        if self.registry.contains_key(&name) {
            return Err(StoreError::DuplicateMapper { name }.into());
        }

        let (mapper, collection) = def.build(&self.config)?;
        self.registry.insert(name.clone(), mapper);
        self.collections.insert(name.clone(), collection);

        let installed = self
            .check_inverses(&name)
            .map_err(InternalError::from)
            .and_then(|()| {
                if self.config.index_foreign_keys {
                    self.ensure_foreign_key_indexes(&name)
                } else {
                    Ok(())
                }
            });
        if let Err(err) = installed {
            self.registry.remove(&name);
            self.collections.remove(&name);
            return Err(err);
        }

        tracing::debug!(mapper = %name, "defined mapper");

        Ok(())
    }

    fn check_inverses(&self, name: &str) -> Result<(), RelationError> {
        let Some(mapper) = self.registry.get(name) else {
            return Ok(());
        };

        for relation in mapper.relations() {
            if let Ok(related) = relation.get_relation(&self.registry) {
                relation.find_inverse_relation(related)?;
            }
        }
        for (owner, relation) in self.registry.relations_to(name) {
            if owner != name {
                relation.find_inverse_relation(mapper)?;
            }
        }

        Ok(())
    }

    // belongsTo keys live on the owner; hasMany/hasOne keys on the related side.
    // Indexes created here are dropped again when a later one fails.
    fn ensure_foreign_key_indexes(&mut self, name: &str) -> Result<(), InternalError> {
        let mut wanted: Vec<(String, String)> = Vec::new();

        if let Some(mapper) = self.registry.get(name) {
            for relation in mapper.relations() {
                if let Some(field) = relation.foreign_key() {
                    let holder = match relation.kind() {
                        RelationKind::BelongsTo => name,
                        RelationKind::HasMany | RelationKind::HasOne => relation.related(),
                    };
                    wanted.push((holder.to_string(), field.to_string()));
                }
            }
        }
        for (_, relation) in self.registry.relations_to(name) {
            if relation.kind() != RelationKind::BelongsTo
                && let Some(field) = relation.foreign_key()
            {
                wanted.push((name.to_string(), field.to_string()));
            }
        }

        let mut created: Vec<(String, String)> = Vec::new();
        for (holder, field) in wanted {
            let Some(collection) = self.collections.get_mut(&holder) else {
                continue;
            };
            if collection.index(&field).is_some() {
                continue;
            }

            if let Err(err) =
                collection.create_index(field.clone(), vec![IndexField::field(field.clone())])
            {
                for (holder, field) in created {
                    if let Some(collection) = self.collections.get_mut(&holder) {
                        collection.drop_index(&field);
                    }
                }
                return Err(err.into());
            }
            created.push((holder, field));
        }

        Ok(())
    }

    pub fn create_index(
        &mut self,
        mapper: &str,
        name: impl Into<String>,
        fields: Vec<IndexField>,
    ) -> Result<(), InternalError> {
        self.collection_mut(mapper)?.create_index(name, fields)?;

        Ok(())
    }

    /// Local field of the relation on the related mapper pointing back at
    /// `mapper.field`.
    pub fn inverse(&self, mapper: &str, field: &str) -> Result<Option<String>, InternalError> {
        let relation = self.relation(mapper, field)?;
        let inverse = relation.get_inverse(&self.registry)?;

        Ok(inverse.map(|inverse| inverse.local_field().to_string()))
    }

    ///
    /// RECORDS
    ///

    /// Add a record. Values under a relation's local field are treated as
    /// nested payloads: maps are added to the related collection, scalars are
    /// taken as related ids. Either way the payload field itself is not
    /// stored; the records are linked instead.
    pub fn add(&mut self, mapper: &str, mut record: Record) -> Result<Value, InternalError> {
        let relations = self.mapper(mapper)?.relations().to_vec();
        let mut deferred: Vec<(Rc<Relation>, Vec<Value>)> = Vec::new();

        for relation in relations {
            let Some(payload) = record.unset(relation.local_field()) else {
                continue;
            };
            let ids = self.add_payload(&relation, payload)?;

            if relation.kind() == RelationKind::BelongsTo {
                let key = ids.into_iter().next().unwrap_or_default();
                relation.set_foreign_key(&mut record, key);
            } else {
                deferred.push((relation, ids));
            }
        }

        let collection = self.collection_mut(mapper)?;
        let existing = collection.get(collection.record_id(&record)).cloned();
        let id = collection.insert(record)?;
        let current = collection.get(&id).cloned();
        self.reconcile(mapper, existing.as_ref(), current.as_ref());

        for (relation, ids) in deferred {
            if relation.kind().is_many() {
                self.set_link_many(mapper, &id, relation.local_field(), ids)?;
            } else {
                let target = ids.into_iter().next();
                self.set_link_one(mapper, &id, relation.local_field(), target)?;
            }
        }

        Ok(id)
    }

    /// Add records one by one; earlier records stay when a later one fails.
    pub fn add_many(
        &mut self,
        mapper: &str,
        records: impl IntoIterator<Item = Record>,
    ) -> Result<Vec<Value>, InternalError> {
        records
            .into_iter()
            .map(|record| self.add(mapper, record))
            .collect()
    }

    // Nested maps become related records; scalars are related ids.
    fn add_payload(
        &mut self,
        relation: &Relation,
        payload: Value,
    ) -> Result<Vec<Value>, InternalError> {
        let items = match payload {
            Value::List(items) => items,
            other => vec![other],
        };

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            if item.is_null() {
                continue;
            }
            match Record::from_value(&item) {
                Some(nested) => ids.push(self.add(relation.related(), nested)?),
                None => ids.push(item),
            }
        }

        Ok(ids)
    }

    pub fn get(&self, mapper: &str, id: &Value) -> Result<&Record, InternalError> {
        self.collection(mapper)?.get(id).ok_or_else(|| {
            StoreError::RecordNotFound {
                mapper: mapper.to_string(),
                id: id.clone(),
            }
            .into()
        })
    }

    /// Remove a record, cancel its pending notification and drop every
    /// cached link that pointed at it.
    pub fn remove(&mut self, mapper: &str, id: &Value) -> Result<Record, InternalError> {
        let record = self.collection_mut(mapper)?.remove(id)?;

        self.scheduler.cancel(&(mapper.to_string(), id.clone()));
        self.links.forget_record(mapper, id);
        self.reconcile(mapper, Some(&record), None);

        tracing::debug!(mapper, id = %id, "removed record and severed its links");

        Ok(record)
    }

    /// Write one field. Relation local fields are routed to the link
    /// setters; tracked plain fields schedule a coalesced change event.
    pub fn set_field(
        &mut self,
        mapper: &str,
        id: &Value,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<(), InternalError> {
        let value = value.into();
        let accessor = self.mapper(mapper)?.accessor(field);

        if let Some(Accessor::Link(_)) = accessor {
            return self.set_link_value(mapper, id, field, value);
        }

        let (before, after) = self.write(mapper, id, |record| {
            record.set(field, value);
        })?;

        if let Some(Accessor::ForeignKey(position)) = accessor {
            let relation = self.mapper(mapper)?.relations().get(position).cloned();
            let target = after.value(field);
            if let Some(relation) = relation
                && !target.is_null()
                && self.collection(relation.related())?.contains(target)
            {
                self.claim_has_one(mapper, id, &relation, target)?;
            }
            self.note_relink(mapper, id, field);
        }

        let tracked = self.mapper(mapper)?.is_tracked(field);
        if tracked && before.get(field) != after.get(field) {
            self.scheduler.schedule((mapper.to_string(), id.clone()));
        }

        Ok(())
    }

    // Update one record and reconcile the links its new state invalidates.
    fn write(
        &mut self,
        mapper: &str,
        id: &Value,
        mutate: impl FnOnce(&mut Record),
    ) -> Result<(Record, Record), InternalError> {
        let collection = self.collection_mut(mapper)?;
        let before = collection.update(id, mutate)?;
        let after = collection
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::RecordNotFound {
                mapper: mapper.to_string(),
                id: id.clone(),
            })?;

        self.reconcile(mapper, Some(&before), Some(&after));

        Ok((before, after))
    }

    ///
    /// LINKS
    ///

    /// Related id(s) of one relation field, resolved and cached on first use.
    pub fn link(&mut self, mapper: &str, id: &Value, field: &str) -> Result<Link, InternalError> {
        let relation = self.relation(mapper, field)?;
        if let Some(link) = relation.get_local_field(&self.links, id) {
            return Ok(link.clone());
        }

        let link = self.resolve(&relation, mapper, id)?;
        relation.set_local_field(&mut self.links, id, link.clone())?;
        sink::record(MetricsEvent::LinkResolved { collection: mapper });

        Ok(link)
    }

    /// The related records behind `link`, in link order.
    pub fn linked(
        &mut self,
        mapper: &str,
        id: &Value,
        field: &str,
    ) -> Result<Vec<&Record>, InternalError> {
        let relation = self.relation(mapper, field)?;
        let link = self.link(mapper, id, field)?;
        let related = self.collection(relation.related())?;

        Ok(link
            .ids()
            .into_iter()
            .filter_map(|related_id| related.get(related_id))
            .collect())
    }

    /// Ids of the related records behind `link`, in link order.
    pub fn linked_ids(
        &mut self,
        mapper: &str,
        id: &Value,
        field: &str,
    ) -> Result<Vec<Value>, InternalError> {
        let link = self.link(mapper, id, field)?;

        Ok(link.ids().into_iter().cloned().collect())
    }

    fn resolve(
        &self,
        relation: &Relation,
        mapper: &str,
        id: &Value,
    ) -> Result<Link, InternalError> {
        let record = self.get(mapper, id)?;
        let related = self
            .collections
            .get(relation.related())
            .ok_or_else(|| RelationError::UnknownMapper {
                name: relation.related().to_string(),
            })?;

        Ok(relation.find_existing_links_for(record, related)?)
    }

    // Local-field writes: nested maps are added first, `Null` unlinks.
    fn set_link_value(
        &mut self,
        mapper: &str,
        id: &Value,
        field: &str,
        value: Value,
    ) -> Result<(), InternalError> {
        let relation = self.relation(mapper, field)?;
        let ids = self.add_payload(&relation, value)?;

        if relation.kind().is_many() {
            return self.set_link_many(mapper, id, field, ids);
        }
        if ids.len() > 1 {
            return Err(RelationError::Cardinality {
                field: field.to_string(),
                kind: relation.kind(),
            }
            .into());
        }

        self.set_link_one(mapper, id, field, ids.into_iter().next())
    }

    /// Point a belongsTo or hasOne field at `target`, or unlink with `None`.
    ///
    /// belongsTo writes the owner's foreign key; hasOne clears the key on the
    /// previously linked record and writes it on the new one, which also
    /// severs the new record from any other owner.
    pub fn set_link_one(
        &mut self,
        mapper: &str,
        id: &Value,
        field: &str,
        target: Option<Value>,
    ) -> Result<(), InternalError> {
        let relation = self.relation(mapper, field)?;
        if relation.kind().is_many() {
            return Err(RelationError::Cardinality {
                field: field.to_string(),
                kind: relation.kind(),
            }
            .into());
        }

        let related = relation.related().to_string();
        if let Some(target) = &target
            && !self.collection(&related)?.contains(target)
        {
            return Err(RelationError::TargetNotFound {
                mapper: related,
                id: target.clone(),
            }
            .into());
        }

        let current = self.link(mapper, id, field)?;
        if current == Link::One(target.clone()) {
            return Ok(());
        }

        if relation.kind() == RelationKind::BelongsTo {
            let key = target.clone().unwrap_or_default();
            self.write(mapper, id, |record| relation.set_foreign_key(record, key))?;
            if let Some(target) = &target {
                self.claim_has_one(mapper, id, &relation, target)?;
            }
        } else {
            if let Some(previous) = current.as_one().cloned()
                && target.as_ref() != Some(&previous)
            {
                self.write(&related, &previous, |record| {
                    relation.set_foreign_key(record, Value::Null);
                })?;
            }
            if let Some(target) = &target {
                self.write(&related, target, |record| {
                    relation.set_foreign_key(record, id.clone());
                })?;
            }
        }

        relation.set_local_field(&mut self.links, id, Link::One(target))?;
        self.note_relink(mapper, id, field);

        Ok(())
    }

    // A belongsTo whose inverse is a hasOne: `target` keeps `id` as its only
    // holder. Other holders have their key cleared.
    fn claim_has_one(
        &mut self,
        mapper: &str,
        id: &Value,
        relation: &Relation,
        target: &Value,
    ) -> Result<(), InternalError> {
        let inverse_field = match relation.get_inverse(&self.registry)? {
            Some(inverse) if inverse.kind() == RelationKind::HasOne => {
                inverse.local_field().to_string()
            }
            _ => return Ok(()),
        };
        let inverse = self.relation(relation.related(), &inverse_field)?;

        let id_attribute = self.mapper(mapper)?.id_attribute().to_string();
        let rivals = self
            .collection(mapper)?
            .query()
            .filter_by(|record| {
                relation.get_foreign_key(record) == target && record.value(&id_attribute) != id
            })
            .map(|record| record.value(&id_attribute).clone());

        for rival in rivals {
            self.write(mapper, &rival, |record| {
                relation.set_foreign_key(record, Value::Null);
            })?;
            tracing::debug!(mapper, id = %rival, "released hasOne target to a new holder");
        }
        inverse.set_local_field(&mut self.links, target, Link::One(Some(id.clone())))?;

        Ok(())
    }

    /// Replace the related set of a hasMany field. Duplicate targets are
    /// ignored.
    ///
    /// foreign_key  → each child's key is written or cleared
    /// local_keys   → the owner's key list is replaced, in target order
    /// foreign_keys → the owner id is added to or dropped from each list
    pub fn set_link_many(
        &mut self,
        mapper: &str,
        id: &Value,
        field: &str,
        targets: Vec<Value>,
    ) -> Result<(), InternalError> {
        let relation = self.relation(mapper, field)?;
        if !relation.kind().is_many() {
            return Err(RelationError::Cardinality {
                field: field.to_string(),
                kind: relation.kind(),
            }
            .into());
        }

        let related = relation.related().to_string();
        let mut seen = BTreeSet::new();
        let targets: Vec<Value> = targets
            .into_iter()
            .filter(|target| seen.insert(target.clone()))
            .collect();
        {
            let collection = self.collection(&related)?;
            if let Some(missing) = targets.iter().find(|target| !collection.contains(target)) {
                return Err(RelationError::TargetNotFound {
                    mapper: related,
                    id: missing.clone(),
                }
                .into());
            }
        }

        if self.link(mapper, id, field)? == Link::Many(targets.clone()) {
            return Ok(());
        }

        match relation.keys().clone() {
            RelationKeys::ForeignKey(key) => {
                let current = self.resolve(&relation, mapper, id)?;
                for child in current.ids() {
                    if !targets.contains(child) {
                        self.write(&related, child, |record| {
                            relation.set_foreign_key(record, Value::Null);
                        })?;
                    }
                }
                for target in &targets {
                    if self.get(&related, target)?.value(&key) != id {
                        self.write(&related, target, |record| {
                            relation.set_foreign_key(record, id.clone());
                        })?;
                    }
                }
            }
            RelationKeys::LocalKeys(_) => {
                let keys = Value::List(targets.clone());
                self.write(mapper, id, |record| relation.set_foreign_key(record, keys))?;
            }
            RelationKeys::ForeignKeys(key) => {
                let current = self.resolve(&relation, mapper, id)?;
                for holder in current.ids() {
                    if !targets.contains(holder) {
                        self.write(&related, holder, |record| {
                            edit_key_list(record, &key, |keys| keys.retain(|k| k != id));
                        })?;
                    }
                }
                for target in &targets {
                    if !current.contains(target) {
                        self.write(&related, target, |record| {
                            edit_key_list(record, &key, |keys| keys.push(id.clone()));
                        })?;
                    }
                }
            }
        }

        let link = self.resolve(&relation, mapper, id)?;
        relation.set_local_field(&mut self.links, id, link)?;
        self.note_relink(mapper, id, field);

        Ok(())
    }

    /// Link a single record into a hasMany field, keeping existing links.
    pub fn add_link(
        &mut self,
        mapper: &str,
        id: &Value,
        field: &str,
        target: Value,
    ) -> Result<(), InternalError> {
        let mut targets = self.linked_ids(mapper, id, field)?;
        targets.push(target);

        self.set_link_many(mapper, id, field, targets)
    }

    fn note_relink(&self, mapper: &str, id: &Value, field: &str) {
        sink::record(MetricsEvent::Relink { collection: mapper });
        tracing::debug!(mapper, id = %id, field, "relinked relation field");
    }

    ///
    /// CHANGES
    ///

    /// Tracked changes of a record against its committed snapshot.
    pub fn changes(&self, mapper: &str, id: &Value) -> Result<Changes, InternalError> {
        let tracked = self.mapper(mapper)?;
        let record = self.get(mapper, id)?;

        Ok(record.changes_where(|field| tracked.is_tracked(field)))
    }

    /// Take the record's current fields as its snapshot and cancel its
    /// pending notification.
    pub fn commit(&mut self, mapper: &str, id: &Value) -> Result<(), InternalError> {
        self.collection_mut(mapper)?.update(id, Record::commit)?;
        self.scheduler.cancel(&(mapper.to_string(), id.clone()));

        Ok(())
    }

    /// Restore the record's snapshot and cancel its pending notification.
    pub fn revert(&mut self, mapper: &str, id: &Value) -> Result<(), InternalError> {
        self.write(mapper, id, Record::revert)?;
        self.scheduler.cancel(&(mapper.to_string(), id.clone()));

        Ok(())
    }

    #[must_use]
    pub fn is_pending(&self, mapper: &str, id: &Value) -> bool {
        self.scheduler.is_pending(&(mapper.to_string(), id.clone()))
    }

    /// Step the clock and deliver every notification now due. Returns the
    /// number of change events emitted.
    pub fn advance(&mut self, ticks: u64) -> usize {
        self.scheduler.clock().advance(ticks);
        let due = self.scheduler.take_due();

        self.deliver(due)
    }

    /// Deliver every pending notification regardless of due time.
    pub fn flush(&mut self) -> usize {
        let all = self.scheduler.take_all();

        self.deliver(all)
    }

    // Records whose tracked changes are empty by delivery time emit nothing.
    fn deliver(&self, keys: Vec<(String, Value)>) -> usize {
        let mut delivered = 0;

        for (mapper, id) in keys {
            let (Some(schema), Some(collection)) =
                (self.registry.get(&mapper), self.collections.get(&mapper))
            else {
                continue;
            };
            let Some(record) = collection.get(&id) else {
                continue;
            };

            let changes = record.changes_where(|field| schema.is_tracked(field));
            if changes.is_empty() {
                continue;
            }
            collection.notify_change(&id, changes);
            delivered += 1;
        }

        delivered
    }

    pub fn subscribe(
        &mut self,
        mapper: &str,
        observer: Rc<dyn CollectionObserver>,
    ) -> Result<(), InternalError> {
        self.collection_mut(mapper)?.subscribe(observer);

        Ok(())
    }

    ///
    /// DIAGNOSTICS
    ///

    /// Check index membership of every collection and that every cached
    /// belongsTo link agrees with its foreign key.
    pub fn verify_consistency(&self) -> Result<(), InternalError> {
        for collection in self.collections.values() {
            collection.verify_consistency()?;
        }

        for (key, link) in &self.links {
            let Ok(relation) = self.relation(&key.mapper, &key.field) else {
                continue;
            };
            if relation.kind() != RelationKind::BelongsTo {
                continue;
            }
            let Some(record) = self.collections.get(&key.mapper).and_then(|c| c.get(&key.id))
            else {
                continue;
            };

            let foreign_key = relation.get_foreign_key(record);
            let agrees = match link.as_one() {
                Some(linked) => linked == foreign_key,
                None => {
                    foreign_key.is_null()
                        || self
                            .collections
                            .get(relation.related())
                            .is_none_or(|related| !related.contains(foreign_key))
                }
            };

            if !agrees {
                tracing::warn!(
                    mapper = %key.mapper,
                    id = %key.id,
                    field = %key.field,
                    "cached link disagrees with its foreign key"
                );
                return Err(ConsistencyError::StaleLink {
                    mapper: key.mapper.clone(),
                    id: key.id.clone(),
                    field: key.field.clone(),
                }
                .into());
            }
        }

        Ok(())
    }
}

// Apply `edit` to the id list stored under `field`, creating it when absent.
fn edit_key_list(record: &mut Record, field: &str, edit: impl FnOnce(&mut Vec<Value>)) {
    let mut keys = record.value(field).as_list().cloned().unwrap_or_default();
    edit(&mut keys);
    record.set(field, Value::List(keys));
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.config)
            .field("mappers", &self.registry.keys().collect::<Vec<_>>())
            .field("links", &self.links.len())
            .field("pending", &self.scheduler.len())
            .finish_non_exhaustive()
    }
}
