//! Module: collection
//! Responsibility: the record arena plus its primary and secondary indexes.
//! Does not own: relation links or change scheduling (see `store`).

mod event;
mod plan;


use crate::{
    db::{
        index::{BetweenOptions, Index, IndexError, IndexField, KeyFn},
        query::{Filter, Query, QueryError},
    },
    error::ErrorClass,
    obs::sink::{self, MetricsEvent},
    record::{Changes, Record},
    value::Value,
};
use plan::{IndexDelta, PlanScope};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    rc::Rc,
};
use thiserror::Error as ThisError;

pub use event::{CollectionEvent, CollectionObserver};

/// Named instance method callable through `Query::map_call`.
pub type RecordMethod = Rc<dyn Fn(&Record) -> Value>;

///
/// CollectionError
///

#[derive(Debug, ThisError)]
pub enum CollectionError {
    #[error("record has no value for id attribute '{attribute}'")]
    MissingId { attribute: String },

    #[error("record {id} not found")]
    NotFound { id: Value },

    #[error("update changed the id of record {id}")]
    IdChanged { id: Value },

    #[error("index '{name}' already exists")]
    DuplicateIndex { name: String },

    #[error("index '{name}' not found")]
    UnknownIndex { name: String },

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}

impl CollectionError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::MissingId { .. } | Self::IdChanged { .. } => ErrorClass::InvariantViolation,
            Self::NotFound { .. } | Self::UnknownIndex { .. } => ErrorClass::NotFound,
            Self::DuplicateIndex { .. } => ErrorClass::Conflict,
            Self::Index(err) => err.class(),
            Self::Query(err) => err.class(),
            Self::Consistency(_) => ErrorClass::Corruption,
        }
    }
}

///
/// ConsistencyError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConsistencyError {
    #[error(
        "index '{index}' diverges from the primary index ({} missing, {} extra)",
        missing.len(),
        extra.len()
    )]
    DivergentMembership {
        index: String,
        missing: Vec<Value>,
        extra: Vec<Value>,
    },

    #[error("cached link '{mapper}.{field}' of record {id} disagrees with its foreign key")]
    StaleLink {
        mapper: String,
        id: Value,
        field: String,
    },
}

///
/// OnConflict
///
/// How `add` resolves an incoming record whose id is already present.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnConflict {
    #[default]
    Merge,
    Replace,
    Skip,
}

///
/// Collection
///
/// Owns its records, keyed by id. The primary index is keyed by the id
/// attribute; every secondary index holds exactly the primary's record set.
///

pub struct Collection {
    name: String,
    id_attribute: String,
    hash_code: Option<KeyFn>,
    on_conflict: OnConflict,
    records: BTreeMap<Value, Record>,
    primary: Index,
    indexes: BTreeMap<String, Index>,
    methods: BTreeMap<String, RecordMethod>,
    observers: Vec<Rc<dyn CollectionObserver>>,
}

impl Collection {
    #[must_use]
    pub fn new(name: impl Into<String>, id_attribute: impl Into<String>) -> Self {
        let id_attribute = id_attribute.into();
        let primary = Index::new(vec![IndexField::field(id_attribute.clone())])
            .with_id_attribute(&id_attribute);

        Self {
            name: name.into(),
            id_attribute,
            hash_code: None,
            on_conflict: OnConflict::default(),
            records: BTreeMap::new(),
            primary,
            indexes: BTreeMap::new(),
            methods: BTreeMap::new(),
            observers: Vec::new(),
        }
    }

    /// Bucket identity for every index of this collection. Must be set before
    /// records are added.
    #[must_use]
    pub fn with_hash_code(mut self, hash_code: Option<KeyFn>) -> Self {
        self.primary = self.primary.with_hash_code(hash_code.clone());
        self.hash_code = hash_code;
        self
    }

    #[must_use]
    pub const fn with_on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.on_conflict = on_conflict;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    #[must_use]
    pub const fn on_conflict(&self) -> OnConflict {
        self.on_conflict
    }

    #[must_use]
    pub fn record_id<'r>(&self, record: &'r Record) -> &'r Value {
        record.value(&self.id_attribute)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &Value) -> bool {
        self.records.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &Value) -> Option<&Record> {
        self.records.get(id)
    }

    /// Ids in primary index order.
    #[must_use]
    pub fn ids(&self) -> Vec<Value> {
        self.primary.get_all().into_iter().map(|entry| entry.id().clone()).collect()
    }

    #[must_use]
    pub const fn primary(&self) -> &Index {
        &self.primary
    }

    #[must_use]
    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    pub fn index_names(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(String::as_str)
    }

    pub(crate) fn records(&self) -> &BTreeMap<Value, Record> {
        &self.records
    }

    ///
    /// MEMBERSHIP
    ///

    /// Add one record under the collection's conflict policy.
    pub fn insert(&mut self, record: Record) -> Result<Value, CollectionError> {
        let on_conflict = self.on_conflict;
        let mut ids = self.add([record], on_conflict)?;

        ids.pop()
            .ok_or_else(|| CollectionError::MissingId {
                attribute: self.id_attribute.clone(),
            })
    }

    /// Add records, resolving id conflicts per `on_conflict`. New records get
    /// their current fields committed as snapshot. The batch is
    /// all-or-nothing: every resulting record is keyed for every index before
    /// any index is written.
    ///
    /// Returns the id of every input record, skipped ones included.
    pub fn add(
        &mut self,
        records: impl IntoIterator<Item = Record>,
        on_conflict: OnConflict,
    ) -> Result<Vec<Value>, CollectionError> {
        let mut ids = Vec::new();
        let mut staged: Vec<(Value, Record)> = Vec::new();
        let mut positions: BTreeMap<Value, usize> = BTreeMap::new();

        for mut record in records {
            let id = record.value(&self.id_attribute).clone();
            if id.is_null() {
                return Err(CollectionError::MissingId {
                    attribute: self.id_attribute.clone(),
                });
            }
            ids.push(id.clone());

            let slot = positions.get(&id).copied();
            let base = slot
                .map(|pos| &staged[pos].1)
                .or_else(|| self.records.get(&id));

            let next = match (base, on_conflict) {
                (None, _) => {
                    record.commit();
                    record
                }
                (Some(_), OnConflict::Skip) => continue,
                (Some(existing), OnConflict::Merge) => {
                    let mut merged = existing.clone();
                    merged.merge(&record);
                    merged
                }
                (Some(existing), OnConflict::Replace) => {
                    let mut replaced = existing.clone();
                    replaced.replace_fields(&record);
                    replaced
                }
            };

            match slot {
                Some(pos) => staged[pos].1 = next,
                None => {
                    positions.insert(id.clone(), staged.len());
                    staged.push((id, next));
                }
            }
        }

        let plans = staged
            .iter()
            .map(|(id, next)| self.plan_mutation(self.records.get(id), Some(next), PlanScope::All))
            .collect::<Result<Vec<_>, _>>()?;

        let mut added = Vec::new();
        let mut delta = IndexDelta::default();
        for ((id, next), plan) in staged.into_iter().zip(plans) {
            let applied = self.apply_plan(plan);
            delta.inserts += applied.inserts;
            delta.removes += applied.removes;
            if self.records.insert(id.clone(), next).is_none() {
                added.push(id);
            }
        }

        self.record_index_delta(delta);
        if !added.is_empty() {
            sink::record(MetricsEvent::RecordsAdded {
                collection: &self.name,
                count: added.len() as u64,
            });
            self.emit(&CollectionEvent::Add {
                collection: self.name.clone(),
                ids: added,
            });
        }

        Ok(ids)
    }

    /// Mutate a record and move it in every index. The mutation must keep
    /// the id; a planning failure leaves the record and every index
    /// untouched. Returns the record as it was before the mutation.
    pub fn update(
        &mut self,
        id: &Value,
        mutate: impl FnOnce(&mut Record),
    ) -> Result<Record, CollectionError> {
        let current = self
            .records
            .get(id)
            .ok_or_else(|| CollectionError::NotFound { id: id.clone() })?;

        let mut next = current.clone();
        mutate(&mut next);
        if !next.value(&self.id_attribute).strict_eq(id) {
            return Err(CollectionError::IdChanged { id: id.clone() });
        }

        let plan = self.plan_mutation(Some(current), Some(&next), PlanScope::All)?;
        let delta = self.apply_plan(plan);
        self.record_index_delta(delta);

        self.records
            .get_mut(id)
            .map(|slot| std::mem::replace(slot, next))
            .ok_or_else(|| CollectionError::NotFound { id: id.clone() })
    }

    /// Re-key one record in one secondary index.
    pub fn update_index(&mut self, id: &Value, name: &str) -> Result<(), CollectionError> {
        if !self.indexes.contains_key(name) {
            return Err(CollectionError::UnknownIndex {
                name: name.to_string(),
            });
        }
        self.resync(id, PlanScope::Only(name))
    }

    /// Re-key one record in the primary and every secondary index.
    pub fn update_indexes(&mut self, id: &Value) -> Result<(), CollectionError> {
        self.resync(id, PlanScope::All)
    }

    fn resync(&mut self, id: &Value, scope: PlanScope<'_>) -> Result<(), CollectionError> {
        let record = self
            .records
            .get(id)
            .ok_or_else(|| CollectionError::NotFound { id: id.clone() })?;

        let plan = self
            .plan_resync(record, scope)
            .then(self.plan_mutation(None, Some(record), scope)?);
        let delta = self.apply_plan(plan);
        self.record_index_delta(delta);

        Ok(())
    }

    pub fn remove(&mut self, id: &Value) -> Result<Record, CollectionError> {
        let record = self
            .records
            .remove(id)
            .ok_or_else(|| CollectionError::NotFound { id: id.clone() })?;

        let plan = self.plan_removal(&record);
        let delta = self.apply_plan(plan);
        self.record_index_delta(delta);

        sink::record(MetricsEvent::RecordsRemoved {
            collection: &self.name,
            count: 1,
        });
        self.emit(&CollectionEvent::Remove {
            collection: self.name.clone(),
            ids: vec![id.clone()],
        });

        Ok(record)
    }

    /// Remove every record matching `filter`, in match order.
    pub fn remove_all(&mut self, filter: &Filter) -> Result<Vec<Record>, CollectionError> {
        let ids: Vec<Value> = self
            .query()
            .filter(filter)
            .map(|record| self.record_id(record).clone());

        let mut removed = Vec::with_capacity(ids.len());
        let mut delta = IndexDelta::default();
        for id in &ids {
            if let Some(record) = self.records.remove(id) {
                let applied = self.apply_plan(self.plan_removal(&record));
                delta.inserts += applied.inserts;
                delta.removes += applied.removes;
                removed.push(record);
            }
        }

        self.record_index_delta(delta);
        if !removed.is_empty() {
            sink::record(MetricsEvent::RecordsRemoved {
                collection: &self.name,
                count: removed.len() as u64,
            });
            self.emit(&CollectionEvent::Remove {
                collection: self.name.clone(),
                ids,
            });
        }

        Ok(removed)
    }

    /// Drop every record from the arena and every index.
    pub fn clear(&mut self) {
        let ids = self.ids();
        self.records.clear();
        self.primary.clear();
        for index in self.indexes.values_mut() {
            index.clear();
        }

        if !ids.is_empty() {
            sink::record(MetricsEvent::RecordsRemoved {
                collection: &self.name,
                count: ids.len() as u64,
            });
            self.emit(&CollectionEvent::Remove {
                collection: self.name.clone(),
                ids,
            });
        }
    }

    ///
    /// INDEXES
    ///

    /// Build a secondary index and back-fill it from every record. Nothing is
    /// installed when any record fails to key.
    pub fn create_index(
        &mut self,
        name: impl Into<String>,
        fields: Vec<IndexField>,
    ) -> Result<(), CollectionError> {
        let name = name.into();
        if self.indexes.contains_key(&name) {
            return Err(CollectionError::DuplicateIndex { name });
        }
        if fields.is_empty() {
            return Err(IndexError::NoFields.into());
        }

        let mut index = Index::new(fields)
            .with_id_attribute(&self.id_attribute)
            .with_hash_code(self.hash_code.clone());
        for record in self.records.values() {
            index.insert_record(record)?;
        }

        tracing::debug!(
            collection = %self.name,
            index = %name,
            records = self.records.len(),
            "created secondary index"
        );
        self.record_index_delta(IndexDelta {
            inserts: self.records.len() as u64,
            removes: 0,
        });
        self.indexes.insert(name, index);

        Ok(())
    }

    /// Drop a secondary index. The primary index cannot be dropped.
    pub fn drop_index(&mut self, name: &str) -> Option<Index> {
        let index = self.indexes.remove(name)?;
        tracing::debug!(collection = %self.name, index = %name, "dropped secondary index");

        Some(index)
    }

    /// Check that the primary index, the arena, and every secondary index
    /// hold the same record set.
    pub fn verify_consistency(&self) -> Result<(), ConsistencyError> {
        let arena: BTreeSet<&Value> = self.records.keys().collect();

        let check = |name: &str, index: &Index| {
            let mut members = BTreeSet::new();
            index.visit_all(|entry| {
                members.insert(entry.id().clone());
            });

            let missing: Vec<Value> = arena
                .iter()
                .filter(|id| !members.contains(**id))
                .map(|id| (*id).clone())
                .collect();
            let extra: Vec<Value> = members
                .iter()
                .filter(|id| !arena.contains(id))
                .cloned()
                .collect();

            if missing.is_empty() && extra.is_empty() {
                Ok(())
            } else {
                tracing::warn!(
                    collection = %self.name,
                    index = %name,
                    missing = missing.len(),
                    extra = extra.len(),
                    "index membership diverges from the record arena"
                );
                Err(ConsistencyError::DivergentMembership {
                    index: name.to_string(),
                    missing,
                    extra,
                })
            }
        };

        check("primary", &self.primary)?;
        for (name, index) in &self.indexes {
            check(name, index)?;
        }

        Ok(())
    }

    ///
    /// METHODS
    ///

    pub fn define_method(
        &mut self,
        name: impl Into<String>,
        method: impl Fn(&Record) -> Value + 'static,
    ) {
        self.methods.insert(name.into(), Rc::new(method));
    }

    pub(crate) fn method(&self, name: &str) -> Option<&RecordMethod> {
        self.methods.get(name)
    }

    ///
    /// QUERIES
    ///

    #[must_use]
    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }

    pub fn find(&self, keys: &[Value], index: Option<&str>) -> Result<Vec<&Record>, QueryError> {
        Ok(self.query().get(keys, index)?.run())
    }

    pub fn get_all(
        &self,
        key_lists: &[Vec<Value>],
        index: Option<&str>,
    ) -> Result<Vec<&Record>, QueryError> {
        Ok(self.query().get_all(key_lists, index)?.run())
    }

    pub fn between(
        &self,
        left: &[Value],
        right: &[Value],
        index: Option<&str>,
        opts: &BetweenOptions,
    ) -> Result<Vec<&Record>, QueryError> {
        Ok(self.query().between(left, right, index, opts)?.run())
    }

    #[must_use]
    pub fn filter(&self, filter: &Filter) -> Vec<&Record> {
        self.query().filter(filter).run()
    }

    #[must_use]
    pub fn skip(&self, count: usize) -> Vec<&Record> {
        self.query().skip(count).run()
    }

    #[must_use]
    pub fn limit(&self, count: usize) -> Vec<&Record> {
        self.query().limit(count).run()
    }

    pub fn for_each(&self, f: impl FnMut(&Record)) {
        self.query().for_each(f);
    }

    pub fn map<T>(&self, f: impl FnMut(&Record) -> T) -> Vec<T> {
        self.query().map(f)
    }

    pub fn reduce<T>(&self, init: T, f: impl FnMut(T, &Record) -> T) -> T {
        self.query().reduce(init, f)
    }

    pub fn map_call(&self, method: &str) -> Result<Vec<Value>, QueryError> {
        self.query().map_call(method)
    }

    ///
    /// EVENTS
    ///

    pub fn subscribe(&mut self, observer: Rc<dyn CollectionObserver>) {
        self.observers.push(observer);
    }

    /// Re-emit a member record's change set. Unknown ids are ignored.
    pub fn notify_change(&self, id: &Value, changes: Changes) {
        if !self.records.contains_key(id) {
            return;
        }

        sink::record(MetricsEvent::Notification {
            collection: &self.name,
        });
        self.emit(&CollectionEvent::Change {
            collection: self.name.clone(),
            id: id.clone(),
            changes,
        });
    }

    fn emit(&self, event: &CollectionEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }

    fn record_index_delta(&self, delta: IndexDelta) {
        if delta.inserts == 0 && delta.removes == 0 {
            return;
        }

        sink::record(MetricsEvent::IndexDelta {
            collection: &self.name,
            inserts: delta.inserts,
            removes: delta.removes,
        });
    }

    ///
    /// EXPORT
    ///

    /// Records as a JSON array in primary index order.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.primary
                .get_all()
                .into_iter()
                .filter_map(|entry| self.records.get(entry.id()))
                .map(Record::to_json)
                .collect(),
        )
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("id_attribute", &self.id_attribute)
            .field("records", &self.records.len())
            .field("indexes", &self.indexes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
