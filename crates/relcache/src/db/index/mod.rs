//! Module: index
//! Responsibility: ordered, possibly compound key → bucket structure.
//! Does not own: record storage or multi-index coordination (see `collection`).

mod field;
mod range;

#[cfg(test)]
mod tests;

use crate::{error::ErrorClass, record::Record, value::Value};
use std::{cmp::Ordering, fmt};
use thiserror::Error as ThisError;

pub use field::{IndexField, KeyFn};
pub use range::BetweenOptions;

///
/// IndexError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum IndexError {
    #[error("between bounds must have equal length (left {left}, right {right})")]
    BoundArityMismatch { left: usize, right: usize },

    #[error("key list has {found} components but the index has {expected} fields")]
    KeyArity { expected: usize, found: usize },

    #[error("index field '{field}' produced a map value, which cannot key an index")]
    UnindexableKey { field: String },

    #[error("an index needs at least one field")]
    NoFields,
}

impl IndexError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        ErrorClass::Unsupported
    }
}

///
/// RecordRef
///
/// Bucket entry: the record id plus the hash code buckets are ordered and
/// de-duplicated by. Equality and ordering look at the hash code only.
///

#[derive(Clone, Debug)]
pub struct RecordRef {
    hash: Value,
    id: Value,
}

impl RecordRef {
    #[must_use]
    pub const fn new(hash: Value, id: Value) -> Self {
        Self { hash, id }
    }

    /// Entry whose hash code is its id.
    #[must_use]
    pub fn from_id(id: Value) -> Self {
        Self {
            hash: id.clone(),
            id,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &Value {
        &self.id
    }

    #[must_use]
    pub const fn hash(&self) -> &Value {
        &self.hash
    }
}

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for RecordRef {}

impl PartialOrd for RecordRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash.cmp(&other.hash)
    }
}

///
/// Index
///
/// Sorted multi-level index. Each level holds strictly ascending `keys` and a
/// parallel `values` array; with more than one field a value is a nested
/// level keyed by the remaining fields, otherwise a bucket of entries sharing
/// the full key, sorted by hash code.
///

#[derive(Clone)]
pub struct Index {
    fields: Vec<IndexField>,
    id_attribute: String,
    hash_code: Option<KeyFn>,
    root: IndexNode,
}

impl Index {
    #[must_use]
    pub fn new(fields: Vec<IndexField>) -> Self {
        Self {
            fields,
            id_attribute: crate::DEFAULT_ID_ATTRIBUTE.to_string(),
            hash_code: None,
            root: IndexNode::default(),
        }
    }

    #[must_use]
    pub fn with_id_attribute(mut self, id_attribute: impl Into<String>) -> Self {
        self.id_attribute = id_attribute.into();
        self
    }

    #[must_use]
    pub fn with_hash_code(mut self, hash_code: Option<KeyFn>) -> Self {
        self.hash_code = hash_code;
        self
    }

    #[must_use]
    pub fn fields(&self) -> &[IndexField] {
        &self.fields
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(IndexField::name).collect()
    }

    /// Top-level keys in ascending order.
    #[must_use]
    pub fn keys(&self) -> &[Value] {
        &self.root.keys
    }

    /// Number of entries across every bucket.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut count = 0;
        self.root.visit_all(&mut |_: &RecordRef| count += 1);
        count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.keys.is_empty()
    }

    ///
    /// KEY LIST OPERATIONS
    ///

    /// Insert `entry` under a full key list. Re-inserting an entry with the
    /// same hash code is a no-op.
    pub fn set(&mut self, keys: &[Value], entry: RecordRef) -> Result<(), IndexError> {
        self.check_full_key(keys)?;
        self.root.set(keys, entry);

        Ok(())
    }

    /// Entries under a full key list or a key prefix. Unmatched keys yield `[]`.
    pub fn get(&self, keys: &[Value]) -> Result<Vec<&RecordRef>, IndexError> {
        if keys.len() > self.fields.len() {
            return Err(IndexError::KeyArity {
                expected: self.fields.len(),
                found: keys.len(),
            });
        }

        let mut out = Vec::new();
        self.root.get(keys, &mut out);

        Ok(out)
    }

    /// Every entry in key order.
    #[must_use]
    pub fn get_all(&self) -> Vec<&RecordRef> {
        let mut out = Vec::new();
        self.root.collect_all(&mut out);
        out
    }

    /// Remove `entry` from the bucket under `keys`, pruning empty levels.
    pub fn remove(&mut self, keys: &[Value], entry: &RecordRef) -> Result<bool, IndexError> {
        self.check_full_key(keys)?;

        Ok(self.root.remove(keys, entry))
    }

    /// Depth-first traversal of every bucket in key order.
    pub fn visit_all(&self, mut f: impl FnMut(&RecordRef)) {
        self.root.visit_all(&mut f);
    }

    /// First bucket in key order, empty when the index is empty.
    #[must_use]
    pub fn peek(&self) -> &[RecordRef] {
        self.root.peek()
    }

    pub fn clear(&mut self) {
        self.root = IndexNode::default();
    }

    ///
    /// RECORD OPERATIONS
    ///

    /// Derive the key list for a record. Maps cannot key an index.
    pub fn key_for(&self, record: &Record) -> Result<Vec<Value>, IndexError> {
        self.fields
            .iter()
            .map(|field| {
                let key = field.extract(record);
                if key.is_indexable() {
                    Ok(key)
                } else {
                    Err(IndexError::UnindexableKey {
                        field: field.name().to_string(),
                    })
                }
            })
            .collect()
    }

    /// Bucket entry for a record under this index's hash code.
    #[must_use]
    pub fn entry_for(&self, record: &Record) -> RecordRef {
        let id = record.value(&self.id_attribute).clone();
        let hash = self
            .hash_code
            .as_ref()
            .map_or_else(|| id.clone(), |hash_code| hash_code(record));

        RecordRef::new(hash, id)
    }

    pub fn insert_record(&mut self, record: &Record) -> Result<(), IndexError> {
        let keys = self.key_for(record)?;
        let entry = self.entry_for(record);
        self.root.set(&keys, entry);

        Ok(())
    }

    /// Remove a record. When its current key no longer locates it (the record
    /// changed since it was indexed) every bucket is scanned.
    pub fn remove_record(&mut self, record: &Record) -> Result<bool, IndexError> {
        let entry = self.entry_for(record);
        let removed = match self.key_for(record) {
            Ok(keys) => self.root.remove(&keys, &entry),
            Err(_) => false,
        };

        Ok(removed || self.root.remove_anywhere(&entry))
    }

    /// Move a record to the bucket for its current key.
    pub fn update_record(&mut self, record: &Record) -> Result<(), IndexError> {
        let keys = self.key_for(record)?;
        let entry = self.entry_for(record);
        self.root.remove_anywhere(&entry);
        self.root.set(&keys, entry);

        Ok(())
    }

    ///
    /// PLANNED OPERATIONS
    ///
    /// Callers have already validated the key list via `key_for`.
    ///

    pub(crate) fn insert_planned(&mut self, keys: &[Value], entry: RecordRef) {
        self.root.set(keys, entry);
    }

    pub(crate) fn remove_planned(&mut self, keys: &[Value], entry: &RecordRef) -> bool {
        self.root.remove(keys, entry) || self.root.remove_anywhere(entry)
    }

    fn check_full_key(&self, keys: &[Value]) -> Result<(), IndexError> {
        if keys.len() != self.fields.len() {
            return Err(IndexError::KeyArity {
                expected: self.fields.len(),
                found: keys.len(),
            });
        }
        if let Some(pos) = keys.iter().position(|k| !k.is_indexable()) {
            return Err(IndexError::UnindexableKey {
                field: self.fields[pos].name().to_string(),
            });
        }

        Ok(())
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("fields", &self.fields)
            .field("id_attribute", &self.id_attribute)
            .field("keys", &self.root.keys.len())
            .finish_non_exhaustive()
    }
}

///
/// IndexNode
///
/// One level of an index. `keys[i]` owns `values[i]`.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct IndexNode {
    keys: Vec<Value>,
    values: Vec<Slot>,
}

#[derive(Clone, Debug)]
enum Slot {
    Bucket(Vec<RecordRef>),
    Nested(IndexNode),
}

impl Slot {
    fn collect_all<'a>(&'a self, out: &mut Vec<&'a RecordRef>) {
        match self {
            Self::Bucket(bucket) => out.extend(bucket.iter()),
            Self::Nested(node) => node.collect_all(out),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Bucket(bucket) => bucket.is_empty(),
            Self::Nested(node) => node.keys.is_empty(),
        }
    }
}

impl IndexNode {
    fn set(&mut self, keys: &[Value], entry: RecordRef) {
        let Some((key, rest)) = keys.split_first() else {
            return;
        };

        let pos = match self.keys.binary_search(key) {
            Ok(pos) => pos,
            Err(pos) => {
                let slot = if rest.is_empty() {
                    Slot::Bucket(Vec::new())
                } else {
                    Slot::Nested(Self::default())
                };
                self.keys.insert(pos, key.clone());
                self.values.insert(pos, slot);
                pos
            }
        };

        match &mut self.values[pos] {
            Slot::Bucket(bucket) => {
                if let Err(at) = bucket.binary_search(&entry) {
                    bucket.insert(at, entry);
                }
            }
            Slot::Nested(node) => node.set(rest, entry),
        }
    }

    fn get<'a>(&'a self, keys: &[Value], out: &mut Vec<&'a RecordRef>) {
        let Some((key, rest)) = keys.split_first() else {
            self.collect_all(out);
            return;
        };
        let Ok(pos) = self.keys.binary_search(key) else {
            return;
        };

        match &self.values[pos] {
            Slot::Nested(node) => node.get(rest, out),
            slot @ Slot::Bucket(_) if rest.is_empty() => slot.collect_all(out),
            Slot::Bucket(_) => {}
        }
    }

    fn collect_all<'a>(&'a self, out: &mut Vec<&'a RecordRef>) {
        for slot in &self.values {
            slot.collect_all(out);
        }
    }

    fn remove(&mut self, keys: &[Value], entry: &RecordRef) -> bool {
        let Some((key, rest)) = keys.split_first() else {
            return false;
        };
        let Ok(pos) = self.keys.binary_search(key) else {
            return false;
        };

        let removed = match &mut self.values[pos] {
            Slot::Bucket(bucket) => match bucket.binary_search(entry) {
                Ok(at) => {
                    bucket.remove(at);
                    true
                }
                Err(_) => false,
            },
            Slot::Nested(node) => node.remove(rest, entry),
        };
        if removed {
            self.prune(pos);
        }

        removed
    }

    // Full scan for an entry whose indexed key is no longer known.
    fn remove_anywhere(&mut self, entry: &RecordRef) -> bool {
        for pos in 0..self.values.len() {
            let removed = match &mut self.values[pos] {
                Slot::Bucket(bucket) => match bucket.binary_search(entry) {
                    Ok(at) => {
                        bucket.remove(at);
                        true
                    }
                    Err(_) => false,
                },
                Slot::Nested(node) => node.remove_anywhere(entry),
            };
            if removed {
                self.prune(pos);
                return true;
            }
        }

        false
    }

    fn prune(&mut self, pos: usize) {
        if self.values[pos].is_empty() {
            self.keys.remove(pos);
            self.values.remove(pos);
        }
    }

    fn visit_all(&self, f: &mut impl FnMut(&RecordRef)) {
        for slot in &self.values {
            match slot {
                Slot::Bucket(bucket) => bucket.iter().for_each(&mut *f),
                Slot::Nested(node) => node.visit_all(f),
            }
        }
    }

    fn peek(&self) -> &[RecordRef] {
        match self.values.first() {
            Some(Slot::Bucket(bucket)) => bucket,
            Some(Slot::Nested(node)) => node.peek(),
            None => &[],
        }
    }
}
