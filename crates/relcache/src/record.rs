//! Records: open field maps with change tracking against a committed snapshot.

use crate::value::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

static NULL: Value = Value::Null;

///
/// Record
///
/// Open map of named fields. Identity lives in whichever field the owning
/// collection designates as its id attribute.
///
/// `previous` is the snapshot taken by the last `commit`; it drives
/// `changes`, `has_changes` and `revert`.
///

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
    previous: BTreeMap<String, Value>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from field pairs and commit them as its snapshot.
    pub fn from_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let fields: BTreeMap<String, Value> = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        Self {
            previous: fields.clone(),
            fields,
        }
    }

    /// Build a record from a map value (`Value::Map`); other values yield `None`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        value
            .as_map()
            .map(|entries| Self::from_fields(entries.iter().map(|(k, v)| (k.clone(), v.clone()))))
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Field value, `Null` when missing.
    #[must_use]
    pub fn value(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&NULL)
    }

    /// Resolve a dotted path: the first segment names a field, the rest walk
    /// nested maps.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        match path.split_once('.') {
            None => self.fields.get(path),
            Some((head, rest)) => self.fields.get(head)?.path(rest),
        }
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Write a field. Writing `Null` keeps the field present as null.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn unset(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge `other`'s fields over this record, keeping fields it does not name.
    pub fn merge(&mut self, other: &Self) {
        for (k, v) in &other.fields {
            self.fields.insert(k.clone(), v.clone());
        }
    }

    /// Replace every field, keeping the committed snapshot.
    pub fn replace_fields(&mut self, other: &Self) {
        self.fields.clone_from(&other.fields);
    }

    /// Committed value of a field.
    #[must_use]
    pub fn previous(&self, field: &str) -> Option<&Value> {
        self.previous.get(field)
    }

    /// Diff against the committed snapshot over every field.
    #[must_use]
    pub fn changes(&self) -> Changes {
        self.changes_where(|_| true)
    }

    /// Diff against the committed snapshot, restricted to tracked fields.
    #[must_use]
    pub fn changes_where(&self, tracked: impl Fn(&str) -> bool) -> Changes {
        let mut changes = Changes::default();

        for (field, value) in &self.fields {
            if !tracked(field) {
                continue;
            }
            match self.previous.get(field) {
                None => {
                    changes.added.insert(field.clone(), value.clone());
                }
                Some(prev) if !prev.strict_eq(value) => {
                    changes.changed.insert(field.clone(), value.clone());
                }
                Some(_) => {}
            }
        }
        for field in self.previous.keys() {
            if tracked(field) && !self.fields.contains_key(field) {
                changes.removed.insert(field.clone());
            }
        }

        changes
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changes().is_empty()
    }

    /// Take the current fields as the new snapshot.
    pub fn commit(&mut self) {
        self.previous.clone_from(&self.fields);
    }

    /// Restore the committed snapshot.
    pub fn revert(&mut self) {
        self.fields.clone_from(&self.previous);
    }

    /// Plain JSON object of the current fields.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_fields(iter)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::<String, Value>::deserialize(deserializer).map(Self::from_fields)
    }
}

///
/// Changes
///
/// Field-level diff between a record and its committed snapshot.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Changes {
    pub added: BTreeMap<String, Value>,
    pub changed: BTreeMap<String, Value>,
    pub removed: BTreeSet<String>,
}

impl Changes {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

///
/// TESTS
///
