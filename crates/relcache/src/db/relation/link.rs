use crate::value::Value;
use derive_more::{Deref, IntoIterator};
use std::collections::BTreeMap;

///
/// Link
///
/// Resolved related id(s) cached for one relation field of one record.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Link {
    One(Option<Value>),
    Many(Vec<Value>),
}

impl Link {
    #[must_use]
    pub fn ids(&self) -> Vec<&Value> {
        match self {
            Self::One(id) => id.iter().collect(),
            Self::Many(ids) => ids.iter().collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, id: &Value) -> bool {
        match self {
            Self::One(linked) => linked.as_ref() == Some(id),
            Self::Many(ids) => ids.contains(id),
        }
    }

    #[must_use]
    pub const fn as_one(&self) -> Option<&Value> {
        match self {
            Self::One(id) => id.as_ref(),
            Self::Many(_) => None,
        }
    }
}

///
/// LinkKey
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct LinkKey {
    pub mapper: String,
    pub id: Value,
    pub field: String,
}

impl LinkKey {
    pub fn new(mapper: impl Into<String>, id: Value, field: impl Into<String>) -> Self {
        Self {
            mapper: mapper.into(),
            id,
            field: field.into(),
        }
    }
}

///
/// LinkTable
///
/// Side-table of resolved links. A missing entry means the link has not
/// been resolved yet, not that it is empty.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator)]
#[into_iterator(owned, ref)]
pub struct LinkTable(BTreeMap<LinkKey, Link>);

impl LinkTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn link(&self, mapper: &str, id: &Value, field: &str) -> Option<&Link> {
        self.0.get(&LinkKey::new(mapper, id.clone(), field))
    }

    pub fn cache(&mut self, mapper: &str, id: &Value, field: &str, link: Link) {
        self.0.insert(LinkKey::new(mapper, id.clone(), field), link);
    }

    pub fn forget(&mut self, mapper: &str, id: &Value, field: &str) -> Option<Link> {
        self.0.remove(&LinkKey::new(mapper, id.clone(), field))
    }

    /// Drop every cached link owned by one record.
    pub fn forget_record(&mut self, mapper: &str, id: &Value) {
        self.0
            .retain(|key, _| !(key.mapper == mapper && &key.id == id));
    }

    /// Drop the cached links of one relation field for which `stale` holds.
    pub fn forget_where(
        &mut self,
        mapper: &str,
        field: &str,
        mut stale: impl FnMut(&Value, &Link) -> bool,
    ) -> usize {
        let before = self.0.len();
        self.0.retain(|key, link| {
            !(key.mapper == mapper && key.field == field && stale(&key.id, link))
        });

        before - self.0.len()
    }

    /// Ids of records with a cached link for one relation field.
    #[must_use]
    pub fn cached_owners(&self, mapper: &str, field: &str) -> Vec<Value> {
        self.0
            .keys()
            .filter(|key| key.mapper == mapper && key.field == field)
            .map(|key| key.id.clone())
            .collect()
    }
}

///
/// TESTS
///
