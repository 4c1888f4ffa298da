//! Module: query
//! Responsibility: single-use cursors over one collection.
//!
//! A query is seeded at most once (`get`, `get_all`, `between`); every later
//! step transforms the seeded records. An unseeded query reads the whole
//! collection in primary order.

mod filter;
mod operator;
mod sort;

#[cfg(test)]
mod tests;

use crate::{
    db::{
        collection::Collection,
        index::{BetweenOptions, Index, IndexError, RecordRef},
    },
    error::ErrorClass,
    obs::sink::{self, MetricsEvent},
    record::Record,
    value::Value,
};
use thiserror::Error as ThisError;

pub use filter::{Clause, Filter};
pub use operator::{LikeFlags, Operator};
pub use sort::{Direction, OrderBy};

///
/// QueryError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QueryError {
    #[error("query data is already seeded; '{method}' must be the first step")]
    AlreadySeeded { method: &'static str },

    #[error("'{option}' expects a non-negative whole number, got {value}")]
    NotNumeric { option: String, value: Value },

    #[error("unknown filter operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("invalid like pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("index '{name}' not found")]
    UnknownIndex { name: String },

    #[error("method '{name}' not found")]
    UnknownMethod { name: String },

    #[error("invalid filter: {reason}")]
    InvalidFilter { reason: String },

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl QueryError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::AlreadySeeded { .. } => ErrorClass::InvariantViolation,
            Self::UnknownIndex { .. } | Self::UnknownMethod { .. } => ErrorClass::NotFound,
            Self::NotNumeric { .. }
            | Self::UnknownOperator { .. }
            | Self::InvalidPattern { .. }
            | Self::InvalidFilter { .. } => ErrorClass::Unsupported,
            Self::Index(err) => err.class(),
        }
    }
}

///
/// Query
///

pub struct Query<'a> {
    collection: &'a Collection,
    data: Option<Vec<&'a Record>>,
    scanned: usize,
}

impl<'a> Query<'a> {
    pub(crate) const fn new(collection: &'a Collection) -> Self {
        Self {
            collection,
            data: None,
            scanned: 0,
        }
    }

    ///
    /// SEEDING
    ///

    /// Records under a key list (or key prefix) of `index`; `None` means the
    /// primary index.
    pub fn get(mut self, keys: &[Value], index: Option<&str>) -> Result<Self, QueryError> {
        self.ensure_unseeded("get")?;
        let refs = self.resolve(index)?.get(keys)?;
        self.seed(refs);

        Ok(self)
    }

    /// Concatenated results of `get` for each key list, in list order.
    pub fn get_all(
        mut self,
        key_lists: &[Vec<Value>],
        index: Option<&str>,
    ) -> Result<Self, QueryError> {
        self.ensure_unseeded("get_all")?;
        let index = self.resolve(index)?;

        let mut refs = Vec::new();
        for keys in key_lists {
            refs.extend(index.get(keys)?);
        }
        self.seed(refs);

        Ok(self)
    }

    pub fn between(
        mut self,
        left: &[Value],
        right: &[Value],
        index: Option<&str>,
        opts: &BetweenOptions,
    ) -> Result<Self, QueryError> {
        self.ensure_unseeded("between")?;
        let refs = self.resolve(index)?.between(left, right, opts)?;
        self.seed(refs);

        Ok(self)
    }

    ///
    /// TRANSFORMS
    ///

    /// Keep matching records, then apply the filter's ordering and paging.
    #[must_use]
    pub fn filter(mut self, filter: &Filter) -> Self {
        self.data().retain(|record| filter.matches(record));
        self = self.sort(filter.ordering());

        let (offset, limit) = filter.paging();
        if let Some(offset) = offset {
            self = self.skip(offset);
        }
        if let Some(limit) = limit {
            self = self.limit(limit);
        }

        self
    }

    #[must_use]
    pub fn filter_by(mut self, predicate: impl Fn(&Record) -> bool) -> Self {
        self.data().retain(|record| predicate(*record));
        self
    }

    #[must_use]
    pub fn sort(mut self, order: &[OrderBy]) -> Self {
        sort::sort_records(self.data(), order);
        self
    }

    #[must_use]
    pub fn skip(mut self, count: usize) -> Self {
        let data = self.data();
        let count = count.min(data.len());
        data.drain(..count);
        self
    }

    #[must_use]
    pub fn limit(mut self, count: usize) -> Self {
        self.data().truncate(count);
        self
    }

    ///
    /// TERMINALS
    ///

    #[must_use]
    pub fn run(mut self) -> Vec<&'a Record> {
        let data = std::mem::take(self.data());
        self.finish(data.len());
        data
    }

    #[must_use]
    pub fn count(self) -> usize {
        self.run().len()
    }

    pub fn for_each(self, mut f: impl FnMut(&Record)) {
        for record in self.run() {
            f(record);
        }
    }

    pub fn map<T>(self, f: impl FnMut(&Record) -> T) -> Vec<T> {
        self.run().into_iter().map(f).collect()
    }

    pub fn reduce<T>(self, init: T, mut f: impl FnMut(T, &Record) -> T) -> T {
        self.run()
            .into_iter()
            .fold(init, |acc, record| f(acc, record))
    }

    /// Invoke a named instance method on every record.
    pub fn map_call(self, method: &str) -> Result<Vec<Value>, QueryError> {
        let method = self
            .collection
            .method(method)
            .cloned()
            .ok_or_else(|| QueryError::UnknownMethod {
                name: method.to_string(),
            })?;

        Ok(self.run().into_iter().map(|record| method(record)).collect())
    }

    ///
    /// INTERNALS
    ///

    fn ensure_unseeded(&self, method: &'static str) -> Result<(), QueryError> {
        if self.data.is_some() {
            return Err(QueryError::AlreadySeeded { method });
        }

        Ok(())
    }

    fn resolve(&self, index: Option<&str>) -> Result<&'a Index, QueryError> {
        let collection = self.collection;
        match index {
            None => Ok(collection.primary()),
            Some(name) => collection
                .index(name)
                .ok_or_else(|| QueryError::UnknownIndex {
                    name: name.to_string(),
                }),
        }
    }

    fn seed(&mut self, refs: Vec<&'a RecordRef>) {
        let collection = self.collection;
        let records = collection.records();
        let data: Vec<&'a Record> = refs
            .into_iter()
            .filter_map(|entry| records.get(entry.id()))
            .collect();

        self.scanned = data.len();
        self.data = Some(data);
    }

    fn data(&mut self) -> &mut Vec<&'a Record> {
        if self.data.is_none() {
            let collection = self.collection;
            let refs = collection.primary().get_all();
            self.seed(refs);
        }

        self.data.get_or_insert_with(Vec::new)
    }

    fn finish(&self, returned: usize) {
        sink::record(MetricsEvent::QueryRun {
            collection: self.collection.name(),
            scanned: self.scanned as u64,
            returned: returned as u64,
        });
    }
}
