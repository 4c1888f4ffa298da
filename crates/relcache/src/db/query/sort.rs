use super::QueryError;
use crate::{record::Record, value::Value};
use std::cmp::Ordering;

static NULL: Value = Value::Null;

///
/// Direction
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if raw.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }
}

///
/// OrderBy
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    /// Parse object-notation ordering: a bare field name, a `[field, dir]`
    /// pair, or a list of either.
    pub fn parse_list(value: &Value) -> Result<Vec<Self>, QueryError> {
        match value {
            Value::Text(field) => Ok(vec![Self::asc(field.clone())]),
            Value::List(items) if Self::is_pair(items) => Ok(vec![Self::parse_one(value)?]),
            Value::List(items) => items.iter().map(Self::parse_one).collect(),
            other => Err(invalid(other)),
        }
    }

    fn parse_one(value: &Value) -> Result<Self, QueryError> {
        match value {
            Value::Text(field) => Ok(Self::asc(field.clone())),
            Value::List(items) => match items.as_slice() {
                [Value::Text(field)] => Ok(Self::asc(field.clone())),
                [Value::Text(field), Value::Text(dir)] => Direction::parse(dir)
                    .map(|direction| Self {
                        field: field.clone(),
                        direction,
                    })
                    .ok_or_else(|| invalid(value)),
                _ => Err(invalid(value)),
            },
            other => Err(invalid(other)),
        }
    }

    fn is_pair(items: &[Value]) -> bool {
        matches!(items, [Value::Text(_), Value::Text(dir)] if Direction::parse(dir).is_some())
    }
}

fn invalid(value: &Value) -> QueryError {
    QueryError::InvalidFilter {
        reason: format!("unsupported orderBy entry {value}"),
    }
}

/// Stable sort. Text compares upper-cased; ties fall through to the next
/// ordering pair.
pub(super) fn sort_records(records: &mut Vec<&Record>, order: &[OrderBy]) {
    if order.is_empty() {
        return;
    }

    let mut keyed: Vec<(Vec<Value>, &Record)> = records
        .drain(..)
        .map(|record| {
            let keys = order
                .iter()
                .map(|o| record.get_path(&o.field).unwrap_or(&NULL).upper_cased())
                .collect();
            (keys, record)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| {
        for ((left, right), o) in a.iter().zip(b).zip(order) {
            let ord = match o.direction {
                Direction::Asc => left.cmp(right),
                Direction::Desc => right.cmp(left),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    records.extend(keyed.into_iter().map(|(_, record)| record));
}
