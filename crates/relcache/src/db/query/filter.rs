use super::{
    QueryError,
    operator::Operator,
    sort::{Direction, OrderBy},
};
use crate::{record::Record, value::Value};
use regex::Regex;

static NULL: Value = Value::Null;

///
/// Clause
///
/// One `field op predicate` test. `or` clauses combine with the running
/// result by OR instead of AND.
///

#[derive(Clone, Debug)]
pub struct Clause {
    field: String,
    op: Operator,
    predicate: Value,
    or: bool,
    pattern: Option<Regex>,
}

impl Clause {
    /// Build a clause; `op` may carry a leading `|`.
    pub fn new(
        field: impl Into<String>,
        op: &str,
        predicate: impl Into<Value>,
    ) -> Result<Self, QueryError> {
        let (op, or) = Operator::parse(op)?;
        let predicate = predicate.into();
        let pattern = op.compile(&predicate)?;

        Ok(Self {
            field: field.into(),
            op,
            predicate,
            or,
            pattern,
        })
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.op
    }

    #[must_use]
    pub const fn is_or(&self) -> bool {
        self.or
    }

    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        let value = record.get_path(&self.field).unwrap_or(&NULL);

        self.op
            .matches(value, &self.predicate, self.pattern.as_ref())
    }
}

///
/// Filter
///
/// Where-clauses plus ordering and paging, applied in that order.
///
/// Object notation:
///
/// ```text
/// { "where": { "age": { ">=": 18, "|<": 5 } },
///   "role": "admin",
///   "orderBy": [["age", "DESC"], "name"],
///   "skip": 10, "limit": 5 }
/// ```
///
/// Keys other than `skip`, `offset`, `where`, `limit`, `orderBy` and `sort`
/// are shorthand for an `==` clause.
///

#[derive(Clone, Debug, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
    order_by: Vec<OrderBy>,
    offset: Option<usize>,
    limit: Option<usize>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// AND (or, with a `|`-prefixed operator, OR) a clause onto the filter.
    pub fn clause(
        mut self,
        field: impl Into<String>,
        op: &str,
        predicate: impl Into<Value>,
    ) -> Result<Self, QueryError> {
        self.clauses.push(Clause::new(field, op, predicate)?);
        Ok(self)
    }

    /// AND a loose-equality clause onto the filter.
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, predicate: impl Into<Value>) -> Self {
        self.clauses.push(Clause {
            field: field.into(),
            op: Operator::Eq,
            predicate: predicate.into(),
            or: false,
            pattern: None,
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    #[must_use]
    pub fn ordering(&self) -> &[OrderBy] {
        &self.order_by
    }

    #[must_use]
    pub const fn paging(&self) -> (Option<usize>, Option<usize>) {
        (self.offset, self.limit)
    }

    /// Fold the clauses left to right. The first clause seeds the result; an
    /// empty filter matches everything.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        let mut result: Option<bool> = None;

        for clause in &self.clauses {
            result = Some(match result {
                None => clause.matches(record),
                Some(acc) if clause.or => acc || clause.matches(record),
                Some(acc) => acc && clause.matches(record),
            });
        }

        result.unwrap_or(true)
    }

    // A field entry is either an operator map or a bare value meaning `==`.
    // A `|` before the field name ORs its first clause.
    fn push_field(&mut self, field: &str, entry: &Value) -> Result<(), QueryError> {
        let (field, or_field) = match field.strip_prefix('|') {
            Some(rest) => (rest, true),
            None => (field, false),
        };

        match entry {
            Value::Map(ops) => {
                for (i, (op, predicate)) in ops.iter().enumerate() {
                    let mut clause = Clause::new(field, op, predicate.clone())?;
                    clause.or |= or_field && i == 0;
                    self.clauses.push(clause);
                }
            }
            other => {
                let mut clause = Clause::new(field, "==", other.clone())?;
                clause.or = or_field;
                self.clauses.push(clause);
            }
        }

        Ok(())
    }
}

fn count(option: &str, value: &Value) -> Result<usize, QueryError> {
    value.as_count().ok_or_else(|| QueryError::NotNumeric {
        option: option.to_string(),
        value: value.clone(),
    })
}

impl TryFrom<&Value> for Filter {
    type Error = QueryError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let Some(entries) = value.as_map() else {
            return Err(QueryError::InvalidFilter {
                reason: format!("filter must be an object, got {value}"),
            });
        };

        let mut filter = Self::new();
        for (key, entry) in entries {
            match key.as_str() {
                "skip" | "offset" => filter.offset = Some(count(key, entry)?),
                "limit" => filter.limit = Some(count(key, entry)?),
                "orderBy" | "sort" => filter.order_by = OrderBy::parse_list(entry)?,
                "where" => {
                    let Some(fields) = entry.as_map() else {
                        return Err(QueryError::InvalidFilter {
                            reason: format!("where must be an object, got {entry}"),
                        });
                    };
                    for (field, clause) in fields {
                        filter.push_field(field, clause)?;
                    }
                }
                field => {
                    let mut clause = Clause::new(field, "==", entry.clone())?;
                    if let Some(rest) = field.strip_prefix('|') {
                        clause.field = rest.to_string();
                        clause.or = true;
                    }
                    filter.clauses.push(clause);
                }
            }
        }

        Ok(filter)
    }
}

impl TryFrom<&serde_json::Value> for Filter {
    type Error = QueryError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        Self::try_from(&Value::from(value.clone()))
    }
}
