use super::QueryError;
use crate::value::Value;
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;

///
/// LikeFlags
///
/// Trailing characters of a `like` operator. `i`, `m` and `s` map to regex
/// flags; `g`, `y` and `u` are accepted and have no effect.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LikeFlags {
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_all: bool,
}

impl LikeFlags {
    fn parse(operator: &str, flags: &str) -> Result<Self, QueryError> {
        let mut parsed = Self::default();
        for flag in flags.chars() {
            match flag {
                'i' => parsed.case_insensitive = true,
                'm' => parsed.multi_line = true,
                's' => parsed.dot_all = true,
                'g' | 'y' | 'u' => {}
                _ => {
                    return Err(QueryError::UnknownOperator {
                        operator: operator.to_string(),
                    });
                }
            }
        }

        Ok(parsed)
    }
}

///
/// Operator
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operator {
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    NotContains,
    IsectEmpty,
    IsectNotEmpty,
    Like(LikeFlags),
    NotLike(LikeFlags),
}

impl Operator {
    /// Parse an operator name. A leading `|` marks an OR clause and is
    /// returned as the second element.
    pub fn parse(raw: &str) -> Result<(Self, bool), QueryError> {
        let (name, or) = match raw.strip_prefix('|') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };

        if let Some(flags) = name.strip_prefix("notLike") {
            return Ok((Self::NotLike(LikeFlags::parse(raw, flags)?), or));
        }
        if let Some(flags) = name.strip_prefix("like") {
            return Ok((Self::Like(LikeFlags::parse(raw, flags)?), or));
        }

        let op = match name {
            "==" | "=" => Self::Eq,
            "===" => Self::StrictEq,
            "!=" => Self::Ne,
            "!==" => Self::StrictNe,
            ">" => Self::Gt,
            ">=" => Self::Gte,
            "<" => Self::Lt,
            "<=" => Self::Lte,
            "in" => Self::In,
            "notIn" => Self::NotIn,
            "contains" => Self::Contains,
            "notContains" => Self::NotContains,
            "isectEmpty" => Self::IsectEmpty,
            "isectNotEmpty" => Self::IsectNotEmpty,
            _ => {
                return Err(QueryError::UnknownOperator {
                    operator: raw.to_string(),
                });
            }
        };

        Ok((op, or))
    }

    /// Compile the predicate of a `like`/`notLike` operator; other operators
    /// need no pattern.
    pub(super) fn compile(self, predicate: &Value) -> Result<Option<Regex>, QueryError> {
        let (Self::Like(flags) | Self::NotLike(flags)) = self else {
            return Ok(None);
        };
        let Some(pattern) = predicate.to_match_text() else {
            return Err(QueryError::InvalidPattern {
                pattern: predicate.to_string(),
                reason: "like patterns must be text".to_string(),
            });
        };

        compile_like(&pattern, flags).map(Some)
    }

    /// Evaluate against a record's field value. `pattern` is the regex
    /// compiled for like operators.
    pub(super) fn matches(self, value: &Value, predicate: &Value, pattern: Option<&Regex>) -> bool {
        match self {
            Self::Eq => value.loose_eq(predicate),
            Self::StrictEq => value.strict_eq(predicate),
            Self::Ne => !value.loose_eq(predicate),
            Self::StrictNe => !value.strict_eq(predicate),
            Self::Gt => value.loose_cmp(predicate) == Some(Ordering::Greater),
            Self::Gte => matches!(
                value.loose_cmp(predicate),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Lt => value.loose_cmp(predicate) == Some(Ordering::Less),
            Self::Lte => matches!(
                value.loose_cmp(predicate),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::In => contains(predicate, value),
            Self::NotIn => !contains(predicate, value),
            Self::Contains => contains(value, predicate),
            Self::NotContains => !contains(value, predicate),
            Self::IsectEmpty => !intersects(value, predicate),
            Self::IsectNotEmpty => intersects(value, predicate),
            Self::Like(_) => like(value, pattern),
            Self::NotLike(_) => !like(value, pattern),
        }
    }
}

/// `needle` is an element of list `haystack`, or a substring of text
/// `haystack`. Element comparison is strict.
fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::List(items) => items.iter().any(|item| item.strict_eq(needle)),
        Value::Text(text) => needle
            .to_match_text()
            .is_some_and(|needle| text.contains(needle.as_str())),
        _ => false,
    }
}

fn intersects(left: &Value, right: &Value) -> bool {
    let as_slice = |value: &Value| -> Vec<Value> {
        match value {
            Value::Null => Vec::new(),
            Value::List(items) => items.clone(),
            other => vec![other.clone()],
        }
    };
    let right = as_slice(right);

    as_slice(left)
        .iter()
        .any(|item| right.iter().any(|other| other.strict_eq(item)))
}

fn like(value: &Value, pattern: Option<&Regex>) -> bool {
    match (value.to_match_text(), pattern) {
        (Some(text), Some(pattern)) => pattern.is_match(&text),
        _ => false,
    }
}

/// Anchored regex for a like pattern: `%` matches any run, `_` any single
/// character, everything else literally.
fn compile_like(pattern: &str, flags: LikeFlags) -> Result<Regex, QueryError> {
    let mut source = String::with_capacity(pattern.len() + 2);
    source.push('^');
    let mut buf = [0; 4];
    for ch in pattern.chars() {
        match ch {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    source.push('$');

    RegexBuilder::new(&source)
        .case_insensitive(flags.case_insensitive)
        .multi_line(flags.multi_line)
        .dot_matches_new_line(flags.dot_all)
        .build()
        .map_err(|err| QueryError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })
}
