use super::Value;
use std::cmp::Ordering;

/// Canonical total order over values.
///
/// Null < Bool < number < Text < List < Map. Int and Float share one numeric
/// rank and compare exactly by magnitude; an Int and an equal Float are
/// equal, and so are both float zeros. NaN sorts after every number, or
/// before every number when its sign bit is set.
pub(super) fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    let rank = left.rank().cmp(&right.rank());
    if rank != Ordering::Equal {
        return rank;
    }

    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => float_cmp(*a, *b),
        (Value::Int(a), Value::Float(b)) => int_float_cmp(*a, *b),
        (Value::Float(a), Value::Int(b)) => int_float_cmp(*b, *a).reverse(),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::List(a), Value::List(b)) => a.cmp(b),
        (Value::Map(a), Value::Map(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

#[allow(clippy::float_cmp)]
fn float_cmp(a: f64, b: f64) -> Ordering {
    if a == b {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

// 2^63, the first float above every i64.
const I64_END: f64 = 9_223_372_036_854_775_808.0;

// Exact: no i64 -> f64 rounding, so the order stays transitive above 2^53.
#[allow(clippy::cast_possible_truncation)]
fn int_float_cmp(int: i64, float: f64) -> Ordering {
    if float.is_nan() {
        return if float.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if float >= I64_END {
        return Ordering::Less;
    }
    if float < -I64_END {
        return Ordering::Greater;
    }

    let whole = float.trunc();
    let fraction = float - whole;
    int.cmp(&(whole as i64)).then(if fraction > 0.0 {
        Ordering::Less
    } else if fraction < 0.0 {
        Ordering::Greater
    } else {
        Ordering::Equal
    })
}

impl Value {
    /// Strict equality: same family and equal content. Int and Float are one
    /// numeric family.
    #[must_use]
    pub fn strict_eq(&self, other: &Self) -> bool {
        if self.is_numeric() && other.is_numeric() {
            return canonical_cmp(self, other) == Ordering::Equal;
        }

        self.rank() == other.rank() && self == other
    }

    /// Loose equality with scalar coercion.
    ///
    /// Text is parsed as a number when compared against a number or bool; bool
    /// compares as 0/1. Null only equals null.
    #[must_use]
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::List(_) | Self::Map(_), _) | (_, Self::List(_) | Self::Map(_)) => self == other,
            _ => match (self.coerce_number(), other.coerce_number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Loose relational comparison.
    ///
    /// Returns `None` when the pair has no meaningful order (null operands,
    /// containers, text that is not a number compared with a number).
    #[must_use]
    pub fn loose_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => None,
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::List(_) | Self::Map(_), _) | (_, Self::List(_) | Self::Map(_)) => None,
            _ => {
                let (a, b) = (self.coerce_number()?, other.coerce_number()?);
                a.partial_cmp(&b)
            }
        }
    }

    // Scalar-to-number coercion for loose operators.
    fn coerce_number(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Int(_) | Self::Float(_) => self.as_f64(),
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
            Self::Null | Self::List(_) | Self::Map(_) => None,
        }
    }
}
