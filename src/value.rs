use std::{cmp::Ordering, collections::BTreeMap};

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, prelude::FromPrimitive};

use crate::ast::Literal;

/// A field value stored in a record.
///
/// This type represents all JSON types plus dates, with a distinction between
/// integers and floats (unlike standard JSON which only has "number").
///
/// # Comparison
///
/// Values only compare within a type family: integers and floats compare
/// numerically with each other, strings with strings, dates with dates. A
/// comparison across families never matches.
///
/// # Examples
///
/// ```
/// use abcd::Value;
/// use std::collections::BTreeMap;
///
/// // Scalar values
/// let energy = Value::Float(-12.5);
/// let n_atoms = Value::Integer(8);
/// assert!(n_atoms.loose_eq(&Value::Float(8.0)));
///
/// // Collections
/// let pbc = Value::Array(vec![Value::Boolean(true); 3]);
///
/// let mut elements = BTreeMap::new();
/// elements.insert("Si".to_string(), Value::Integer(8));
/// let derived = Value::Object(elements);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// Floating-point number
    Float(f64),

    /// UTF-8 string
    String(String),

    /// Point in time, stored in UTC
    Date(DateTime<Utc>),

    /// Array of values (homogeneous or heterogeneous)
    Array(Vec<Value>),

    /// Object with string keys, sorted for deterministic output
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Human-readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "bool",
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "str",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Object(_) => "dict",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Equality within a type family. Integers and floats are compared
    /// exactly through `Decimal`, falling back to `f64` when the float is out
    /// of decimal range (or NaN).
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(_), Value::Float(_)) | (Value::Float(_), Value::Integer(_)) => {
                self.partial_compare(other) == Some(Ordering::Equal)
            }
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.loose_eq(vb))
            }
            _ => self == other,
        }
    }

    /// Ordering within a type family, `None` across families and for
    /// booleans, arrays, objects and nulls.
    pub fn partial_compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Float(b)) => compare_int_float(*a, *b),
            (Value::Float(a), Value::Integer(b)) => compare_int_float(*b, *a).map(Ordering::reverse),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Rank of the value's type in the cross-type sort order.
    fn sort_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::String(_) => 2,
            Value::Object(_) => 3,
            Value::Array(_) => 4,
            Value::Boolean(_) => 5,
            Value::Date(_) => 6,
        }
    }

    /// Total order used for sorting result sets: null < numbers < strings <
    /// objects < arrays < booleans < dates.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        let by_rank = self.sort_rank().cmp(&other.sort_rank());
        if by_rank != Ordering::Equal {
            return by_rank;
        }
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a
                .iter()
                .zip(b)
                .map(|(x, y)| x.sort_cmp(y))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Value::Object(a), Value::Object(b)) => a
                .iter()
                .zip(b)
                .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| va.sort_cmp(vb)))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            _ => self.partial_compare(other).unwrap_or(Ordering::Equal),
        }
    }
}

fn compare_int_float(a: i64, b: f64) -> Option<Ordering> {
    if let Some(ad) = Decimal::from_i64(a)
        && let Some(bd) = Decimal::from_f64_retain(b)
    {
        return Some(ad.cmp(&bd));
    }
    (a as f64).partial_cmp(&b)
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Integer(n) => Value::Integer(*n),
            Literal::Float(n) => Value::Float(*n),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Date(d) => Value::Date(*d),
            Literal::Array(items) => Value::Array(items.iter().map(Value::from).collect()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Candidate values a predicate is tested against: every resolved value and,
/// for arrays, each of their elements.
pub fn candidates<'a>(values: &[&'a Value]) -> Vec<&'a Value> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        out.push(*value);
        if let Value::Array(items) = value {
            out.extend(items.iter());
        }
    }
    out
}

/// Element view of the resolved values: arrays are replaced by their
/// elements (one level), other values stand for themselves.
pub fn elements<'a>(values: &[&'a Value]) -> Vec<&'a Value> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Array(items) => out.extend(items.iter()),
            other => out.push(*other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_equality_crosses_int_and_float() {
        assert!(Value::Integer(5).loose_eq(&Value::Float(5.0)));
        assert!(!Value::Integer(5).loose_eq(&Value::Float(5.000001)));
        assert!(!Value::Integer(5).loose_eq(&Value::String("5".into())));
    }

    #[test]
    fn large_integers_compare_exactly() {
        let big = Value::Integer(9_007_199_254_740_993);
        let float = Value::Float(9_007_199_254_740_992.0);
        assert_eq!(big.partial_compare(&float), Some(Ordering::Greater));
    }

    #[test]
    fn ordering_never_crosses_families() {
        assert_eq!(
            Value::String("10".into()).partial_compare(&Value::Integer(5)),
            None
        );
        assert_eq!(
            Value::Boolean(true).partial_compare(&Value::Boolean(false)),
            None
        );
    }

    #[test]
    fn sort_order_ranks_types() {
        let mut values = vec![
            Value::Boolean(false),
            Value::String("a".into()),
            Value::Integer(3),
            Value::Null,
            Value::Float(1.5),
        ];
        values.sort_by(Value::sort_cmp);
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Float(1.5),
                Value::Integer(3),
                Value::String("a".into()),
                Value::Boolean(false),
            ]
        );
    }

    #[test]
    fn candidates_and_elements_flatten_one_level() {
        let nested = Value::Array(vec![
            Value::Integer(1),
            Value::Array(vec![Value::Integer(2)]),
        ]);
        let values = [&nested];
        assert_eq!(candidates(&values).len(), 3);
        assert_eq!(
            elements(&values),
            vec![&Value::Integer(1), &Value::Array(vec![Value::Integer(2)])]
        );
    }
}
