//! Document-store adapter
//!
//! Executes Mongo-style filter documents. The supported language:
//!
//! - Logical: `$and`, `$or`, `$nor`
//! - Comparison: implicit equality, `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`
//! - Array: `$in`, `$nin`, `$elemMatch`
//! - Element: `$exists`, `$type`
//! - Evaluation: `$regex` (with `$options`), `$not`
//!
//! A field condition holds when any of the field's values, or any element
//! of an array value, satisfies it. Operators inside an `$elemMatch` apply to
//! one element at a time.
//!
//! A path that fans out over an array of sub-documents (`info.kind` on
//! `info: [{kind: ..}, {kind: ..}]`) yields one value per sub-document. The
//! operators of a field condition must then all hold for the same one of
//! those values, as if each sub-document were matched on its own. Negate
//! with `$nor` to require that no sub-document matches.

use std::{cmp::Ordering, collections::BTreeMap, slice, sync::Arc};

use regex::Regex;
use serde_json::Value as Json;

use crate::{
    ast::FieldPath,
    compile::{Backend, Predicate},
    convert::json_to_value,
    record::resolve_in,
    value::{Value, candidates},
};

use super::{BackendError, Collection, Database};

/// In-process document store.
#[derive(Debug)]
pub struct DocumentStore {
    collection: Collection,
}

impl DocumentStore {
    pub fn new(collection: impl Into<String>) -> Self {
        DocumentStore {
            collection: Collection::new(collection, Backend::DocumentStore),
        }
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        DocumentStore::new("atoms")
    }
}

impl Database for DocumentStore {
    type Filter = Json;

    fn backend(&self) -> Backend {
        Backend::DocumentStore
    }

    fn collection(&self) -> &Collection {
        &self.collection
    }

    fn prepare(&self, filter: &Json) -> Result<Predicate, BackendError> {
        let query = Query::parse(filter).map_err(|message| {
            tracing::warn!(backend = %Backend::DocumentStore, %filter, %message, "rejected filter");
            BackendError::query(Backend::DocumentStore, message)
        })?;
        let query = Arc::new(query);
        Ok(Predicate::new(move |record| query.matches(&record.fields)))
    }
}

#[derive(Debug)]
enum Query {
    And(Vec<Query>),
    Or(Vec<Query>),
    Nor(Vec<Query>),
    Field { path: FieldPath, ops: Vec<Op> },
}

#[derive(Debug)]
enum Op {
    Eq(Value),
    Ne(Value),
    Cmp(Comparison, Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Regex(Regex),
    Exists(bool),
    Type(TypeName),
    Not(Vec<Op>),
    ElemMatch(ElemMatch),
}

#[derive(Debug, Clone, Copy)]
enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug)]
enum ElemMatch {
    Ops(Vec<Op>),
    Query(Box<Query>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeName {
    Null,
    Bool,
    Int,
    Double,
    Number,
    String,
    Date,
    Array,
    Object,
}

impl Query {
    fn parse(json: &Json) -> Result<Query, String> {
        let Json::Object(entries) = json else {
            return Err(format!("filter must be an object, found {json}"));
        };

        let mut clauses = vec![];
        for (key, value) in entries {
            let clause = match key.as_str() {
                "$and" => Query::And(Self::parse_list(key, value)?),
                "$or" => Query::Or(Self::parse_list(key, value)?),
                "$nor" => Query::Nor(Self::parse_list(key, value)?),
                op if op.starts_with('$') => {
                    return Err(format!("unknown top-level operator `{op}`"));
                }
                field => {
                    let path = FieldPath::parse(field);
                    if path.is_empty() {
                        return Err(format!("invalid field name `{field}`"));
                    }
                    Query::Field {
                        path,
                        ops: parse_condition(value)?,
                    }
                }
            };
            clauses.push(clause);
        }

        Ok(match clauses.len() {
            1 => clauses.remove(0),
            _ => Query::And(clauses),
        })
    }

    fn parse_list(key: &str, value: &Json) -> Result<Vec<Query>, String> {
        match value {
            Json::Array(items) if !items.is_empty() => items.iter().map(Query::parse).collect(),
            _ => Err(format!("`{key}` takes a non-empty array of filters")),
        }
    }

    fn matches(&self, document: &BTreeMap<String, Value>) -> bool {
        match self {
            Query::And(clauses) => clauses.iter().all(|q| q.matches(document)),
            Query::Or(clauses) => clauses.iter().any(|q| q.matches(document)),
            Query::Nor(clauses) => !clauses.iter().any(|q| q.matches(document)),
            Query::Field { path, ops } => {
                let values = resolve_in(document, path);
                if values.is_empty() {
                    return ops.iter().all(|op| op.matches_field(&[]));
                }
                values
                    .iter()
                    .any(|value| ops.iter().all(|op| op.matches_field(slice::from_ref(value))))
            }
        }
    }
}

fn is_operator_object(json: &Json) -> bool {
    match json {
        Json::Object(entries) => {
            !entries.is_empty()
                && entries.keys().all(|k| k.starts_with('$'))
                && !(entries.len() == 1 && entries.contains_key("$date"))
        }
        _ => false,
    }
}

/// A field's condition: an operator object or a value for implicit equality.
fn parse_condition(json: &Json) -> Result<Vec<Op>, String> {
    if is_operator_object(json) {
        parse_ops(json)
    } else {
        Ok(vec![Op::Eq(json_to_value(json.clone()))])
    }
}

fn parse_ops(json: &Json) -> Result<Vec<Op>, String> {
    let Json::Object(entries) = json else {
        return Err(format!("expected an operator object, found {json}"));
    };

    let options = match entries.get("$options") {
        None => "",
        Some(Json::String(options)) => options.as_str(),
        Some(other) => return Err(format!("`$options` must be a string, found {other}")),
    };
    if !options.is_empty() && !entries.contains_key("$regex") {
        return Err("`$options` requires `$regex`".to_string());
    }

    let mut ops = vec![];
    for (key, value) in entries {
        let op = match key.as_str() {
            "$eq" => Op::Eq(json_to_value(value.clone())),
            "$ne" => Op::Ne(json_to_value(value.clone())),
            "$gt" => Op::Cmp(Comparison::Gt, json_to_value(value.clone())),
            "$gte" => Op::Cmp(Comparison::Gte, json_to_value(value.clone())),
            "$lt" => Op::Cmp(Comparison::Lt, json_to_value(value.clone())),
            "$lte" => Op::Cmp(Comparison::Lte, json_to_value(value.clone())),
            "$in" => Op::In(value_list(key, value)?),
            "$nin" => Op::Nin(value_list(key, value)?),
            "$regex" => Op::Regex(regex(value, options)?),
            "$options" => continue,
            "$exists" => match value {
                Json::Bool(exists) => Op::Exists(*exists),
                other => return Err(format!("`$exists` takes a boolean, found {other}")),
            },
            "$type" => Op::Type(type_name(value)?),
            "$not" => Op::Not(parse_ops(value)?),
            "$elemMatch" => {
                let condition = if is_operator_object(value) {
                    ElemMatch::Ops(parse_ops(value)?)
                } else {
                    ElemMatch::Query(Box::new(Query::parse(value)?))
                };
                Op::ElemMatch(condition)
            }
            other => return Err(format!("unknown operator `{other}`")),
        };
        ops.push(op);
    }
    Ok(ops)
}

fn value_list(key: &str, json: &Json) -> Result<Vec<Value>, String> {
    match json {
        Json::Array(items) => Ok(items.iter().cloned().map(json_to_value).collect()),
        other => Err(format!("`{key}` takes an array, found {other}")),
    }
}

fn regex(json: &Json, options: &str) -> Result<Regex, String> {
    let Json::String(pattern) = json else {
        return Err(format!("`$regex` takes a string, found {json}"));
    };
    if let Some(flag) = options.chars().find(|c| !matches!(c, 'i' | 'm' | 's' | 'x')) {
        return Err(format!("unsupported regex option `{flag}`"));
    }
    let pattern = if options.is_empty() {
        pattern.clone()
    } else {
        format!("(?{options}){pattern}")
    };
    Regex::new(&pattern).map_err(|e| format!("invalid regular expression: {e}"))
}

fn type_name(json: &Json) -> Result<TypeName, String> {
    let Json::String(name) = json else {
        return Err(format!("`$type` takes a type name, found {json}"));
    };
    Ok(match name.as_str() {
        "null" => TypeName::Null,
        "bool" => TypeName::Bool,
        "int" | "long" => TypeName::Int,
        "double" => TypeName::Double,
        "number" => TypeName::Number,
        "string" => TypeName::String,
        "date" => TypeName::Date,
        "array" => TypeName::Array,
        "object" => TypeName::Object,
        other => return Err(format!("unknown type name `{other}`")),
    })
}

impl TypeName {
    fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (TypeName::Null, Value::Null)
            | (TypeName::Bool, Value::Boolean(_))
            | (TypeName::Int, Value::Integer(_))
            | (TypeName::Double, Value::Float(_))
            | (TypeName::Number, Value::Integer(_) | Value::Float(_))
            | (TypeName::String, Value::String(_))
            | (TypeName::Date, Value::Date(_))
            | (TypeName::Array, Value::Array(_))
            | (TypeName::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

impl Comparison {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Gte => ordering != Ordering::Less,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Lte => ordering != Ordering::Greater,
        }
    }
}

impl Op {
    /// Applies the operator to every value a field path resolved to.
    fn matches_field(&self, values: &[&Value]) -> bool {
        match self {
            Op::Eq(expected) => equals_field(values, expected),
            Op::Ne(expected) => !equals_field(values, expected),
            Op::In(list) => list.iter().any(|expected| equals_field(values, expected)),
            Op::Nin(list) => !list.iter().any(|expected| equals_field(values, expected)),
            Op::Exists(exists) => values.is_empty() != *exists,
            Op::Not(ops) => !ops.iter().all(|op| op.matches_field(values)),
            Op::ElemMatch(condition) => values.iter().any(|value| match value {
                Value::Array(items) => items.iter().any(|item| condition.matches(item)),
                _ => false,
            }),
            Op::Cmp(..) | Op::Regex(_) | Op::Type(_) => {
                candidates(values).into_iter().any(|value| self.matches_value(value))
            }
        }
    }

    /// Applies the operator to a single value, as inside `$elemMatch`.
    fn matches_value(&self, value: &Value) -> bool {
        match self {
            Op::Eq(expected) => value.loose_eq(expected),
            Op::Ne(expected) => !value.loose_eq(expected),
            Op::Cmp(comparison, expected) => value
                .partial_compare(expected)
                .is_some_and(|ordering| comparison.accepts(ordering)),
            Op::In(list) => list.iter().any(|expected| value.loose_eq(expected)),
            Op::Nin(list) => !list.iter().any(|expected| value.loose_eq(expected)),
            Op::Regex(regex) => matches!(value, Value::String(s) if regex.is_match(s)),
            Op::Exists(exists) => *exists,
            Op::Type(name) => name.matches(value),
            Op::Not(ops) => !ops.iter().all(|op| op.matches_value(value)),
            Op::ElemMatch(condition) => match value {
                Value::Array(items) => items.iter().any(|item| condition.matches(item)),
                _ => false,
            },
        }
    }
}

impl ElemMatch {
    fn matches(&self, element: &Value) -> bool {
        match self {
            ElemMatch::Ops(ops) => ops.iter().all(|op| op.matches_value(element)),
            ElemMatch::Query(query) => match element {
                Value::Object(document) => query.matches(document),
                _ => false,
            },
        }
    }
}

/// Equality against a field: any value or array element matches. `null`
/// also matches a missing field.
fn equals_field(values: &[&Value], expected: &Value) -> bool {
    if expected.is_null() && values.is_empty() {
        return true;
    }
    candidates(values).into_iter().any(|value| value.loose_eq(expected))
}
