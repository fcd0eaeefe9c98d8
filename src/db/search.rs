//! Search-index adapter
//!
//! Executes the query DSL subset the search compiler emits: `match_all`,
//! `match_none`, `term`, `terms`, `range`, `exists` and `bool` (`filter`,
//! `must`, `should`, `must_not`, `minimum_should_match`). Any other clause is
//! rejected.
//!
//! Fields named `<field>.<keyword suffix>` address the exact value of
//! `<field>`.

use std::{cmp::Ordering, sync::Arc};

use serde_json::Value as Json;

use crate::{
    ast::FieldPath,
    compile::{Backend, Predicate},
    convert::json_to_value,
    lexer::parse_date,
    record::Record,
    value::{Value, candidates, elements},
};

use super::{BackendError, Collection, Database};

/// In-process search index.
#[derive(Debug)]
pub struct SearchIndex {
    collection: Collection,
    keyword_suffix: Option<String>,
}

impl SearchIndex {
    pub fn new(index: impl Into<String>, keyword_suffix: impl Into<String>) -> Self {
        let suffix = keyword_suffix.into();
        SearchIndex {
            collection: Collection::new(index, Backend::SearchIndex),
            keyword_suffix: (!suffix.is_empty()).then_some(suffix),
        }
    }

    fn field(&self, name: &str) -> Result<FieldPath, String> {
        let name = match &self.keyword_suffix {
            Some(suffix) => name
                .strip_suffix(suffix.as_str())
                .and_then(|rest| rest.strip_suffix('.'))
                .unwrap_or(name),
            None => name,
        };
        let path = FieldPath::parse(name);
        if path.is_empty() {
            return Err(format!("invalid field name `{name}`"));
        }
        Ok(path)
    }

    fn parse(&self, json: &Json) -> Result<Clause, String> {
        let (kind, body) = single_entry(json, "query clause")?;
        match kind.as_str() {
            "match_all" => Ok(Clause::MatchAll),
            "match_none" => Ok(Clause::MatchNone),
            "term" => {
                let (name, value) = single_entry(body, "`term`")?;
                let value = match value {
                    Json::Object(inner) if inner.contains_key("value") => &inner["value"],
                    other => other,
                };
                Ok(Clause::Term {
                    path: self.field(name)?,
                    value: json_to_value(value.clone()),
                })
            }
            "terms" => {
                let (name, values) = single_entry(body, "`terms`")?;
                let Json::Array(values) = values else {
                    return Err(format!("`terms` takes an array of values, found {values}"));
                };
                Ok(Clause::Terms {
                    path: self.field(name)?,
                    values: values.iter().cloned().map(json_to_value).collect(),
                })
            }
            "range" => {
                let (name, bounds) = single_entry(body, "`range`")?;
                Ok(Clause::Range {
                    path: self.field(name)?,
                    bounds: range_bounds(bounds)?,
                })
            }
            "exists" => match body.get("field") {
                Some(Json::String(name)) => Ok(Clause::Exists {
                    path: self.field(name)?,
                }),
                _ => Err("`exists` takes a `field` name".to_string()),
            },
            "bool" => self.parse_bool(body),
            other => Err(format!("unsupported query clause `{other}`")),
        }
    }

    fn parse_bool(&self, body: &Json) -> Result<Clause, String> {
        let Json::Object(entries) = body else {
            return Err(format!("`bool` takes an object, found {body}"));
        };

        let mut clause = BoolClause::default();
        let mut minimum_should_match = None;
        for (key, value) in entries {
            match key.as_str() {
                "filter" | "must" => clause.must.extend(self.parse_clauses(value)?),
                "should" => clause.should.extend(self.parse_clauses(value)?),
                "must_not" => clause.must_not.extend(self.parse_clauses(value)?),
                "minimum_should_match" => {
                    let count = value
                        .as_u64()
                        .ok_or_else(|| format!("`minimum_should_match` must be a count, found {value}"))?;
                    minimum_should_match = Some(count as usize);
                }
                other => return Err(format!("unsupported `bool` section `{other}`")),
            }
        }

        clause.minimum_should_match = minimum_should_match.unwrap_or(
            if !clause.should.is_empty() && clause.must.is_empty() {
                1
            } else {
                0
            },
        );
        Ok(Clause::Bool(clause))
    }

    fn parse_clauses(&self, json: &Json) -> Result<Vec<Clause>, String> {
        match json {
            Json::Array(items) => items.iter().map(|item| self.parse(item)).collect(),
            single => Ok(vec![self.parse(single)?]),
        }
    }
}

impl Database for SearchIndex {
    type Filter = Json;

    fn backend(&self) -> Backend {
        Backend::SearchIndex
    }

    fn collection(&self) -> &Collection {
        &self.collection
    }

    fn prepare(&self, filter: &Json) -> Result<Predicate, BackendError> {
        let clause = self.parse(filter).map_err(|message| {
            tracing::warn!(backend = %Backend::SearchIndex, %filter, %message, "rejected query");
            BackendError::query(Backend::SearchIndex, message)
        })?;
        let clause = Arc::new(clause);
        Ok(Predicate::new(move |record| clause.matches(record)))
    }
}

#[derive(Debug)]
enum Clause {
    MatchAll,
    MatchNone,
    Term { path: FieldPath, value: Value },
    Terms { path: FieldPath, values: Vec<Value> },
    Range { path: FieldPath, bounds: Vec<(RangeOp, Value)> },
    Exists { path: FieldPath },
    Bool(BoolClause),
}

#[derive(Debug, Default)]
struct BoolClause {
    must: Vec<Clause>,
    should: Vec<Clause>,
    must_not: Vec<Clause>,
    minimum_should_match: usize,
}

#[derive(Debug, Clone, Copy)]
enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Clause {
    fn matches(&self, record: &Record) -> bool {
        match self {
            Clause::MatchAll => true,
            Clause::MatchNone => false,
            Clause::Term { path, value } => {
                let values = record.resolve(path);
                candidates(&values).into_iter().any(|v| v.loose_eq(value))
            }
            Clause::Terms { path, values: wanted } => {
                let values = record.resolve(path);
                candidates(&values)
                    .into_iter()
                    .any(|v| wanted.iter().any(|w| v.loose_eq(w)))
            }
            Clause::Range { path, bounds } => {
                let values = record.resolve(path);
                elements(&values).into_iter().any(|v| {
                    bounds.iter().all(|(op, bound)| {
                        v.partial_compare(bound).is_some_and(|o| op.accepts(o))
                    })
                })
            }
            Clause::Exists { path } => {
                let values = record.resolve(path);
                elements(&values).into_iter().any(|v| !v.is_null())
            }
            Clause::Bool(clause) => {
                clause.must.iter().all(|c| c.matches(record))
                    && !clause.must_not.iter().any(|c| c.matches(record))
                    && clause.should.iter().filter(|c| c.matches(record)).count()
                        >= clause.minimum_should_match
            }
        }
    }
}

impl RangeOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            RangeOp::Gt => ordering == Ordering::Greater,
            RangeOp::Gte => ordering != Ordering::Less,
            RangeOp::Lt => ordering == Ordering::Less,
            RangeOp::Lte => ordering != Ordering::Greater,
        }
    }
}

fn single_entry<'a>(json: &'a Json, what: &str) -> Result<(&'a String, &'a Json), String> {
    match json {
        Json::Object(entries) if entries.len() == 1 => entries
            .iter()
            .next()
            .ok_or_else(|| format!("{what} must have exactly one key")),
        _ => Err(format!("{what} must be an object with exactly one key, found {json}")),
    }
}

/// With a `format`, bounds are date strings.
fn range_bounds(json: &Json) -> Result<Vec<(RangeOp, Value)>, String> {
    let Json::Object(entries) = json else {
        return Err(format!("`range` takes an object of bounds, found {json}"));
    };
    let dates = entries.contains_key("format");

    let mut bounds = vec![];
    for (key, value) in entries {
        let op = match key.as_str() {
            "gt" => RangeOp::Gt,
            "gte" => RangeOp::Gte,
            "lt" => RangeOp::Lt,
            "lte" => RangeOp::Lte,
            "format" => continue,
            other => return Err(format!("unsupported `range` parameter `{other}`")),
        };
        bounds.push((op, bound(value, dates)?));
    }
    if bounds.is_empty() {
        return Err("`range` needs at least one bound".to_string());
    }
    Ok(bounds)
}

fn bound(json: &Json, dates: bool) -> Result<Value, String> {
    if !dates {
        return Ok(json_to_value(json.clone()));
    }
    match json {
        Json::String(text) => parse_date(text)
            .map(Value::Date)
            .ok_or_else(|| format!("invalid date bound `{text}`")),
        other => Err(format!("date bounds must be strings, found {other}")),
    }
}
