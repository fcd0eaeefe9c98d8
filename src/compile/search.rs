use chrono::SecondsFormat;
use serde_json::{Value as Json, json};

use crate::ast::{Bound, CompareOp, FieldRef, Literal, LiteralType, Node, Quantifier};

use super::{Backend, Compile, UnsupportedOperationError};

/// Date format attached to every date `range` clause.
pub const DATE_FORMAT: &str = "strict_date_optional_time";

/// Compiles trees into OpenSearch-style query DSL.
///
/// String predicates address the keyword sub-field (`name.keyword`) so they
/// compare exact values rather than analyzed text.
#[derive(Debug, Clone, Default)]
pub struct SearchCompiler {
    keyword_suffix: Option<String>,
}

impl SearchCompiler {
    /// An empty suffix addresses string fields directly.
    pub fn new(keyword_suffix: impl Into<String>) -> Self {
        let suffix = keyword_suffix.into();
        SearchCompiler {
            keyword_suffix: (!suffix.is_empty()).then_some(suffix),
        }
    }

    fn unsupported(&self, construct: impl Into<String>) -> UnsupportedOperationError {
        UnsupportedOperationError::new(Backend::SearchIndex, construct)
    }

    fn field_name(&self, field: &FieldRef, kind: LiteralType) -> String {
        match (&self.keyword_suffix, kind) {
            (Some(suffix), LiteralType::String) => format!("{}.{suffix}", field.path),
            _ => field.path.to_string(),
        }
    }

    fn node(&self, node: &Node) -> Result<Json, UnsupportedOperationError> {
        if let Some(field) = node.field()
            && field.quantifier == Quantifier::All
        {
            return Err(self.unsupported("the `all(...)` quantifier"));
        }

        match node {
            Node::And { .. } => Ok(json!({ "bool": { "filter": self.clauses(node)? } })),
            Node::Or { .. } => Ok(should(self.clauses(node)?)),
            Node::Not { operand } => Ok(must_not(self.node(operand)?)),
            Node::Comparison { field, op, value } => self.comparison(field, *op, value),
            Node::Membership { field, values } => self.membership(field, values),
            Node::Range { field, low, high } => Ok(self.range(field, Some(low), Some(high))),
            Node::Existence { field } => {
                Ok(json!({ "exists": { "field": field.path.to_string() } }))
            }
        }
    }

    /// Compiled operands of a chain of the same connective.
    fn clauses(&self, chain: &Node) -> Result<Vec<Json>, UnsupportedOperationError> {
        chain.operands().into_iter().map(|node| self.node(node)).collect()
    }

    fn comparison(
        &self,
        field: &FieldRef,
        op: CompareOp,
        value: &Literal,
    ) -> Result<Json, UnsupportedOperationError> {
        let bound = |inclusive| Bound {
            value: value.clone(),
            inclusive,
        };
        match op {
            CompareOp::Regex => Err(self.unsupported("the `~=` operator")),
            CompareOp::Eq | CompareOp::Ne if matches!(value, Literal::Array(_)) => {
                Err(self.unsupported("equality against an array literal"))
            }
            CompareOp::Eq => Ok(self.equals(field, value)),
            CompareOp::Ne => Ok(must_not(self.equals(field, value))),
            CompareOp::Lt => Ok(self.range(field, None, Some(&bound(false)))),
            CompareOp::Le => Ok(self.range(field, None, Some(&bound(true)))),
            CompareOp::Gt => Ok(self.range(field, Some(&bound(false)), None)),
            CompareOp::Ge => Ok(self.range(field, Some(&bound(true)), None)),
        }
    }

    /// Dates have no exact term form, so equality is a closed range.
    fn equals(&self, field: &FieldRef, value: &Literal) -> Json {
        match value {
            Literal::Date(_) => {
                let bound = Bound::inclusive(value.clone());
                self.range(field, Some(&bound), Some(&bound))
            }
            _ => json!({ "term": { self.field_name(field, value.kind()): operand(value) } }),
        }
    }

    /// One `terms` clause per value family; dates become closed ranges.
    fn membership(
        &self,
        field: &FieldRef,
        values: &[Literal],
    ) -> Result<Json, UnsupportedOperationError> {
        let mut groups: Vec<(String, Vec<Json>)> = vec![];
        let mut clauses = vec![];
        for value in values {
            if let Literal::Date(_) = value {
                clauses.push(self.equals(field, value));
                continue;
            }
            let name = self.field_name(field, value.kind());
            match groups.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, members)) => members.push(operand(value)),
                None => groups.push((name, vec![operand(value)])),
            }
        }
        let mut terms: Vec<Json> = groups
            .into_iter()
            .map(|(name, members)| json!({ "terms": { name: members } }))
            .collect();
        terms.extend(clauses);

        Ok(match terms.len() {
            1 => terms.remove(0),
            _ => should(terms),
        })
    }

    fn range(&self, field: &FieldRef, low: Option<&Bound>, high: Option<&Bound>) -> Json {
        let kind = low.or(high).map(|b| b.value.kind()).unwrap_or(LiteralType::Integer);
        let mut body = serde_json::Map::new();
        if let Some(low) = low {
            let key = if low.inclusive { "gte" } else { "gt" };
            body.insert(key.to_string(), operand(&low.value));
        }
        if let Some(high) = high {
            let key = if high.inclusive { "lte" } else { "lt" };
            body.insert(key.to_string(), operand(&high.value));
        }
        if kind == LiteralType::Date {
            body.insert("format".to_string(), json!(DATE_FORMAT));
        }
        json!({ "range": { self.field_name(field, kind): Json::Object(body) } })
    }
}

impl Compile for SearchCompiler {
    type Output = Json;

    fn compile(&self, node: &Node) -> Result<Json, UnsupportedOperationError> {
        self.node(node)
    }

    fn match_all(&self) -> Json {
        json!({ "match_all": {} })
    }
}

fn should(clauses: Vec<Json>) -> Json {
    json!({ "bool": { "should": clauses, "minimum_should_match": 1 } })
}

fn must_not(clause: Json) -> Json {
    json!({ "bool": { "must_not": [clause] } })
}

fn operand(literal: &Literal) -> Json {
    match literal {
        Literal::Integer(n) => json!(n),
        Literal::Float(n) => json!(n),
        Literal::String(s) => json!(s),
        Literal::Boolean(b) => json!(b),
        Literal::Date(d) => json!(d.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Literal::Array(items) => Json::Array(items.iter().map(operand).collect()),
    }
}
