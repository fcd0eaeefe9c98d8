use serde_json::{Map, Value as Json, json};

use crate::{
    ast::{Bound, CompareOp, FieldRef, Literal, Node, Quantifier},
    convert::date_to_json,
};

use super::{Compile, UnsupportedOperationError};

/// Compiles trees into Mongo-style filter documents.
///
/// Array handling is spelled out explicitly: predicates that must hold for a
/// single element (ranges, existence, `all(...)`) use `$elemMatch` for array
/// values and a `$type` guard for scalar values.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentCompiler;

impl Compile for DocumentCompiler {
    type Output = Json;

    fn compile(&self, node: &Node) -> Result<Json, UnsupportedOperationError> {
        Ok(compile_node(node))
    }

    fn match_all(&self) -> Json {
        json!({})
    }
}

fn compile_node(node: &Node) -> Json {
    match node {
        Node::And { .. } => json!({ "$and": clauses(node) }),
        Node::Or { .. } => json!({ "$or": clauses(node) }),
        Node::Not { operand } => json!({ "$nor": [compile_node(operand)] }),
        Node::Comparison { field, op, value } => {
            let condition = match op {
                CompareOp::Regex => json!({ "$regex": operand(value) }),
                // `f != v` holds when no value equals `v`, including across
                // sub-documents, so it is negated outside the field.
                CompareOp::Ne if field.quantifier == Quantifier::Any => {
                    let path = field.path.to_string();
                    return json!({ "$nor": [{ path: { "$eq": operand(value) } }] });
                }
                _ => json!({ operator(*op): operand(value) }),
            };
            quantified(field, condition, false)
        }
        Node::Membership { field, values } => {
            let values: Vec<Json> = values.iter().map(operand).collect();
            quantified(field, json!({ "$in": values }), false)
        }
        Node::Range { field, low, high } => quantified(field, bounds(low, high), true),
        Node::Existence { field } => quantified(field, json!({ "$ne": null }), true),
    }
}

/// Compiled operands of a chain of the same connective.
fn clauses(node: &Node) -> Vec<Json> {
    node.operands().into_iter().map(compile_node).collect()
}

/// `condition` applied to `field` under its quantifier. `per_element` marks
/// conditions that must hold for one element rather than for the field as a
/// whole.
fn quantified(field: &FieldRef, condition: Json, per_element: bool) -> Json {
    let path = field.path.to_string();
    match field.quantifier {
        Quantifier::Any if per_element => some_element(&path, condition),
        Quantifier::Any => json!({ path: condition }),
        Quantifier::All => json!({
            "$and": [
                { "$nor": violations(&path, condition.clone()) },
                some_element(&path, condition),
            ]
        }),
    }
}

/// Either an array element satisfies `condition`, or the field is a scalar
/// that does.
fn some_element(path: &str, condition: Json) -> Json {
    let mut scalar = Map::new();
    scalar.insert("$exists".to_string(), json!(true));
    scalar.insert("$not".to_string(), json!({ "$type": "array" }));
    if let Json::Object(ops) = &condition {
        scalar.extend(ops.clone());
    }
    json!({
        "$or": [
            { path: { "$elemMatch": condition } },
            { path: scalar },
        ]
    })
}

/// Filters matching an element that fails `condition`: an array element, or
/// a non-array value. The second form also matches arrays where no element
/// passes, which the first form already catches; empty arrays have no
/// elements and are excluded.
fn violations(path: &str, condition: Json) -> Json {
    json!([
        { path: { "$elemMatch": { "$not": condition.clone() } } },
        { path: { "$ne": [], "$not": condition } },
    ])
}

fn bounds(low: &Bound, high: &Bound) -> Json {
    let low_op = if low.inclusive { "$gte" } else { "$gt" };
    let high_op = if high.inclusive { "$lte" } else { "$lt" };
    json!({ low_op: operand(&low.value), high_op: operand(&high.value) })
}

fn operator(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "$eq",
        CompareOp::Ne => "$ne",
        CompareOp::Lt => "$lt",
        CompareOp::Le => "$lte",
        CompareOp::Gt => "$gt",
        CompareOp::Ge => "$gte",
        CompareOp::Regex => "$regex",
    }
}

fn operand(literal: &Literal) -> Json {
    match literal {
        Literal::Integer(n) => json!(n),
        Literal::Float(n) => json!(n),
        Literal::String(s) => json!(s),
        Literal::Boolean(b) => json!(b),
        Literal::Date(d) => date_to_json(d),
        Literal::Array(items) => Json::Array(items.iter().map(operand).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn compile(query: &str) -> Json {
        DocumentCompiler.compile(&parse(query).unwrap()).unwrap()
    }

    #[test]
    fn and_chains_flatten() {
        assert_eq!(
            compile("a = 1 and b = 2 and c = 3"),
            json!({"$and": [{"a": {"$eq": 1}}, {"b": {"$eq": 2}}, {"c": {"$eq": 3}}]})
        );
    }

    #[test]
    fn not_becomes_nor() {
        assert_eq!(
            compile("not energy < 0"),
            json!({"$nor": [{"energy": {"$lt": 0}}]})
        );
    }

    #[test]
    fn existence_guards_scalars_and_arrays() {
        assert_eq!(
            compile("virial"),
            json!({"$or": [
                {"virial": {"$elemMatch": {"$ne": null}}},
                {"virial": {"$exists": true, "$not": {"$type": "array"}, "$ne": null}},
            ]})
        );
    }
}
