use std::{cmp::Ordering, fmt, sync::Arc};

use crate::{
    ast::{Bound, CompareOp, FieldRef, Node, Quantifier},
    record::Record,
    types,
    value::{Value, candidates, elements},
};

use super::{Backend, Compile, UnsupportedOperationError};

/// An in-process filter: a shareable closure over records.
///
/// This is the reference semantics every other backend is measured against.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&Record) -> bool + Send + Sync>);

impl Predicate {
    pub fn new(test: impl Fn(&Record) -> bool + Send + Sync + 'static) -> Self {
        Predicate(Arc::new(test))
    }

    /// Matches every record.
    pub fn always() -> Self {
        Predicate::new(|_| true)
    }

    pub fn matches(&self, record: &Record) -> bool {
        (self.0)(record)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

type Test = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Which values of a field a leaf predicate looks at.
#[derive(Clone, Copy)]
enum View {
    /// Resolved values plus the elements of array values
    Candidates,
    /// Array values replaced by their elements
    Elements,
}

/// Compiles trees into [`Predicate`] closures. Total: every checked tree
/// compiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryCompiler;

impl MemoryCompiler {
    fn operands(&self, chain: &Node) -> Result<Vec<Predicate>, UnsupportedOperationError> {
        chain.operands().into_iter().map(|node| self.compile(node)).collect()
    }
}

impl Compile for MemoryCompiler {
    type Output = Predicate;

    fn compile(&self, node: &Node) -> Result<Predicate, UnsupportedOperationError> {
        Ok(match node {
            Node::And { .. } => {
                let operands = self.operands(node)?;
                Predicate::new(move |record| operands.iter().all(|p| p.matches(record)))
            }
            Node::Or { .. } => {
                let operands = self.operands(node)?;
                Predicate::new(move |record| operands.iter().any(|p| p.matches(record)))
            }
            Node::Not { operand } => {
                let operand = self.compile(operand)?;
                Predicate::new(move |record| !operand.matches(record))
            }
            Node::Comparison { field, op, value } => {
                let value = Value::from(value);
                match (op, field.quantifier) {
                    // `f != v` negates `f = v` as a whole, so records without
                    // the field match.
                    (CompareOp::Ne, Quantifier::Any) => {
                        let equal = leaf(field, View::Candidates, comparison(CompareOp::Eq, value)?);
                        Predicate::new(move |record| !equal.matches(record))
                    }
                    _ => leaf(field, View::Candidates, comparison(*op, value)?),
                }
            }
            Node::Membership { field, values } => {
                let values: Vec<Value> = values.iter().map(Value::from).collect();
                let test: Test = Box::new(move |v| values.iter().any(|x| v.loose_eq(x)));
                leaf(field, View::Candidates, test)
            }
            Node::Range { field, low, high } => leaf(field, View::Elements, range(low, high)),
            Node::Existence { field } => {
                leaf(field, View::Elements, Box::new(|v: &Value| !v.is_null()))
            }
        })
    }

    fn match_all(&self) -> Predicate {
        Predicate::always()
    }
}

fn leaf(field: &FieldRef, view: View, test: Test) -> Predicate {
    let path = field.path.clone();
    match field.quantifier {
        Quantifier::Any => Predicate::new(move |record| {
            let values = record.resolve(&path);
            let pool = match view {
                View::Candidates => candidates(&values),
                View::Elements => elements(&values),
            };
            pool.into_iter().any(|v| test(v))
        }),
        Quantifier::All => Predicate::new(move |record| {
            let values = record.resolve(&path);
            let items = elements(&values);
            !items.is_empty() && items.into_iter().all(|v| test(v))
        }),
    }
}

/// Single-value test for `v op value`.
fn comparison(op: CompareOp, value: Value) -> Result<Test, UnsupportedOperationError> {
    let test: Test = match op {
        CompareOp::Eq => Box::new(move |v| v.loose_eq(&value)),
        CompareOp::Ne => Box::new(move |v| !v.loose_eq(&value)),
        CompareOp::Lt => ordered(value, |o| o == Ordering::Less),
        CompareOp::Le => ordered(value, |o| o != Ordering::Greater),
        CompareOp::Gt => ordered(value, |o| o == Ordering::Greater),
        CompareOp::Ge => ordered(value, |o| o != Ordering::Less),
        CompareOp::Regex => {
            let pattern = match &value {
                Value::String(pattern) => pattern,
                other => {
                    return Err(UnsupportedOperationError::new(
                        Backend::Memory,
                        format!("`~=` with a {} operand", other.type_name()),
                    ));
                }
            };
            let regex = types::compile_pattern(pattern).map_err(|reason| {
                UnsupportedOperationError::new(
                    Backend::Memory,
                    format!("the invalid regular expression {pattern:?}: {reason}"),
                )
            })?;
            Box::new(move |v| matches!(v, Value::String(s) if regex.is_match(s)))
        }
    };
    Ok(test)
}

fn ordered(value: Value, accept: fn(Ordering) -> bool) -> Test {
    Box::new(move |v| v.partial_compare(&value).is_some_and(accept))
}

/// Both bounds are tested against the same value.
fn range(low: &Bound, high: &Bound) -> Test {
    let (low_value, low_inclusive) = (Value::from(&low.value), low.inclusive);
    let (high_value, high_inclusive) = (Value::from(&high.value), high.inclusive);
    Box::new(move |v| {
        let above = match v.partial_compare(&low_value) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => low_inclusive,
            _ => false,
        };
        let below = match v.partial_compare(&high_value) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => high_inclusive,
            _ => false,
        };
        above && below
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn matches(query: &str, record: &Record) -> bool {
        MemoryCompiler.compile(&parse(query).unwrap()).unwrap().matches(record)
    }

    #[test]
    fn not_equal_matches_missing_fields() {
        let record = Record::new().with("energy", Value::Float(-1.0));
        assert!(matches("config_type != \"bulk\"", &record));
        assert!(!matches("energy != -1.0", &record));
    }

    #[test]
    fn quantifiers_over_arrays() {
        let record = Record::new().with("forces", Value::from(vec![0.5, -2.0, 1.5]));
        assert!(matches("forces > 1", &record));
        assert!(!matches("all(forces) > 1", &record));
        assert!(matches("all(forces) in -3..3", &record));
        assert!(matches("forces = [0.5, -2.0, 1.5]", &record));
    }

    #[test]
    fn empty_and_null_arrays_do_not_exist() {
        let empty = Record::new().with("virial", Value::Array(vec![]));
        let nulls = Record::new().with("virial", Value::Array(vec![Value::Null]));
        assert!(!matches("virial", &empty));
        assert!(!matches("virial", &nulls));
        assert!(!matches("all(virial)", &empty));
    }
}
