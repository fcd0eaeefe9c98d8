use std::fmt;

use serde::Serialize;

use crate::ast::{CompareOp, FieldRef, Literal};

/// One end of a [`Node::Range`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bound {
    pub value: Literal,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(value: Literal) -> Self {
        Bound {
            value,
            inclusive: true,
        }
    }

    pub fn exclusive(value: Literal) -> Self {
        Bound {
            value,
            inclusive: false,
        }
    }
}

/// Abstract Syntax Tree node of a filter expression.
///
/// Leaf predicates reference exactly one field; the boolean combinators own
/// their children. Deep equality (`PartialEq`) is structural, so parsing the
/// same text twice yields equal trees.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    /// Field compared against a literal
    ///
    /// # Examples
    /// ```text
    /// energy <= -3.5
    /// config_type ~= "^bulk"
    /// ```
    Comparison {
        field: FieldRef,
        op: CompareOp,
        value: Literal,
    },

    /// Logical AND (`and`, `&`)
    And { left: Box<Node>, right: Box<Node> },

    /// Logical OR (`or`, `|`)
    Or { left: Box<Node>, right: Box<Node> },

    /// Logical NOT (`not`, `!`)
    Not { operand: Box<Node> },

    /// Field value is one of a non-empty literal list
    ///
    /// # Example
    /// ```text
    /// calculator_name in ["vasp", "castep"]
    /// ```
    Membership { field: FieldRef, values: Vec<Literal> },

    /// Field value lies between two bounds
    ///
    /// # Example
    /// ```text
    /// n_atoms in 8..<64
    /// ```
    Range {
        field: FieldRef,
        low: Bound,
        high: Bound,
    },

    /// Field is present with a non-null value
    ///
    /// # Example
    /// ```text
    /// virial
    /// ```
    Existence { field: FieldRef },
}

impl Node {
    pub fn comparison(field: FieldRef, op: CompareOp, value: Literal) -> Self {
        Node::Comparison { field, op, value }
    }

    pub fn and(left: Node, right: Node) -> Self {
        Node::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Node, right: Node) -> Self {
        Node::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: Node) -> Self {
        Node::Not {
            operand: Box::new(operand),
        }
    }

    pub fn exists(field: FieldRef) -> Self {
        Node::Existence { field }
    }

    /// The field a leaf predicate references, `None` for combinators.
    pub fn field(&self) -> Option<&FieldRef> {
        match self {
            Node::Comparison { field, .. }
            | Node::Membership { field, .. }
            | Node::Range { field, .. }
            | Node::Existence { field } => Some(field),
            Node::And { .. } | Node::Or { .. } | Node::Not { .. } => None,
        }
    }

    /// Nodes on the longest path from this node down to a leaf.
    pub fn height(&self) -> usize {
        match self {
            Node::And { left, right } | Node::Or { left, right } => {
                left.height().max(right.height()) + 1
            }
            Node::Not { operand } => operand.height() + 1,
            _ => 1,
        }
    }

    /// Operands of a chain of the same connective, left to right. Any other
    /// node is its own single operand.
    ///
    /// Walks the chain with an explicit stack so long `and`/`or` chains do
    /// not recurse once per operand.
    pub fn operands(&self) -> Vec<&Node> {
        let mut operands = vec![];
        let mut pending = vec![self];
        while let Some(next) = pending.pop() {
            match (self, next) {
                (Node::And { .. }, Node::And { left, right })
                | (Node::Or { .. }, Node::Or { left, right }) => {
                    pending.push(right);
                    pending.push(left);
                }
                _ => operands.push(next),
            }
        }
        operands
    }

    /// Binding strength used when printing: `or` < `and` < everything else.
    fn precedence(&self) -> u8 {
        match self {
            Node::Or { .. } => 1,
            Node::And { .. } => 2,
            _ => 3,
        }
    }

    fn fmt_child(&self, child: &Node, strict: bool, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let needs_parens = if strict {
            child.precedence() <= self.precedence()
        } else {
            child.precedence() < self.precedence()
        };
        if needs_parens {
            write!(f, "({child})")
        } else {
            write!(f, "{child}")
        }
    }
}

/// Canonical query text. Parentheses are emitted only where precedence or
/// left-associativity would otherwise regroup the tree, so the text parses
/// back to an equal tree.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Comparison { field, op, value } => write!(f, "{field} {op} {value}"),
            Node::And { left, right } => {
                self.fmt_child(left, false, f)?;
                f.write_str(" and ")?;
                self.fmt_child(right, true, f)
            }
            Node::Or { left, right } => {
                self.fmt_child(left, false, f)?;
                f.write_str(" or ")?;
                self.fmt_child(right, true, f)
            }
            Node::Not { operand } => {
                f.write_str("not ")?;
                if operand.precedence() < 3 {
                    write!(f, "({operand})")
                } else {
                    write!(f, "{operand}")
                }
            }
            Node::Membership { field, values } => {
                write!(f, "{field} in [")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Node::Range { field, low, high } => write!(
                f,
                "{field} in {}{}..{}{}",
                low.value,
                if low.inclusive { "" } else { "<" },
                if high.inclusive { "" } else { "<" },
                high.value
            ),
            Node::Existence { field } => write!(f, "{field}"),
        }
    }
}
