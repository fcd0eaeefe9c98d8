//! Literal type resolution.
//!
//! Every leaf predicate is checked here while it is being built, so a tree
//! that leaves the parser is well typed and no compiler ever has to guess.

use regex::Regex;
use thiserror::Error;

use crate::{
    ast::{Bound, CompareOp, FieldRef, Literal, LiteralType, Quantifier},
    lexer::Position,
};

/// Operator applied to a literal of the wrong type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("operator `{operator}` cannot be applied to a {found} literal at {position}")]
    Operator {
        operator: CompareOp,
        found: LiteralType,
        position: Position,
    },

    #[error("range bounds must have the same type, found {low} and {high} at {position}")]
    RangeBounds {
        low: LiteralType,
        high: LiteralType,
        position: Position,
    },

    #[error("{found} literal cannot be used as a range bound at {position}")]
    RangeBound {
        found: LiteralType,
        position: Position,
    },

    #[error("membership lists take scalar values, found {found} at {position}")]
    MembershipValue {
        found: LiteralType,
        position: Position,
    },

    #[error("`all(...)` cannot be compared with an array literal at {position}")]
    QuantifiedArray { position: Position },
}

impl TypeError {
    pub fn position(&self) -> Position {
        match self {
            TypeError::Operator { position, .. }
            | TypeError::RangeBounds { position, .. }
            | TypeError::RangeBound { position, .. }
            | TypeError::MembershipValue { position, .. }
            | TypeError::QuantifiedArray { position } => *position,
        }
    }
}

/// Checks `field op value`.
///
/// - `=`/`!=` accept every literal type.
/// - Ordering operators accept numbers, strings and dates.
/// - `~=` accepts strings only.
pub fn check_comparison(
    field: &FieldRef,
    op: CompareOp,
    value: &Literal,
    position: Position,
) -> Result<(), TypeError> {
    let found = value.kind();
    let legal = match op {
        CompareOp::Eq | CompareOp::Ne => true,
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => found.is_ordered(),
        CompareOp::Regex => found == LiteralType::String,
    };
    if !legal {
        return Err(TypeError::Operator {
            operator: op,
            found,
            position,
        });
    }
    if field.quantifier == Quantifier::All && found == LiteralType::Array {
        return Err(TypeError::QuantifiedArray { position });
    }
    Ok(())
}

/// Membership lists hold scalars only.
pub fn check_membership_value(value: &Literal, position: Position) -> Result<(), TypeError> {
    match value.kind() {
        LiteralType::Array => Err(TypeError::MembershipValue {
            found: LiteralType::Array,
            position,
        }),
        _ => Ok(()),
    }
}

/// Both bounds must be ordered and of the same family.
pub fn check_range(low: &Bound, high: &Bound, position: Position) -> Result<(), TypeError> {
    let (low, high) = (low.value.kind(), high.value.kind());
    for found in [low, high] {
        if !found.is_ordered() {
            return Err(TypeError::RangeBound { found, position });
        }
    }
    if !low.same_family(high) {
        return Err(TypeError::RangeBounds {
            low,
            high,
            position,
        });
    }
    Ok(())
}

/// Compiles a `~=` pattern, returning the engine's message on failure.
pub fn compile_pattern(pattern: &str) -> Result<Regex, String> {
    Regex::new(pattern).map_err(|e| e.to_string())
}
