//! # ABCD Filter Language - Abstract Syntax Tree
//!
//! This module defines the tree a filter expression is parsed into. The tree is
//! backend independent: the same [`Node`] is handed to every compiler in
//! [`crate::compile`] and each one produces its own native filter from it.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[node]** - Predicate and boolean combinator nodes
//! - **[operators]** - Comparison operators
//! - **[literal]** - Typed literal values and their inferred kinds
//! - **[field]** - Dotted field paths and the array quantifier
//!
//! ## Quick Start
//!
//! ```text
//! energy < -10.5 and pbc = [true, true, true] and not config_type ~= "^bulk"
//! ```
//!
//! ## Precedence
//!
//! `not` binds tighter than `and`, which binds tighter than `or`. Both binary
//! operators are left-associative and parentheses override:
//!
//! ```text
//! a = 1 or b = 2 and c = 3      ==   a = 1 or (b = 2 and c = 3)
//! ```
//!
//! ## Array Fields
//!
//! A bare field matches when *any* of its values satisfies the predicate. The
//! explicit `all(field)` form requires every element to satisfy it:
//!
//! ```text
//! forces_norm < 0.05            // some atom below the threshold
//! all(forces_norm) < 0.05       // every atom below the threshold
//! ```
//!
//! ## Immutability
//!
//! Nodes are never mutated once built. Compiling the same tree for two backends
//! borrows it twice and cannot leak state between the two results.
pub mod field;
pub mod literal;
pub mod node;
pub mod operators;
pub mod tokens;

pub use field::{FieldPath, FieldRef, Quantifier};
pub use literal::{Literal, LiteralType};
pub use node::{Bound, Node};
pub use operators::CompareOp;
pub use tokens::{Token, TokenKind};
