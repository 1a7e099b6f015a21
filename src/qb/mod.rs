//! The Cypher query builder: a compositional AST with deterministic,
//! parameter-safe rendering (§3, §4.1–§4.6).

pub mod clause;
pub mod expr;
pub mod pattern;
pub mod query;
pub mod value;

pub use clause::{Assignment, Clause, OrderItem, RemoveItem};
pub use expr::{ArithmeticOp, CompareOp, Expression, LogicalOp};
pub use pattern::{Direction, Length, NodePattern, PathPattern, Pattern, PatternElement, RelationshipPattern};
pub use query::{AliasIndex, Query};
pub use value::{NodeRef, ParameterTable, PathRef, RelationshipRef, Value};

/// Shorthand constructor for an anonymous or aliased node pattern.
pub fn node() -> NodePattern {
    NodePattern::new()
}

/// Shorthand constructor for a relationship pattern.
pub fn rel() -> RelationshipPattern {
    RelationshipPattern::new()
}

/// Build a path pattern from alternating node/relationship elements,
/// validating the alternation at construction (§4.3).
pub fn path(elements: Vec<PatternElement>) -> crate::Result<PathPattern> {
    PathPattern::new(elements)
}
