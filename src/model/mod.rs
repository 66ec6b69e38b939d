//! Query-side data model: relations, filters, predicates and bounds.

pub mod bound;
pub mod predicate;
pub mod query;
pub mod relation;

pub use bound::Bound;
pub use predicate::{ColumnRef, CompareOp, JoinPredicate};
pub use query::JoinQuery;
pub use relation::{ColumnStats, FilterHint, Relation, RelationRef};
