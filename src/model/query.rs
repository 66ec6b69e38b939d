//! A join query as handed to the optimizer.

use super::predicate::{ColumnRef, JoinPredicate};
use super::relation::RelationRef;
use serde::{Deserialize, Serialize};

/// A conjunctive inner-join query: relations plus join predicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinQuery {
    pub relations: Vec<RelationRef>,
    #[serde(default)]
    pub predicates: Vec<JoinPredicate>,
}

impl JoinQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relation(mut self, relation: RelationRef) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn predicate(mut self, predicate: JoinPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Add `left = right`.
    pub fn equi_join(self, left: ColumnRef, right: ColumnRef) -> Self {
        self.predicate(JoinPredicate::equi(left, right))
    }
}
