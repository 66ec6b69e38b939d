// src/planner/join_optimizer/cardinality.rs
//! Upper bound calculation for joins.
//!
//! The selector only sees the [`BoundProvider`] trait. [`FrequencyBound`] is the
//! default and implements the frequency-domination bound; [`LearnedBound`] lets an
//! external cardinality model override it per join.

use crate::model::{Bound, ColumnRef, Relation};
use crate::planner::join_optimizer::component::ColumnBound;
use crate::planner::join_optimizer::join_graph::EdgeId;
use crate::planner::PlanResult;
use std::collections::{BTreeMap, BTreeSet};

/// One side of a candidate join.
#[derive(Debug, Clone, Copy)]
pub struct JoinSide<'a> {
    pub relations: &'a BTreeSet<String>,
    pub bound: Bound,
    pub column: &'a ColumnRef,
    pub stats: ColumnBound,
    /// Rows of this side that can find a join partner, when tightened below `bound`.
    pub eligible: Option<Bound>,
}

impl JoinSide<'_> {
    /// Rows that can take part in the join.
    pub fn participating_rows(&self) -> Bound {
        self.eligible.map_or(self.bound, |e| e.min(self.bound))
    }

    /// The join column is unique within this side.
    pub fn is_key(&self) -> bool {
        self.stats.max_frequency <= Bound::ONE
    }
}

/// A candidate join between two components.
#[derive(Debug, Clone, Copy)]
pub struct BoundRequest<'a> {
    pub edge: EdgeId,
    pub left: JoinSide<'a>,
    pub right: JoinSide<'a>,
}

/// Result of a join bound computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundEstimate {
    pub bound: Bound,
    /// One side's join column is a key, so the join cannot fan out on the other side.
    pub key_join: bool,
}

/// Supplies bounds for base relations and candidate joins.
pub trait BoundProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Bound of a base relation after filters.
    fn base_bound(&self, relation: &Relation) -> Bound {
        relation.base_bound()
    }

    fn join_bound(&self, request: &BoundRequest<'_>) -> PlanResult<BoundEstimate>;
}

/// Frequency-domination bound:
/// `min(|A| * maxfreq(B.b), |B| * maxfreq(A.a))`, collapsing to `|A|` (or `|B|`)
/// when the other side's join column is a key.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrequencyBound;

impl BoundProvider for FrequencyBound {
    fn name(&self) -> &str {
        "frequency"
    }

    fn join_bound(&self, request: &BoundRequest<'_>) -> PlanResult<BoundEstimate> {
        let left = &request.left;
        let right = &request.right;
        let left_rows = left.participating_rows();
        let right_rows = right.participating_rows();

        let mut bound = left_rows
            .saturating_mul(right.stats.max_frequency)
            .min(right_rows.saturating_mul(left.stats.max_frequency));

        if right.is_key() {
            bound = bound.min(left_rows);
        }
        if left.is_key() {
            bound = bound.min(right_rows);
        }

        Ok(BoundEstimate {
            bound,
            key_join: left.is_key() || right.is_key(),
        })
    }
}

/// An external cardinality model, e.g. a learned estimator.
pub trait CardinalityModel: Send + Sync {
    fn name(&self) -> &str {
        "model"
    }

    /// Estimated rows of joining the two relation sets, or `None` if the model has
    /// no opinion.
    fn estimate(&self, left: &BTreeSet<String>, right: &BTreeSet<String>) -> Option<f64>;
}

/// Bound provider backed by a [`CardinalityModel`].
///
/// Model estimates are rounded up. Joins the model does not cover use the
/// frequency bound.
pub struct LearnedBound<M> {
    model: M,
    fallback: FrequencyBound,
    clamp_to_frequency_bound: bool,
}

impl<M: CardinalityModel> LearnedBound<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            fallback: FrequencyBound,
            clamp_to_frequency_bound: true,
        }
    }

    /// Cap model estimates at the frequency bound (on by default).
    pub fn with_clamp(mut self, clamp: bool) -> Self {
        self.clamp_to_frequency_bound = clamp;
        self
    }
}

impl<M: CardinalityModel> BoundProvider for LearnedBound<M> {
    fn name(&self) -> &str {
        self.model.name()
    }

    fn join_bound(&self, request: &BoundRequest<'_>) -> PlanResult<BoundEstimate> {
        let frequency = self.fallback.join_bound(request)?;

        let Some(estimate) = self
            .model
            .estimate(request.left.relations, request.right.relations)
            .and_then(Bound::from_f64)
        else {
            return Ok(frequency);
        };

        let bound = if self.clamp_to_frequency_bound {
            estimate.min(frequency.bound)
        } else {
            estimate
        };
        tracing::trace!(
            edge = %request.edge,
            model = self.model.name(),
            %estimate,
            frequency = %frequency.bound,
            "model override"
        );

        Ok(BoundEstimate {
            bound,
            key_join: frequency.key_join,
        })
    }
}

/// A fixed table of cardinalities keyed by relation set.
#[derive(Debug, Clone, Default)]
pub struct StaticOverrides {
    cardinalities: BTreeMap<BTreeSet<String>, f64>,
}

impl StaticOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override<I, S>(mut self, relations: I, cardinality: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(relations, cardinality);
        self
    }

    pub fn insert<I, S>(&mut self, relations: I, cardinality: f64)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = relations.into_iter().map(Into::into).collect();
        self.cardinalities.insert(key, cardinality);
    }
}

impl CardinalityModel for StaticOverrides {
    fn name(&self) -> &str {
        "static-overrides"
    }

    fn estimate(&self, left: &BTreeSet<String>, right: &BTreeSet<String>) -> Option<f64> {
        let key: BTreeSet<String> = left.union(right).cloned().collect();
        self.cardinalities.get(&key).copied()
    }
}
