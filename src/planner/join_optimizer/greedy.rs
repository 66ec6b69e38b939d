// src/planner/join_optimizer/greedy.rs
//! Greedy join-order selection driven by upper bounds.
//!
//! Kruskal-style: every round evaluates each unconsumed edge between two distinct
//! components, applies the one with the smallest bound and merges its components.
//!
//! Ties are broken in this order:
//! 1. key/foreign-key joins first
//! 2. smallest combined bound of the two input components
//! 3. edge order (left relation, left column, right relation, right column)

use crate::model::{Bound, ColumnRef};
use crate::planner::join_optimizer::cardinality::{
    BoundEstimate, BoundProvider, BoundRequest, JoinSide,
};
use crate::planner::join_optimizer::component::{Component, ComponentSet, Link};
use crate::planner::join_optimizer::join_graph::{EdgeId, JoinGraph};
use crate::planner::join_optimizer::tightening::BoundTightener;
use crate::planner::plan::{JoinStep, OperatorPolicy, StepKind};
use crate::planner::{PlanError, PlanResult};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// A join edge evaluated as the next step.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub edge: EdgeId,
    pub left: usize,
    pub right: usize,
    pub left_column: ColumnRef,
    pub right_column: ColumnRef,
    pub estimate: BoundEstimate,
    /// Combined bound of the two input components.
    pub input_size: Bound,
}

impl Candidate {
    /// Total order used for selection; smaller is better.
    pub fn compare(&self, other: &Candidate) -> Ordering {
        self.estimate
            .bound
            .cmp(&other.estimate.bound)
            .then_with(|| other.estimate.key_join.cmp(&self.estimate.key_join))
            .then_with(|| self.input_size.cmp(&other.input_size))
            .then_with(|| self.edge.cmp(&other.edge))
    }
}

/// Greedy selector over one join graph.
pub struct GreedySelector<'a> {
    graph: &'a JoinGraph,
    provider: &'a dyn BoundProvider,
    tightening: bool,
    operators: OperatorPolicy,
}

impl<'a> GreedySelector<'a> {
    pub fn new(graph: &'a JoinGraph, provider: &'a dyn BoundProvider) -> Self {
        Self {
            graph,
            provider,
            tightening: true,
            operators: OperatorPolicy::default(),
        }
    }

    pub fn with_tightening(mut self, enabled: bool) -> Self {
        self.tightening = enabled;
        self
    }

    pub fn with_operators(mut self, operators: OperatorPolicy) -> Self {
        self.operators = operators;
        self
    }

    /// Join `relations` greedily until no edge connects two components.
    ///
    /// Returns the remaining components: one per connected subgraph of `relations`.
    pub fn select(&self, relations: &[String]) -> PlanResult<Vec<Component>> {
        let mut components = ComponentSet::new(self.graph, relations, self.provider)?;
        let mut tightener = BoundTightener::new(self.tightening);
        let mut round = 0;

        loop {
            let candidates = self.candidates(&components, &tightener)?;
            let Some(best) = candidates.into_iter().min_by(|a, b| a.compare(b)) else {
                break;
            };

            tracing::debug!(
                round,
                edge = %best.edge,
                left = %best.left_column,
                right = %best.right_column,
                bound = %best.estimate.bound,
                key_join = best.estimate.key_join,
                "selected join"
            );

            let merged = self.apply(&mut components, &best, round)?;
            if let Some(component) = components.get(merged) {
                tightener.propagate(component, &components);
            }
            round += 1;
        }

        Ok(components.into_components())
    }

    /// Replay a caller-given left-deep order with the same bound machinery.
    ///
    /// Each next relation joins the current component through its smallest-bound
    /// edge, or by cross product when no edge connects them.
    pub fn replay(&self, order: &[String]) -> PlanResult<Component> {
        let mut seen = BTreeSet::new();
        for name in order {
            if self.graph.relation(name).is_none() {
                return Err(PlanError::MalformedQuery(format!(
                    "join order references unknown relation '{}'",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(PlanError::MalformedQuery(format!(
                    "relation '{}' appears more than once in the join order",
                    name
                )));
            }
        }
        if seen.len() != self.graph.relation_count() {
            return Err(PlanError::MalformedQuery(format!(
                "join order covers {} of {} relations",
                seen.len(),
                self.graph.relation_count()
            )));
        }

        let mut components = ComponentSet::new(self.graph, order, self.provider)?;
        let mut tightener = BoundTightener::new(self.tightening);
        let (first, rest) = order
            .split_first()
            .ok_or_else(|| PlanError::MalformedQuery("join order is empty".to_string()))?;
        let mut current = components
            .id_of(first)
            .ok_or_else(|| unknown_relation(first))?;

        for (round, name) in rest.iter().enumerate() {
            let next = components.id_of(name).ok_or_else(|| unknown_relation(name))?;

            let best = self
                .candidates(&components, &tightener)?
                .into_iter()
                .filter(|c| {
                    (c.left == current && c.right == next) || (c.left == next && c.right == current)
                })
                .min_by(|a, b| a.compare(b));

            current = match best {
                Some(candidate) => self.apply(&mut components, &candidate, round)?,
                None => self.apply_cross(&mut components, current, next, round)?,
            };
            if let Some(component) = components.get(current) {
                tightener.propagate(component, &components);
            }
        }

        components
            .into_components()
            .into_iter()
            .next()
            .ok_or_else(|| PlanError::MalformedQuery("join order is empty".to_string()))
    }

    /// Evaluate every unconsumed edge between two distinct components.
    fn candidates(
        &self,
        components: &ComponentSet<'_>,
        tightener: &BoundTightener,
    ) -> PlanResult<Vec<Candidate>> {
        let mut edges = BTreeSet::new();
        for component in components.iter() {
            edges.extend(component.pending_edges().iter().copied());
        }

        let mut candidates = Vec::with_capacity(edges.len());
        for id in edges {
            let Some(edge) = self.graph.edge(id) else {
                continue;
            };
            let (Some(a), Some(b)) = (
                components.component_of(&edge.left.relation),
                components.component_of(&edge.right.relation),
            ) else {
                continue;
            };
            if a.id() == b.id() {
                continue;
            }

            // Left side: more relations, then the smaller first relation name
            let a_first = match a.relation_count().cmp(&b.relation_count()) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => a.first_relation() < b.first_relation(),
            };
            let (left, right, left_column, right_column) = if a_first {
                (a, b, &edge.left, &edge.right)
            } else {
                (b, a, &edge.right, &edge.left)
            };

            let estimate = self.estimate(id, left, right, left_column, right_column, tightener)?;
            tracing::trace!(edge = %id, bound = %estimate.bound, "candidate");

            candidates.push(Candidate {
                edge: id,
                left: left.id(),
                right: right.id(),
                left_column: left_column.clone(),
                right_column: right_column.clone(),
                estimate,
                input_size: left.bound().saturating_add(right.bound()),
            });
        }

        Ok(candidates)
    }

    fn estimate(
        &self,
        edge: EdgeId,
        left: &Component,
        right: &Component,
        left_column: &ColumnRef,
        right_column: &ColumnRef,
        tightener: &BoundTightener,
    ) -> PlanResult<BoundEstimate> {
        let left_stats = left
            .column(left_column)
            .ok_or_else(|| missing_column(left_column))?;
        let right_stats = right
            .column(right_column)
            .ok_or_else(|| missing_column(right_column))?;

        // Empty inputs stay empty; the provider is not consulted
        if left.bound().is_zero() || right.bound().is_zero() {
            return Ok(BoundEstimate {
                bound: Bound::ZERO,
                key_join: false,
            });
        }

        let request = BoundRequest {
            edge,
            left: JoinSide {
                relations: left.relations(),
                bound: left.bound(),
                column: left_column,
                stats: left_stats,
                eligible: tightener.eligible(edge, left),
            },
            right: JoinSide {
                relations: right.relations(),
                bound: right.bound(),
                column: right_column,
                stats: right_stats,
                eligible: tightener.eligible(edge, right),
            },
        };
        self.provider.join_bound(&request)
    }

    fn apply(
        &self,
        components: &mut ComponentSet<'_>,
        candidate: &Candidate,
        round: usize,
    ) -> PlanResult<usize> {
        let kind = StepKind::Join {
            left_column: candidate.left_column.clone(),
            right_column: candidate.right_column.clone(),
            key_join: candidate.estimate.key_join,
        };
        let step = self.step(
            components,
            candidate.left,
            candidate.right,
            kind,
            candidate.estimate.bound,
            round,
        )?;

        components.merge(
            candidate.left,
            candidate.right,
            Link::Equi {
                left: &candidate.left_column,
                right: &candidate.right_column,
                key_join: candidate.estimate.key_join,
            },
            candidate.estimate.bound,
            step,
        )
    }

    fn apply_cross(
        &self,
        components: &mut ComponentSet<'_>,
        left: usize,
        right: usize,
        round: usize,
    ) -> PlanResult<usize> {
        let bound = match (components.get(left), components.get(right)) {
            (Some(l), Some(r)) => l.bound().saturating_mul(r.bound()),
            _ => {
                return Err(PlanError::MalformedQuery(
                    "cross product over unknown component".to_string(),
                ))
            }
        };
        tracing::debug!(round, %bound, "cross product");

        let step = self.step(components, left, right, StepKind::CrossProduct, bound, round)?;
        components.merge(left, right, Link::Cross, bound, step)
    }

    fn step(
        &self,
        components: &ComponentSet<'_>,
        left: usize,
        right: usize,
        kind: StepKind,
        bound: Bound,
        index: usize,
    ) -> PlanResult<JoinStep> {
        let names = |id: usize| -> PlanResult<Vec<String>> {
            components
                .get(id)
                .map(|c| c.relations().iter().cloned().collect())
                .ok_or_else(|| PlanError::MalformedQuery(format!("unknown component {}", id)))
        };

        Ok(JoinStep {
            index,
            left: names(left)?,
            right: names(right)?,
            operator: self.operators.assign(&kind),
            kind,
            bound,
        })
    }
}

fn unknown_relation(name: &str) -> PlanError {
    PlanError::MalformedQuery(format!("unknown relation '{}'", name))
}

fn missing_column(column: &ColumnRef) -> PlanError {
    PlanError::MissingStatistics {
        table: column.relation.clone(),
        column: Some(column.column.clone()),
    }
}
