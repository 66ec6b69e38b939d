// src/planner/join_optimizer/tightening.rs
//! Bound tightening for relations that are not joined yet.
//!
//! After a key/foreign-key merge, the join columns of the merged component can only
//! hold values of the key side. A still-unjoined relation `R` attached to such a
//! column through `R.x = M.c` can then contribute at most
//! `distinct_M(c) * maxfreq_R(x)` rows to that join. The annotation is only read
//! while `R` is still a singleton component; base statistics are never changed.

use crate::model::Bound;
use crate::planner::join_optimizer::component::{Component, ComponentSet};
use crate::planner::join_optimizer::join_graph::EdgeId;
use std::collections::BTreeMap;

/// Eligible-row cap for the unjoined side of one edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tightening {
    pub relation: String,
    pub eligible: Bound,
}

#[derive(Debug, Default)]
pub struct BoundTightener {
    enabled: bool,
    annotations: BTreeMap<EdgeId, Tightening>,
}

impl BoundTightener {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            annotations: BTreeMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Eligible rows of `side` for `edge`, if `side` is the annotated unjoined relation.
    pub fn eligible(&self, edge: EdgeId, side: &Component) -> Option<Bound> {
        let t = self.annotations.get(&edge)?;
        (side.is_singleton() && side.contains(&t.relation)).then_some(t.eligible)
    }

    pub fn annotations(&self) -> &BTreeMap<EdgeId, Tightening> {
        &self.annotations
    }

    /// Re-derive annotations for the edges leaving a freshly merged component.
    pub fn propagate(&mut self, merged: &Component, components: &ComponentSet<'_>) {
        if !self.is_enabled() {
            return;
        }

        // Relations inside the merged component are no longer unjoined
        self.annotations
            .retain(|_, t| !merged.contains(&t.relation));

        let graph = components.graph();
        for id in merged.pending_edges() {
            let Some(edge) = graph.edge(*id) else {
                continue;
            };
            let (inner, outer) = if merged.contains(&edge.left.relation) {
                (&edge.left, &edge.right)
            } else {
                (&edge.right, &edge.left)
            };

            let Some(capped) = merged.column(inner).filter(|c| c.key_capped) else {
                continue;
            };
            let Some(target) = components.component_of(&outer.relation) else {
                continue;
            };
            if !target.is_singleton() {
                continue;
            }
            let Some(outer_stats) = target.column(outer) else {
                continue;
            };

            let eligible = capped
                .distinct
                .saturating_mul(outer_stats.max_frequency)
                .min(target.bound());

            if eligible < target.bound() {
                tracing::debug!(
                    edge = %id,
                    relation = %outer.relation,
                    %eligible,
                    rows = %target.bound(),
                    "tightened unjoined relation"
                );
            }
            self.annotations.insert(
                *id,
                Tightening {
                    relation: outer.relation.clone(),
                    eligible,
                },
            );
        }
    }
}
