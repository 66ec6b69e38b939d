// src/planner/join_optimizer/component.rs
//! Components: sets of relations already joined in the partial plan.

use crate::model::{Bound, ColumnRef};
use crate::planner::join_optimizer::cardinality::BoundProvider;
use crate::planner::join_optimizer::join_graph::{EdgeId, JoinGraph};
use crate::planner::plan::JoinStep;
use crate::planner::{PlanError, PlanResult};
use std::collections::{BTreeMap, BTreeSet};

/// Bounds on one join column inside a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnBound {
    /// Most rows of the component sharing one value of the column.
    pub max_frequency: Bound,
    /// Number of distinct values of the column in the component.
    pub distinct: Bound,
    /// The column's value domain was narrowed by a key/foreign-key join.
    pub key_capped: bool,
}

/// A maximal set of relations joined together so far.
#[derive(Debug, Clone)]
pub struct Component {
    id: usize,
    relations: BTreeSet<String>,
    bound: Bound,
    steps: Vec<JoinStep>,
    columns: BTreeMap<ColumnRef, ColumnBound>,
    pending: BTreeSet<EdgeId>,
}

impl Component {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn relations(&self) -> &BTreeSet<String> {
        &self.relations
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn is_singleton(&self) -> bool {
        self.relations.len() == 1
    }

    pub fn contains(&self, relation: &str) -> bool {
        self.relations.contains(relation)
    }

    /// Smallest relation name; used for deterministic ordering.
    pub fn first_relation(&self) -> &str {
        self.relations.iter().next().map(String::as_str).unwrap_or("")
    }

    pub fn bound(&self) -> Bound {
        self.bound
    }

    /// Join steps that produced this component, in selection order.
    pub fn steps(&self) -> &[JoinStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<JoinStep> {
        self.steps
    }

    pub fn column(&self, column: &ColumnRef) -> Option<ColumnBound> {
        self.columns.get(column).copied()
    }

    /// Unconsumed edges leaving this component.
    pub fn pending_edges(&self) -> &BTreeSet<EdgeId> {
        &self.pending
    }
}

/// How two components are combined.
#[derive(Debug, Clone, Copy)]
pub enum Link<'a> {
    /// Equi-join on `left` (a column of the left component) and `right`.
    Equi {
        left: &'a ColumnRef,
        right: &'a ColumnRef,
        key_join: bool,
    },
    Cross,
}

/// The live components of one optimization run.
pub struct ComponentSet<'g> {
    graph: &'g JoinGraph,
    components: BTreeMap<usize, Component>,
    owner: BTreeMap<String, usize>,
}

impl<'g> ComponentSet<'g> {
    /// One singleton component per relation, bounded by the provider's base bound.
    pub fn new(
        graph: &'g JoinGraph,
        relations: &[String],
        provider: &dyn BoundProvider,
    ) -> PlanResult<Self> {
        let scope: BTreeSet<&str> = relations.iter().map(String::as_str).collect();
        let mut components = BTreeMap::new();
        let mut owner = BTreeMap::new();

        for (id, name) in scope.iter().enumerate() {
            let relation = graph.relation(name).ok_or_else(|| {
                PlanError::MalformedQuery(format!("unknown relation '{}'", name))
            })?;
            let bound = provider.base_bound(relation);

            let columns = relation
                .columns
                .iter()
                .map(|(col, stats)| {
                    (
                        ColumnRef::new(name.to_string(), col.clone()),
                        ColumnBound {
                            max_frequency: Bound::from(stats.max_frequency).min(bound),
                            distinct: Bound::from(stats.distinct_count).min(bound),
                            key_capped: false,
                        },
                    )
                })
                .collect();

            let pending = graph
                .edges_of(name)
                .into_iter()
                .filter(|e| {
                    scope.contains(e.left.relation.as_str())
                        && scope.contains(e.right.relation.as_str())
                })
                .map(|e| e.id)
                .collect();

            components.insert(
                id,
                Component {
                    id,
                    relations: BTreeSet::from([name.to_string()]),
                    bound,
                    steps: Vec::new(),
                    columns,
                    pending,
                },
            );
            owner.insert(name.to_string(), id);
        }

        Ok(Self {
            graph,
            components,
            owner,
        })
    }

    pub fn graph(&self) -> &'g JoinGraph {
        self.graph
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Component> {
        self.components.get(&id)
    }

    pub fn id_of(&self, relation: &str) -> Option<usize> {
        self.owner.get(relation).copied()
    }

    pub fn component_of(&self, relation: &str) -> Option<&Component> {
        self.id_of(relation).and_then(|id| self.components.get(&id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Merge `right` into `left`, returning the id of the merged component.
    ///
    /// Every edge that becomes internal is dropped, which also collapses parallel
    /// edges between the two sides into the one that was chosen.
    pub fn merge(
        &mut self,
        left: usize,
        right: usize,
        link: Link<'_>,
        bound: Bound,
        step: JoinStep,
    ) -> PlanResult<usize> {
        if left == right {
            return Err(PlanError::MalformedQuery(
                "cannot join a component with itself".to_string(),
            ));
        }
        let l = self.take(left)?;
        let r = self.take(right)?;

        // Fan-out applied to the other side's columns
        let (left_fanout, right_fanout, key_join) = match link {
            Link::Equi {
                left: lc,
                right: rc,
                key_join,
            } => {
                let lb = l.column(lc).ok_or_else(|| missing_column(lc))?;
                let rb = r.column(rc).ok_or_else(|| missing_column(rc))?;
                (rb.max_frequency, lb.max_frequency, key_join)
            }
            Link::Cross => (r.bound, l.bound, false),
        };

        let mut columns = BTreeMap::new();
        for (col, cb) in &l.columns {
            columns.insert(col.clone(), widen(*cb, left_fanout, bound));
        }
        for (col, cb) in &r.columns {
            columns.insert(col.clone(), widen(*cb, right_fanout, bound));
        }

        if let Link::Equi {
            left: lc,
            right: rc,
            ..
        } = link
        {
            // Equal join columns share one value domain
            let shared = match (l.columns.get(lc), r.columns.get(rc)) {
                (Some(a), Some(b)) => a.distinct.min(b.distinct).min(bound),
                _ => bound,
            };
            for col in [lc, rc] {
                if let Some(cb) = columns.get_mut(col) {
                    cb.distinct = shared;
                    cb.key_capped |= key_join;
                }
            }
        }

        let mut relations = l.relations;
        relations.extend(r.relations);

        let graph = self.graph;
        let pending = l
            .pending
            .union(&r.pending)
            .copied()
            .filter(|id| {
                graph.edge(*id).is_some_and(|e| {
                    !(relations.contains(&e.left.relation) && relations.contains(&e.right.relation))
                })
            })
            .collect();

        let mut steps = l.steps;
        steps.extend(r.steps);
        steps.push(step);
        steps.sort_by_key(|s| s.index);

        for name in &relations {
            self.owner.insert(name.clone(), left);
        }
        self.components.insert(
            left,
            Component {
                id: left,
                relations,
                bound,
                steps,
                columns,
                pending,
            },
        );

        Ok(left)
    }

    pub fn into_components(self) -> Vec<Component> {
        self.components.into_values().collect()
    }

    fn take(&mut self, id: usize) -> PlanResult<Component> {
        self.components
            .remove(&id)
            .ok_or_else(|| PlanError::MalformedQuery(format!("unknown component {}", id)))
    }
}

fn widen(cb: ColumnBound, fanout: Bound, bound: Bound) -> ColumnBound {
    ColumnBound {
        max_frequency: cb.max_frequency.saturating_mul(fanout).min(bound),
        distinct: cb.distinct.min(bound),
        key_capped: cb.key_capped,
    }
}

fn missing_column(column: &ColumnRef) -> PlanError {
    PlanError::MissingStatistics {
        table: column.relation.clone(),
        column: Some(column.column.clone()),
    }
}
