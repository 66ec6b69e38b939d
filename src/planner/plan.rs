//! Emitted plans: ordered join steps annotated with upper bounds.

use crate::model::{Bound, ColumnRef};
use crate::planner::join_optimizer::component::Component;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Physical join operator attached to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOperator {
    HashJoin,
    NestedLoop,
    SortMerge,
}

impl fmt::Display for JoinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinOperator::HashJoin => "hash join",
            JoinOperator::NestedLoop => "nested loop",
            JoinOperator::SortMerge => "sort merge",
        };
        f.write_str(name)
    }
}

/// How join operators are assigned to plan steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorPolicy {
    /// Hash join for every equi-join, nested loop for cross products. Robust when
    /// the bounds are far above the true cardinalities.
    #[default]
    Pessimistic,
    /// Leave operator choice to the downstream optimizer.
    Unrestricted,
}

impl OperatorPolicy {
    pub fn assign(self, kind: &StepKind) -> Option<JoinOperator> {
        match (self, kind) {
            (OperatorPolicy::Unrestricted, _) => None,
            (OperatorPolicy::Pessimistic, StepKind::Join { .. }) => Some(JoinOperator::HashJoin),
            (OperatorPolicy::Pessimistic, StepKind::CrossProduct) => {
                Some(JoinOperator::NestedLoop)
            }
        }
    }
}

/// What a step joins on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    Join {
        left_column: ColumnRef,
        right_column: ColumnRef,
        key_join: bool,
    },
    CrossProduct,
}

/// One join in the chosen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinStep {
    /// Position in the plan, starting at 0.
    pub index: usize,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub kind: StepKind,
    /// Upper bound on the rows produced by this step.
    pub bound: Bound,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<JoinOperator>,
}

impl JoinStep {
    pub fn is_cross_product(&self) -> bool {
        matches!(self.kind, StepKind::CrossProduct)
    }

    /// All relations covered by the step's output, sorted.
    pub fn relations(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self.left.iter().chain(&self.right).collect();
        set.into_iter().cloned().collect()
    }
}

/// Non-fatal conditions found while planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanWarning {
    /// The join graph has several connected subgraphs, combined by cross product.
    DisconnectedGraph { subgraphs: Vec<Vec<String>> },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::DisconnectedGraph { subgraphs } => {
                let parts: Vec<String> = subgraphs
                    .iter()
                    .map(|s| format!("{{{}}}", s.join(", ")))
                    .collect();
                write!(
                    f,
                    "join graph is disconnected ({}); subgraphs are combined by cross product",
                    parts.join(" ")
                )
            }
        }
    }
}

/// An ordered join plan with per-step upper bounds. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    relations: Vec<String>,
    steps: Vec<JoinStep>,
    bound: Bound,
    contains_cross_join: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<PlanWarning>,
}

impl Plan {
    /// Emit the plan of one finished component.
    pub fn from_component(component: Component) -> Self {
        let relations = component.relations().iter().cloned().collect();
        let bound = component.bound();
        let steps = component.into_steps();
        let contains_cross_join = steps.iter().any(JoinStep::is_cross_product);

        Self {
            relations,
            steps,
            bound,
            contains_cross_join,
            warnings: Vec::new(),
        }
    }

    /// Combine independently optimized plans by cross product.
    ///
    /// Inputs are ordered by ascending bound (ties: first relation name). Their steps
    /// are concatenated in that order, followed by one cross-product step per
    /// additional input whose bound is the product of both sides.
    pub fn cross_product(mut plans: Vec<Plan>, policy: OperatorPolicy) -> Option<Plan> {
        plans.sort_by(|a, b| {
            a.bound
                .cmp(&b.bound)
                .then_with(|| a.relations.first().cmp(&b.relations.first()))
        });
        let mut plans = plans.into_iter();
        let mut acc = plans.next()?;

        let mut subgraphs = vec![acc.relations.clone()];
        let mut acc_relations = acc.relations.clone();
        let mut pending_cross = Vec::new();
        let mut bound = acc.bound;

        for plan in plans {
            subgraphs.push(plan.relations.clone());
            bound = bound.saturating_mul(plan.bound);

            let kind = StepKind::CrossProduct;
            pending_cross.push(JoinStep {
                index: 0,
                left: acc_relations.clone(),
                right: plan.relations.clone(),
                operator: policy.assign(&kind),
                kind,
                bound,
            });

            acc_relations.extend(plan.relations);
            acc_relations.sort();
            acc.steps.extend(plan.steps);
            acc.warnings.extend(plan.warnings);
        }

        if pending_cross.is_empty() {
            return Some(acc);
        }

        acc.steps.extend(pending_cross);
        for (index, step) in acc.steps.iter_mut().enumerate() {
            step.index = index;
        }

        let mut warnings = vec![PlanWarning::DisconnectedGraph { subgraphs }];
        warnings.append(&mut acc.warnings);

        Some(Plan {
            relations: acc_relations,
            steps: acc.steps,
            bound,
            contains_cross_join: true,
            warnings,
        })
    }

    pub(crate) fn with_warning(mut self, warning: PlanWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    /// Relations covered by the plan, sorted.
    pub fn relations(&self) -> &[String] {
        &self.relations
    }

    pub fn steps(&self) -> &[JoinStep] {
        &self.steps
    }

    /// Upper bound on the final result.
    pub fn bound(&self) -> Bound {
        self.bound
    }

    pub fn contains_cross_join(&self) -> bool {
        self.contains_cross_join
    }

    pub fn warnings(&self) -> &[PlanWarning] {
        &self.warnings
    }

    /// Relation-level join order: each relation in the order it enters the plan.
    pub fn join_order(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::with_capacity(self.relations.len());
        let mut seen = BTreeSet::new();
        for step in &self.steps {
            for rel in step.left.iter().chain(&step.right) {
                if seen.insert(rel.as_str()) {
                    order.push(rel.clone());
                }
            }
        }
        for rel in &self.relations {
            if !seen.contains(rel.as_str()) {
                order.push(rel.clone());
            }
        }
        order
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "plan over {} relation(s), {} step(s), bound {}",
            self.relations.len(),
            self.steps.len(),
            self.bound
        )?;
        for step in &self.steps {
            let join = match &step.kind {
                StepKind::Join {
                    left_column,
                    right_column,
                    key_join,
                } => {
                    let key = if *key_join { " [key]" } else { "" };
                    format!(
                        "JOIN {{{}}} ON {} = {}{}",
                        step.right.join(", "),
                        left_column,
                        right_column,
                        key
                    )
                }
                StepKind::CrossProduct => format!("CROSS JOIN {{{}}}", step.right.join(", ")),
            };
            let op = step
                .operator
                .map(|op| format!(" ({})", op))
                .unwrap_or_default();
            writeln!(
                f,
                "  {}: {{{}}} {} -> {}{}",
                step.index + 1,
                step.left.join(", "),
                join,
                step.bound,
                op
            )?;
        }
        for warning in &self.warnings {
            writeln!(f, "  warning: {}", warning)?;
        }
        Ok(())
    }
}
