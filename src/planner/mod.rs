//! Upper-bound-driven join-order planner.
//!
//! Three phases:
//! 1. Graph building: JoinQuery + statistics → JoinGraph (filters folded in)
//! 2. Greedy selection: JoinGraph → one Component per connected subgraph
//! 3. Emission: Components → Plan (cross products between subgraphs)

pub mod hints;
pub mod join_optimizer;
pub mod plan;

pub use join_optimizer::{
    BoundProvider, CardinalityModel, FrequencyBound, GreedySelector, JoinGraph,
    JoinGraphBuilder, LearnedBound, StaticOverrides,
};
pub use plan::{JoinOperator, JoinStep, OperatorPolicy, Plan, PlanWarning, StepKind};

use crate::model::JoinQuery;
use crate::stats::StatisticsProvider;
use thiserror::Error;

/// Errors that can occur during planning.
///
/// All of them abort optimization of the query; none is downgraded to a default bound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Missing statistics for {table}{}", column_suffix(.column))]
    MissingStatistics {
        table: String,
        column: Option<String>,
    },

    #[error("Bound provider failed: {0}")]
    Provider(String),
}

pub type PlanResult<T> = Result<T, PlanError>;

fn column_suffix(column: &Option<String>) -> String {
    column.as_ref().map(|c| format!(".{}", c)).unwrap_or_default()
}

/// Knobs of one optimizer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizerOptions {
    /// Derive eligible-row caps for unjoined relations after key joins.
    pub tightening: bool,
    pub operators: OperatorPolicy,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            tightening: true,
            operators: OperatorPolicy::Pessimistic,
        }
    }
}

/// Main entry point for bound-driven join ordering.
///
/// Holds no state between calls, so one optimizer can serve many queries
/// concurrently.
pub struct BoundOptimizer<'p> {
    provider: &'p dyn BoundProvider,
    options: OptimizerOptions,
}

impl<'p> BoundOptimizer<'p> {
    pub fn new(provider: &'p dyn BoundProvider) -> Self {
        Self {
            provider,
            options: OptimizerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OptimizerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Build the join graph for `query` and optimize it.
    pub fn optimize_query<S>(&self, query: &JoinQuery, stats: &S) -> PlanResult<Plan>
    where
        S: StatisticsProvider + ?Sized,
    {
        let graph = JoinGraphBuilder::new(stats).build(query)?;
        self.optimize(&graph)
    }

    /// Choose a join order for `graph`.
    ///
    /// Every connected subgraph is optimized independently; the resulting plans are
    /// combined by [`Plan::cross_product`].
    pub fn optimize(&self, graph: &JoinGraph) -> PlanResult<Plan> {
        let subgraphs = graph.connected_subgraphs();
        if subgraphs.len() > 1 {
            tracing::warn!(
                subgraphs = subgraphs.len(),
                "join graph is disconnected, falling back to cross products"
            );
        }

        let selector = self.selector(graph);
        let mut plans = Vec::with_capacity(subgraphs.len());
        for relations in &subgraphs {
            for component in selector.select(relations)? {
                plans.push(Plan::from_component(component));
            }
        }

        let plan = Plan::cross_product(plans, self.options.operators)
            .ok_or_else(|| PlanError::MalformedQuery("query has no relations".to_string()))?;
        tracing::debug!(
            provider = self.provider.name(),
            steps = plan.steps().len(),
            bound = %plan.bound(),
            "emitted plan"
        );
        Ok(plan)
    }

    /// Bound a caller-given left-deep join order, e.g. the one a native optimizer chose.
    pub fn evaluate_order(&self, graph: &JoinGraph, order: &[String]) -> PlanResult<Plan> {
        let component = self.selector(graph).replay(order)?;
        let mut plan = Plan::from_component(component);
        let subgraphs = graph.connected_subgraphs();
        if subgraphs.len() > 1 {
            plan = plan.with_warning(PlanWarning::DisconnectedGraph { subgraphs });
        }
        Ok(plan)
    }

    fn selector<'g>(&self, graph: &'g JoinGraph) -> GreedySelector<'g>
    where
        'p: 'g,
    {
        GreedySelector::new(graph, self.provider)
            .with_tightening(self.options.tightening)
            .with_operators(self.options.operators)
    }
}

impl Default for BoundOptimizer<'static> {
    fn default() -> Self {
        Self::new(&FrequencyBound)
    }
}
