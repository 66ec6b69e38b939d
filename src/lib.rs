//! # upbound
//!
//! Join-order optimization driven by guaranteed upper bounds on intermediate
//! result sizes instead of point estimates.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        JoinQuery + StatisticsProvider                    │
//! │  (relations, filter hints, equi-join predicates)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [join graph builder]
//! ┌─────────────────────────────────────────────────────────┐
//! │                    JoinGraph                             │
//! │  (post-filter row counts, distinct counts, max freqs)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [greedy selector + BoundProvider]
//! ┌─────────────────────────────────────────────────────────┐
//! │           Components (merged relation sets)              │
//! │           + bound tightening for unjoined relations      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [plan emitter]
//! ┌─────────────────────────────────────────────────────────┐
//! │       Plan (text / JSON / pg_hint_plan hints)            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ```
//! use upbound::prelude::*;
//!
//! let stats = StatisticsContext::new()
//!     .with_table("a", TableStatistics::new(1000).with_column("id", 1000, 1))
//!     .with_table("b", TableStatistics::new(50).with_column("a_id", 50, 1));
//! let query = JoinQuery::new()
//!     .relation(RelationRef::new("a"))
//!     .relation(RelationRef::new("b"))
//!     .equi_join("a.id".parse().unwrap(), "b.a_id".parse().unwrap());
//!
//! let plan = BoundOptimizer::default().optimize_query(&query, &stats).unwrap();
//! assert_eq!(plan.bound(), Bound::new(50));
//! ```

pub mod config;
pub mod input;
pub mod model;
pub mod planner;
pub mod stats;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::model::{
        Bound, ColumnRef, ColumnStats, CompareOp, FilterHint, JoinPredicate, JoinQuery, Relation,
        RelationRef,
    };
    pub use crate::planner::{
        BoundOptimizer, BoundProvider, CardinalityModel, FrequencyBound, JoinGraph,
        JoinGraphBuilder, JoinOperator, JoinStep, LearnedBound, OperatorPolicy, OptimizerOptions,
        Plan, PlanError, PlanResult, PlanWarning, StaticOverrides, StepKind,
    };
    pub use crate::stats::{
        ColumnStatistics, StatisticsContext, StatisticsProvider, TableStatistics,
    };
}

// Also export at crate root for convenience
pub use model::{Bound, JoinQuery};
pub use planner::{BoundOptimizer, Plan, PlanError};
pub use stats::{StatisticsContext, StatisticsProvider};
