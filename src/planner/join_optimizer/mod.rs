// src/planner/join_optimizer/mod.rs
//! Bound-driven join ordering: graph, bounds, components, greedy selection.

pub mod cardinality;
pub mod component;
pub mod greedy;
pub mod join_graph;
pub mod tightening;

pub use cardinality::{
    BoundEstimate, BoundProvider, BoundRequest, CardinalityModel, FrequencyBound, JoinSide,
    LearnedBound, StaticOverrides,
};
pub use component::{ColumnBound, Component, ComponentSet, Link};
pub use greedy::{Candidate, GreedySelector};
pub use join_graph::{EdgeId, JoinEdge, JoinGraph, JoinGraphBuilder};
pub use tightening::{BoundTightener, Tightening};
