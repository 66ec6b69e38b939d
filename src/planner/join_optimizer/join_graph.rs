// src/planner/join_optimizer/join_graph.rs
use crate::model::{ColumnRef, ColumnStats, FilterHint, JoinQuery, Relation, RelationRef};
use crate::planner::{PlanError, PlanResult};
use crate::stats::StatisticsProvider;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Stable identifier of a join edge within one [`JoinGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub usize);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// An equi-join predicate between two relations.
///
/// Stored normalized: `left.relation < right.relation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinEdge {
    pub id: EdgeId,
    pub left: ColumnRef,
    pub right: ColumnRef,
}

impl JoinEdge {
    pub fn touches(&self, relation: &str) -> bool {
        self.left.relation == relation || self.right.relation == relation
    }

    /// The column this edge uses on `relation`.
    pub fn column_on(&self, relation: &str) -> Option<&ColumnRef> {
        if self.left.relation == relation {
            Some(&self.left)
        } else if self.right.relation == relation {
            Some(&self.right)
        } else {
            None
        }
    }

    /// The column on the side opposite to `relation`.
    pub fn opposite(&self, relation: &str) -> Option<&ColumnRef> {
        if self.left.relation == relation {
            Some(&self.right)
        } else if self.right.relation == relation {
            Some(&self.left)
        } else {
            None
        }
    }
}

impl fmt::Display for JoinEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}

/// Undirected join graph: relations are nodes, equi-join predicates are edges.
///
/// Built once per query and read-only afterwards. May be disconnected.
#[derive(Debug, Clone)]
pub struct JoinGraph {
    graph: UnGraph<Relation, EdgeId>,
    node_index: BTreeMap<String, NodeIndex>,
    edges: Vec<JoinEdge>,
}

impl JoinGraph {
    /// Build a graph from already-folded relations and equi-join column pairs.
    ///
    /// Edges are normalized, deduplicated and numbered in sorted order so that
    /// edge identifiers do not depend on predicate order in the input.
    pub fn from_parts(
        relations: Vec<Relation>,
        joins: impl IntoIterator<Item = (ColumnRef, ColumnRef)>,
    ) -> PlanResult<Self> {
        let mut graph = UnGraph::default();
        let mut node_index = BTreeMap::new();

        for relation in relations {
            if node_index.contains_key(&relation.name) {
                return Err(PlanError::MalformedQuery(format!(
                    "relation '{}' appears more than once",
                    relation.name
                )));
            }
            let name = relation.name.clone();
            let idx = graph.add_node(relation);
            node_index.insert(name, idx);
        }

        let mut pairs = BTreeSet::new();
        for (a, b) in joins {
            for col in [&a, &b] {
                let idx = node_index.get(&col.relation).ok_or_else(|| {
                    PlanError::MalformedQuery(format!(
                        "join column {} references unknown relation '{}'",
                        col, col.relation
                    ))
                })?;
                if graph[*idx].column(&col.column).is_none() {
                    return Err(PlanError::MissingStatistics {
                        table: graph[*idx].table.clone(),
                        column: Some(col.column.clone()),
                    });
                }
            }
            if a.relation == b.relation {
                return Err(PlanError::MalformedQuery(format!(
                    "predicate {} = {} does not join two relations",
                    a, b
                )));
            }
            pairs.insert(if a < b { (a, b) } else { (b, a) });
        }

        let mut edges = Vec::with_capacity(pairs.len());
        for (id, (left, right)) in pairs.into_iter().enumerate() {
            let id = EdgeId(id);
            graph.add_edge(node_index[&left.relation], node_index[&right.relation], id);
            edges.push(JoinEdge { id, left, right });
        }

        Ok(Self {
            graph,
            node_index,
            edges,
        })
    }

    pub fn relation_count(&self) -> usize {
        self.node_index.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.node_index.get(name).map(|idx| &self.graph[*idx])
    }

    /// Relations in name order.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.node_index.values().map(|idx| &self.graph[*idx])
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.node_index.keys().map(String::as_str)
    }

    /// Edges in identifier order.
    pub fn edges(&self) -> &[JoinEdge] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> Option<&JoinEdge> {
        self.edges.get(id.0)
    }

    /// Edges incident to `relation`, in identifier order.
    pub fn edges_of(&self, relation: &str) -> Vec<&JoinEdge> {
        let Some(idx) = self.node_index.get(relation) else {
            return Vec::new();
        };
        let mut ids: Vec<EdgeId> = self.graph.edges(*idx).map(|e| *e.weight()).collect();
        ids.sort();
        ids.into_iter().map(|id| &self.edges[id.0]).collect()
    }

    pub fn are_joinable(&self, t1: &str, t2: &str) -> bool {
        match (self.node_index.get(t1), self.node_index.get(t2)) {
            (Some(a), Some(b)) => self.graph.find_edge(*a, *b).is_some(),
            _ => false,
        }
    }

    /// Connected subgraphs as sorted relation-name lists, ordered by their first name.
    pub fn connected_subgraphs(&self) -> Vec<Vec<String>> {
        let mut sets = UnionFind::<usize>::new(self.graph.node_count());
        for edge in self.graph.edge_references() {
            sets.union(edge.source().index(), edge.target().index());
        }

        let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (name, idx) in &self.node_index {
            groups
                .entry(sets.find(idx.index()))
                .or_default()
                .push(name.clone());
        }

        let mut subgraphs: Vec<Vec<String>> = groups.into_values().collect();
        subgraphs.sort();
        subgraphs
    }

    pub fn is_connected(&self) -> bool {
        self.connected_subgraphs().len() <= 1
    }
}

/// Builds a [`JoinGraph`] from a [`JoinQuery`] using an injected statistics source.
pub struct JoinGraphBuilder<'a, S: StatisticsProvider + ?Sized> {
    stats: &'a S,
}

impl<'a, S: StatisticsProvider + ?Sized> JoinGraphBuilder<'a, S> {
    pub fn new(stats: &'a S) -> Self {
        Self { stats }
    }

    pub fn build(&self, query: &JoinQuery) -> PlanResult<JoinGraph> {
        if query.relations.is_empty() {
            return Err(PlanError::MalformedQuery("query has no relations".to_string()));
        }

        let mut by_name: BTreeMap<&str, &RelationRef> = BTreeMap::new();
        for rel in &query.relations {
            if by_name.insert(rel.name.as_str(), rel).is_some() {
                return Err(PlanError::MalformedQuery(format!(
                    "relation '{}' appears more than once",
                    rel.name
                )));
            }
        }

        // Validate predicates and collect the join columns of every relation
        let mut join_columns: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut joins = Vec::with_capacity(query.predicates.len());
        for pred in &query.predicates {
            if !pred.is_equi() {
                return Err(PlanError::MalformedQuery(format!(
                    "unsupported non-equi join predicate: {}",
                    pred
                )));
            }
            if pred.left.relation == pred.right.relation {
                return Err(PlanError::MalformedQuery(format!(
                    "predicate {} does not join two relations",
                    pred
                )));
            }
            for col in [&pred.left, &pred.right] {
                let rel = by_name.get(col.relation.as_str()).ok_or_else(|| {
                    PlanError::MalformedQuery(format!(
                        "predicate {} references unknown relation '{}'",
                        pred, col.relation
                    ))
                })?;
                if self.stats.column(rel.table_name(), &col.column).is_none() {
                    return Err(PlanError::MalformedQuery(format!(
                        "predicate {} references unknown column '{}' of table '{}'",
                        pred,
                        col.column,
                        rel.table_name()
                    )));
                }
                join_columns
                    .entry(col.relation.as_str())
                    .or_default()
                    .insert(col.column.as_str());
            }
            joins.push((pred.left.clone(), pred.right.clone()));
        }

        let mut relations = Vec::with_capacity(query.relations.len());
        for rel in &query.relations {
            let columns = join_columns.get(rel.name.as_str());
            relations.push(self.fold_relation(rel, columns)?);
        }

        let graph = JoinGraph::from_parts(relations, joins)?;
        tracing::debug!(
            relations = graph.relation_count(),
            edges = graph.edge_count(),
            "built join graph"
        );
        Ok(graph)
    }

    /// Apply filter hints and clamp join-column statistics to the filtered row count.
    fn fold_relation(
        &self,
        rel: &RelationRef,
        join_columns: Option<&BTreeSet<&str>>,
    ) -> PlanResult<Relation> {
        let table = rel.table_name();
        let base_rows = self
            .stats
            .row_count(table)
            .ok_or_else(|| PlanError::MissingStatistics {
                table: table.to_string(),
                column: None,
            })?;
        let rows = filtered_rows(base_rows, &rel.filters).map_err(|msg| {
            PlanError::MalformedQuery(format!("relation '{}': {}", rel.name, msg))
        })?;

        let mut relation = Relation::new(&rel.name, table, rows);
        relation.filtered = !rel.filters.is_empty();

        for column in join_columns.into_iter().flatten() {
            let missing = || PlanError::MissingStatistics {
                table: table.to_string(),
                column: Some(column.to_string()),
            };
            let raw = self.stats.column(table, column).ok_or_else(missing)?;
            let distinct = raw.distinct_count.ok_or_else(missing)?;
            let max_frequency = raw.max_frequency.ok_or_else(missing)?;
            relation = relation.with_column(
                column,
                ColumnStats::fold(distinct, max_frequency, base_rows, rows),
            );
        }

        Ok(relation)
    }
}

/// Row count after all filter hints.
///
/// Hints are combined by minimum: each one alone bounds the surviving rows, while
/// their product would assume independent filters.
pub fn filtered_rows(base_rows: u64, filters: &[FilterHint]) -> Result<u64, String> {
    let mut rows = base_rows;
    for filter in filters {
        let bounded = match *filter {
            FilterHint::Selectivity(s) => {
                if !(0.0..=1.0).contains(&s) {
                    return Err(format!("selectivity {} is outside [0, 1]", s));
                }
                scale_rows_up(base_rows, s)
            }
            FilterHint::RowCount(n) => n,
        };
        rows = rows.min(bounded);
    }
    Ok(rows)
}

/// `ceil(rows * selectivity)` over the exact binary value of `selectivity`.
///
/// Computed in integer space: `rows as f64` drops low bits above 2^53, which
/// would round the result below the true count.
fn scale_rows_up(rows: u64, selectivity: f64) -> u64 {
    if selectivity <= 0.0 {
        return 0;
    }
    if selectivity >= 1.0 {
        return rows;
    }

    // selectivity == mantissa * 2^-shift
    let bits = selectivity.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as u32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, shift) = if exponent == 0 {
        (fraction, 1074)
    } else {
        (fraction | (1u64 << 52), 1075 - exponent)
    };

    // rows * mantissa < 2^117
    let product = u128::from(rows) * u128::from(mantissa);
    if shift >= 128 {
        return u64::from(product > 0);
    }
    let scaled = (product + (1u128 << shift) - 1) >> shift;
    // selectivity < 1, so the result never exceeds rows
    u64::try_from(scaled).unwrap_or(rows).min(rows)
}
