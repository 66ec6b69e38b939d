// tests/planner/soundness_test.rs
//! Every step bound must cover the rows the step really produces.
//!
//! Small random tables are generated together with their exact statistics; the
//! chosen steps are then executed naively and each intermediate result is counted.

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use upbound::model::{ColumnRef, FilterHint, JoinQuery, RelationRef};
use upbound::planner::{BoundOptimizer, JoinGraphBuilder, Plan, StepKind};
use upbound::stats::{StatisticsContext, TableStatistics};

const COLUMNS: [&str; 3] = ["id", "a", "b"];

/// Rows of `(a, b)` values; `id` is the row position. `keep` is a row-count filter
/// that keeps a prefix of the rows.
#[derive(Debug, Clone)]
struct Table {
    rows: Vec<[u8; 2]>,
    keep: Option<usize>,
}

impl Table {
    fn value(&self, row: usize, column: &str) -> u8 {
        match column {
            "id" => row as u8,
            "a" => self.rows[row][0],
            _ => self.rows[row][1],
        }
    }

    fn live_rows(&self) -> usize {
        self.keep.unwrap_or(self.rows.len()).min(self.rows.len())
    }

    fn statistics(&self) -> TableStatistics {
        let mut stats = TableStatistics::new(self.rows.len() as u64);
        for column in COLUMNS {
            let mut counts: BTreeMap<u8, u64> = BTreeMap::new();
            for row in 0..self.rows.len() {
                *counts.entry(self.value(row, column)).or_default() += 1;
            }
            let max_frequency = counts.values().copied().max().unwrap_or(0);
            stats = stats.with_column(column, counts.len() as u64, max_frequency);
        }
        stats
    }
}

/// An edge `r{left}.{left_column} = r{right}.{right_column}`.
type Edge = (usize, usize, usize, usize);

fn table() -> impl Strategy<Value = Table> {
    (
        prop::collection::vec(prop::array::uniform2(0u8..4), 0..7),
        prop::option::of(0usize..7),
    )
        .prop_map(|(rows, keep)| Table { rows, keep })
}

fn scenario() -> impl Strategy<Value = (Vec<Table>, Vec<Edge>)> {
    prop::collection::vec(table(), 1..5).prop_flat_map(|tables| {
        let n = tables.len();
        let edges = prop::collection::vec((0..n, 0..3usize, 0..n, 0..3usize), 0..6);
        (Just(tables), edges)
    })
}

fn build(tables: &[Table], edges: &[Edge]) -> (StatisticsContext, JoinQuery) {
    let mut stats = StatisticsContext::new();
    let mut query = JoinQuery::new();

    for (i, table) in tables.iter().enumerate() {
        let name = format!("r{}", i);
        stats.insert_table(&name, table.statistics());
        let mut relation = RelationRef::new(&name);
        if table.keep.is_some() {
            relation = relation.with_filter(FilterHint::RowCount(table.live_rows() as u64));
        }
        query = query.relation(relation);
    }

    for &(l, lc, r, rc) in edges {
        if l == r {
            continue;
        }
        query = query.equi_join(
            ColumnRef::new(format!("r{}", l), COLUMNS[lc]),
            ColumnRef::new(format!("r{}", r), COLUMNS[rc]),
        );
    }

    (stats, query)
}

/// An intermediate result: the relations it covers and one row index per relation.
struct Intermediate {
    relations: BTreeSet<String>,
    tuples: Vec<BTreeMap<String, usize>>,
}

fn table_of<'t>(tables: &'t [Table], name: &str) -> &'t Table {
    let index: usize = name[1..].parse().unwrap();
    &tables[index]
}

/// Execute the plan's steps and return the row count of each step's output.
fn execute(plan: &Plan, tables: &[Table]) -> Vec<usize> {
    let mut parts: Vec<Intermediate> = plan
        .relations()
        .iter()
        .map(|name| Intermediate {
            relations: BTreeSet::from([name.clone()]),
            tuples: (0..table_of(tables, name).live_rows())
                .map(|row| BTreeMap::from([(name.clone(), row)]))
                .collect(),
        })
        .collect();

    let mut counts = Vec::new();
    for step in plan.steps() {
        let take = |parts: &mut Vec<Intermediate>, name: &str| {
            let pos = parts
                .iter()
                .position(|p| p.relations.contains(name))
                .unwrap();
            parts.remove(pos)
        };
        let left = take(&mut parts, step.left[0].as_str());
        let right = take(&mut parts, step.right[0].as_str());

        let mut tuples = Vec::new();
        for l in &left.tuples {
            for r in &right.tuples {
                let matches = match &step.kind {
                    StepKind::Join {
                        left_column,
                        right_column,
                        ..
                    } => {
                        let lv = table_of(tables, &left_column.relation)
                            .value(l[&left_column.relation], &left_column.column);
                        let rv = table_of(tables, &right_column.relation)
                            .value(r[&right_column.relation], &right_column.column);
                        lv == rv
                    }
                    StepKind::CrossProduct => true,
                };
                if matches {
                    let mut tuple = l.clone();
                    tuple.extend(r.iter().map(|(k, v)| (k.clone(), *v)));
                    tuples.push(tuple);
                }
            }
        }

        counts.push(tuples.len());
        let mut relations = left.relations;
        relations.extend(right.relations);
        parts.push(Intermediate { relations, tuples });
    }

    counts
}

fn check_plan(plan: &Plan, tables: &[Table]) -> Result<(), TestCaseError> {
    let counts = execute(plan, tables);
    for (step, count) in plan.steps().iter().zip(&counts) {
        prop_assert!(
            step.bound.rows() >= *count as u128,
            "step {} bound {} < actual {}\n{}",
            step.index,
            step.bound,
            count,
            plan
        );
    }

    let total = match counts.last() {
        Some(count) => *count,
        None => tables[0].live_rows(),
    };
    prop_assert!(plan.bound().rows() >= total as u128);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_greedy_plan_bounds_are_sound((tables, edges) in scenario()) {
        let (stats, query) = build(&tables, &edges);
        let plan = BoundOptimizer::default().optimize_query(&query, &stats).unwrap();

        check_plan(&plan, &tables)?;
    }

    #[test]
    fn test_evaluated_order_bounds_are_sound((tables, edges) in scenario()) {
        let (stats, query) = build(&tables, &edges);
        let graph = JoinGraphBuilder::new(&stats).build(&query).unwrap();
        let order: Vec<String> = (0..tables.len()).rev().map(|i| format!("r{}", i)).collect();
        let plan = BoundOptimizer::default().evaluate_order(&graph, &order).unwrap();

        check_plan(&plan, &tables)?;
    }
}
