//! Render a plan as a pg_hint_plan hint block.
//!
//! ```text
//! /*+
//!   Leading(((a b) c))
//!   HashJoin(a b)
//!   HashJoin(a b c)
//!   Rows(a b #50)
//!   Rows(a b c #500)
//! */
//! ```
//!
//! `Leading` fixes the join tree, one operator hint per step pins the operator when the
//! plan carries one, and `Rows` hints inject each step's upper bound as the row count.

use crate::planner::plan::{JoinOperator, Plan};
use std::collections::BTreeMap;

impl Plan {
    /// The plan as a pg_hint_plan comment.
    pub fn to_hints(&self) -> String {
        let lines = hint_lines(self);
        if lines.is_empty() {
            return String::new();
        }

        let mut out = String::from("/*+\n");
        for line in lines {
            out.push_str("  ");
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("*/");
        out
    }
}

fn hint_lines(plan: &Plan) -> Vec<String> {
    if plan.steps().is_empty() {
        return Vec::new();
    }

    let mut lines = Vec::new();
    if let Some(tree) = leading_tree(plan) {
        lines.push(format!("Leading({})", tree));
    }

    for step in plan.steps() {
        if let Some(op) = step.operator {
            lines.push(format!("{}({})", operator_hint(op), step.relations().join(" ")));
        }
    }
    for step in plan.steps() {
        lines.push(format!("Rows({} #{})", step.relations().join(" "), step.bound));
    }

    lines
}

/// Nested join tree in `Leading` syntax, e.g. `((a b) c)`.
fn leading_tree(plan: &Plan) -> Option<String> {
    let mut trees: Vec<String> = Vec::new();
    let mut owner: BTreeMap<&str, usize> = BTreeMap::new();

    let mut last = None;
    for step in plan.steps() {
        let left = subtree(step.left.first()?, &mut trees, &mut owner);
        let right = subtree(step.right.first()?, &mut trees, &mut owner);
        let joined = format!("({} {})", trees[left], trees[right]);
        trees.push(joined);
        let idx = trees.len() - 1;
        for name in step.left.iter().chain(&step.right) {
            owner.insert(name.as_str(), idx);
        }
        last = Some(idx);
    }

    last.map(|idx| trees[idx].clone())
}

/// Index of the subtree currently holding `name`; base relations start as leaves.
fn subtree<'a>(
    name: &'a str,
    trees: &mut Vec<String>,
    owner: &mut BTreeMap<&'a str, usize>,
) -> usize {
    *owner.entry(name).or_insert_with(|| {
        trees.push(name.to_string());
        trees.len() - 1
    })
}

fn operator_hint(op: JoinOperator) -> &'static str {
    match op {
        JoinOperator::HashJoin => "HashJoin",
        JoinOperator::NestedLoop => "NestLoop",
        JoinOperator::SortMerge => "MergeJoin",
    }
}
