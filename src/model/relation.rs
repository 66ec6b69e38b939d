//! Base relations and their local filters.

use super::bound::Bound;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A local filter already applied to a relation, as reported by the statistics source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterHint {
    /// Fraction of the table's rows that pass the filter (0.0 to 1.0).
    Selectivity(f64),
    /// Number of rows that pass the filter.
    RowCount(u64),
}

/// A relation as it appears in a query: an alias over a base table plus its filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRef {
    pub name: String,
    /// Base table; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterHint>,
}

impl RelationRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            filters: Vec::new(),
        }
    }

    /// Scan `table` under this relation's name.
    pub fn on_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_filter(mut self, filter: FilterHint) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }
}

/// Statistics of one join column, with the relation's filters folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnStats {
    /// Upper bound on the number of distinct values.
    pub distinct_count: u64,
    /// Upper bound on the number of rows sharing any single value.
    pub max_frequency: u64,
    /// The column is a key of the unfiltered table.
    pub unique: bool,
}

impl ColumnStats {
    /// Fold table-level statistics into post-filter statistics.
    ///
    /// Uniqueness is decided on the unfiltered table (distinct count reaches the row
    /// count, or no value repeats) and is kept after filtering.
    pub fn fold(distinct_count: u64, max_frequency: u64, base_rows: u64, rows: u64) -> Self {
        let unique = max_frequency <= 1 || (base_rows > 0 && distinct_count >= base_rows);
        let max_frequency = if unique {
            max_frequency.min(1)
        } else {
            max_frequency
        };

        Self {
            distinct_count: distinct_count.min(rows),
            max_frequency: max_frequency.min(rows),
            unique,
        }
    }
}

/// A base relation after its filters have been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    pub table: String,
    /// Row count after filters.
    pub cardinality: u64,
    /// Statistics for the columns this relation is joined on.
    pub columns: BTreeMap<String, ColumnStats>,
    /// At least one filter hint was folded into `cardinality`.
    pub filtered: bool,
}

impl Relation {
    pub fn new(name: impl Into<String>, table: impl Into<String>, cardinality: u64) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            cardinality,
            columns: BTreeMap::new(),
            filtered: false,
        }
    }

    pub fn with_column(mut self, name: &str, stats: ColumnStats) -> Self {
        self.columns.insert(name.to_string(), stats);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnStats> {
        self.columns.get(name)
    }

    /// The exact post-filter row count.
    pub fn base_bound(&self) -> Bound {
        Bound::from(self.cardinality)
    }
}
