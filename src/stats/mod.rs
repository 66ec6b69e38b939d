//! Statistics provider interface.
//!
//! The optimizer consumes table row counts and per-column distinct counts and
//! maximum value frequencies; it never computes them. [`StatisticsContext`] is an
//! explicitly-owned in-memory catalog that callers fill from whatever collected the
//! statistics and inject into the join graph builder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source of table and column statistics.
pub trait StatisticsProvider {
    /// Row count of the unfiltered table, if known.
    fn row_count(&self, table: &str) -> Option<u64>;

    /// Statistics of `table.column`.
    ///
    /// Returns `None` when the column does not exist. An existing column whose
    /// statistics were not collected returns `Some` with empty fields.
    fn column(&self, table: &str, column: &str) -> Option<ColumnStatistics>;
}

/// Raw statistics of one column; fields are `None` when not collected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_frequency: Option<u64>,
}

impl ColumnStatistics {
    pub fn new(distinct_count: u64, max_frequency: u64) -> Self {
        Self {
            distinct_count: Some(distinct_count),
            max_frequency: Some(max_frequency),
        }
    }

    /// A column known to exist, without collected statistics.
    pub fn uncollected() -> Self {
        Self::default()
    }
}

/// Statistics for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStatistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnStatistics>,
}

impl TableStatistics {
    pub fn new(row_count: u64) -> Self {
        Self {
            row_count: Some(row_count),
            columns: BTreeMap::new(),
        }
    }

    /// Adds column statistics.
    pub fn with_column(mut self, name: &str, distinct_count: u64, max_frequency: u64) -> Self {
        self.columns.insert(
            name.to_string(),
            ColumnStatistics::new(distinct_count, max_frequency),
        );
        self
    }

    /// Adds a column whose statistics are unknown.
    pub fn with_uncollected_column(mut self, name: &str) -> Self {
        self.columns
            .insert(name.to_string(), ColumnStatistics::uncollected());
        self
    }
}

/// In-memory statistics catalog owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatisticsContext {
    tables: BTreeMap<String, TableStatistics>,
}

impl StatisticsContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, stats: TableStatistics) -> Self {
        self.insert_table(name, stats);
        self
    }

    pub fn insert_table(&mut self, name: &str, stats: TableStatistics) {
        self.tables.insert(name.to_string(), stats);
    }

    pub fn table(&self, name: &str) -> Option<&TableStatistics> {
        self.tables.get(name)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

impl StatisticsProvider for StatisticsContext {
    fn row_count(&self, table: &str) -> Option<u64> {
        self.tables.get(table).and_then(|t| t.row_count)
    }

    fn column(&self, table: &str, column: &str) -> Option<ColumnStatistics> {
        self.tables
            .get(table)
            .and_then(|t| t.columns.get(column))
            .copied()
    }
}
