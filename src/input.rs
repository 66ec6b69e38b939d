//! Query files: statistics plus a join query in one TOML or JSON document.
//!
//! ```toml
//! [statistics.orders]
//! row_count = 10000
//! columns.customer_id = { distinct_count = 900, max_frequency = 40 }
//!
//! [statistics.customer]
//! row_count = 1000
//! columns.id = { distinct_count = 1000, max_frequency = 1 }
//!
//! [query]
//! relations = [
//!     { name = "o", table = "orders", filters = [{ selectivity = 0.1 }] },
//!     { name = "customer" },
//! ]
//! predicates = [{ left = "o.customer_id", right = "customer.id" }]
//! ```

use crate::model::JoinQuery;
use crate::stats::StatisticsContext;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML query file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON query file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported query file format: {0} (expected .toml or .json)")]
    UnsupportedFormat(PathBuf),
}

/// Everything the optimizer needs for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFile {
    #[serde(default)]
    pub statistics: StatisticsContext,
    pub query: JoinQuery,
}

impl QueryFile {
    /// Load a query file, choosing the format by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, InputError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let read = || {
            fs::read_to_string(path).map_err(|source| InputError::Read {
                path: path.to_path_buf(),
                source,
            })
        };

        match extension.as_deref() {
            Some("toml") => Self::from_toml_str(&read()?),
            Some("json") => Self::from_json_str(&read()?),
            _ => Err(InputError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, InputError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(content)?)
    }
}
