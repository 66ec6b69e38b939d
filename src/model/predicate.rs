//! Column references and join predicates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A column of a relation, written `relation.column`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnRef {
    pub relation: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(relation: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.relation, self.column)
    }
}

impl FromStr for ColumnRef {
    type Err = String;

    /// Splits on the first `.`; both parts must be non-empty.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((relation, column)) if !relation.is_empty() && !column.is_empty() => {
                Ok(Self::new(relation.trim(), column.trim()))
            }
            _ => Err(format!(
                "invalid column reference '{}': expected relation.column",
                s
            )),
        }
    }
}

impl TryFrom<String> for ColumnRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnRef> for String {
    fn from(value: ColumnRef) -> Self {
        value.to_string()
    }
}

/// Comparison operator of a predicate between two relations.
///
/// Only [`CompareOp::Eq`] is accepted by the optimizer; the others exist so
/// that callers can hand over a query unchanged and get a precise error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompareOp {
    #[default]
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    GtEq,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        };
        f.write_str(op)
    }
}

/// A join predicate `left <op> right` between columns of two relations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinPredicate {
    pub left: ColumnRef,
    #[serde(default)]
    pub op: CompareOp,
    pub right: ColumnRef,
}

impl JoinPredicate {
    /// An equi-join predicate `left = right`.
    pub fn equi(left: ColumnRef, right: ColumnRef) -> Self {
        Self {
            left,
            op: CompareOp::Eq,
            right,
        }
    }

    pub fn new(left: ColumnRef, op: CompareOp, right: ColumnRef) -> Self {
        Self { left, op, right }
    }

    pub fn is_equi(&self) -> bool {
        self.op == CompareOp::Eq
    }
}

impl fmt::Display for JoinPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}
