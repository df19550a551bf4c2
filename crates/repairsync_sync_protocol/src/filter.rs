//! Column filters for remote list queries.
//!
//! Filters render in the `column=op.value` query-string form understood by
//! PostgREST-style endpoints, and can also be evaluated against a row
//! directly (used by in-memory remotes).

use crate::row::RemoteRow;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Column equals value.
    Eq,
    /// Column is greater than value.
    Gt,
}

impl FilterOp {
    fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Gt => "gt",
        }
    }
}

/// A single column filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Column name.
    pub column: String,
    /// Operator.
    pub op: FilterOp,
    /// Comparison value.
    pub value: Value,
}

impl Filter {
    /// `column = value`.
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_owned(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    /// `column > value`.
    pub fn gt(column: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_owned(),
            op: FilterOp::Gt,
            value: value.into(),
        }
    }

    /// Returns the `(column, "op.value")` query pair.
    pub fn query_pair(&self) -> (String, String) {
        let value = match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        (self.column.clone(), format!("{}.{}", self.op.as_str(), value))
    }

    /// Evaluates the filter against a row. Missing columns never match.
    pub fn matches(&self, row: &RemoteRow) -> bool {
        let Some(actual) = row.get(&self.column) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => compare(actual, &self.value) == Some(Ordering::Equal),
            FilterOp::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (column, expr) = self.query_pair();
        write!(f, "{column}={expr}")
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
