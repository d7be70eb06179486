pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("could not connect to database: {0}")]
    Connection(String),
    #[error("{0}")]
    Query(String),
    #[error("table `{0}` does not exist")]
    UnknownTable(String),
}

/// Trait defining the interface for database operations
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute a query and return the column headers alongside the rows as JSON values.
    /// Headers are `(column_name, column_type)` pairs.
    async fn get_results(&self, query: &str) -> Result<DatabaseResult, DbError>;

    /// Get the database schema information
    /// Returns all tables with their columns, and every foreign key reference keyed by the
    /// referenced `table.column`.
    async fn get_schema(&self) -> Result<Schema, DbError>;

    /// Table names in ascending order.
    async fn list_tables(&self) -> Result<Vec<String>, DbError> {
        Ok(self.get_schema().await?.tables.into_keys().collect())
    }

    /// Name of the SQL dialect, used when asking the model to check a query.
    fn dialect(&self) -> &str;
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Schema {
    pub tables: BTreeMap<String, Vec<(String, String)>>,
    pub references: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DatabaseResult {
    pub headers: Vec<(String, String)>,
    pub rows: Vec<Vec<Value>>,
}

impl DatabaseResult {
    /// Renders the rows as a list of tuples, e.g. `[(200,)]` or `[('India', 60)]`.
    /// An empty result renders as an empty string.
    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        let mut out = String::from("[");
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push('(');
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    out.push_str(", ");
                }
                render_value(&mut out, value);
            }
            if row.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        out.push(']');
        out
    }
}

fn render_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => {
            let _ = write!(out, "'{}'", s.replace('\'', "\\'"));
        }
        Value::Array(_) | Value::Object(_) => {
            let _ = write!(out, "'{value}'");
        }
    }
}
