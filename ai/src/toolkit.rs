//! The SQL tools offered to the agent.
//!
//! Tool names and behaviour follow the conventional SQL agent toolkit, so the
//! few-shot examples and any prompt written against that toolkit work unchanged.
//! Errors from the database come back to the agent as `Error: ...` observations
//! (see [`crate::react`]), which lets it rewrite a bad query.

use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use db::{Database, DbError};

use crate::error::ToolError;
use crate::llm::LanguageModel;
use crate::tool::{SharedTool, Tool};

pub const QUERY_TOOL: &str = "sql_db_query";
pub const SCHEMA_TOOL: &str = "sql_db_schema";
pub const LIST_TABLES_TOOL: &str = "sql_db_list_tables";
pub const QUERY_CHECKER_TOOL: &str = "sql_db_query_checker";

const SAMPLE_ROWS: usize = 3;

const QUERY_CHECKER_PROMPT: &str = "
{query}
Double check the {dialect} query above for common mistakes, including:
- Using NOT IN with NULL values
- Using UNION when UNION ALL should have been used
- Using BETWEEN for exclusive ranges
- Data type mismatch in predicates
- Properly quoting identifiers
- Using the correct number of arguments for functions
- Casting to the correct data type
- Using the proper columns for joins

If there are any of the above mistakes, rewrite the query. If there are no mistakes, just reproduce the original query.

Output the final SQL query only.

SQL Query: ";

#[derive(Clone)]
pub struct SqlDatabaseToolkit {
    db: Arc<dyn Database>,
    llm: Arc<dyn LanguageModel>,
}

impl std::fmt::Debug for SqlDatabaseToolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlDatabaseToolkit")
            .field("dialect", &self.db.dialect())
            .finish_non_exhaustive()
    }
}

impl SqlDatabaseToolkit {
    pub fn new(db: Arc<dyn Database>, llm: Arc<dyn LanguageModel>) -> Self {
        Self { db, llm }
    }

    /// All four tools, query first.
    pub fn tools(&self) -> Vec<SharedTool> {
        vec![
            Arc::new(QuerySqlTool {
                db: Arc::clone(&self.db),
            }),
            Arc::new(InfoSqlTool {
                db: Arc::clone(&self.db),
            }),
            Arc::new(ListSqlTablesTool {
                db: Arc::clone(&self.db),
            }),
            Arc::new(QueryCheckerTool {
                db: Arc::clone(&self.db),
                llm: Arc::clone(&self.llm),
            }),
        ]
    }
}

struct QuerySqlTool {
    db: Arc<dyn Database>,
}

#[async_trait]
impl Tool for QuerySqlTool {
    fn name(&self) -> &str {
        QUERY_TOOL
    }

    fn description(&self) -> &str {
        "Input to this tool is a detailed and correct SQL query, output is a result from the database. If the query is not correct, an error message will be returned. If an error is returned, rewrite the query, check the query, and try again. If you encounter an issue with Unknown column 'xxxx' in 'field list', use sql_db_schema to query the correct table fields."
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let query = input.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidInput("expected a SQL query".into()));
        }
        Ok(self.db.get_results(query).await?.render())
    }
}

struct InfoSqlTool {
    db: Arc<dyn Database>,
}

#[async_trait]
impl Tool for InfoSqlTool {
    fn name(&self) -> &str {
        SCHEMA_TOOL
    }

    fn description(&self) -> &str {
        "Input to this tool is a comma-separated list of tables, output is the schema and sample rows for those tables. Be sure that the tables actually exist by calling sql_db_list_tables first! Example Input: table1, table2, table3"
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let requested = split_table_names(input);
        if requested.is_empty() {
            return Err(ToolError::InvalidInput(
                "expected a comma-separated list of tables".into(),
            ));
        }

        let schema = self.db.get_schema().await?;
        if let Some(unknown) = requested.iter().find(|t| !schema.tables.contains_key(**t)) {
            return Err(DbError::UnknownTable((*unknown).to_string()).into());
        }

        let mut out = String::new();
        for table in requested {
            let columns = schema
                .tables
                .get(table)
                .map(|columns| {
                    columns
                        .iter()
                        .map(|(name, ty)| format!("{name} ({ty})"))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();

            let prefix = format!("{table}.");
            let prefix = prefix.as_str();
            let foreign_keys: Vec<String> = schema
                .references
                .iter()
                .flat_map(move |(referenced, referencing)| {
                    referencing
                        .iter()
                        .filter_map(move |column| column.strip_prefix(prefix))
                        .map(move |column| format!("{column} -> {referenced}"))
                })
                .collect();

            let sample = self
                .db
                .get_results(&format!(
                    "SELECT * FROM \"{}\" LIMIT {SAMPLE_ROWS}",
                    table.replace('"', "\"\"")
                ))
                .await?;

            if !out.is_empty() {
                out.push_str("\n\n");
            }
            let _ = writeln!(out, "Table `{table}`: {columns}");
            if !foreign_keys.is_empty() {
                let _ = writeln!(out, "Foreign keys: {}", foreign_keys.join(", "));
            }
            let _ = write!(
                out,
                "/*\n{SAMPLE_ROWS} rows from {table} table:\n{}\n*/",
                sample.render()
            );
        }

        Ok(out)
    }
}

/// Table names from agent input like "actor, `film`, 'city'".
fn split_table_names(input: &str) -> Vec<&str> {
    input
        .split(',')
        .map(|name| name.trim().trim_matches(|c: char| matches!(c, '`' | '"' | '\'')))
        .filter(|name| !name.is_empty())
        .collect()
}

struct ListSqlTablesTool {
    db: Arc<dyn Database>,
}

#[async_trait]
impl Tool for ListSqlTablesTool {
    fn name(&self) -> &str {
        LIST_TABLES_TOOL
    }

    fn description(&self) -> &str {
        "Input is an empty string, output is a comma-separated list of tables in the database."
    }

    async fn call(&self, _input: &str) -> Result<String, ToolError> {
        Ok(self.db.list_tables().await?.join(", "))
    }
}

struct QueryCheckerTool {
    db: Arc<dyn Database>,
    llm: Arc<dyn LanguageModel>,
}

#[async_trait]
impl Tool for QueryCheckerTool {
    fn name(&self) -> &str {
        QUERY_CHECKER_TOOL
    }

    fn description(&self) -> &str {
        "Use this tool to double check if your query is correct before executing it. Always use this tool before executing a query with sql_db_query!"
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let prompt = QUERY_CHECKER_PROMPT
            .replace("{dialect}", self.db.dialect())
            .replace("{query}", input.trim());
        let checked = self.llm.complete(&prompt, &[]).await?;
        Ok(checked.trim().to_string())
    }
}
