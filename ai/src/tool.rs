use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ToolError;

/// Something the agent can name in an `Action:` line and call with the text
/// that follows `Action Input:`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn call(&self, input: &str) -> Result<String, ToolError>;
}

pub type SharedTool = Arc<dyn Tool>;

/// Drops every tool whose name is excluded, keeping the order of the rest.
/// Excluded names that match nothing are ignored.
pub fn filter_tools(tools: Vec<SharedTool>, excluded: &[String]) -> Vec<SharedTool> {
    tools
        .into_iter()
        .filter(|tool| !excluded.iter().any(|name| name == tool.name()))
        .collect()
}

/// One `name: description` line per tool, as listed in the prompt.
pub fn describe_tools(tools: &[SharedTool]) -> String {
    tools
        .iter()
        .map(|tool| format!("{}: {}", tool.name(), tool.description()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn tool_names(tools: &[SharedTool]) -> String {
    tools
        .iter()
        .map(|tool| tool.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Echoes its input back, for tests that only care about names.
    pub(crate) struct NamedTool(pub(crate) &'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test tool"
        }

        async fn call(&self, input: &str) -> Result<String, ToolError> {
            Ok(format!("{} got {input}", self.0))
        }
    }

    fn names(tools: &[SharedTool]) -> Vec<&str> {
        tools.iter().map(|tool| tool.name()).collect()
    }

    fn toolkit() -> Vec<SharedTool> {
        vec![
            Arc::new(NamedTool("sql_db_query")),
            Arc::new(NamedTool("sql_db_list_tables")),
            Arc::new(NamedTool("sql_db_query_checker")),
        ]
    }

    #[test]
    fn query_checker_is_filtered_out_and_order_kept() {
        let filtered = filter_tools(toolkit(), &["sql_db_query_checker".to_string()]);
        assert_eq!(names(&filtered), ["sql_db_query", "sql_db_list_tables"]);
    }

    #[test]
    fn filtering_twice_changes_nothing() {
        let excluded = ["sql_db_query_checker".to_string()];
        let once = filter_tools(toolkit(), &excluded);
        let twice = filter_tools(once.clone(), &excluded);
        assert_eq!(names(&once), names(&twice));
    }

    #[test]
    fn unknown_exclusions_are_a_no_op() {
        let filtered = filter_tools(toolkit(), &["sql_db_drop_everything".to_string()]);
        assert_eq!(
            names(&filtered),
            ["sql_db_query", "sql_db_list_tables", "sql_db_query_checker"]
        );
        assert!(filter_tools(toolkit(), &[]).len() == 3);
    }

    #[test]
    fn prompt_listings() {
        let tools = filter_tools(toolkit(), &["sql_db_list_tables".to_string()]);
        assert_eq!(tool_names(&tools), "sql_db_query, sql_db_query_checker");
        assert_eq!(
            describe_tools(&tools),
            "sql_db_query: test tool\nsql_db_query_checker: test tool"
        );
    }
}
