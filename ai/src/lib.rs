//! Natural-language-to-SQL agent: prompt assembly, the SQL toolkit, the model
//! client and the loop that ties them together.

pub mod delegate;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod react;
pub mod tool;
pub mod toolkit;

pub use delegate::AgentDelegate;
pub use error::{AgentError, AiError, PromptError, ToolError};
pub use llm::{LanguageModel, OllamaLLM};
pub use prompt::{PromptTemplate, sql_agent_prompt};
pub use react::AgentExecutor;
pub use tool::{SharedTool, Tool, filter_tools};
pub use toolkit::SqlDatabaseToolkit;
