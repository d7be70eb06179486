use async_trait::async_trait;

use crate::error::AgentError;

/// Turns a question into a final answer. Whatever reasoning, tools or model sit
/// behind it are the implementor's business; callers only see the answer or
/// the fault.
#[async_trait]
pub trait AgentDelegate: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String, AgentError>;
}
