use std::time::Duration;

use thiserror::Error;

/// Failures talking to the model server.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("request to model server failed: {0}")]
    Request(String),
    #[error("model server returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("could not decode model response: {0}")]
    Serialization(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("missing value for prompt variable `{0}`")]
    MissingVariable(String),
}

/// Failures inside a tool call. These are reported back to the agent as an
/// observation rather than ending the run.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Database(#[from] db::DbError),
    #[error(transparent)]
    Model(#[from] AiError),
    #[error("invalid tool input: {0}")]
    InvalidInput(String),
}

/// Anything that stops the agent from producing an answer.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("language model error: {0}")]
    Model(#[from] AiError),
    #[error("prompt error: {0}")]
    Prompt(#[from] PromptError),
    #[error("agent stopped after {0} iterations without a final answer")]
    IterationLimit(usize),
    #[error("agent did not answer within {0:?}")]
    Timeout(Duration),
}
