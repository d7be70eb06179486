use std::sync::Arc;

use ai::{AgentDelegate, AgentExecutor, OllamaLLM};
use db::postgres::PostgresDatabase;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

pub const MISSING_QUESTION: &str = "No question provided.";

/// Aborts the agent task when the caller stops waiting for it, e.g. on a
/// client disconnect.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// What a caller gets back for a question that was handed to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub question: String,
    pub answer: String,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The question was empty or whitespace. The agent was not called.
    MissingInput,
    Answered(AgentResponse),
    /// The agent failed; `answer` carries the fault description.
    Failed(AgentResponse),
}

impl HandlerOutcome {
    pub fn response(&self) -> Option<&AgentResponse> {
        match self {
            Self::MissingInput => None,
            Self::Answered(response) | Self::Failed(response) => Some(response),
        }
    }
}

/// Validates a question, hands it to the agent and turns whatever comes back
/// into an [`HandlerOutcome`]. Holds no per-request state, so one handler serves
/// any number of concurrent callers.
#[derive(Clone)]
pub struct RequestHandler {
    delegate: Arc<dyn AgentDelegate>,
}

impl std::fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandler").finish_non_exhaustive()
    }
}

impl RequestHandler {
    pub fn new(delegate: Arc<dyn AgentDelegate>) -> Self {
        Self { delegate }
    }

    /// Connects to the configured database and wires the SQL agent behind a handler.
    pub async fn from_config(conf: &config::AppConfig) -> Result<Self, db::DbError> {
        let database =
            PostgresDatabase::connect(&conf.database.url, conf.database.max_connections).await?;
        let llm = Arc::new(OllamaLLM::new(&conf.ai));
        info!(model = llm.model(), temperature = conf.ai.temperature, "using ollama");

        let agent = AgentExecutor::from_config(conf, llm, Arc::new(database));
        Ok(Self::new(Arc::new(agent)))
    }

    #[instrument(name = "handle", skip_all)]
    pub async fn handle(&self, question: &str) -> HandlerOutcome {
        if question.trim().is_empty() {
            info!("rejecting empty question");
            return HandlerOutcome::MissingInput;
        }

        info!(%question, "processing");

        // Run on its own task so a panicking agent is reported like any other fault.
        let delegate = Arc::clone(&self.delegate);
        let owned = question.to_string();
        let mut task = AbortOnDrop(tokio::spawn(async move { delegate.answer(&owned).await }));
        let result = (&mut task.0).await;

        let outcome = match result {
            Ok(Ok(answer)) => HandlerOutcome::Answered(AgentResponse {
                question: question.to_string(),
                answer,
                status: Status::Success,
            }),
            Ok(Err(fault)) => {
                error!(%fault, "agent failed");
                HandlerOutcome::Failed(AgentResponse {
                    question: question.to_string(),
                    answer: fault.to_string(),
                    status: Status::Error,
                })
            }
            Err(join_error) => {
                error!(%join_error, "agent task did not complete");
                HandlerOutcome::Failed(AgentResponse {
                    question: question.to_string(),
                    answer: format!("agent task did not complete: {join_error}"),
                    status: Status::Error,
                })
            }
        };

        info!(success = matches!(outcome, HandlerOutcome::Answered(_)), "idle");
        outcome
    }
}
