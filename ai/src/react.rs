//! Thought/Action/Observation loop driving the SQL tools.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::delegate::AgentDelegate;
use crate::error::AgentError;
use crate::llm::LanguageModel;
use crate::prompt::{PromptTemplate, sql_agent_prompt};
use crate::tool::{SharedTool, describe_tools, filter_tools, tool_names};
use crate::toolkit::SqlDatabaseToolkit;

const FINAL_ANSWER: &str = "Final Answer:";
const OBSERVATION: &str = "Observation: ";
const THOUGHT: &str = "Thought: ";
const INVALID_RESPONSE: &str = "Invalid or incomplete response";

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
        .expect("valid action regex")
});
static ACTION_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)").expect("valid action regex"));
static ACTION_INPUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)").expect("valid action regex")
});

/// What the model asked for on one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStep {
    Action {
        tool: String,
        input: String,
        log: String,
    },
    Finish {
        answer: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    /// Text sent back to the model as the observation. `None` means a generic
    /// "invalid response" observation.
    pub observation: Option<String>,
}

impl ParseError {
    fn for_model(message: &str) -> Self {
        Self {
            message: message.to_string(),
            observation: Some(message.to_string()),
        }
    }
}

/// Parses a single-input ReAct completion.
pub fn parse_output(text: &str) -> Result<AgentStep, ParseError> {
    let includes_answer = text.contains(FINAL_ANSWER);

    if let Some(caps) = ACTION_RE.captures(text) {
        if includes_answer {
            return Err(ParseError {
                message: format!(
                    "Parsing LLM output produced both a final answer and a parse-able action: {text}"
                ),
                observation: None,
            });
        }

        let tool = caps.get(1).map_or("", |m| m.as_str()).trim();
        let input = caps
            .get(2)
            .map_or("", |m| m.as_str())
            .trim()
            .trim_matches('"');

        return Ok(AgentStep::Action {
            tool: tool.to_string(),
            input: input.to_string(),
            log: text.to_string(),
        });
    }

    if includes_answer {
        let answer = text.rsplit(FINAL_ANSWER).next().unwrap_or_default().trim();
        return Ok(AgentStep::Finish {
            answer: answer.to_string(),
        });
    }

    if !ACTION_ONLY_RE.is_match(text) {
        Err(ParseError::for_model(
            "Invalid Format: Missing 'Action:' after 'Thought:'",
        ))
    } else if !ACTION_INPUT_RE.is_match(text) {
        Err(ParseError::for_model(
            "Invalid Format: Missing 'Action Input:' after 'Action:'",
        ))
    } else {
        Err(ParseError {
            message: format!("Could not parse LLM output: `{text}`"),
            observation: None,
        })
    }
}

/// Runs the loop until the model gives a final answer, the iteration cap is hit
/// or the deadline passes.
pub struct AgentExecutor {
    llm: Arc<dyn LanguageModel>,
    tools: Vec<SharedTool>,
    prompt: PromptTemplate,
    max_iterations: usize,
    timeout: Option<Duration>,
    stop: Vec<String>,
}

impl std::fmt::Debug for AgentExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentExecutor")
            .field("tools", &tool_names(&self.tools))
            .field("max_iterations", &self.max_iterations)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl AgentExecutor {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        tools: Vec<SharedTool>,
        prompt: PromptTemplate,
    ) -> Self {
        let defaults = config::AIConfig::default();
        Self {
            llm,
            tools,
            prompt,
            max_iterations: defaults.max_iterations,
            timeout: None,
            stop: vec![format!("\n{}", OBSERVATION.trim_end_matches(": "))],
        }
    }

    /// Builds the SQL agent the configuration describes: the full toolkit minus
    /// the excluded tools, the SQL prompt with schema and examples bound.
    pub fn from_config(
        conf: &config::AppConfig,
        llm: Arc<dyn LanguageModel>,
        db: Arc<dyn db::Database>,
    ) -> Self {
        let toolkit = SqlDatabaseToolkit::new(db, Arc::clone(&llm));
        let tools = filter_tools(toolkit.tools(), &conf.agent.excluded_tools);
        let prompt = sql_agent_prompt(&conf.agent.schema, &conf.agent.examples);

        Self::new(llm, tools, prompt)
            .with_max_iterations(conf.ai.max_iterations)
            .with_timeout(conf.ai.timeout_secs.map(Duration::from_secs))
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tools(&self) -> &[SharedTool] {
        &self.tools
    }

    pub async fn run(&self, question: &str) -> Result<String, AgentError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run_loop(question))
                .await
                .map_err(|_| AgentError::Timeout(limit))?,
            None => self.run_loop(question).await,
        }
    }

    #[instrument(name = "agent.run", skip_all, fields(max_iterations = self.max_iterations))]
    async fn run_loop(&self, question: &str) -> Result<String, AgentError> {
        let descriptions = describe_tools(&self.tools);
        let names = tool_names(&self.tools);
        let mut scratchpad = String::new();

        for iteration in 0..self.max_iterations {
            let prompt = self.prompt.format(&[
                ("input", question),
                ("tools", &descriptions),
                ("tool_names", &names),
                ("agent_scratchpad", &scratchpad),
            ])?;

            let output = self.llm.complete(&prompt, &self.stop).await?;
            debug!(iteration, %output, "model step");

            let (log, observation) = match parse_output(&output) {
                Ok(AgentStep::Finish { answer }) => {
                    info!(iteration, %answer, "agent finished");
                    return Ok(answer);
                }
                Ok(AgentStep::Action { tool, input, log }) => {
                    let observation = self.call_tool(&tool, &input).await;
                    (log, observation)
                }
                Err(err) => {
                    warn!(iteration, %err, "could not parse model output");
                    let observation = err
                        .observation
                        .unwrap_or_else(|| INVALID_RESPONSE.to_string());
                    (output, observation)
                }
            };

            debug!(iteration, %observation, "observation");
            scratchpad.push_str(&log);
            scratchpad.push('\n');
            scratchpad.push_str(OBSERVATION);
            scratchpad.push_str(&observation);
            scratchpad.push('\n');
            scratchpad.push_str(THOUGHT);
        }

        warn!(max_iterations = self.max_iterations, "iteration limit reached");
        Err(AgentError::IterationLimit(self.max_iterations))
    }

    /// Runs one tool. Unknown tools and tool failures become the observation.
    async fn call_tool(&self, name: &str, input: &str) -> String {
        let Some(tool) = self.tools.iter().find(|tool| tool.name() == name) else {
            return format!(
                "{name} is not a valid tool, try one of [{}].",
                tool_names(&self.tools)
            );
        };

        debug!(tool = name, %input, "calling tool");
        match tool.call(input).await {
            Ok(output) => output,
            Err(err) => format!("Error: {err}"),
        }
    }
}

#[async_trait]
impl AgentDelegate for AgentExecutor {
    async fn answer(&self, question: &str) -> Result<String, AgentError> {
        self.run(question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiError;
    use crate::tool::tests::NamedTool;
    use crate::toolkit::tests::FakeDatabase;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned completions and keeps every prompt it saw.
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, AiError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<String, AiError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(vec![]),
            })
        }

        fn replying(replies: &[&str]) -> Arc<Self> {
            Self::new(replies.iter().map(|r| Ok((*r).to_string())).collect())
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, prompt: &str, stop: &[String]) -> Result<String, AiError> {
            assert_eq!(stop, ["\nObservation"]);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("Thought: still thinking".to_string()))
        }
    }

    fn executor(model: Arc<ScriptedModel>) -> AgentExecutor {
        let conf = config::AppConfig::default();
        AgentExecutor::from_config(&conf, model, Arc::new(FakeDatabase::dvd_rental()))
    }

    #[test]
    fn parses_an_action() {
        let step = parse_output(
            "Thought: count them\nAction: sql_db_query\nAction Input: \"SELECT COUNT(*) FROM actor;\"\n",
        )
        .unwrap();
        assert_eq!(
            step,
            AgentStep::Action {
                tool: "sql_db_query".into(),
                input: "SELECT COUNT(*) FROM actor;".into(),
                log: "Thought: count them\nAction: sql_db_query\nAction Input: \"SELECT COUNT(*) FROM actor;\"\n".into(),
            }
        );
    }

    #[test]
    fn parses_a_final_answer() {
        let step = parse_output(
            "Thought: I now know the final answer.\nFinal Answer: There are 200 actors in the database.\n",
        )
        .unwrap();
        assert_eq!(
            step,
            AgentStep::Finish {
                answer: "There are 200 actors in the database.".into()
            }
        );
    }

    #[test]
    fn action_and_answer_together_is_an_error() {
        let err = parse_output("Action: sql_db_query\nAction Input: SELECT 1\nFinal Answer: 1")
            .unwrap_err();
        assert!(err.message.starts_with("Parsing LLM output produced both"));
        assert_eq!(err.observation, None);
    }

    #[test]
    fn missing_action_and_missing_input_messages() {
        let err = parse_output("Thought: hmm").unwrap_err();
        assert_eq!(
            err.observation.as_deref(),
            Some("Invalid Format: Missing 'Action:' after 'Thought:'")
        );

        let err = parse_output("Thought: hmm\nAction: sql_db_query").unwrap_err();
        assert_eq!(
            err.observation.as_deref(),
            Some("Invalid Format: Missing 'Action Input:' after 'Action:'")
        );
    }

    #[test]
    fn executor_from_config_hides_the_query_checker() {
        let agent = executor(ScriptedModel::replying(&[]));
        let names: Vec<&str> = agent.tools().iter().map(|t| t.name()).collect();
        assert_eq!(names, ["sql_db_query", "sql_db_schema", "sql_db_list_tables"]);
    }

    #[tokio::test]
    async fn runs_a_query_then_answers() {
        let model = ScriptedModel::replying(&[
            "Thought: count rows in actor\nAction: sql_db_query\nAction Input: SELECT COUNT(*) FROM actor;",
            "Thought: The query returned a single value. I now know the final answer.\nFinal Answer: There are 200 actors in the database.",
        ]);
        let agent = executor(model.clone());

        let answer = agent
            .answer("What is the total number of actors?")
            .await
            .unwrap();
        assert_eq!(answer, "There are 200 actors in the database.");

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Question: What is the total number of actors?"));
        assert!(prompts[1].ends_with(
            "Action Input: SELECT COUNT(*) FROM actor;\nObservation: [(200,)]\nThought: \n"
        ));
    }

    #[tokio::test]
    async fn tool_errors_and_unknown_tools_are_fed_back() {
        let model = ScriptedModel::replying(&[
            "Action: sql_db_query\nAction Input: SELEC 1",
            "Action: drop_tables\nAction Input: all",
            "Final Answer: I could not work it out.",
        ]);
        let agent = executor(model.clone());

        let answer = agent.run("anything").await.unwrap();
        assert_eq!(answer, "I could not work it out.");

        let prompts = model.prompts();
        assert!(prompts[1].contains("Observation: Error: syntax error"));
        assert!(prompts[2].contains(
            "Observation: drop_tables is not a valid tool, try one of [sql_db_query, sql_db_schema, sql_db_list_tables]."
        ));
    }

    #[tokio::test]
    async fn parse_errors_are_recovered_from() {
        let model = ScriptedModel::replying(&["I think the answer is 200", "Final Answer: 200"]);
        let agent = executor(model.clone());

        assert_eq!(agent.run("q").await.unwrap(), "200");
        assert!(model.prompts()[1].contains(
            "I think the answer is 200\nObservation: Invalid Format: Missing 'Action:' after 'Thought:'\nThought: "
        ));
    }

    #[tokio::test]
    async fn looping_agent_hits_the_iteration_cap() {
        let model = ScriptedModel::replying(&[]);
        let agent = AgentExecutor::new(
            model.clone(),
            vec![Arc::new(NamedTool("sql_db_query"))],
            sql_agent_prompt("", &[]),
        )
        .with_max_iterations(3);

        let err = agent.run("q").await.unwrap_err();
        assert!(matches!(err, AgentError::IterationLimit(3)));
        assert_eq!(model.prompts().len(), 3);
    }

    #[tokio::test]
    async fn model_failures_end_the_run() {
        let model = ScriptedModel::new(vec![Err(AiError::Request("connection refused".into()))]);
        let err = executor(model).run("q").await.unwrap_err();
        assert!(matches!(err, AgentError::Model(AiError::Request(_))));
    }

    struct SlowModel;

    #[async_trait]
    impl LanguageModel for SlowModel {
        async fn complete(&self, _prompt: &str, _stop: &[String]) -> Result<String, AiError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("Final Answer: late".into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_enforced() {
        let agent = AgentExecutor::new(Arc::new(SlowModel), vec![], sql_agent_prompt("", &[]))
            .with_timeout(Some(Duration::from_secs(5)));

        let err = agent.run("q").await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout(d) if d == Duration::from_secs(5)));
    }
}
