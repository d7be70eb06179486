use std::collections::HashMap;

use crate::error::PromptError;

/// Instructions for the SQL agent. `{db_schema}` and `{examples}` are bound once at
/// start-up, the rest on every step of the loop.
pub const SQL_AGENT_TEMPLATE: &str = "
You are an agent designed to interact with a PostgreSQL database.
Given an input question, you are to generate a valid SQL query to answer it.
The database schema is as follows: {db_schema}
The user is asking the following question: {input}
You have access to the following tools: {tools}
Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: The query returned a single value. I now know the final answer.
Final Answer: the final answer to the original input question

**IMPORTANT: Once you have a result that directly answers the question, you MUST provide the Final Answer and stop. Do not loop or attempt further actions.**

Begin!

{examples}

Question: {input}
{agent_scratchpad}
";

/// A `{name}` style template with required inputs and pre-bound partials.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    input_variables: Vec<String>,
    partials: HashMap<String, String>,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>, input_variables: &[&str]) -> Self {
        Self {
            template: template.into(),
            input_variables: input_variables.iter().map(ToString::to_string).collect(),
            partials: HashMap::new(),
        }
    }

    #[must_use]
    pub fn partial(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.partials.insert(name.into(), value.into());
        self
    }

    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// Substitutes every placeholder. Values are inserted verbatim and never
    /// scanned for further placeholders, so SQL or JSON inside them is safe.
    pub fn format(&self, values: &[(&str, &str)]) -> Result<String, PromptError> {
        let lookup = |name: &str| {
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .or_else(|| self.partials.get(name).map(String::as_str))
        };

        if let Some(missing) = self
            .input_variables
            .iter()
            .find(|name| !values.iter().any(|(key, _)| key == name))
        {
            return Err(PromptError::MissingVariable(missing.clone()));
        }

        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") || tail.starts_with("}}") {
                out.push_str(&tail[..1]);
                rest = &tail[2..];
                continue;
            }

            if tail.starts_with('}') {
                out.push('}');
                rest = &tail[1..];
                continue;
            }

            match placeholder(tail) {
                Some(name) => {
                    let value =
                        lookup(name).ok_or_else(|| PromptError::MissingVariable(name.to_string()))?;
                    out.push_str(value);
                    rest = &tail[name.len() + 2..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }

        out.push_str(rest);
        Ok(out)
    }
}

/// The identifier inside a `{name}` at the start of `s`, if there is one.
fn placeholder(s: &str) -> Option<&str> {
    let inner = s.strip_prefix('{')?;
    let end = inner.find('}')?;
    let name = &inner[..end];
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(name)
}

/// The SQL agent prompt with the schema description and the worked examples bound.
pub fn sql_agent_prompt(schema: &str, examples: &[String]) -> PromptTemplate {
    PromptTemplate::new(
        SQL_AGENT_TEMPLATE,
        &["input", "tools", "tool_names", "agent_scratchpad"],
    )
    .partial("db_schema", schema)
    .partial("examples", examples.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_values<'a>(question: &'a str, scratchpad: &'a str) -> Vec<(&'a str, &'a str)> {
        vec![
            ("input", question),
            ("tools", "sql_db_query: run a query"),
            ("tool_names", "sql_db_query"),
            ("agent_scratchpad", scratchpad),
        ]
    }

    #[test]
    fn sql_prompt_binds_schema_examples_and_inputs() {
        let prompt = sql_agent_prompt(
            "- Table `actor`: `actor_id`",
            &["Question: a\nFinal Answer: b".into(), "Question: c\nFinal Answer: d".into()],
        );
        let text = prompt
            .format(&step_values("How many actors?", ""))
            .unwrap();

        assert!(text.contains("The database schema is as follows: - Table `actor`: `actor_id`"));
        assert!(text.contains("should be one of [sql_db_query]"));
        assert!(text.contains("Question: a\nFinal Answer: b\n\nQuestion: c\nFinal Answer: d"));
        assert!(text.trim_end().ends_with("Question: How many actors?"));
        assert!(!text.contains('{'));
    }

    #[test]
    fn template_tells_the_agent_to_stop_after_the_final_answer() {
        assert!(SQL_AGENT_TEMPLATE.contains("you MUST provide the Final Answer and stop"));
        assert_eq!(
            sql_agent_prompt("", &[]).input_variables(),
            ["input", "tools", "tool_names", "agent_scratchpad"]
        );
    }

    #[test]
    fn missing_required_input_is_reported() {
        let err = sql_agent_prompt("", &[])
            .format(&[("input", "q"), ("tools", ""), ("tool_names", "")])
            .unwrap_err();
        assert_eq!(err, PromptError::MissingVariable("agent_scratchpad".into()));
    }

    #[test]
    fn unbound_placeholder_is_reported() {
        let err = PromptTemplate::new("{a} and {b}", &["a"])
            .format(&[("a", "1")])
            .unwrap_err();
        assert_eq!(err, PromptError::MissingVariable("b".into()));
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let text = PromptTemplate::new("Q: {input}", &["input"])
            .format(&[("input", "select '{input}'")])
            .unwrap();
        assert_eq!(text, "Q: select '{input}'");
    }

    #[test]
    fn braces_can_be_escaped_and_stray_ones_survive() {
        let text = PromptTemplate::new("{{x}} {not a var} {y}", &["y"])
            .format(&[("y", "1")])
            .unwrap();
        assert_eq!(text, "{x} {not a var} 1");
    }

    #[test]
    fn inputs_override_partials_of_the_same_name() {
        let text = PromptTemplate::new("{a}", &[])
            .partial("a", "partial")
            .format(&[("a", "input")])
            .unwrap();
        assert_eq!(text, "input");
    }
}
