use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, error, info_span, trace};

use crate::error::AiError;

/// A text-completion model. The agent only ever needs one prompt in and one
/// completion out, cut at the first stop sequence.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str, stop: &[String]) -> Result<String, AiError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions<'a>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions<'a> {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    done_reason: Option<String>,
}

/// Completion client for an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaLLM {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaLLM {
    pub fn new(conf: &config::AIConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: conf.url.trim_end_matches('/').to_string(),
            model: conf.model.clone(),
            temperature: conf.temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for OllamaLLM {
    async fn complete(&self, prompt: &str, stop: &[String]) -> Result<String, AiError> {
        let url = format!("{}/api/generate", self.base_url);
        let span = info_span!("ollama.generate", %url, model = %self.model);

        async {
            let request = GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
                options: GenerateOptions {
                    temperature: self.temperature,
                    stop: (!stop.is_empty()).then_some(stop),
                },
            };

            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| AiError::Request(e.to_string()))?;

            let status = response.status();
            debug!(%status, "received response");

            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Failed to read error body".into());
                error!(%status, %body, "generate request failed");
                return Err(AiError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            let text = response
                .text()
                .await
                .map_err(|e| AiError::Request(format!("Failed to read response text: {e}")))?;

            let parsed: GenerateResponse = serde_json::from_str(&text).map_err(|e| {
                error!(%e, raw = %text, "deserialization error");
                AiError::Serialization(format!("{e}. Raw JSON was: '{text}'"))
            })?;

            trace!(done_reason = ?parsed.done_reason, "completion finished");
            Ok(parsed.response)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_temperature_and_stop() {
        let stop = vec!["\nObservation".to_string()];
        let body = serde_json::to_value(GenerateRequest {
            model: "llama3",
            prompt: "Question: hi",
            stream: false,
            options: GenerateOptions {
                temperature: 0.5,
                stop: Some(stop.as_slice()),
            },
        })
        .unwrap();

        assert_eq!(body["model"], "llama3");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["temperature"], 0.5);
        assert_eq!(body["options"]["stop"][0], "\nObservation");
    }

    #[test]
    fn absent_stop_list_is_omitted() {
        let body = serde_json::to_value(GenerateRequest {
            model: "llama3",
            prompt: "p",
            stream: false,
            options: GenerateOptions {
                temperature: 0.1,
                stop: None,
            },
        })
        .unwrap();

        assert!(body["options"].get("stop").is_none());
    }

    #[test]
    fn trailing_slash_in_base_url_is_dropped() {
        let llm = OllamaLLM::new(&config::AIConfig {
            url: "http://localhost:11434/".into(),
            ..Default::default()
        });
        assert_eq!(llm.base_url, "http://localhost:11434");
        assert_eq!(llm.model(), "llama3");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_request_error() {
        let llm = OllamaLLM::new(&config::AIConfig {
            url: "http://127.0.0.1:9".into(),
            ..Default::default()
        });
        let err = llm.complete("hello", &[]).await.unwrap_err();
        assert!(matches!(err, AiError::Request(_)));
    }
}
