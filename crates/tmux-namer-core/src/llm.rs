use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

use crate::config::{self, LlmConfig};
use crate::error::{NamerError, Result};
use crate::payload::truncate_chars;
use crate::pricing::Usage;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Raw model output plus the token usage it was billed for.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub usage: Usage,
}

/// Something that can turn a list of questions into a (raw) window name.
pub trait NameGenerator {
    fn generate(&self, questions: &[String]) -> impl Future<Output = Result<Generation>>;
}

/// OpenAI chat-completions client for window names. One request per call,
/// no retries.
pub struct LlmService {
    config: LlmConfig,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for LlmService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmService")
            .field("model", &self.config.model)
            .field("base_url", &self.base_url())
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl LlmService {
    /// Build a client with an explicit credential. A missing key is not an
    /// error here; it surfaces as `NamerError::Auth` on the first `generate`.
    pub fn new(config: &LlmConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NamerError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config: config.clone(),
            api_key,
            client,
        })
    }

    /// Build a client, resolving the key from config or environment.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(config, config::resolve_api_key(config))
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    fn request_body(&self, questions: &[String]) -> serde_json::Value {
        let prompt = build_prompt(questions, self.config.max_question_chars);
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": self.config.system_prompt},
                {"role": "user", "content": prompt},
            ],
            "max_tokens": self.config.max_tokens,
        });
        if let Some(t) = self.config.temperature {
            body["temperature"] = serde_json::json!(t);
        }
        body
    }

    /// OpenAI: POST {base_url}/v1/chat/completions
    async fn generate_openai(&self, questions: &[String]) -> Result<Generation> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            NamerError::Auth(format!(
                "{} not set",
                self.config
                    .env_var
                    .as_deref()
                    .unwrap_or(config::DEFAULT_API_KEY_ENV)
            ))
        })?;

        let url = format!("{}/v1/chat/completions", self.base_url());
        let body = self.request_body(questions);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(NamerError::Upstream(upstream_error_message(
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status"),
                &text,
            )));
        }

        let completion: ChatCompletion = resp
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;

        completion.into_generation()
    }

    fn transport_error(&self, e: reqwest::Error) -> NamerError {
        if e.is_timeout() {
            NamerError::Upstream(format!(
                "request timed out after {}s",
                self.config.timeout_secs
            ))
        } else if e.is_decode() {
            NamerError::Upstream(format!("response parse error: {e}"))
        } else {
            NamerError::Upstream(format!("network error: {e}"))
        }
    }
}

impl NameGenerator for LlmService {
    async fn generate(&self, questions: &[String]) -> Result<Generation> {
        self.generate_openai(questions).await
    }
}

/// The user-turn prompt listing the questions, each capped at `max_chars`.
pub fn build_prompt(questions: &[String], max_chars: usize) -> String {
    let context = questions
        .iter()
        .map(|q| format!("- {}", truncate_chars(q, max_chars)))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Based on these user questions:\n{context}\n\n\
         Generate a 2-4 word lowercase phrase describing this work session. \
         Output ONLY the phrase, nothing else."
    )
}

/// Prefer the API's own `error.message`; fall back to the status line.
fn upstream_error_message(code: u16, reason: &str, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(str::to_string))
        .filter(|msg| !msg.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP {code}: {reason}"))
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl ChatCompletion {
    fn into_generation(self) -> Result<Generation> {
        let usage = self
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let text = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| NamerError::Upstream("response missing message content".into()))?;

        Ok(Generation {
            text: text.trim().to_string(),
            usage,
        })
    }
}
