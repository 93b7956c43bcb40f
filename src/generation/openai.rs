//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::prompts::{self, QuizPlan};
use super::{ContentGenerator, FlashcardSet, GenerationError};
use crate::models::{Flashcard, Quiz};
use crate::students::GenerationSettings;

const MAX_RETRIES: u32 = 2;
const BASE_BACKOFF_MS: u64 = 250;
const MINDMAP_MAX_TOKENS: u32 = 2048;
const MINDMAP_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn system(content: &str) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    fn user(content: String) -> Self {
        Self {
            role: "user".into(),
            content,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Default, Clone, Copy)]
struct CallOptions {
    json: bool,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

pub struct OpenAiGenerator {
    settings: GenerationSettings,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

impl OpenAiGenerator {
    /// Builds a client from settings, reading the key from the environment
    /// variable they name. A missing key is reported on the first call.
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self, GenerationError> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|v| !v.trim().is_empty());
        Self::with_api_key(settings, api_key)
    }

    pub fn with_api_key(
        settings: &GenerationSettings,
        api_key: Option<String>,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.call_timeout)
            .build()?;
        Ok(Self {
            settings: settings.clone(),
            api_key,
            client,
        })
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
            && !self.settings.model.trim().is_empty()
            && !self.settings.api_endpoint.trim().is_empty()
    }

    fn complete(
        &self,
        system: &str,
        prompt: String,
        options: CallOptions,
    ) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            GenerationError::NotConfigured(format!("{} is not set", self.settings.api_key_env))
        })?;
        let messages = [ChatMessage::system(system), ChatMessage::user(prompt)];
        let request = ChatRequest {
            model: &self.settings.model,
            messages: &messages,
            response_format: options
                .json
                .then(|| serde_json::json!({ "type": "json_object" })),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };
        let url = format!(
            "{}/chat/completions",
            self.settings.api_endpoint.trim_end_matches('/')
        );
        let response = self.post_with_retry(&url, api_key, &request)?;
        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;
        Ok(content.trim().to_string())
    }

    fn post_with_retry(
        &self,
        url: &str,
        api_key: &str,
        request: &ChatRequest<'_>,
    ) -> Result<ChatResponse, GenerationError> {
        let mut retry = 0;
        loop {
            let err = match self.client.post(url).bearer_auth(api_key).json(request).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp.bytes()?;
                        return Ok(serde_json::from_slice(&bytes)?);
                    }
                    let body = resp.text().unwrap_or_default();
                    let err = GenerationError::HttpStatus { status, body };
                    if !is_retryable(status) {
                        return Err(err);
                    }
                    err
                }
                // A timed-out request already spent the whole call budget.
                Err(e) if e.is_timeout() => return Err(GenerationError::Request(e)),
                Err(e) => GenerationError::Request(e),
            };
            if retry >= MAX_RETRIES {
                return Err(err);
            }
            let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
            warn!(retry, error = %err, "generation request failed, retrying");
            std::thread::sleep(backoff);
            retry += 1;
        }
    }
}

impl ContentGenerator for OpenAiGenerator {
    fn generate_summary(&self, text: &str) -> Result<String, GenerationError> {
        self.complete(
            prompts::ASSISTANT_SYSTEM,
            prompts::summary_prompt(text),
            CallOptions::default(),
        )
    }

    fn generate_flashcards(&self, text: &str) -> Result<Vec<Flashcard>, GenerationError> {
        let raw = self.complete(
            prompts::JSON_SYSTEM,
            prompts::flashcards_prompt(text),
            CallOptions {
                json: true,
                ..CallOptions::default()
            },
        )?;
        serde_json::from_str::<FlashcardSet>(&raw)?.validate()
    }

    fn generate_mindmap(&self, text: &str) -> Result<String, GenerationError> {
        if text.chars().count() > self.settings.max_input_chars {
            warn!(
                max_chars = self.settings.max_input_chars,
                "mindmap source truncated"
            );
        }
        let markdown = self.complete(
            prompts::ASSISTANT_SYSTEM,
            prompts::mindmap_prompt(text, self.settings.max_input_chars),
            CallOptions {
                json: false,
                max_tokens: Some(MINDMAP_MAX_TOKENS),
                temperature: Some(MINDMAP_TEMPERATURE),
            },
        )?;
        if !markdown.lines().any(|l| l.trim_start().starts_with('#')) {
            return Err(GenerationError::Malformed(
                "mindmap has no markdown headings".into(),
            ));
        }
        Ok(markdown)
    }

    fn generate_quiz(&self, text: &str, plan: QuizPlan) -> Result<Quiz, GenerationError> {
        let raw = self.complete(
            prompts::JSON_SYSTEM,
            prompts::quiz_prompt(text, plan),
            CallOptions {
                json: true,
                ..CallOptions::default()
            },
        )?;
        let quiz = parse_quiz(&raw)?;
        if quiz.len() != plan.total {
            debug!(
                requested = plan.total,
                received = quiz.len(),
                "quiz length differs from plan"
            );
        }
        Ok(quiz)
    }

    fn generate_formula_sheet(&self, text: &str) -> Result<String, GenerationError> {
        self.complete(
            prompts::FORMULA_SYSTEM,
            prompts::formula_sheet_prompt(text),
            CallOptions::default(),
        )
    }
}

/// Parses and validates a `{"quiz": [...]}` document.
pub fn parse_quiz(raw: &str) -> Result<Quiz, GenerationError> {
    let quiz: Quiz = serde_json::from_str(raw)?;
    quiz.validate()?;
    Ok(quiz)
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}
