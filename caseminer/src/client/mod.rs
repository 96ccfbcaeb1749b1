//! Blocking client for the chat-completions provider.
//!
//! One request is in flight at a time; retries, backoff, and fallback-model
//! escalation are driven by the pure state machine in [`state`], so the
//! policy is testable without a network. Prompts are truncated
//! deterministically against each model's context budget before sending.

pub mod state;

use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use state::{step, CallAction, CallEvent, CallState};

/// One model in the fallback priority list.
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    /// Provider-side model identifier.
    pub name: &'static str,
    /// Context window, in tokens.
    pub context_tokens: usize,
    /// Request timeout, scaled to the model's expected latency.
    pub timeout: Duration,
}

/// Fallback models in priority order: the fast primary first, then larger
/// models by context size and reasoning capability. Larger models get
/// longer timeouts.
pub static MODEL_PRIORITY: &[ModelSpec] = &[
    ModelSpec {
        name: "qwen-2.5-qwq-32b",
        context_tokens: 32_768,
        timeout: Duration::from_secs(120),
    },
    ModelSpec {
        name: "qwen3-235b",
        context_tokens: 131_072,
        timeout: Duration::from_secs(300),
    },
    ModelSpec {
        name: "deepseek-r1-671b",
        context_tokens: 131_072,
        timeout: Duration::from_secs(600),
    },
    ModelSpec {
        name: "llama-3.2-3b",
        context_tokens: 131_072,
        timeout: Duration::from_secs(180),
    },
    ModelSpec {
        name: "mistral-31-24b",
        context_tokens: 131_072,
        timeout: Duration::from_secs(240),
    },
    ModelSpec {
        name: "llama-3.3-70b",
        context_tokens: 65_536,
        timeout: Duration::from_secs(180),
    },
    ModelSpec {
        name: "llama-3.1-405b",
        context_tokens: 65_536,
        timeout: Duration::from_secs(300),
    },
];

/// Tokens held back from the context budget for the response.
const RESPONSE_RESERVE_TOKENS: usize = 2000;
/// Extra buffer subtracted when sizing `max_tokens`.
const MAX_TOKENS_BUFFER: usize = 1000;
/// Floor for `max_tokens` when the prompt already crowds the context.
const MIN_RESPONSE_TOKENS: u32 = 1000;
/// Rough chars-per-token ratio for English text.
const CHARS_PER_TOKEN: usize = 3;
/// Boundary between the fixed prompt preamble and the variable-length body.
const BODY_MARKER: &str = "Press Release Body:";
/// Appended wherever a body had to be cut.
const TRUNCATION_SUFFIX: &str = "\n\n[Document truncated due to length]";

/// Rough token estimate for a piece of text.
#[inline]
fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

fn truncate_at_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Deterministically truncates a prompt to fit a model's context budget.
///
/// The instruction preamble is preserved intact; only the variable-length
/// body after the `Press Release Body:` marker is cut, with a `[truncated]`
/// note appended. Prompts without the marker fall back to a simple tail
/// cut.
pub fn truncate_prompt(prompt: &str, model: &ModelSpec) -> String {
    let budget = model.context_tokens.saturating_sub(RESPONSE_RESERVE_TOKENS);
    if estimate_tokens(prompt) <= budget {
        return prompt.to_string();
    }

    warn!(
        model = model.name,
        estimated = estimate_tokens(prompt),
        budget,
        "prompt exceeds the model's context budget, truncating"
    );

    if let Some(marker_pos) = prompt.find(BODY_MARKER) {
        let preamble = &prompt[..marker_pos];
        let body = &prompt[marker_pos..];
        let available = budget.saturating_sub(estimate_tokens(preamble));
        if available > 0 {
            let max_body_chars = available * CHARS_PER_TOKEN;
            if body.chars().count() > max_body_chars {
                let mut result = preamble.to_string();
                result.push_str(truncate_at_chars(body, max_body_chars));
                result.push_str(TRUNCATION_SUFFIX);
                return result;
            }
        }
    }

    let max_chars = budget * CHARS_PER_TOKEN;
    let mut result = truncate_at_chars(prompt, max_chars).to_string();
    result.push_str(TRUNCATION_SUFFIX);
    result
}

/// Sizes `max_tokens` to what the model's context leaves for a response.
pub fn adjust_max_tokens(prompt: &str, model: &ModelSpec, requested: u32) -> u32 {
    let available = model
        .context_tokens
        .saturating_sub(estimate_tokens(prompt))
        .saturating_sub(MAX_TOKENS_BUFFER);
    if available == 0 {
        return MIN_RESPONSE_TOKENS;
    }
    (available as u32).min(requested)
}

/// True when an error body reports the prompt exceeded the context window.
pub fn is_context_error(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("maximum context length")
        && lower.contains("tokens")
        && (lower.contains("requested") || lower.contains("exceeded"))
}

/// True when an error body reports the model itself is unusable.
pub fn is_model_error(body: &str) -> bool {
    let lower = body.to_lowercase();
    ["model", "not found", "not available", "invalid", "unsupported"]
        .iter()
        .any(|keyword| lower.contains(keyword))
}

/// Pulls the text content out of a provider response envelope.
///
/// Providers disagree on envelope shape, so each known shape is probed in a
/// fixed priority order and the first string found wins:
///
/// 1. `choices[0].message.content` (OpenAI style)
/// 2. a top-level `content` field
/// 3. one of `text`, `response`, `result`, `output`, `message`, either as a
///    string or as an object with a `content` field
pub fn extract_content(envelope: &Value) -> Option<String> {
    if let Some(content) = envelope
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
    {
        return Some(content.to_string());
    }

    if let Some(content) = envelope.get("content").and_then(Value::as_str) {
        return Some(content.to_string());
    }

    for field in ["text", "response", "result", "output", "message"] {
        match envelope.get(field) {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Object(map)) => {
                if let Some(Value::String(s)) = map.get("content") {
                    return Some(s.clone());
                }
            }
            _ => {}
        }
    }

    None
}

/// Blocking chat-completions client with retry and model fallback.
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
    retry_attempts: u32,
    retry_delay: Duration,
    models: &'static [ModelSpec],
}

impl ApiClient {
    /// Creates a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the API key is missing and
    /// [`Error::Transport`] when the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let http = reqwest::blocking::Client::builder().build()?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
            retry_attempts: config.retry_attempts,
            retry_delay: config.retry_delay,
            models: MODEL_PRIORITY,
        })
    }

    /// Issues one request, retrying and escalating through the fallback
    /// list as the policy dictates. Returns the raw response envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelsExhausted`] when every model in the priority
    /// list has been tried without a successful response.
    pub fn call(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<Value> {
        let mut state = CallState::start();
        let mut current_prompt = prompt.to_string();

        loop {
            let model = &self.models[state.model_index];
            let truncated = truncate_prompt(&current_prompt, model);
            let adjusted = adjust_max_tokens(&truncated, model, max_tokens);

            debug!(
                model = model.name,
                attempt = state.attempt,
                max_tokens = adjusted,
                prompt_chars = truncated.len(),
                "sending request"
            );

            let event = match self.send(model, &truncated, adjusted, temperature) {
                Ok(Outcome::Envelope(envelope)) => return Ok(envelope),
                Ok(Outcome::Failed(event)) => event,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    warn!(model = model.name, error = %e, "transient transport failure");
                    CallEvent::TransientFailure
                }
                Err(e) => {
                    warn!(model = model.name, error = %e, "request failed");
                    CallEvent::TransientFailure
                }
            };

            // Later models reuse the already-truncated prompt.
            current_prompt = truncated;

            let (next, action) = step(state, event, self.retry_attempts, self.models.len());
            state = next;
            match action {
                CallAction::Done => unreachable!("success returns the envelope directly"),
                CallAction::RetryAfterDelay => thread::sleep(self.retry_delay),
                CallAction::SwitchModel => {
                    info!(
                        model = self.models[state.model_index].name,
                        "switching to fallback model"
                    );
                }
                CallAction::GiveUp => return Err(Error::ModelsExhausted),
            }
        }
    }

    /// Issues one request and extracts the text content from the envelope.
    ///
    /// # Errors
    ///
    /// Everything [`ApiClient::call`] returns, plus [`Error::EmptyEnvelope`]
    /// when no known envelope shape yields a string.
    pub fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        let envelope = self.call(prompt, max_tokens, temperature)?;
        extract_content(&envelope).ok_or(Error::EmptyEnvelope)
    }

    fn send(
        &self,
        model: &ModelSpec,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> std::result::Result<Outcome, reqwest::Error> {
        let payload = json!({
            "model": model.name,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": max_tokens,
            "temperature": temperature,
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(model.timeout)
            .send()?;

        let status = response.status();
        if status.is_success() {
            return match response.json::<Value>() {
                Ok(envelope) => Ok(Outcome::Envelope(envelope)),
                Err(e) => {
                    warn!(model = model.name, error = %e, "response body was not JSON");
                    Ok(Outcome::Failed(CallEvent::RequestFailed))
                }
            };
        }

        if status.as_u16() == 429 {
            warn!(model = model.name, "rate limited");
            return Ok(Outcome::Failed(CallEvent::RateLimited));
        }

        let body = response.text().unwrap_or_default();
        if is_context_error(&body) {
            warn!(model = model.name, "context length exceeded");
            Ok(Outcome::Failed(CallEvent::ModelRejected))
        } else if is_model_error(&body) {
            warn!(model = model.name, body = %body, "model rejected the request");
            Ok(Outcome::Failed(CallEvent::ModelRejected))
        } else {
            warn!(model = model.name, status = %status, "request failed");
            Ok(Outcome::Failed(CallEvent::RequestFailed))
        }
    }
}

enum Outcome {
    Envelope(Value),
    Failed(CallEvent),
}
