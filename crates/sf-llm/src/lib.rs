//! Generative-text integration for the habit tracker.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint (DeepSeek by
//! default) to produce:
//! - No-added-sugar recipe suggestions from user-supplied ingredients
//! - Short motivation messages tuned to the user's streak
//!
//! The client holds no tracker state; request building and response parsing
//! are pure functions so they can be tested without the network. A static
//! fallback recipe keeps the feature usable when the service is down or no
//! API key is configured.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default OpenAI-compatible endpoint (DeepSeek).
pub const DEFAULT_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";
/// Default model name.
pub const DEFAULT_MODEL: &str = "deepseek-chat";

const RECIPE_MAX_TOKENS: u32 = 1000;
const RECIPE_TEMPERATURE: f32 = 0.7;
const MOTIVATION_MAX_TOKENS: u32 = 200;
const MOTIVATION_TEMPERATURE: f32 = 0.9;

/// LLM client errors.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provided API key was invalid.
    #[error("invalid API key: {reason}")]
    InvalidApiKey { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error: {message}")]
    Api { message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Chat-completions API client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
pub struct Client {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_key", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client with the given API key against the default
    /// endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_api_url(api_key, DEFAULT_API_URL)
    }

    /// Creates a new client against a custom endpoint.
    pub fn with_api_url(
        api_key: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();

        if api_key.is_empty() {
            return Err(LlmError::InvalidApiKey {
                reason: "API key cannot be empty",
            });
        }
        if api_key.trim().is_empty() {
            return Err(LlmError::InvalidApiKey {
                reason: "API key cannot be whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(LlmError::ClientBuild)?;

        Ok(Self {
            http,
            api_key,
            api_url: api_url.into(),
        })
    }

    /// Generates a no-added-sugar recipe from the given ingredients.
    pub async fn generate_recipe(
        &self,
        model: &str,
        ingredients: &str,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: model.to_string(),
            max_tokens: RECIPE_MAX_TOKENS,
            temperature: RECIPE_TEMPERATURE,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: RECIPE_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_recipe_prompt(ingredients),
                },
            ],
        };
        self.complete(&request).await
    }

    /// Generates a short motivation message for the given streak length.
    pub async fn generate_motivation(
        &self,
        model: &str,
        streak_days: u32,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: model.to_string(),
            max_tokens: MOTIVATION_MAX_TOKENS,
            temperature: MOTIVATION_TEMPERATURE,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MOTIVATION_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_motivation_prompt(streak_days),
                },
            ],
        };
        self.complete(&request).await
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(&body).unwrap_or_else(|| LlmError::Api {
                message: format!("status {status}: {body}"),
            }));
        }

        let payload: ChatResponse = serde_json::from_str(&body)
            .map_err(|err| LlmError::InvalidResponse(err.to_string()))?;
        extract_content(payload)
    }
}

const RECIPE_SYSTEM_PROMPT: &str = "\
You are a nutrition-minded cook. Create tasty recipes with no added sugar.
Rules:
1. Never use sugar, honey, syrups, or other sweeteners.
2. Stick to plain, widely available ingredients.
3. Give a short name, a cooking time, an ingredient list, and numbered steps.
4. Finish with one practical tip.";

const MOTIVATION_SYSTEM_PROMPT: &str = "\
You are a supportive coach helping someone quit added sugar. Reply with a \
single short encouraging message. No hashtags, no emoji spam.";

fn build_recipe_prompt(ingredients: &str) -> String {
    format!(
        "Create a healthy no-added-sugar dish using these ingredients: {}",
        ingredients.trim()
    )
}

fn build_motivation_prompt(streak_days: u32) -> String {
    if streak_days == 0 {
        "I slipped up today and my streak is back to zero. Encourage me to start again.".to_string()
    } else {
        format!("I have stayed sugar-free for {streak_days} days in a row. Cheer me on.")
    }
}

/// Static recipe used when the service is unreachable or unconfigured.
pub fn fallback_recipe(ingredients: &str) -> String {
    format!(
        "Simple no-sugar salad\n\
         \n\
         Time: 15 minutes\n\
         \n\
         Ingredients:\n\
         - {}\n\
         - Olive oil\n\
         - Lemon juice\n\
         - Salt and pepper to taste\n\
         \n\
         Steps:\n\
         1. Chop everything into bite-sized pieces.\n\
         2. Toss in a large bowl.\n\
         3. Dress with olive oil and lemon juice.\n\
         4. Season and serve.\n\
         \n\
         Tip: the fiber keeps you full without reaching for anything sweet.",
        ingredients.trim()
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

fn extract_content(payload: ChatResponse) -> Result<String, LlmError> {
    let content = payload
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content);
    match content {
        Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        _ => Err(LlmError::InvalidResponse(
            "missing message content".to_string(),
        )),
    }
}

fn parse_api_error(body: &str) -> Option<LlmError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| LlmError::Api {
            message: payload.error.message,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_rejects_empty_api_key() {
        assert!(matches!(
            Client::new(""),
            Err(LlmError::InvalidApiKey { .. })
        ));
    }

    #[test]
    fn client_rejects_whitespace_api_key() {
        assert!(matches!(
            Client::new("   "),
            Err(LlmError::InvalidApiKey { .. })
        ));
    }

    #[test]
    fn client_accepts_valid_api_key() {
        assert!(Client::new("sk-valid-key").is_ok());
    }

    #[test]
    fn client_debug_redacts_api_key() {
        let client = Client::new("secret-key").unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn recipe_prompt_includes_ingredients() {
        let prompt = build_recipe_prompt("  oats, banana ");
        assert!(prompt.contains("oats, banana"));
        assert!(!prompt.ends_with(' '));
    }

    #[test]
    fn motivation_prompt_mentions_streak() {
        assert!(build_motivation_prompt(12).contains("12 days"));
        assert!(build_motivation_prompt(0).contains("start again"));
    }

    #[test]
    fn extract_content_reads_first_choice() {
        let payload: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Baked apples\n"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_content(payload).unwrap(), "Baked apples");
    }

    #[test]
    fn extract_content_rejects_empty_choices() {
        let payload: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            extract_content(payload),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn parse_api_error_reads_openai_shape() {
        let body = r#"{"error":{"message":"rate limited","type":"rate_limit_error"}}"#;
        let err = parse_api_error(body).unwrap();
        assert!(matches!(err, LlmError::Api { message } if message == "rate limited"));
    }

    #[test]
    fn fallback_recipe_uses_ingredients() {
        let recipe = fallback_recipe("cucumber, feta");
        assert!(recipe.contains("cucumber, feta"));
        assert!(recipe.contains("no-sugar"));
    }
}
