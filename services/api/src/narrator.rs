//! Narrators used by the service binary.

use async_trait::async_trait;
use prospectus::config::NarrationConfig;
use prospectus::narration::{NarrationError, NarrationRequest, NarrationService, Narrator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const SYSTEM_PROMPT: &str = "You are a warm, knowledgeable admissions guide narrating a school \
prospectus to a prospective family. Speak directly to the parents, use the child's name and \
pronouns, stay factual to the supplied content and keep it to two short paragraphs.";
const MAX_TOKENS: u32 = 300;
const TEMPERATURE: f32 = 0.7;

/// Pick the remote narrator when an API key is configured, otherwise narrate offline.
pub(crate) fn narration_service(config: &NarrationConfig) -> NarrationService {
    let narrator: Arc<dyn Narrator> = match &config.api_key {
        Some(api_key) => {
            info!(endpoint = %config.endpoint, model = %config.model, "using remote narrator");
            Arc::new(OpenAiNarrator::new(
                config.endpoint.clone(),
                api_key.clone(),
                config.model.clone(),
            ))
        }
        None => {
            info!("no narration API key configured; narration uses fallback text");
            Arc::new(OfflineNarrator)
        }
    };
    NarrationService::new(narrator, config.timeout)
}

/// Always defers to the fallback sentence.
pub(crate) struct OfflineNarrator;

#[async_trait]
impl Narrator for OfflineNarrator {
    async fn narrate(&self, _request: &NarrationRequest) -> Result<String, NarrationError> {
        Err(NarrationError::Unavailable(
            "no narration API key configured".to_string(),
        ))
    }
}

/// Narrator speaking the chat-completions protocol.
pub(crate) struct OpenAiNarrator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAiNarrator {
    pub(crate) fn new(endpoint: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
        }
    }

    fn chat_request(&self, request: &NarrationRequest) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt(),
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

fn first_choice(response: ChatResponse) -> Result<String, NarrationError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| NarrationError::Malformed("response contained no narration".to_string()))
}

#[async_trait]
impl Narrator for OpenAiNarrator {
    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.chat_request(request))
            .send()
            .await
            .map_err(|err| NarrationError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NarrationError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| NarrationError::Malformed(err.to_string()))?;
        first_choice(parsed)
    }
}
