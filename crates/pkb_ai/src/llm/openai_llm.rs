use pkb_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::Llm;
use crate::openai::{provider_error, OpenAiClient};

#[derive(Debug, Clone)]
pub struct OpenAiLlm {
    client: OpenAiClient,
    temperature: f32,
}

impl OpenAiLlm {
    pub fn new(client: OpenAiClient) -> Self {
        Self {
            client,
            temperature: 0.2,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

impl Llm for OpenAiLlm {
    fn generate(&self, model: &str, system: &str, prompt: &str) -> Result<String, AppError> {
        let req = ChatRequest {
            model,
            temperature: self.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let resp = self
            .client
            .post("chat/completions")
            .send_json(req)
            .map_err(|e| provider_error("AI_COMPLETION_FAILED", "Completion", e))?;

        let v: ChatResponse = resp.into_json().map_err(|e| {
            AppError::new("AI_COMPLETION_FAILED", "Failed to decode completion response")
                .with_details(e.to_string())
        })?;
        let text = v
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AppError::new(
                "AI_COMPLETION_FAILED",
                "Completion response was empty",
            ));
        }
        Ok(text.trim().to_string())
    }
}
