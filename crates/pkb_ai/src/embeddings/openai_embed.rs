use pkb_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::openai::{provider_error, OpenAiClient};

const MAX_INPUT_CHARS: usize = 8_000;

#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: OpenAiClient,
}

impl OpenAiEmbedder {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        // Chunking keeps inputs small; queries are user-supplied, so bound them here.
        let input = match input.char_indices().nth(MAX_INPUT_CHARS) {
            Some((cut, _)) => &input[..cut],
            None => input,
        };

        let req = EmbeddingsRequest { model, input };
        let resp = self
            .client
            .post("embeddings")
            .send_json(req)
            .map_err(|e| provider_error("AI_EMBEDDINGS_FAILED", "Embeddings", e))?;

        let v: EmbeddingsResponse = resp.into_json().map_err(|e| {
            AppError::new("AI_EMBEDDINGS_FAILED", "Failed to decode embeddings response")
                .with_details(e.to_string())
        })?;
        let embedding = v
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .unwrap_or_default();
        if embedding.is_empty() {
            return Err(AppError::new(
                "AI_EMBEDDINGS_FAILED",
                "Embeddings response was empty",
            ));
        }
        Ok(embedding)
    }
}
