use std::sync::Arc;
use std::time::Duration;

use pkb_ai::embeddings::{Embedder, OpenAiEmbedder};
use pkb_ai::index::IndexStore;
use pkb_ai::llm::{Llm, OpenAiLlm};
use pkb_ai::openai::OpenAiClient;
use pkb_ai::respond::Responder;
use pkb_core::error::AppError;

use crate::config::{BotConfig, ENV_API_KEY};

/// OpenAI-compatible client from config plus the API key in the environment.
pub fn provider_client(
    cfg: &BotConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<OpenAiClient, AppError> {
    let api_key = lookup(ENV_API_KEY).unwrap_or_default();
    Ok(OpenAiClient::new(&cfg.models.base_url, &api_key)?
        .with_timeout(Duration::from_secs(cfg.models.timeout_secs.max(1))))
}

pub fn provider_pair(client: OpenAiClient) -> (Arc<dyn Embedder>, Arc<dyn Llm>) {
    (
        Arc::new(OpenAiEmbedder::new(client.clone())),
        Arc::new(OpenAiLlm::new(client)),
    )
}

/// Load the index once and wire it with the given provider clients.
pub fn build_responder(
    cfg: &BotConfig,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn Llm>,
) -> Result<Responder, AppError> {
    let store = IndexStore::open(cfg.paths.index_path.clone());
    let index = store.load()?;
    tracing::info!(
        path = %store.path().display(),
        chunks = index.len(),
        model = %index.meta.embedding_model,
        built = %index.meta.generated_at_utc,
        "index loaded"
    );
    Responder::new(Arc::new(index), embedder, llm, cfg.responder_settings())
}
