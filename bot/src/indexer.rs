use pkb_ai::embeddings::Embedder;
use pkb_ai::index::{IndexBuildInput, IndexStore, PolicyIndex};
use pkb_core::error::AppError;
use pkb_core::ingest::load_policy_documents;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::config::BotConfig;

pub fn now_rfc3339_utc() -> Result<String, AppError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| AppError::new("AI_INDEX_BUILD_FAILED", "Failed to format time").with_details(e.to_string()))
}

/// Full offline rebuild: read every policy, chunk, embed, then replace the index file.
///
/// Any failure leaves the previous index untouched.
pub fn run_index(cfg: &BotConfig, embedder: &dyn Embedder) -> Result<PolicyIndex, AppError> {
    let policies_dir = cfg.paths.policies_dir.as_path();
    tracing::info!(dir = %policies_dir.display(), "reading policies");
    let docs = load_policy_documents(policies_dir)?;

    let store = IndexStore::open(cfg.paths.index_path.clone());
    let index = store.build_with_embedder(
        &docs,
        embedder,
        IndexBuildInput {
            model: cfg.models.embedding.clone(),
            policies_dir: policies_dir.to_string_lossy().to_string(),
            generated_at_utc: now_rfc3339_utc()?,
            chunking: cfg.chunking,
        },
    )?;

    tracing::info!(
        path = %store.path().display(),
        policies = index.meta.policies_count,
        chunks = index.meta.chunk_count,
        dims = index.meta.dims,
        "index written"
    );
    Ok(index)
}
