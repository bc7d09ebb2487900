use pkb_core::error::AppError;
use serde::Serialize;

use crate::embeddings::Embedder;
use crate::index::{IndexChunk, PolicyIndex};

mod similarity;

pub use similarity::cosine_similarity;

pub const DEFAULT_TOP_K: usize = 6;

/// A chunk of the loaded index paired with its similarity to the current query.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoredReference<'a> {
    pub chunk: &'a IndexChunk,
    pub score: f32,
}

/// Rank every chunk against an already-embedded query.
///
/// Brute-force scan; exact score ties keep index order because the sort is stable.
pub fn rank<'a>(
    index: &'a PolicyIndex,
    query_vector: &[f32],
    top_k: usize,
) -> Result<Vec<ScoredReference<'a>>, AppError> {
    let top_k = top_k.max(1);

    let mut hits: Vec<ScoredReference<'a>> = Vec::with_capacity(index.items.len());
    for chunk in index.items.iter() {
        if chunk.embedding.len() != query_vector.len() {
            return Err(AppError::new(
                "AI_RETRIEVAL_FAILED",
                "Query embedding dims do not match index dims",
            )
            .with_details(format!(
                "source={}; chunk_id={}; index_dims={}; query_dims={}",
                chunk.source_filename,
                chunk.chunk_id,
                chunk.embedding.len(),
                query_vector.len()
            )));
        }
        hits.push(ScoredReference {
            chunk,
            score: cosine_similarity(query_vector, &chunk.embedding),
        });
    }

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(top_k);
    Ok(hits)
}

/// Embed `query` and return the `top_k` most similar chunks, best first.
///
/// An empty index yields an empty result without calling the embedder.
pub fn retrieve<'a>(
    index: &'a PolicyIndex,
    embedder: &dyn Embedder,
    model: &str,
    query: &str,
    top_k: usize,
) -> Result<Vec<ScoredReference<'a>>, AppError> {
    let q = query.trim();
    if q.is_empty() {
        return Err(AppError::new(
            "AI_RETRIEVAL_FAILED",
            "Query must not be empty",
        ));
    }
    if index.is_empty() {
        return Ok(Vec::new());
    }

    let qv = embedder.embed(model, q)?;
    let hits = rank(index, &qv, top_k)?;

    if let Some(best) = hits.first() {
        tracing::debug!(
            top_score = best.score,
            source = %best.chunk.source_filename,
            chunk_id = best.chunk.chunk_id,
            hits = hits.len(),
            "retrieved references"
        );
    }
    Ok(hits)
}
