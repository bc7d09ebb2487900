use pkb_core::error::AppError;

/// Text → fixed-length vector. One synchronous call per input; failures propagate unretried.
pub trait Embedder: Send + Sync {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError>;
}

pub mod openai_embed;

pub use openai_embed::OpenAiEmbedder;
