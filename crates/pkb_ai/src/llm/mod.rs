use pkb_core::error::AppError;

/// One-shot completion: a system instruction plus a user prompt in, answer text out.
pub trait Llm: Send + Sync {
    fn generate(&self, model: &str, system: &str, prompt: &str) -> Result<String, AppError>;
}

pub mod openai_llm;

pub use openai_llm::OpenAiLlm;
