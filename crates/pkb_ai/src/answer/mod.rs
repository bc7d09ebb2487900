use pkb_core::domain::display_code;
use pkb_core::error::AppError;

use crate::guardrails::is_deferral;
use crate::llm::Llm;
use crate::retrieve::ScoredReference;

mod prompts;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmAnswer {
    Answered(String),
    /// The model judged its context insufficient and returned the deferral sentinel.
    Deferred,
}

/// Grounding context handed to the model: one block per chunk, tagged `[CODE#chunk_id]`.
pub fn build_context_block(refs: &[ScoredReference<'_>]) -> String {
    refs.iter()
        .map(|r| {
            let meta = r.chunk.meta();
            format!(
                "[{}#{}] {}\n{}",
                display_code(&meta),
                r.chunk.chunk_id,
                r.chunk.source_filename,
                r.chunk.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Issue exactly one completion grounded on `refs`.
pub fn answer_with_llm(
    llm: &dyn Llm,
    model: &str,
    question: &str,
    refs: &[ScoredReference<'_>],
    deferral: &str,
) -> Result<LlmAnswer, AppError> {
    if refs.is_empty() {
        return Err(AppError::new(
            "AI_COMPLETION_FAILED",
            "At least one grounding reference is required",
        ));
    }

    let context = build_context_block(refs);
    let prompt = prompts::grounded_prompt(question.trim(), &context, deferral);
    let out = llm.generate(model, prompts::system_prompt(), &prompt)?;

    let out = out.trim();
    if out.is_empty() {
        return Err(AppError::new(
            "AI_COMPLETION_FAILED",
            "Completion response was empty",
        ));
    }
    if is_deferral(out, deferral) {
        return Ok(LlmAnswer::Deferred);
    }
    Ok(LlmAnswer::Answered(out.to_string()))
}
