use std::sync::Arc;

use pkb_core::error::AppError;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::answer::{answer_with_llm, LlmAnswer};
use crate::attribution::Attribution;
use crate::embeddings::Embedder;
use crate::guardrails::{ConfidenceGate, GateDecision, DEFAULT_CONFIDENCE_THRESHOLD, DEFERRAL_MESSAGE};
use crate::index::PolicyIndex;
use crate::llm::Llm;
use crate::openai::{DEFAULT_COMPLETION_MODEL, DEFAULT_EMBEDDING_MODEL};
use crate::retrieve::{retrieve, DEFAULT_TOP_K};

pub mod cooldown;

pub use cooldown::{
    check_and_touch, Clock, InMemoryLastSeenStore, LastSeenStore, SystemClock,
    DEFAULT_INTRO_COOLDOWN,
};

pub const DEFAULT_INTRO_TEXT: &str = "你好，我是【人資AI助手】🤖\n\n你可以直接輸入人資相關問題，例如：\n・病假規則是什麼？\n・加班費如何計算？\n・特休規定有哪些？\n";
pub const DEFAULT_ANSWER_HEADER: &str = "📖【HR AI 助手回覆】";
pub const DEFAULT_FAILURE_MESSAGE: &str = "系統暫時無法回覆，請稍後再試；急件請直接洽人資專員。";

/// User-facing texts. The deferral and failure texts must differ so the two outcomes stay
/// distinguishable in transcripts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ReplyMessages {
    pub intro: String,
    pub answer_header: String,
    pub deferral: String,
    pub failure: String,
}

impl Default for ReplyMessages {
    fn default() -> Self {
        Self {
            intro: DEFAULT_INTRO_TEXT.to_string(),
            answer_header: DEFAULT_ANSWER_HEADER.to_string(),
            deferral: DEFERRAL_MESSAGE.to_string(),
            failure: DEFAULT_FAILURE_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponderSettings {
    pub embedding_model: String,
    pub completion_model: String,
    pub top_k: usize,
    pub confidence_threshold: f32,
    pub intro_cooldown: Duration,
    pub messages: ReplyMessages,
}

impl Default for ResponderSettings {
    fn default() -> Self {
        Self {
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            top_k: DEFAULT_TOP_K,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            intro_cooldown: DEFAULT_INTRO_COOLDOWN,
            messages: ReplyMessages::default(),
        }
    }
}

/// Result of answering one question, before banner and message formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Answered {
        attribution: Attribution,
        top_score: f32,
        text: String,
    },
    /// Either the gate rejected the evidence or the model declined.
    Deferred { top_score: Option<f32> },
}

/// Query handler: (question, requester_id) → reply text.
///
/// All collaborators are injected. The index is shared read-only for the handler's lifetime.
pub struct Responder {
    index: Arc<PolicyIndex>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn Llm>,
    last_seen: Arc<dyn LastSeenStore>,
    clock: Arc<dyn Clock>,
    gate: ConfidenceGate,
    settings: ResponderSettings,
}

impl Responder {
    pub fn new(
        index: Arc<PolicyIndex>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn Llm>,
        settings: ResponderSettings,
    ) -> Result<Self, AppError> {
        let gate = ConfidenceGate::new(settings.confidence_threshold)?;
        if settings.messages.deferral.trim() == settings.messages.failure.trim() {
            return Err(AppError::new(
                "PKB_CONFIG_INVALID",
                "Deferral and failure messages must differ",
            ));
        }
        if index.meta.embedding_model != settings.embedding_model {
            tracing::warn!(
                index_model = %index.meta.embedding_model,
                query_model = %settings.embedding_model,
                "index was built with a different embedding model"
            );
        }
        Ok(Self {
            index,
            embedder,
            llm,
            last_seen: Arc::new(InMemoryLastSeenStore::new()),
            clock: Arc::new(SystemClock),
            gate,
            settings,
        })
    }

    pub fn with_last_seen_store(mut self, store: Arc<dyn LastSeenStore>) -> Self {
        self.last_seen = store;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn index(&self) -> &PolicyIndex {
        &self.index
    }

    pub fn settings(&self) -> &ResponderSettings {
        &self.settings
    }

    /// Retrieve, gate and (if confident) ground one completion. The model is never called when
    /// the gate defers.
    pub fn answer(&self, question: &str) -> Result<Outcome, AppError> {
        if question.trim().is_empty() {
            return Ok(Outcome::Deferred { top_score: None });
        }

        let refs = retrieve(
            &self.index,
            self.embedder.as_ref(),
            &self.settings.embedding_model,
            question,
            self.settings.top_k,
        )?;

        let (attribution, top_score) = match self.gate.decide(&refs) {
            GateDecision::Defer { top_score } => {
                tracing::info!(?top_score, threshold = self.gate.threshold(), "deferring: low confidence");
                return Ok(Outcome::Deferred { top_score });
            }
            GateDecision::Answer {
                attribution,
                top_score,
            } => (attribution, top_score),
        };

        match answer_with_llm(
            self.llm.as_ref(),
            &self.settings.completion_model,
            question,
            &refs,
            &self.settings.messages.deferral,
        )? {
            LlmAnswer::Answered(text) => Ok(Outcome::Answered {
                attribution,
                top_score,
                text,
            }),
            LlmAnswer::Deferred => {
                tracing::info!(top_score, "deferring: model reported insufficient context");
                Ok(Outcome::Deferred {
                    top_score: Some(top_score),
                })
            }
        }
    }

    /// Full reply for one inbound message, including the intro banner when due.
    pub fn respond(&self, question: &str, requester_id: &str) -> String {
        let show_intro = check_and_touch(
            self.last_seen.as_ref(),
            self.clock.as_ref(),
            requester_id,
            self.settings.intro_cooldown,
        );

        let msgs = &self.settings.messages;
        let body = match self.answer(question) {
            Ok(Outcome::Answered {
                attribution, text, ..
            }) => format!("{}\n{}", attribution.preface(), text),
            Ok(Outcome::Deferred { .. }) => msgs.deferral.clone(),
            Err(e) => {
                tracing::error!(
                    code = %e.code,
                    details = e.details.as_deref().unwrap_or(""),
                    retryable = e.retryable,
                    "query failed: {}",
                    e.message
                );
                msgs.failure.clone()
            }
        };

        if show_intro {
            format!("{}\n{}\n{}", msgs.intro, msgs.answer_header, body)
        } else {
            body
        }
    }
}
