use pkb_core::error::AppError;

use crate::attribution::{select_attribution, Attribution};
use crate::retrieve::ScoredReference;

/// Minimum top similarity required before the model is allowed to answer.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.28;

/// Fixed reply when the knowledge base does not cover a question. The model is told to emit
/// exactly this text when its context is insufficient.
pub const DEFERRAL_MESSAGE: &str = "此問題非規範範圍，請洽人資專員";

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Evidence too weak: reply with the deferral message, do not call the model.
    Defer { top_score: Option<f32> },
    Answer { attribution: Attribution, top_score: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceGate {
    threshold: f32,
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

impl ConfidenceGate {
    pub fn new(threshold: f32) -> Result<Self, AppError> {
        if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
            return Err(AppError::new(
                "PKB_CONFIG_INVALID",
                "Confidence threshold must be within [-1, 1]",
            )
            .with_details(format!("threshold={threshold}")));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// `refs` must be ranked best first. A top score equal to the threshold passes.
    pub fn decide(&self, refs: &[ScoredReference<'_>]) -> GateDecision {
        let Some(top) = refs.first() else {
            return GateDecision::Defer { top_score: None };
        };
        if top.score < self.threshold {
            return GateDecision::Defer {
                top_score: Some(top.score),
            };
        }
        match select_attribution(refs) {
            Some(attribution) => GateDecision::Answer {
                attribution,
                top_score: top.score,
            },
            None => GateDecision::Defer {
                top_score: Some(top.score),
            },
        }
    }
}

/// True when model output is (or contains) the deferral sentinel.
pub fn is_deferral(output: &str, sentinel: &str) -> bool {
    let sentinel = sentinel.trim();
    !sentinel.is_empty() && output.contains(sentinel)
}
