use pkb_core::domain::PolicyMeta;
use pkb_core::error::AppError;
use serde::{Deserialize, Serialize};

pub const INDEX_SCHEMA: &str = "policy_kb_index_v1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexMeta {
    pub generated_at_utc: String, // RFC3339
    pub policies_dir: String,
    pub policies_count: u32,
    pub chunk_count: u32,
    pub embedding_model: String,
    pub dims: u32,
    pub schema: String,
}

/// Per-document build summary, kept for operators inspecting the artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicySummary {
    pub source_filename: String,
    pub policy_code: String,
    pub policy_name: String,
    pub policy_month: String,
    pub chunks: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexChunk {
    pub source_filename: String,
    pub policy_code: String,
    pub policy_name: String,
    pub policy_month: String,
    // 1-based, unique within `source_filename`.
    pub chunk_id: u32,
    pub text: String,
    pub text_sha256: String,
    pub embedding: Vec<f32>,
}

impl IndexChunk {
    pub fn meta(&self) -> PolicyMeta {
        PolicyMeta {
            code: self.policy_code.clone(),
            title: self.policy_name.clone(),
            month: self.policy_month.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyIndex {
    pub meta: IndexMeta,
    pub policies: Vec<PolicySummary>,
    pub items: Vec<IndexChunk>,
}

impl PolicyIndex {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Structural checks run on every load: schema tag, counts, vector dims and text hashes.
    pub fn verify(&self) -> Result<(), AppError> {
        if self.meta.schema != INDEX_SCHEMA {
            return Err(AppError::new(
                "AI_INDEX_INCOMPATIBLE",
                "Index schema is not supported; rebuild the index",
            )
            .with_details(format!("expected={INDEX_SCHEMA}; got={}", self.meta.schema)));
        }
        if self.meta.chunk_count as usize != self.items.len() {
            return Err(AppError::new("AI_INDEX_CORRUPT", "Index chunk count mismatch")
                .with_details(format!(
                    "meta={}; items={}",
                    self.meta.chunk_count,
                    self.items.len()
                )));
        }
        for item in self.items.iter() {
            if item.embedding.len() != self.meta.dims as usize {
                return Err(AppError::new("AI_INDEX_CORRUPT", "Index vector dims mismatch")
                    .with_details(format!(
                        "source={}; chunk_id={}; expected={}; got={}",
                        item.source_filename,
                        item.chunk_id,
                        self.meta.dims,
                        item.embedding.len()
                    )));
            }
            if super::sha256_hex(item.text.as_bytes()) != item.text_sha256 {
                return Err(AppError::new("AI_INDEX_CORRUPT", "Index chunk text hash mismatch")
                    .with_details(format!(
                        "source={}; chunk_id={}",
                        item.source_filename, item.chunk_id
                    )));
            }
        }
        Ok(())
    }
}
