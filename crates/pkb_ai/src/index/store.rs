use std::fs;
use std::path::{Path, PathBuf};

use pkb_core::domain::{compare_for_index, PolicyDocument};
use pkb_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::chunking::{chunk_text, ChunkConfig};
use crate::embeddings::Embedder;

use super::model::{IndexChunk, IndexMeta, PolicyIndex, PolicySummary, INDEX_SCHEMA};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexBuildInput {
    pub model: String,
    pub policies_dir: String,
    pub generated_at_utc: String,
    pub chunking: ChunkConfig,
}

/// The single on-disk index artifact.
#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    pub fn open(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }

    fn ensure_parent(&self) -> Result<(), AppError> {
        let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };
        fs::create_dir_all(parent).map_err(|e| {
            AppError::new("AI_INDEX_BUILD_FAILED", "Failed to create index directory")
                .with_details(format!("path={}; err={}", parent.display(), e))
        })
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load and verify the whole index into memory.
    pub fn load(&self) -> Result<PolicyIndex, AppError> {
        if !self.exists() {
            return Err(AppError::new(
                "AI_INDEX_NOT_READY",
                "Index not found; run the indexer first",
            )
            .with_details(format!("path={}", self.path.display())));
        }
        let bytes = fs::read(&self.path).map_err(|e| {
            AppError::new("AI_INDEX_NOT_READY", "Failed to read index")
                .with_details(format!("path={}; err={}", self.path.display(), e))
        })?;
        let index: PolicyIndex = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::new("AI_INDEX_CORRUPT", "Failed to decode index")
                .with_details(format!("path={}; err={}", self.path.display(), e))
        })?;
        index.verify()?;
        Ok(index)
    }

    /// Replace the artifact via tmp file + rename so a running reader never sees a partial write.
    pub fn write(&self, index: &PolicyIndex) -> Result<(), AppError> {
        self.ensure_parent()?;
        let tmp = self.tmp_path();
        let json = serde_json::to_string_pretty(index).map_err(|e| {
            AppError::new("AI_INDEX_BUILD_FAILED", "Failed to encode index")
                .with_details(e.to_string())
        })?;
        fs::write(&tmp, json.as_bytes()).map_err(|e| {
            AppError::new("AI_INDEX_BUILD_FAILED", "Failed to write index")
                .with_details(format!("path={}; err={}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::new("AI_INDEX_BUILD_FAILED", "Failed to finalize index write")
                .with_details(format!(
                    "tmp={}; dest={}; err={}",
                    tmp.display(),
                    self.path.display(),
                    e
                ))
        })?;
        Ok(())
    }

    /// Chunk and embed every document, then write the index once.
    ///
    /// Nothing touches disk until every embedding has succeeded; any error leaves the previous
    /// artifact (if any) in place.
    pub fn build_with_embedder(
        &self,
        docs: &[PolicyDocument],
        embedder: &dyn Embedder,
        input: IndexBuildInput,
    ) -> Result<PolicyIndex, AppError> {
        input.chunking.validate()?;
        if docs.is_empty() {
            return Err(AppError::new(
                "PKB_INGEST_EMPTY",
                "No policy documents to index",
            )
            .with_details(format!("policies_dir={}", input.policies_dir)));
        }

        let mut ordered: Vec<&PolicyDocument> = docs.iter().collect();
        ordered.sort_by(|a, b| compare_for_index(a, b));

        let mut items: Vec<IndexChunk> = Vec::new();
        let mut policies: Vec<PolicySummary> = Vec::with_capacity(ordered.len());
        let mut dims: Option<u32> = None;

        for doc in ordered {
            let chunks = chunk_text(&doc.text, &input.chunking)?;
            let mut chunk_id: u32 = 0;
            for text in chunks {
                if text.trim().is_empty() {
                    tracing::debug!(source = %doc.filename, after_chunk_id = chunk_id, "skipping blank chunk");
                    continue;
                }
                chunk_id += 1;

                let embedding = embedder.embed(&input.model, &text).map_err(|e| {
                    AppError::new("AI_EMBEDDINGS_FAILED", "Failed to compute embeddings")
                        .with_details(format!(
                            "source={}; chunk_id={}; err={}",
                            doc.filename, chunk_id, e
                        ))
                        .with_retryable(e.retryable)
                })?;

                let this_dims = embedding.len() as u32;
                match dims {
                    Some(d) if d != this_dims => {
                        return Err(AppError::new(
                            "AI_INDEX_BUILD_FAILED",
                            "Embedding dimension mismatch across chunks",
                        )
                        .with_details(format!(
                            "expected={}; got={}; source={}; chunk_id={}",
                            d, this_dims, doc.filename, chunk_id
                        )));
                    }
                    Some(_) => {}
                    None if this_dims == 0 => {
                        return Err(AppError::new("AI_EMBEDDINGS_FAILED", "Embedding was empty")
                            .with_details(format!("source={}; chunk_id={}", doc.filename, chunk_id)));
                    }
                    None => dims = Some(this_dims),
                }

                items.push(IndexChunk {
                    source_filename: doc.filename.clone(),
                    policy_code: doc.meta.code.clone(),
                    policy_name: doc.meta.title.clone(),
                    policy_month: doc.meta.month.clone(),
                    chunk_id,
                    text_sha256: super::sha256_hex(text.as_bytes()),
                    text,
                    embedding,
                });
            }

            tracing::info!(source = %doc.filename, chunks = chunk_id, "indexed policy document");
            policies.push(PolicySummary {
                source_filename: doc.filename.clone(),
                policy_code: doc.meta.code.clone(),
                policy_name: doc.meta.title.clone(),
                policy_month: doc.meta.month.clone(),
                chunks: chunk_id,
            });
        }

        let Some(dims) = dims else {
            return Err(AppError::new(
                "PKB_INGEST_EMPTY",
                "Policy documents produced no text chunks",
            )
            .with_details(format!("policies_dir={}", input.policies_dir)));
        };

        let index = PolicyIndex {
            meta: IndexMeta {
                generated_at_utc: input.generated_at_utc,
                policies_dir: input.policies_dir,
                policies_count: policies.len() as u32,
                chunk_count: items.len() as u32,
                embedding_model: input.model,
                dims,
                schema: INDEX_SCHEMA.to_string(),
            },
            policies,
            items,
        };

        self.write(&index)?;
        Ok(index)
    }
}
