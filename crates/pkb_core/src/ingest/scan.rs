use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{compare_for_index, PolicyDocument};
use crate::error::AppError;
use crate::normalize::normalize_text;

use super::extract::{extract_text, SourceFormat};
use super::filename::parse_policy_filename;

/// List supported source documents directly under `dir` (non-recursive), sorted by filename.
///
/// Hidden files and Office lock files (`~$...`) are skipped.
pub fn scan_policy_dir(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    if !dir.is_dir() {
        return Err(AppError::new(
            "PKB_INGEST_DIR_MISSING",
            "Policy source directory not found",
        )
        .with_details(format!("path={}", dir.display())));
    }

    let entries = fs::read_dir(dir).map_err(|e| {
        AppError::new("PKB_INGEST_DIR_MISSING", "Failed to list policy source directory")
            .with_details(format!("path={}; err={}", dir.display(), e))
    })?;

    let mut out = Vec::new();
    for ent in entries.flatten() {
        let path = ent.path();
        if !path.is_file() {
            continue;
        }
        let name = ent.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || name.starts_with("~$") {
            continue;
        }
        if SourceFormat::from_path(&path).is_some() {
            out.push(path);
        }
    }
    out.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    if out.is_empty() {
        return Err(AppError::new(
            "PKB_INGEST_EMPTY",
            "No supported policy documents found (.docx, .pdf, .txt, .md)",
        )
        .with_details(format!("path={}", dir.display())));
    }
    Ok(out)
}

/// Scan, extract and parse every document in `dir`, returned in index-build order.
///
/// Any unreadable document aborts the whole load; misnamed files only lose their metadata.
pub fn load_policy_documents(dir: &Path) -> Result<Vec<PolicyDocument>, AppError> {
    let paths = scan_policy_dir(dir)?;

    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let meta = parse_policy_filename(&filename);
        let text = normalize_text(&extract_text(&path)?);
        tracing::debug!(%filename, chars = text.chars().count(), "extracted policy text");
        docs.push(PolicyDocument {
            filename,
            path,
            meta,
            text,
        });
    }

    docs.sort_by(compare_for_index);
    Ok(docs)
}
