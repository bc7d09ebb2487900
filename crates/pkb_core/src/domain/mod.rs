use std::cmp::Ordering;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Stable sentinel used for every metadata field that could not be parsed from a filename.
///
/// Never produced by a successful parse: codes are upper-cased letter/digit groups, months are
/// six digits and titles cannot contain the angle brackets.
pub const UNKNOWN: &str = "<unknown>";

/// Metadata parsed from a policy filename (`<CODE>_<TITLE>_<YYYYMM>.<ext>`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PolicyMeta {
    pub code: String,
    pub title: String,
    pub month: String,
}

impl PolicyMeta {
    pub fn unknown() -> Self {
        Self {
            code: UNKNOWN.to_string(),
            title: UNKNOWN.to_string(),
            month: UNKNOWN.to_string(),
        }
    }

    pub fn is_known(&self) -> bool {
        self.code != UNKNOWN && self.title != UNKNOWN && self.month != UNKNOWN
    }

    pub fn month_is_known(&self) -> bool {
        self.month != UNKNOWN
    }
}

/// A source document after text extraction. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    pub filename: String,
    pub path: PathBuf,
    pub meta: PolicyMeta,
    pub text: String,
}

/// Deterministic document order for index builds: newest month first, unknown months last,
/// then filename ascending.
pub fn compare_for_index(a: &PolicyDocument, b: &PolicyDocument) -> Ordering {
    match (a.meta.month_is_known(), b.meta.month_is_known()) {
        (true, true) => b.meta.month.cmp(&a.meta.month),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
    .then_with(|| a.filename.cmp(&b.filename))
}

/// User-facing label for a policy code, with the unknown sentinel spelled out.
pub fn display_code(meta: &PolicyMeta) -> &str {
    if meta.code == UNKNOWN {
        "未知版次"
    } else {
        meta.code.as_str()
    }
}

pub fn display_month(meta: &PolicyMeta) -> &str {
    if meta.month == UNKNOWN {
        "未知月份"
    } else {
        meta.month.as_str()
    }
}

/// Unknown titles fall back to the filename stem so the user still sees which file was used.
pub fn display_title<'a>(meta: &'a PolicyMeta, filename: &'a str) -> &'a str {
    if meta.title != UNKNOWN {
        return meta.title.as_str();
    }
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    }
}
