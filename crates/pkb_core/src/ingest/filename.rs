use std::sync::OnceLock;

use regex::Regex;

use crate::domain::PolicyMeta;

// <CODE>_<TITLE>_<YYYYMM>.<ext>, e.g. HR-103-03_出勤管理辦法_202509.docx
fn filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^([a-z]+(?:-[0-9]+)+)_([^_]+)_([0-9]{6})\.[a-z0-9]+$")
            .expect("policy filename pattern is valid")
    })
}

/// Parse policy metadata out of a filename.
///
/// Misnamed files never fail ingestion: every field of the result is [`crate::domain::UNKNOWN`]
/// instead.
pub fn parse_policy_filename(filename: &str) -> PolicyMeta {
    let Some(caps) = filename_re().captures(filename.trim()) else {
        tracing::warn!(filename, "filename does not match <CODE>_<TITLE>_<YYYYMM>.<ext>");
        return PolicyMeta::unknown();
    };

    let title = caps[2].trim();
    if title.is_empty() {
        tracing::warn!(filename, "filename has an empty title segment");
        return PolicyMeta::unknown();
    }

    PolicyMeta {
        code: caps[1].to_uppercase(),
        title: title.to_string(),
        month: caps[3].to_string(),
    }
}
