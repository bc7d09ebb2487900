use pkb_core::domain::{display_code, display_month, display_title, PolicyMeta};
use serde::Serialize;

use crate::retrieve::ScoredReference;

/// The single source document an answer is credited to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribution {
    pub meta: PolicyMeta,
    pub source_filename: String,
    pub votes: u32,
}

impl Attribution {
    /// Provenance line shown before a grounded answer.
    pub fn preface(&self) -> String {
        format!(
            "根據 {} 版《{}》（{}）：",
            display_month(&self.meta),
            display_title(&self.meta, &self.source_filename),
            display_code(&self.meta)
        )
    }
}

// Documents vote as (code, title, month). Misnamed files all share the sentinel triple, so they
// vote under their filename instead of collapsing into one candidate.
fn vote_key<'a>(r: &ScoredReference<'a>) -> (&'a str, &'a str, &'a str) {
    let c = r.chunk;
    if c.meta().is_known() {
        (c.policy_code.as_str(), c.policy_name.as_str(), c.policy_month.as_str())
    } else {
        (c.policy_code.as_str(), c.source_filename.as_str(), c.policy_month.as_str())
    }
}

struct Candidate<'a> {
    key: (&'a str, &'a str, &'a str),
    votes: u32,
    best_score: f32,
    first_seen: usize,
    reference: ScoredReference<'a>,
}

/// Majority vote over the referenced documents.
///
/// Ties go to the document holding the single highest-scoring reference; if even that ties, the
/// document seen first in `refs` wins. Returns `None` for an empty slice.
pub fn select_attribution(refs: &[ScoredReference<'_>]) -> Option<Attribution> {
    let mut candidates: Vec<Candidate<'_>> = Vec::new();
    for (i, r) in refs.iter().enumerate() {
        let key = vote_key(r);
        match candidates.iter_mut().find(|c| c.key == key) {
            Some(c) => {
                c.votes += 1;
                if r.score > c.best_score {
                    c.best_score = r.score;
                    c.reference = *r;
                }
            }
            None => candidates.push(Candidate {
                key,
                votes: 1,
                best_score: r.score,
                first_seen: i,
                reference: *r,
            }),
        }
    }

    let winner = candidates.into_iter().max_by(|a, b| {
        a.votes
            .cmp(&b.votes)
            .then(
                a.best_score
                    .partial_cmp(&b.best_score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(b.first_seen.cmp(&a.first_seen))
    })?;

    let chunk = winner.reference.chunk;
    Some(Attribution {
        meta: chunk.meta(),
        source_filename: chunk.source_filename.clone(),
        votes: winner.votes,
    })
}
