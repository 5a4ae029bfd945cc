//! Candidate ranking
//!
//! Orders candidates by match score, highest first. `sort_by` is stable, so
//! equal scores keep their ingestion order.

use crate::models::{CandidateRecord, ObservedRecord};
use crate::services::match_scorer::{MatchBreakdown, MatchScore, MatchScorer};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// One candidate in ranked order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// Index in the provider's ingestion order
    pub original_index: usize,
    pub score: MatchScore,
    /// `None` when the record was missing a required field
    pub breakdown: Option<MatchBreakdown>,
    pub candidate: CandidateRecord,
}

/// Rank `candidates` against `observed`
///
/// Records the scorer rejects score 0 and sort after every scored record
/// with a positive score, still in ingestion order among themselves.
pub fn rank(
    candidates: &[CandidateRecord],
    observed: &ObservedRecord,
    scorer: &MatchScorer,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .enumerate()
        .map(|(original_index, candidate)| {
            let breakdown = match scorer.breakdown(candidate, observed) {
                Ok(b) => Some(b),
                Err(e) => {
                    tracing::debug!(original_index, error = %e, "Candidate scored 0");
                    None
                }
            };
            RankedCandidate {
                original_index,
                score: breakdown.map(|b| b.score()).unwrap_or(0),
                breakdown,
                candidate: candidate.clone(),
            }
        })
        .collect();

    ranked.sort_by_key(|r| Reverse(r.score));
    ranked
}
