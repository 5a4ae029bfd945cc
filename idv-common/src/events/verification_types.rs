//! Verification-related type definitions
//!
//! Supporting types for per-candidate outcomes and pipeline progress.

use serde::{Deserialize, Serialize};

/// Outcome of the remote face check for one candidate
///
/// Confidence is always within 0-100 when present. Construct terminal
/// outcomes through [`VerificationOutcome::from_confidence`] to keep it that way.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// Not yet attempted
    Pending,
    /// Request issued, awaiting response
    InFlight,
    /// Confidence at or above the pass threshold
    Passed { confidence: f64 },
    /// Confidence below the pass threshold
    Failed { confidence: f64 },
    /// Service unreachable, timed out, or answered with unusable data
    Unavailable,
}

impl VerificationOutcome {
    /// Map a comparison score to `Passed`/`Failed`
    ///
    /// Returns `None` for NaN or a score outside 0-100.
    pub fn from_confidence(confidence: f64, pass_threshold: f64) -> Option<Self> {
        if !(0.0..=100.0).contains(&confidence) {
            return None;
        }
        if confidence >= pass_threshold {
            Some(VerificationOutcome::Passed { confidence })
        } else {
            Some(VerificationOutcome::Failed { confidence })
        }
    }

    /// `Passed`, `Failed` or `Unavailable`
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VerificationOutcome::Passed { .. }
                | VerificationOutcome::Failed { .. }
                | VerificationOutcome::Unavailable
        )
    }
}

impl std::fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationOutcome::Pending => write!(f, "Pending"),
            VerificationOutcome::InFlight => write!(f, "InFlight"),
            VerificationOutcome::Passed { confidence } => write!(f, "Passed({:.1})", confidence),
            VerificationOutcome::Failed { confidence } => write!(f, "Failed({:.1})", confidence),
            VerificationOutcome::Unavailable => write!(f, "Unavailable"),
        }
    }
}

/// Pipeline phase of a verification session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PipelinePhase {
    /// No candidates to check
    Idle,
    /// About to issue the request for `cursor`
    Advancing { cursor: usize },
    /// Request for `cursor` is in flight
    AwaitingResponse { cursor: usize },
    /// Every candidate has a terminal outcome
    Drained,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Idle => write!(f, "Idle"),
            PipelinePhase::Advancing { cursor } => write!(f, "Advancing({})", cursor),
            PipelinePhase::AwaitingResponse { cursor } => write!(f, "AwaitingResponse({})", cursor),
            PipelinePhase::Drained => write!(f, "Drained"),
        }
    }
}

/// Outcome tallies for a session
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub passed: usize,
    pub failed: usize,
    pub unavailable: usize,
}

impl OutcomeCounts {
    pub fn tally<'a>(outcomes: impl IntoIterator<Item = &'a VerificationOutcome>) -> Self {
        let mut counts = Self::default();
        for outcome in outcomes {
            match outcome {
                VerificationOutcome::Passed { .. } => counts.passed += 1,
                VerificationOutcome::Failed { .. } => counts.failed += 1,
                VerificationOutcome::Unavailable => counts.unavailable += 1,
                _ => {}
            }
        }
        counts
    }

    pub fn checked(&self) -> usize {
        self.passed + self.failed + self.unavailable
    }
}
