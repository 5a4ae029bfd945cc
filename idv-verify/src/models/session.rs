//! Verification session state machine
//!
//! One session per active identity. The phase moves
//! `Advancing(0) → AwaitingResponse(0) → Advancing(1) → ... → Drained`,
//! or starts at `Idle` when there are no candidates. Outcomes are recorded
//! strictly in ranked order: only the position under the cursor can change.
//!
//! Sessions are never reset in place. Switching identity builds a new session
//! with a higher `generation`; completions carrying an older generation are
//! rejected by [`crate::services::SessionStore`].

use chrono::{DateTime, Utc};
use idv_common::events::{OutcomeCounts, PipelinePhase, VerificationOutcome};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::ObservedRecord;
use crate::services::RankedCandidate;

/// Session mutation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Completion for a session that has been replaced
    #[error("Stale completion for generation {generation} (current: {current:?})")]
    StaleCompletion {
        generation: u64,
        current: Option<u64>,
    },

    /// Outcome for a position other than the cursor
    #[error("Outcome for position {got} but cursor is at {expected}")]
    OutOfOrder { expected: usize, got: usize },

    /// Operation not allowed in the current phase
    #[error("Cannot {operation} while {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: PipelinePhase,
    },

    /// `Pending`/`InFlight` passed where a terminal outcome is required
    #[error("Outcome {0} is not terminal")]
    NotTerminal(VerificationOutcome),
}

/// Verification state for the active identity
#[derive(Debug, Clone)]
pub struct Session {
    session_id: Uuid,
    generation: u64,
    identity_index: usize,
    observed: ObservedRecord,
    ranked: Vec<RankedCandidate>,
    outcomes: Vec<VerificationOutcome>,
    cursor: usize,
    phase: PipelinePhase,
    started_at: DateTime<Utc>,
    drained_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Fresh session with every outcome `Pending` and the cursor at 0
    pub fn new(
        generation: u64,
        identity_index: usize,
        observed: ObservedRecord,
        ranked: Vec<RankedCandidate>,
    ) -> Self {
        let phase = if ranked.is_empty() {
            PipelinePhase::Idle
        } else {
            PipelinePhase::Advancing { cursor: 0 }
        };
        Self {
            session_id: Uuid::new_v4(),
            generation,
            identity_index,
            observed,
            outcomes: vec![VerificationOutcome::Pending; ranked.len()],
            ranked,
            cursor: 0,
            phase,
            started_at: Utc::now(),
            drained_at: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn outcomes(&self) -> &[VerificationOutcome] {
        &self.outcomes
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// No further requests will be issued for this session
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, PipelinePhase::Idle | PipelinePhase::Drained)
    }

    pub fn counts(&self) -> OutcomeCounts {
        OutcomeCounts::tally(self.outcomes.iter())
    }

    /// Mark the cursor position `InFlight`
    ///
    /// Returns the position now awaiting a response. Only valid in
    /// `Advancing`, which guarantees a single request in flight.
    pub fn begin_request(&mut self) -> Result<usize, SessionError> {
        match self.phase {
            PipelinePhase::Advancing { cursor } => {
                self.outcomes[cursor] = VerificationOutcome::InFlight;
                self.phase = PipelinePhase::AwaitingResponse { cursor };
                Ok(cursor)
            }
            phase => Err(SessionError::InvalidPhase {
                operation: "begin request",
                phase,
            }),
        }
    }

    /// Record the terminal outcome for `position`
    ///
    /// `position` must equal the cursor and a request must be in flight.
    pub fn record_outcome(
        &mut self,
        position: usize,
        outcome: VerificationOutcome,
    ) -> Result<(), SessionError> {
        if !outcome.is_terminal() {
            return Err(SessionError::NotTerminal(outcome));
        }
        match self.phase {
            PipelinePhase::AwaitingResponse { cursor } if cursor == position => {
                self.outcomes[position] = outcome;
                Ok(())
            }
            PipelinePhase::AwaitingResponse { cursor } => Err(SessionError::OutOfOrder {
                expected: cursor,
                got: position,
            }),
            phase => Err(SessionError::InvalidPhase {
                operation: "record outcome",
                phase,
            }),
        }
    }

    /// Move past the recorded position
    ///
    /// Enters `Drained` when the cursor reaches the candidate count.
    pub fn advance_cursor(&mut self) -> Result<PipelinePhase, SessionError> {
        match self.phase {
            PipelinePhase::AwaitingResponse { cursor } if self.outcomes[cursor].is_terminal() => {
                self.cursor = cursor + 1;
                self.phase = if self.cursor >= self.ranked.len() {
                    self.drained_at = Some(Utc::now());
                    PipelinePhase::Drained
                } else {
                    PipelinePhase::Advancing { cursor: self.cursor }
                };
                Ok(self.phase)
            }
            phase => Err(SessionError::InvalidPhase {
                operation: "advance cursor",
                phase,
            }),
        }
    }

    /// Read-only view for the presentation layer
    pub fn snapshot(&self) -> SessionSnapshot {
        let counts = self.counts();
        SessionSnapshot {
            session_id: self.session_id,
            generation: self.generation,
            identity_index: self.identity_index,
            observed: self.observed.clone(),
            candidates: self
                .ranked
                .iter()
                .zip(self.outcomes.iter())
                .enumerate()
                .map(|(position, (ranked, outcome))| CandidateStatus {
                    position,
                    ranked: ranked.clone(),
                    outcome: *outcome,
                })
                .collect(),
            cursor: self.cursor,
            phase: self.phase,
            checked: counts.checked(),
            total: self.ranked.len(),
            counts,
            started_at: self.started_at,
            drained_at: self.drained_at,
        }
    }
}

/// One ranked candidate with its current outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateStatus {
    pub position: usize,
    #[serde(flatten)]
    pub ranked: RankedCandidate,
    pub outcome: VerificationOutcome,
}

/// Serializable copy of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub generation: u64,
    pub identity_index: usize,
    pub observed: ObservedRecord,
    pub candidates: Vec<CandidateStatus>,
    pub cursor: usize,
    pub phase: PipelinePhase,
    /// Candidates with a terminal outcome ("N of M checked")
    pub checked: usize,
    pub total: usize,
    pub counts: OutcomeCounts,
    pub started_at: DateTime<Utc>,
    pub drained_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    pub fn outcomes(&self) -> Vec<VerificationOutcome> {
        self.candidates.iter().map(|c| c.outcome).collect()
    }

    pub fn is_drained(&self) -> bool {
        self.phase == PipelinePhase::Drained
    }
}
