//! Shared handle to the active verification session
//!
//! The store owns at most one [`Session`]. Every mutation names the generation
//! it was issued for; a mismatch means the identity was switched in the
//! meantime and the mutation is rejected as `StaleCompletion` without touching
//! the current session.

use crate::models::{
    ObservedRecord, OutcomeCounts, PipelinePhase, Session, SessionError, SessionSnapshot,
    VerificationOutcome,
};
use crate::services::RankedCandidate;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct StoreInner {
    last_generation: u64,
    current: Option<Session>,
}

/// Cloneable handle; all clones see the same session
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current session with a fresh one for `identity_index`
    ///
    /// Returns the new session's snapshot; its generation is strictly greater
    /// than any generation handed out before.
    pub async fn activate(
        &self,
        identity_index: usize,
        observed: ObservedRecord,
        ranked: Vec<RankedCandidate>,
    ) -> SessionSnapshot {
        let mut inner = self.inner.write().await;
        inner.last_generation += 1;
        let session = Session::new(inner.last_generation, identity_index, observed, ranked);
        let snapshot = session.snapshot();
        if let Some(previous) = inner.current.replace(session) {
            tracing::debug!(
                previous_generation = previous.generation(),
                generation = snapshot.generation,
                abandoned_at = previous.cursor(),
                "Session replaced"
            );
        }
        snapshot
    }

    /// Mark the next candidate `InFlight`
    ///
    /// Returns `Ok(None)` once the session has nothing left to check.
    pub async fn begin_request(&self, generation: u64) -> Result<Option<usize>, SessionError> {
        let mut inner = self.inner.write().await;
        let session = current_for(&mut inner, generation)?;
        if session.is_finished() {
            return Ok(None);
        }
        session.begin_request().map(Some)
    }

    /// Record the outcome for `position` and advance the cursor
    ///
    /// Returns the new phase together with the tallies of this generation,
    /// both taken under the same lock as the write.
    pub async fn complete(
        &self,
        generation: u64,
        position: usize,
        outcome: VerificationOutcome,
    ) -> Result<(PipelinePhase, OutcomeCounts), SessionError> {
        let mut inner = self.inner.write().await;
        let session = current_for(&mut inner, generation)?;
        session.record_outcome(position, outcome)?;
        let phase = session.advance_cursor()?;
        Ok((phase, session.counts()))
    }

    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        self.inner.read().await.current.as_ref().map(Session::snapshot)
    }
}

fn current_for(inner: &mut StoreInner, generation: u64) -> Result<&mut Session, SessionError> {
    let current = inner.current.as_ref().map(Session::generation);
    match inner.current.as_mut() {
        Some(session) if session.generation() == generation => Ok(session),
        _ => Err(SessionError::StaleCompletion { generation, current }),
    }
}
