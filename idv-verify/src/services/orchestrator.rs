//! Sequential face verification orchestrator
//!
//! # Flow
//! `activate_identity` ranks the identity's candidates, installs a fresh
//! session in the [`SessionStore`] and spawns one worker task for it. The
//! worker walks the ranked list in order:
//!
//! 1. `begin_request` marks the cursor position `InFlight`
//! 2. the comparison request runs (timeout, bounded retries)
//! 3. `complete` records `Passed`/`Failed`/`Unavailable` and advances
//!
//! The worker awaits each comparison before starting the next one, so a
//! session never has two requests in flight.
//!
//! # Identity switches
//! Activating another identity cancels the previous worker's token and
//! replaces the session. A request already in flight is left to finish; its
//! result carries the old generation and is dropped by the store.

use crate::models::{ImageRef, PipelinePhase, SessionError, SessionSnapshot, VerificationOutcome};
use crate::provider::IdentityDataset;
use crate::services::face_client::{FaceComparator, FaceComparisonError};
use crate::services::match_scorer::MatchScorer;
use crate::services::ranker::{rank, RankedCandidate};
use crate::services::session_store::SessionStore;
use chrono::{NaiveDate, Utc};
use idv_common::config::{ComparisonConfig, DateOrder};
use idv_common::events::{EventBus, IdvEvent};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Orchestrator errors
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Unknown identity index {index} ({count} identities loaded)")]
    UnknownIdentity { index: usize, count: usize },
}

/// Tuning for the verification loop
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationSettings {
    /// Confidence at or above which a candidate passes
    pub pass_threshold: f64,
    /// Upper bound for one comparison attempt
    pub request_timeout: Duration,
    /// Attempts per candidate, including the first
    pub max_attempts: u32,
    /// Pause between attempts
    pub retry_backoff: Duration,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self::from(&ComparisonConfig::default())
    }
}

impl From<&ComparisonConfig> for VerificationSettings {
    fn from(config: &ComparisonConfig) -> Self {
        Self {
            pass_threshold: config.pass_threshold,
            request_timeout: Duration::from_millis(config.timeout_ms),
            max_attempts: config.max_attempts.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

impl VerificationSettings {
    /// Longest time one candidate can hold up the ones behind it
    pub fn per_candidate_budget(&self) -> Duration {
        (self.request_timeout + self.retry_backoff) * self.max_attempts
    }
}

/// Result of an identity switch
pub struct ActivationHandle {
    /// Session state right after activation
    pub snapshot: SessionSnapshot,
    worker: JoinHandle<()>,
}

impl ActivationHandle {
    pub fn generation(&self) -> u64 {
        self.snapshot.generation
    }

    /// Wait for the worker to drain the session or stop after being superseded
    pub async fn finished(self) {
        if let Err(e) = self.worker.await {
            tracing::error!(error = %e, "Verification worker panicked");
        }
    }
}

/// State shared by the orchestrator and every worker it spawns
#[derive(Clone)]
struct WorkerContext {
    comparator: Arc<dyn FaceComparator>,
    store: SessionStore,
    event_bus: EventBus,
    settings: VerificationSettings,
}

/// Drives verification for whichever identity is active
pub struct VerificationOrchestrator {
    dataset: Arc<IdentityDataset>,
    date_order: DateOrder,
    reference_date: Option<NaiveDate>,
    ctx: WorkerContext,
    /// Cancellation token of the current worker; also serializes switches
    active: Mutex<Option<CancellationToken>>,
}

impl VerificationOrchestrator {
    pub fn new(
        dataset: Arc<IdentityDataset>,
        comparator: Arc<dyn FaceComparator>,
        store: SessionStore,
        event_bus: EventBus,
        settings: VerificationSettings,
        date_order: DateOrder,
    ) -> Self {
        Self {
            dataset,
            date_order,
            reference_date: None,
            ctx: WorkerContext {
                comparator,
                store,
                event_bus,
                settings,
            },
            active: Mutex::new(None),
        }
    }

    /// Compute ages as of `date` instead of today
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn dataset(&self) -> &IdentityDataset {
        &self.dataset
    }

    pub fn store(&self) -> &SessionStore {
        &self.ctx.store
    }

    pub fn settings(&self) -> &VerificationSettings {
        &self.ctx.settings
    }

    fn scorer(&self) -> MatchScorer {
        match self.reference_date {
            Some(date) => MatchScorer::with_reference_date(self.date_order, date),
            None => MatchScorer::new(self.date_order),
        }
    }

    /// Ranked candidates of identity `index`, without touching the session
    pub fn ranking(&self, index: usize) -> Result<Vec<RankedCandidate>, OrchestratorError> {
        let entry = self.dataset.get(index).ok_or(OrchestratorError::UnknownIdentity {
            index,
            count: self.dataset.len(),
        })?;
        Ok(rank(&entry.candidates, &entry.observed, &self.scorer()))
    }

    /// Make identity `index` active and start verifying its candidates
    ///
    /// Any previous session is replaced immediately; its worker stops before
    /// issuing another request.
    pub async fn activate_identity(&self, index: usize) -> Result<ActivationHandle, OrchestratorError> {
        let ranked = self.ranking(index)?;
        let entry = self.dataset.get(index).ok_or(OrchestratorError::UnknownIdentity {
            index,
            count: self.dataset.len(),
        })?;

        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            previous.cancel();
        }

        let snapshot = self
            .ctx
            .store
            .activate(index, entry.observed.clone(), ranked.clone())
            .await;

        tracing::info!(
            session_id = %snapshot.session_id,
            generation = snapshot.generation,
            identity_index = index,
            candidates = snapshot.total,
            "Identity activated"
        );

        self.ctx.event_bus.emit_lossy(IdvEvent::SessionActivated {
            session_id: snapshot.session_id,
            generation: snapshot.generation,
            identity_index: index,
            candidate_count: snapshot.total,
            timestamp: Utc::now(),
        });

        let token = CancellationToken::new();
        let worker = tokio::spawn(run_session(
            self.ctx.clone(),
            snapshot.session_id,
            snapshot.generation,
            entry.observed.face_image.clone(),
            ranked,
            token.clone(),
        ));
        *active = Some(token);

        Ok(ActivationHandle { snapshot, worker })
    }

    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        self.ctx.store.snapshot().await
    }

    /// Stop the current worker (shutdown)
    pub async fn cancel_active(&self) {
        if let Some(token) = self.active.lock().await.take() {
            token.cancel();
        }
    }
}

/// Worker loop for one session generation
async fn run_session(
    ctx: WorkerContext,
    session_id: Uuid,
    generation: u64,
    known_image: Option<ImageRef>,
    ranked: Vec<RankedCandidate>,
    token: CancellationToken,
) {
    let total = ranked.len();

    loop {
        if token.is_cancelled() {
            tracing::debug!(generation, "Worker superseded, stopping");
            return;
        }

        let position = match ctx.store.begin_request(generation).await {
            Ok(Some(position)) => position,
            Ok(None) => return,
            Err(SessionError::StaleCompletion { .. }) => {
                tracing::debug!(generation, "Session replaced before next request");
                return;
            }
            Err(e) => {
                tracing::error!(generation, error = %e, "Cannot start next verification");
                return;
            }
        };

        let candidate = &ranked[position];
        let outcome = verify_candidate(
            &ctx,
            session_id,
            generation,
            position,
            known_image.as_ref(),
            candidate,
            &token,
        )
        .await;

        match ctx.store.complete(generation, position, outcome).await {
            Ok((phase, counts)) => {
                tracing::info!(
                    generation,
                    position,
                    original_index = candidate.original_index,
                    %outcome,
                    "Candidate verified"
                );
                ctx.event_bus.emit_lossy(IdvEvent::VerificationCompleted {
                    session_id,
                    generation,
                    position,
                    original_index: candidate.original_index,
                    outcome,
                    checked: position + 1,
                    total,
                    timestamp: Utc::now(),
                });

                if phase == PipelinePhase::Drained {
                    tracing::info!(
                        generation,
                        passed = counts.passed,
                        failed = counts.failed,
                        unavailable = counts.unavailable,
                        "Session drained"
                    );
                    ctx.event_bus.emit_lossy(IdvEvent::SessionDrained {
                        session_id,
                        generation,
                        counts,
                        timestamp: Utc::now(),
                    });
                    return;
                }
            }
            Err(SessionError::StaleCompletion { current, .. }) => {
                tracing::debug!(
                    generation,
                    current_generation = ?current,
                    position,
                    %outcome,
                    "Dropping stale completion"
                );
                ctx.event_bus.emit_lossy(IdvEvent::StaleCompletionDropped {
                    generation,
                    current_generation: current,
                    position,
                    timestamp: Utc::now(),
                });
                return;
            }
            Err(e) => {
                tracing::error!(generation, position, error = %e, "Failed to record outcome");
                return;
            }
        }
    }
}

/// Run the comparison for one candidate and map it to a terminal outcome
///
/// Never fails: anything that does not yield a usable score is `Unavailable`.
async fn verify_candidate(
    ctx: &WorkerContext,
    session_id: Uuid,
    generation: u64,
    position: usize,
    known_image: Option<&ImageRef>,
    candidate: &RankedCandidate,
    token: &CancellationToken,
) -> VerificationOutcome {
    let (Some(known), Some(unknown)) = (known_image, candidate.candidate.face_image.as_ref()) else {
        tracing::warn!(
            generation,
            position,
            has_reference = known_image.is_some(),
            "Missing image data, candidate unavailable"
        );
        return VerificationOutcome::Unavailable;
    };

    let settings = &ctx.settings;
    for attempt in 1..=settings.max_attempts {
        ctx.event_bus.emit_lossy(IdvEvent::VerificationStarted {
            session_id,
            generation,
            position,
            original_index: candidate.original_index,
            attempt,
            timestamp: Utc::now(),
        });

        let result = tokio::time::timeout(
            settings.request_timeout,
            ctx.comparator.compare(known, unknown),
        )
        .await
        .unwrap_or(Err(FaceComparisonError::Timeout(settings.request_timeout)));

        let error = match result {
            Ok(score) => {
                return match VerificationOutcome::from_confidence(score, settings.pass_threshold) {
                    Some(outcome) => outcome,
                    None => {
                        tracing::warn!(generation, position, score, "Comparator returned score outside 0-100");
                        VerificationOutcome::Unavailable
                    }
                };
            }
            Err(e) => e,
        };

        let retry = error.is_retryable() && attempt < settings.max_attempts && !token.is_cancelled();
        tracing::warn!(
            generation,
            position,
            attempt,
            error = %error,
            retry,
            "Face comparison failed"
        );
        if !retry {
            break;
        }
        tokio::time::sleep(settings.retry_backoff).await;
    }

    VerificationOutcome::Unavailable
}
