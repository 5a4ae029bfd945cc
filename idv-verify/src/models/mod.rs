//! Domain models for identity verification

pub mod records;
pub mod session;

pub use idv_common::events::{OutcomeCounts, PipelinePhase, VerificationOutcome};
pub use records::{CandidateRecord, IdentityEntry, IdentitySummary, ImageRef, ObservedRecord};
pub use session::{CandidateStatus, Session, SessionError, SessionSnapshot};
