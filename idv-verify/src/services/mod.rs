//! Service modules for candidate ranking and face verification

pub mod age;
pub mod face_client;
pub mod match_scorer;
pub mod orchestrator;
pub mod ranker;
pub mod session_store;

pub use age::{age_from_birthdate, parse_birthdate, AgeError};
pub use face_client::{FaceComparator, FaceComparisonError, HttpFaceComparator};
pub use match_scorer::{MatchBreakdown, MatchScore, MatchScorer, ScoreError};
pub use orchestrator::{
    ActivationHandle, OrchestratorError, VerificationOrchestrator, VerificationSettings,
};
pub use ranker::{rank, RankedCandidate};
pub use session_store::SessionStore;
