//! HTTP API handlers for idv-verify
//!
//! REST endpoints for identity selection and session inspection, plus an SSE
//! stream of verification progress.

pub mod health;
pub mod identities;
pub mod session;
pub mod sse;

pub use health::health_routes;
pub use identities::identity_routes;
pub use session::session_routes;
pub use sse::event_stream;
