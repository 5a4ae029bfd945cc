//! # IDV Common Library
//!
//! Shared code for the identity verification services including:
//! - Error type
//! - Bootstrap configuration loading
//! - Event types (IdvEvent enum) and the EventBus
//! - SSE helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
