//! # Calmate API
//!
//! HTTP presentation shell for the calendar assistant.
//!
//! This crate contains:
//! - axum handlers for authentication, calendar operations and the agent
//! - Application context (dependency injection and session registry)
//! - Request logging and error-to-response mapping
//! - The `calmate` binary entry point
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture
//! - Handlers never talk to the identity platform or calendar API directly

pub mod commands;
pub mod context;
pub mod router;
pub mod utils;

pub use context::{AppContext, SessionRegistry};
pub use router::build_router;
pub use utils::api_error::ApiError;
