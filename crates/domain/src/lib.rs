//! # Calmate Domain
//!
//! Business domain types and models for Calmate.
//!
//! This crate contains:
//! - Credential, token and device-code flow types
//! - Calendar event types (calendar API resource shapes)
//! - Domain error types and Result definitions
//! - Configuration structures and constants
//!
//! ## Architecture
//! - No dependencies on other Calmate crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
