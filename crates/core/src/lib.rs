//! # Calmate Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Credential resolution and the token cache model
//! - The resumable device-code authentication state machine
//! - Port/adapter interfaces (traits) for identity, storage, calendar and
//!   language model
//! - The calendar tool adapter and agent loop
//!
//! ## Architecture Principles
//! - Only depends on `calmate-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod agent;
pub mod auth;
pub mod calendar_ports;
pub mod clock;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export specific items to avoid ambiguity
pub use agent::{CalendarAgent, CalendarToolbox, LanguageModel};
pub use auth::{
    AuthService, AuthSession, CredentialResolver, DeviceAuthorization, DevicePoll,
    EnvironmentSecrets, IdentityProvider, SecretSource, SharedTokenCache, TokenCache,
    TokenCacheStore, TokenGrant, TokenRequest,
};
pub use calendar_ports::CalendarGateway;
pub use clock::{Clock, SystemClock};
