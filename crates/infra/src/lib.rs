//! # Calmate Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - HTTP client with bounded retries
//! - Configuration loading (JSON/TOML plus environment overrides)
//! - File-backed token cache store
//! - Microsoft identity platform provider (device-code and refresh grants)
//! - External service integrations (Microsoft Graph calendar, OpenAI)
//! - Secret sources (TOML secrets file, OS keychain)
//!
//! ## Architecture
//! - Implements traits defined in `calmate-core`
//! - Contains all "impure" code (network, filesystem, keychain)

pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod secrets;

// Re-export commonly used items
pub use auth::{FileTokenCacheStore, MicrosoftIdentityProvider};
pub use errors::InfraError;
pub use http::HttpClient;
pub use integrations::{GraphCalendarClient, OpenAIClient};
pub use secrets::{KeychainSecretSource, TomlSecretsFile};
