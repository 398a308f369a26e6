//! Test doubles for the core ports (feature: test-utils)
//!
//! Shared by this crate's unit tests and by downstream crates' tests.

mod auth;
mod calendar;
mod clock;
mod model;

pub use auth::{
    InMemoryTokenCacheStore, ScriptedIdentityProvider, CLIENT_ID, HOME_ACCOUNT_ID, USERNAME,
};
pub use calendar::InMemoryCalendar;
pub use clock::MockClock;
pub use model::ScriptedLanguageModel;
