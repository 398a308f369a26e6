//! Authentication: credential resolution, token cache model and the
//! device-code state machine

pub mod cache;
pub mod credentials;
pub mod ports;
pub mod service;

pub use cache::{SharedTokenCache, TokenCache, TokenGrant};
pub use credentials::{CredentialResolver, EnvironmentSecrets};
pub use ports::{DeviceAuthorization, DevicePoll, IdentityProvider, SecretSource, TokenCacheStore};
pub use service::{AuthService, AuthSession, TokenRequest};
