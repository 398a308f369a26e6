//! Authentication adapters: token cache persistence and the Microsoft
//! identity platform.

pub mod file_store;
pub mod microsoft;

pub use file_store::FileTokenCacheStore;
pub use microsoft::MicrosoftIdentityProvider;
