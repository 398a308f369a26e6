//! External credential sources consulted by the credential resolver

pub mod file;
pub mod keychain;

pub use file::TomlSecretsFile;
pub use keychain::KeychainSecretSource;
