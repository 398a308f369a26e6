//! OS keychain secret source

use calmate_core::SecretSource;
use calmate_domain::CalmateError;
use keyring::Entry;

use crate::errors::InfraError;

/// Reads credentials stored under `service` with the key as the account name.
#[derive(Debug, Clone)]
pub struct KeychainSecretSource {
    service: String,
}

impl KeychainSecretSource {
    /// Source reading entries of keychain `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self { service: service.into() }
    }

    /// Keychain service name.
    pub fn service(&self) -> &str {
        &self.service
    }

    fn read(&self, key: &str) -> Result<Option<String>, CalmateError> {
        let entry = Entry::new(&self.service, key).map_err(InfraError::from)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }
}

impl SecretSource for KeychainSecretSource {
    fn name(&self) -> &str {
        "keychain"
    }

    fn get(&self, key: &str) -> Option<String> {
        match self.read(key) {
            Ok(value) => value,
            Err(err) => {
                // An unavailable keychain must not block the other sources
                tracing::warn!(service = %self.service, key, error = %err, "keychain lookup failed");
                None
            }
        }
    }
}
