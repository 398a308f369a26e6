//! Credential resolution
//!
//! Precedence for each identifier: explicit argument, then external secret
//! sources in registration order, then the process environment, then the
//! configuration file, then the built-in default (tenant only).

use std::collections::HashMap;
use std::sync::Arc;

use calmate_domain::constants::{CLIENT_ID_KEY, DEFAULT_TENANT_ID, TENANT_ID_KEY};
use calmate_domain::{client_id_prefix, CalmateError, CredentialPair, Result};
use tracing::debug;

use super::ports::SecretSource;

/// Process environment as a secret source
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentSecrets;

impl SecretSource for EnvironmentSecrets {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl SecretSource for HashMap<String, String> {
    fn name(&self) -> &str {
        "static"
    }

    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Merges the credential sources into an effective [`CredentialPair`]
#[derive(Clone)]
pub struct CredentialResolver {
    secrets: Vec<Arc<dyn SecretSource>>,
    environment: Arc<dyn SecretSource>,
    configured_client_id: Option<String>,
    configured_tenant_id: Option<String>,
}

impl CredentialResolver {
    /// Resolver reading the environment through `environment`.
    pub fn new(environment: Arc<dyn SecretSource>) -> Self {
        Self {
            secrets: Vec::new(),
            environment,
            configured_client_id: None,
            configured_tenant_id: None,
        }
    }

    /// Add an external secret source; earlier sources win.
    pub fn with_secret_source(mut self, source: Arc<dyn SecretSource>) -> Self {
        self.secrets.push(source);
        self
    }

    /// Values from the configuration file, consulted after the environment.
    pub fn with_configured(mut self, client_id: Option<String>, tenant_id: Option<String>) -> Self {
        self.configured_client_id = client_id;
        self.configured_tenant_id = tenant_id;
        self
    }

    /// Effective credential pair for one request.
    pub fn resolve(
        &self,
        explicit_client_id: Option<&str>,
        explicit_tenant_id: Option<&str>,
    ) -> Result<CredentialPair> {
        let client_id = self.resolve_client_id(explicit_client_id)?;
        let tenant_id = self
            .lookup(explicit_tenant_id, TENANT_ID_KEY, self.configured_tenant_id.as_deref())
            .unwrap_or_else(|| DEFAULT_TENANT_ID.to_string());

        Ok(CredentialPair { client_id, tenant_id })
    }

    /// Resolve only the client id (logout and cache lookups).
    pub fn resolve_client_id(&self, explicit: Option<&str>) -> Result<String> {
        let client_id = self
            .lookup(explicit, CLIENT_ID_KEY, self.configured_client_id.as_deref())
            .ok_or_else(|| {
                CalmateError::Config(format!(
                    "{CLIENT_ID_KEY} is not set; supply it explicitly, in a secrets source or in the environment"
                ))
            })?;
        debug!(client_id_prefix = client_id_prefix(&client_id), "Resolved client id");
        Ok(client_id)
    }

    fn lookup(&self, explicit: Option<&str>, key: &str, configured: Option<&str>) -> Option<String> {
        if let Some(value) = non_blank(explicit) {
            debug!(key, source = "explicit", "Credential resolved");
            return Some(value);
        }

        for source in self.secrets.iter().chain(std::iter::once(&self.environment)) {
            if let Some(value) = non_blank(source.get(key).as_deref()) {
                debug!(key, source = source.name(), "Credential resolved");
                return Some(value);
            }
        }

        non_blank(configured).inspect(|_| debug!(key, source = "config", "Credential resolved"))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> Arc<dyn SecretSource> {
        Arc::new(
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect::<HashMap<_, _>>(),
        )
    }

    #[test]
    fn explicit_arguments_win() {
        let resolver = CredentialResolver::new(source(&[("CLIENT_ID", "env-client")]))
            .with_secret_source(source(&[("CLIENT_ID", "secret-client"), ("TENANT_ID", "secret-tenant")]));

        let pair = resolver.resolve(Some("explicit-client"), Some("explicit-tenant")).unwrap();

        assert_eq!(pair, CredentialPair::new("explicit-client", "explicit-tenant"));
    }

    #[test]
    fn secrets_beat_environment_and_environment_beats_config() {
        let resolver = CredentialResolver::new(source(&[("CLIENT_ID", "env-client"), ("TENANT_ID", "env-tenant")]))
            .with_secret_source(source(&[("CLIENT_ID", "secret-client")]))
            .with_configured(Some("config-client".into()), Some("config-tenant".into()));

        let pair = resolver.resolve(None, None).unwrap();

        assert_eq!(pair.client_id, "secret-client");
        assert_eq!(pair.tenant_id, "env-tenant");
    }

    #[test]
    fn tenant_defaults_to_common() {
        let resolver = CredentialResolver::new(source(&[("CLIENT_ID", "env-client")]));

        assert_eq!(resolver.resolve(None, None).unwrap().tenant_id, "common");
    }

    #[test]
    fn blank_values_are_skipped() {
        let resolver = CredentialResolver::new(source(&[("CLIENT_ID", "env-client")]))
            .with_secret_source(source(&[("CLIENT_ID", "   ")]));

        let pair = resolver.resolve(Some(""), Some(" ")).unwrap();

        assert_eq!(pair.client_id, "env-client");
        assert_eq!(pair.tenant_id, "common");
    }

    #[test]
    fn missing_client_id_is_a_configuration_error() {
        let resolver = CredentialResolver::new(source(&[("TENANT_ID", "contoso")]));

        let err = resolver.resolve(None, None).unwrap_err();

        assert!(matches!(err, CalmateError::Config(msg) if msg.contains("CLIENT_ID")));
    }

    #[test]
    fn configured_client_id_is_last_resort() {
        let resolver = CredentialResolver::new(source(&[]))
            .with_configured(Some(" config-client ".into()), None);

        assert_eq!(resolver.resolve_client_id(None).unwrap(), "config-client");
    }
}
