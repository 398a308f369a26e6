//! Application context - dependency injection container

mod sessions;

use std::sync::Arc;
use std::time::Duration;

use calmate_core::{
    AuthService, CalendarAgent, CalendarGateway, CalendarToolbox, Clock, CredentialResolver,
    EnvironmentSecrets, SystemClock,
};
use calmate_domain::{AuthConfig, Config, Result};
use calmate_infra::{
    FileTokenCacheStore, GraphCalendarClient, HttpClient, KeychainSecretSource,
    MicrosoftIdentityProvider, OpenAIClient, TomlSecretsFile,
};
use tracing::{info, warn};

pub use sessions::{SessionRegistry, SharedSession};

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub auth: Arc<AuthService>,
    pub calendar: Arc<dyn CalendarGateway>,
    /// `None` when no language model is configured
    pub agent: Option<Arc<CalendarAgent>>,
    pub sessions: SessionRegistry,
}

impl AppContext {
    /// Wire the production adapters from `config`.
    ///
    /// # Errors
    /// Returns an error if the secrets file is unreadable, the calendar base
    /// URL is invalid, or an HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let provider = MicrosoftIdentityProvider::new(HttpClient::new()?)
            .with_authority_base(config.auth.authority_base.clone())
            .with_clock(clock.clone());
        let cache_store = FileTokenCacheStore::new(config.auth.cache_dir.clone());
        info!(cache_dir = %cache_store.directory().display(), "Token cache store ready");

        let auth = AuthService::new(
            Arc::new(provider),
            Arc::new(cache_store),
            build_resolver(&config.auth)?,
            clock.clone(),
        )
        .with_scopes(config.auth.scopes.clone())
        .with_max_poll_wait(Duration::from_secs(config.auth.max_poll_wait_secs));

        let calendar: Arc<dyn CalendarGateway> =
            Arc::new(GraphCalendarClient::from_config(&config.graph)?);

        let agent = match OpenAIClient::from_config(&config.llm, HttpClient::new()?) {
            Some(model) => {
                info!(model = %config.llm.model, "Language model configured");
                let toolbox = CalendarToolbox::new(calendar.clone())
                    .with_default_time_zone(config.graph.default_time_zone.clone());
                Some(Arc::new(
                    CalendarAgent::new(Arc::new(model), toolbox, clock.clone())
                        .with_max_tool_rounds(config.llm.max_tool_rounds),
                ))
            }
            None => {
                warn!("No language model API key configured; agent endpoint disabled");
                None
            }
        };

        Ok(Self::from_parts(config, Arc::new(auth), calendar, agent, clock))
    }

    /// Assemble a context from already-built services.
    pub fn from_parts(
        config: Config,
        auth: Arc<AuthService>,
        calendar: Arc<dyn CalendarGateway>,
        agent: Option<Arc<CalendarAgent>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { config, auth, calendar, agent, sessions: SessionRegistry::new(clock) }
    }
}

/// Secrets file, then keychain, then the process environment, then the
/// values from the configuration file.
fn build_resolver(auth: &AuthConfig) -> Result<CredentialResolver> {
    let mut resolver = CredentialResolver::new(Arc::new(EnvironmentSecrets));

    if let Some(path) = &auth.secrets_file {
        resolver = resolver.with_secret_source(Arc::new(TomlSecretsFile::load(path.clone())?));
    }
    if let Some(service) = &auth.keychain_service {
        resolver = resolver.with_secret_source(Arc::new(KeychainSecretSource::new(service.clone())));
    }

    Ok(resolver.with_configured(auth.client_id.clone(), auth.tenant_id.clone()))
}
