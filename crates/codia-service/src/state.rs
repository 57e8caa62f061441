//! Application state.

use std::sync::Arc;

use codia_core::PriceTable;
use codia_store::Store;

use crate::auth::JwksCache;
use crate::config::ServiceConfig;
use crate::provider::{GenerationProvider, ProviderClient};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Server-side price table.
    pub prices: PriceTable,

    /// Upstream generation provider (optional).
    pub provider: Option<Arc<dyn GenerationProvider>>,

    /// Signing keys fetched from the identity platform.
    pub(crate) jwks: Arc<JwksCache>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The provider client is built from `config.provider` with
    /// [`ServiceConfig::provider_timeout`]; generation endpoints answer
    /// `upstream_error` when it is not configured.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let provider = match ProviderClient::new(&config.provider, config.provider_timeout()) {
            Ok(client) => {
                tracing::info!(api_url = %config.provider.api_url, "Generation provider enabled");
                Some(Arc::new(client) as Arc<dyn GenerationProvider>)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Generation provider not configured");
                None
            }
        };

        Self {
            store,
            config,
            prices: PriceTable::default(),
            provider,
            jwks: Arc::new(JwksCache::new()),
        }
    }

    /// Replace the generation provider.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Check if a generation provider is configured.
    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }
}
