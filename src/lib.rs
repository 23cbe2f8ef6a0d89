pub mod config;
pub mod dispatch;
pub mod routes;

pub use crate::config::Settings;

use dispatch::provider::{HttpClient, ProviderCtx};
use dispatch::{
    CacheStore, CachedFetcher, DispatchManager, MemoryStore, ProviderRegistry, RequestValidator,
    SearchDispatcher,
};
use std::sync::Arc;

/// Default copyright line for response envelopes
pub const COPYRIGHT: &str = "Powered by mediagen";

/// Shared application state.
#[derive(Clone)]
pub struct Ctx {
    pub settings: Arc<Settings>,
    pub manager: Arc<DispatchManager>,
    pub search: Arc<SearchDispatcher>,
    pub validator: Arc<RequestValidator>,
}

impl Ctx {
    /// Assemble the full application state from settings.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        let registry = Arc::new(dispatch::create_default_registry());
        let store = settings
            .cache_enabled
            .then(|| Arc::new(MemoryStore::new(settings.cache_capacity)) as Arc<dyn CacheStore>);
        Self::with_parts(settings, registry, store)
    }

    /// Assemble state over a caller-supplied registry and store.
    /// Tests use this to inject mock providers and inspect the cache.
    #[must_use]
    pub fn with_parts(
        settings: Settings,
        registry: Arc<ProviderRegistry>,
        store: Option<Arc<dyn CacheStore>>,
    ) -> Self {
        let http = HttpClient::new();
        let provider_ctx = ProviderCtx {
            http: http.clone(),
            tmdb_api_key: settings.tmdb_api_key.clone(),
            douban_cookie: settings.douban_cookie.clone(),
            archive_url: settings.archive_url.clone(),
        };

        let manager = Arc::new(DispatchManager::new(
            registry,
            CachedFetcher::new(store),
            provider_ctx,
        ));
        let search = Arc::new(SearchDispatcher::new(http, settings.tmdb_api_key.clone()));
        let validator = Arc::new(RequestValidator::new(settings.api_key.clone()));

        Self {
            settings: Arc::new(settings),
            manager,
            search,
            validator,
        }
    }
}
