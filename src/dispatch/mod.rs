mod cache;
mod manager;
mod rate_limit;
mod registry;
mod resource;
mod search;
mod validate;

pub mod provider;
pub mod types;

#[cfg(test)]
mod tests;

pub use cache::{CacheStore, CachedFetcher, MemoryStore};
pub use manager::DispatchManager;
pub use rate_limit::{CLEANUP_INTERVAL_MS, MAX_REQUESTS, RateLimiter, TIME_WINDOW_MS};
pub use registry::{MediaProvider, ProviderRegistry};
pub use resource::ResourceId;
pub use search::{SearchDispatcher, SearchOutcome, is_chinese_text};
pub use validate::{Rejection, RequestValidator, TRUSTED_HEADER};

use provider::{
    BangumiProvider, DoubanProvider, ImdbProvider, MelonProvider, QqMusicProvider, SteamProvider,
    TmdbProvider,
};

/// Dispatch result type
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Dispatch error types
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Upstream error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Upstream request timed out")]
    Timeout,

    #[error("Blocked by upstream anti-bot checks")]
    AntiBot,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    #[error("URL not recognized by the {site} provider")]
    InvalidProviderUrl { site: &'static str },

    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Build the default provider table.
///
/// Registration order is the documented tie-break for overlapping domain
/// matches; both dispatch paths consult this one table.
#[must_use]
pub fn create_default_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(DoubanProvider::new());
    registry.register(ImdbProvider::new());
    registry.register(TmdbProvider::new());
    registry.register(BangumiProvider::new());
    registry.register(SteamProvider::new());
    registry.register(MelonProvider::new());
    registry.register(QqMusicProvider::new());
    registry
}
