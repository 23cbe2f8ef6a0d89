use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Runtime configuration, loaded from an optional `mediagen.toml` plus
/// `MEDIAGEN_*` environment variables (environment wins).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Shared secret; when set, API calls must carry a matching `key`
    #[serde(default)]
    pub api_key: Option<String>,
    /// TMDB API key for the tmdb provider and search backend
    #[serde(default)]
    pub tmdb_api_key: Option<String>,
    /// Session cookie for cookie-gated Douban pages
    #[serde(default)]
    pub douban_cookie: Option<String>,
    /// Base URL of an archival snapshot source; set implies enabled
    #[serde(default)]
    pub archive_url: Option<String>,
    /// Override for the copyright string in response envelopes
    #[serde(default)]
    pub copyright: Option<String>,
    /// Whether generated records are cached
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
    /// Maximum number of cached records
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("mediagen").required(false))
            .add_source(Environment::with_prefix("MEDIAGEN"))
            .build()?
            .try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            api_key: None,
            tmdb_api_key: None,
            douban_cookie: None,
            archive_url: None,
            copyright: None,
            cache_enabled: default_cache_enabled(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

const fn default_cache_enabled() -> bool {
    true
}

const fn default_cache_capacity() -> u64 {
    10_000
}
