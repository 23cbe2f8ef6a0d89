use super::provider::ProviderCtx;
use super::types::MediaRecord;
use super::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Core capability of one metadata source.
///
/// A provider knows which URLs it owns, how to derive a canonical
/// identifier from them, how to generate a record for that identifier,
/// and how to render the record as bulletin-board text.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Provider identifier (e.g. "douban", "tmdb")
    fn name(&self) -> &'static str;

    /// Hostname substrings this provider claims
    fn domains(&self) -> &'static [&'static str];

    /// Extract the canonical identifier from a matched URL
    fn extract_id(&self, url: &str) -> Option<String>;

    /// Normalize a directly supplied identifier
    fn canonical_sid(&self, raw: &str) -> String {
        raw.trim().to_string()
    }

    /// Fetch and normalize one record
    async fn generate(&self, sid: &str, ctx: &ProviderCtx) -> Result<MediaRecord>;

    /// Render the record as display text; pure, re-run on every read
    fn format(&self, record: &MediaRecord) -> String;
}

/// Ordered provider table consulted by both dispatch paths.
///
/// URL matching takes the first registered provider whose domain list
/// matches; registration order is the tie-break when domains overlap.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn MediaProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: MediaProvider + 'static>(&mut self, provider: P) {
        self.providers.push(Arc::new(provider));
    }

    pub fn providers(&self) -> &[Arc<dyn MediaProvider>] {
        &self.providers
    }

    /// Look up by provider name (the direct source+sid path)
    pub fn by_name(&self, name: &str) -> Option<&Arc<dyn MediaProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// First registered provider whose domain list matches the URL
    pub fn match_url(&self, url: &str) -> Option<&Arc<dyn MediaProvider>> {
        self.providers
            .iter()
            .find(|p| p.domains().iter().any(|d| url.contains(d)))
    }
}
