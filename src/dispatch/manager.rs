use super::cache::CachedFetcher;
use super::provider::ProviderCtx;
use super::registry::{MediaProvider, ProviderRegistry};
use super::resource::ResourceId;
use super::types::MediaRecord;
use super::{DispatchError, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Entry point for both dispatch paths, sharing one registry and cache.
pub struct DispatchManager {
    registry: Arc<ProviderRegistry>,
    fetcher: CachedFetcher,
    ctx: ProviderCtx,
}

impl DispatchManager {
    pub fn new(registry: Arc<ProviderRegistry>, fetcher: CachedFetcher, ctx: ProviderCtx) -> Self {
        Self {
            registry,
            fetcher,
            ctx,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Route an arbitrary media page URL to its provider.
    ///
    /// Errors here are client errors (unknown host, unparseable
    /// identifier); generator failures come back as structured failure
    /// records inside `Ok`.
    pub async fn dispatch_url(&self, input: &str) -> Result<MediaRecord> {
        let provider = self
            .registry
            .match_url(input)
            .ok_or_else(|| DispatchError::UnsupportedUrl(input.to_string()))?;
        let sid = provider
            .extract_id(input)
            .ok_or(DispatchError::InvalidProviderUrl {
                site: provider.name(),
            })?;
        info!("dispatching {input} to {}", provider.name());
        Ok(self.run(provider, sid).await)
    }

    /// Direct lookup by provider name and identifier.
    pub async fn dispatch_source(&self, source: &str, sid: &str) -> Result<MediaRecord> {
        let provider = self
            .registry
            .by_name(source)
            .ok_or_else(|| DispatchError::UnsupportedSource(source.to_string()))?;
        let sid = provider.canonical_sid(sid);
        Ok(self.run(provider, sid).await)
    }

    /// Cache-aside generation plus unconditional format attach.
    ///
    /// The formatter runs on every successful return, cached or fresh, so
    /// formatting changes apply retroactively to cached raw data.
    async fn run(&self, provider: &Arc<dyn MediaProvider>, sid: String) -> MediaRecord {
        let id = ResourceId::new(provider.name(), &sid);
        let outcome = self
            .fetcher
            .with_cache(&id, || provider.generate(&sid, &self.ctx))
            .await;

        let mut record = match outcome {
            Ok(record) => record,
            Err(e) => {
                warn!("{} generation failed for {sid}: {e}", provider.name());
                MediaRecord::failure(provider.name(), &sid, e.to_string())
            }
        };

        if record.success {
            record.format = Some(provider.format(&record));
        }
        record
    }
}
