//! Dispatch core tests

use super::provider::ProviderCtx;
use super::types::MediaRecord;
use super::{DispatchError, MediaProvider, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What the mock generator should do on each call
#[derive(Clone, Copy)]
enum MockMode {
    Success,
    FailureRecord,
    ErrorOut,
}

struct MockProvider {
    calls: Arc<AtomicUsize>,
    mode: MockMode,
}

impl MockProvider {
    fn new(mode: MockMode) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: calls.clone(),
                mode,
            },
            calls,
        )
    }
}

#[async_trait]
impl MediaProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn domains(&self) -> &'static [&'static str] {
        &["mock.example.com"]
    }

    fn extract_id(&self, url: &str) -> Option<String> {
        url.rsplit('/')
            .find(|s| !s.is_empty())
            .filter(|s| s.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
    }

    async fn generate(&self, sid: &str, _ctx: &ProviderCtx) -> Result<MediaRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            MockMode::Success => {
                let mut record = MediaRecord::new("mock", sid);
                record.set("title", "Fight Club");
                Ok(record)
            }
            MockMode::FailureRecord => {
                Ok(MediaRecord::failure("mock", sid, "upstream said no"))
            }
            MockMode::ErrorOut => Err(DispatchError::NotFound("mock miss".to_string())),
        }
    }

    fn format(&self, record: &MediaRecord) -> String {
        format!("Title: {}", record.str_field("title").unwrap_or_default())
    }
}

mod resource_tests {
    use crate::dispatch::ResourceId;

    #[test]
    fn test_key_substitutes_path_separators() {
        let id = ResourceId::new("tmdb", "movie/550");
        assert_eq!(id.key(), "tmdb_movie_550");
        assert_eq!(id.sid(), "movie/550");
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = ResourceId::new("tmdb", "movie/550");
        let b = ResourceId::new("tmdb", "movie/550");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_plain_identifier_is_untouched() {
        let id = ResourceId::new("douban", "1292052");
        assert_eq!(id.key(), "douban_1292052");
    }
}

mod rate_limit_tests {
    use crate::dispatch::{MAX_REQUESTS, RateLimiter, TIME_WINDOW_MS};

    #[test]
    fn test_limit_boundary() {
        let limiter = RateLimiter::new();
        let now = 1_000_000;

        for i in 0..MAX_REQUESTS {
            assert!(
                !limiter.check_and_record("client", now + i as u64),
                "request {} should be allowed",
                i + 1
            );
        }
        assert!(limiter.check_and_record("client", now + MAX_REQUESTS as u64));
    }

    #[test]
    fn test_window_expiry_resets() {
        let limiter = RateLimiter::new();
        let now = 1_000_000;

        for _ in 0..MAX_REQUESTS {
            limiter.check_and_record("client", now);
        }
        assert!(limiter.check_and_record("client", now + 1));

        // All stamps age out once the window has passed
        assert!(!limiter.check_and_record("client", now + TIME_WINDOW_MS + 1));
    }

    #[test]
    fn test_identities_are_independent() {
        let limiter = RateLimiter::new();
        let now = 1_000_000;

        for _ in 0..MAX_REQUESTS {
            limiter.check_and_record("busy", now);
        }
        assert!(limiter.check_and_record("busy", now + 1));
        assert!(!limiter.check_and_record("idle", now + 1));
    }

    #[test]
    fn test_limited_request_is_not_recorded() {
        let limiter = RateLimiter::new();
        let now = 1_000_000;

        for _ in 0..MAX_REQUESTS {
            limiter.check_and_record("client", now);
        }
        // Hammering while limited must not extend the window
        for i in 0..100 {
            assert!(limiter.check_and_record("client", now + i));
        }
        assert!(!limiter.check_and_record("client", now + TIME_WINDOW_MS + 1));
    }
}

mod lang_tests {
    use crate::dispatch::is_chinese_text;

    #[test]
    fn test_chinese_title() {
        assert!(is_chinese_text("复仇者联盟"));
    }

    #[test]
    fn test_english_title() {
        assert!(!is_chinese_text("Avengers"));
    }

    #[test]
    fn test_single_latin_char() {
        assert!(!is_chinese_text("A"));
    }

    #[test]
    fn test_single_cjk_char() {
        assert!(is_chinese_text("复"));
    }

    #[test]
    fn test_mixed_mostly_latin() {
        assert!(!is_chinese_text("Avengers 复仇"));
    }

    #[test]
    fn test_mixed_mostly_cjk() {
        assert!(is_chinese_text("复仇者联盟 IV"));
    }
}

mod registry_tests {
    use crate::dispatch::create_default_registry;

    #[test]
    fn test_douban_url_routes() {
        let registry = create_default_registry();
        let url = "https://movie.douban.com/subject/1292052/";

        let provider = registry.match_url(url).expect("douban should match");
        assert_eq!(provider.name(), "douban");
        assert_eq!(provider.extract_id(url).as_deref(), Some("1292052"));
    }

    #[test]
    fn test_tmdb_url_routes() {
        let registry = create_default_registry();
        let url = "https://www.themoviedb.org/movie/550";

        let provider = registry.match_url(url).expect("tmdb should match");
        assert_eq!(provider.name(), "tmdb");
        assert_eq!(provider.extract_id(url).as_deref(), Some("movie/550"));
    }

    #[test]
    fn test_imdb_url_routes() {
        let registry = create_default_registry();
        let url = "https://www.imdb.com/title/tt0137523/";

        let provider = registry.match_url(url).expect("imdb should match");
        assert_eq!(provider.name(), "imdb");
        assert_eq!(provider.extract_id(url).as_deref(), Some("tt0137523"));
    }

    #[test]
    fn test_unknown_host_does_not_match() {
        let registry = create_default_registry();
        assert!(registry.match_url("https://example.com/unknown").is_none());
    }

    #[test]
    fn test_lookup_by_name() {
        let registry = create_default_registry();
        assert!(registry.by_name("steam").is_some());
        assert!(registry.by_name("nosuch").is_none());
    }

    #[test]
    fn test_registration_order_is_stable() {
        let registry = create_default_registry();
        let names: Vec<_> = registry.providers().iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            ["douban", "imdb", "tmdb", "bangumi", "steam", "melon", "qqmusic"]
        );
    }

    #[test]
    fn test_tmdb_canonical_sid_restores_slashes() {
        let registry = create_default_registry();
        let tmdb = registry.by_name("tmdb").expect("tmdb registered");
        assert_eq!(tmdb.canonical_sid("movie_550"), "movie/550");
        assert_eq!(tmdb.canonical_sid("movie/550"), "movie/550");
    }
}

mod cache_tests {
    use super::{MockMode, MockProvider};
    use crate::dispatch::provider::ProviderCtx;
    use crate::dispatch::{
        CacheStore, CachedFetcher, DispatchError, DispatchManager, MemoryStore, ProviderRegistry,
    };
    use serde_json::Value;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    fn manager_with(
        mode: MockMode,
        store: Arc<MemoryStore>,
    ) -> (DispatchManager, Arc<std::sync::atomic::AtomicUsize>) {
        let (provider, calls) = MockProvider::new(mode);
        let mut registry = ProviderRegistry::new();
        registry.register(provider);
        let manager = DispatchManager::new(
            Arc::new(registry),
            CachedFetcher::new(Some(store as Arc<dyn CacheStore>)),
            ProviderCtx::default(),
        );
        (manager, calls)
    }

    #[tokio::test]
    async fn test_second_dispatch_hits_cache() {
        let store = Arc::new(MemoryStore::new(100));
        let (manager, calls) = manager_with(MockMode::Success, store);

        let first = manager
            .dispatch_url("https://mock.example.com/42")
            .await
            .expect("dispatch should succeed");
        let second = manager
            .dispatch_url("https://mock.example.com/42")
            .await
            .expect("dispatch should succeed");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(first.success && second.success);
        assert_eq!(first.str_field("title"), second.str_field("title"));
        // Format is recomputed on the cached return, not read from the store
        assert_eq!(second.format.as_deref(), Some("Title: Fight Club"));
    }

    #[tokio::test]
    async fn test_failure_record_is_not_cached() {
        let store = Arc::new(MemoryStore::new(100));
        let (manager, calls) = manager_with(MockMode::FailureRecord, store);

        let first = manager
            .dispatch_url("https://mock.example.com/42")
            .await
            .expect("dispatch should succeed");
        let second = manager
            .dispatch_url("https://mock.example.com/42")
            .await
            .expect("dispatch should succeed");

        assert!(!first.success && !second.success);
        assert!(first.format.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_generator_error_is_not_cached() {
        let store = Arc::new(MemoryStore::new(100));
        let (manager, calls) = manager_with(MockMode::ErrorOut, store);

        let first = manager
            .dispatch_url("https://mock.example.com/42")
            .await
            .expect("errors become failure records");
        assert!(!first.success);
        assert!(first.error.as_deref().is_some_and(|e| e.contains("mock miss")));

        manager
            .dispatch_url("https://mock.example.com/42")
            .await
            .expect("errors become failure records");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cached_payload_has_no_format() {
        let store = Arc::new(MemoryStore::new(100));
        let (manager, _) = manager_with(MockMode::Success, store.clone());

        manager
            .dispatch_url("https://mock.example.com/42")
            .await
            .expect("dispatch should succeed");

        let bytes = store
            .get("mock_42")
            .await
            .expect("store get should succeed")
            .expect("entry should exist");
        let entry: Value = serde_json::from_slice(&bytes).expect("entry should be JSON");
        assert!(entry.get("format").is_none());
        assert_eq!(entry["title"], "Fight Club");
        assert_eq!(entry["site"], "mock");
    }

    #[tokio::test]
    async fn test_both_dispatch_paths_share_one_cache() {
        let store = Arc::new(MemoryStore::new(100));
        let (manager, calls) = manager_with(MockMode::Success, store);

        manager
            .dispatch_url("https://mock.example.com/42")
            .await
            .expect("dispatch should succeed");
        let direct = manager
            .dispatch_source("mock", "42")
            .await
            .expect("dispatch should succeed");

        assert!(direct.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsupported_url_is_a_client_error() {
        let store = Arc::new(MemoryStore::new(100));
        let (manager, calls) = manager_with(MockMode::Success, store);

        let err = manager
            .dispatch_url("https://example.com/unknown")
            .await
            .expect_err("unknown host should not dispatch");
        assert!(matches!(err, DispatchError::UnsupportedUrl(_)));

        let err = manager
            .dispatch_source("nosuch", "1")
            .await
            .expect_err("unknown source should not dispatch");
        assert!(matches!(err, DispatchError::UnsupportedSource(_)));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_generates() {
        let (provider, calls) = MockProvider::new(MockMode::Success);
        let mut registry = ProviderRegistry::new();
        registry.register(provider);
        let manager = DispatchManager::new(
            Arc::new(registry),
            CachedFetcher::disabled(),
            ProviderCtx::default(),
        );

        manager.dispatch_source("mock", "42").await.unwrap();
        manager.dispatch_source("mock", "42").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_store_roundtrip() {
        let store = MemoryStore::new(10);
        store.put("k", b"v".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.get("absent").await.unwrap(), None);
    }
}

mod validate_tests {
    use crate::dispatch::{Rejection, RequestValidator, TRUSTED_HEADER};
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn test_malicious_patterns() {
        assert!(RequestValidator::looks_malicious("/api?url=../../etc/passwd"));
        assert!(RequestValidator::looks_malicious("/api?q=javascript:alert(1)"));
        assert!(RequestValidator::looks_malicious("/api?q=VBSCRIPT:run"));
        assert!(RequestValidator::looks_malicious("/api?q=<iframe src=x>"));
        assert!(RequestValidator::looks_malicious("/api?q=<OBJECT data=x>"));
        assert!(!RequestValidator::looks_malicious(
            "/api?url=https://movie.douban.com/subject/1292052/"
        ));
    }

    #[test]
    fn test_missing_key_is_unauthorized() {
        let validator = RequestValidator::new(Some("sekrit".to_string()));
        let headers = HeaderMap::new();

        assert_eq!(
            validator.validate("/api", &headers, None),
            Err(Rejection::Unauthorized)
        );
        assert_eq!(
            validator.validate("/api", &headers, Some("wrong")),
            Err(Rejection::Unauthorized)
        );
        assert_eq!(validator.validate("/api", &headers, Some("sekrit")), Ok(()));
    }

    #[test]
    fn test_trusted_header_bypasses_key() {
        let validator = RequestValidator::new(Some("sekrit".to_string()));
        let mut headers = HeaderMap::new();
        headers.insert(TRUSTED_HEADER, HeaderValue::from_static("sekrit"));

        assert_eq!(validator.validate("/api", &headers, None), Ok(()));
    }

    #[test]
    fn test_no_key_configured_allows_all() {
        let validator = RequestValidator::new(None);
        let headers = HeaderMap::new();

        assert_eq!(validator.validate("/api", &headers, None), Ok(()));
    }

    #[test]
    fn test_malice_outranks_rate_limit() {
        let validator = RequestValidator::new(None);
        let headers = HeaderMap::new();

        assert_eq!(
            validator.validate("/api?q=../x", &headers, None),
            Err(Rejection::Forbidden)
        );
    }

    #[test]
    fn test_client_ip_priority() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("3.3.3.3"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("2.2.2.2, 9.9.9.9"));
        assert_eq!(RequestValidator::client_ip(&headers), "2.2.2.2");

        headers.insert("cf-connecting-ip", HeaderValue::from_static("1.1.1.1"));
        assert_eq!(RequestValidator::client_ip(&headers), "1.1.1.1");

        assert_eq!(RequestValidator::client_ip(&HeaderMap::new()), "unknown");
    }
}

mod record_tests {
    use crate::dispatch::types::MediaRecord;

    #[test]
    fn test_cache_bytes_strip_format() {
        let mut record = MediaRecord::new("tmdb", "movie/550");
        record.set("title", "Fight Club");
        record.format = Some("rendered".to_string());

        let bytes = record.to_cache_bytes().expect("serialization");
        let restored = MediaRecord::from_cache_bytes(&bytes).expect("deserialization");

        assert!(restored.format.is_none());
        assert_eq!(restored.str_field("title"), Some("Fight Club"));
        assert_eq!(restored.site, "tmdb");
        assert_eq!(restored.sid, "movie/550");
        assert!(restored.success);
    }

    #[test]
    fn test_failure_record_shape() {
        let record = MediaRecord::failure("douban", "1", "blocked");
        assert!(!record.success);
        assert_eq!(record.error.as_deref(), Some("blocked"));
    }
}
