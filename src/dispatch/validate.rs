use super::rate_limit::RateLimiter;
use axum::http::HeaderMap;
use regex::Regex;
use std::sync::LazyLock;

/// Header carrying the trusted-request marker for internal calls
pub const TRUSTED_HEADER: &str = "x-internal-service";

/// Proxy headers consulted for the client identity, in priority order
const IP_HEADERS: [&str; 3] = ["cf-connecting-ip", "x-forwarded-for", "x-real-ip"];

static MALICIOUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // Directory traversal
        Regex::new(r"\.\./").expect("Invalid traversal regex"),
        // Script protocols
        Regex::new(r"(?i)(?:javascript|vbscript|script):").expect("Invalid protocol regex"),
        // Embedded tags
        Regex::new(r"(?i)<(?:iframe|object|embed)").expect("Invalid tag regex"),
    ]
});

/// Why a request was rejected before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Unauthorized,
    Forbidden,
    RateLimited,
}

impl Rejection {
    pub const fn status(self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::RateLimited => 429,
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::Unauthorized => "Invalid or missing API key",
            Self::Forbidden => "Malicious request detected",
            Self::RateLimited => "Rate limit exceeded, retry after the window",
        }
    }
}

/// Pre-dispatch gate: shared-secret auth, malicious-input scan, rate limit.
///
/// Owns its rate-limiter state; construct one per deployment (or per test)
/// rather than sharing a global.
pub struct RequestValidator {
    api_key: Option<String>,
    limiter: RateLimiter,
}

impl RequestValidator {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            limiter: RateLimiter::new(),
        }
    }

    /// Run all checks in order, short-circuiting on the first failure.
    /// `raw_uri` is the request path plus query string, unparsed.
    pub fn validate(
        &self,
        raw_uri: &str,
        headers: &HeaderMap,
        key_param: Option<&str>,
    ) -> Result<(), Rejection> {
        if let Some(secret) = &self.api_key
            && !Self::is_trusted(headers, secret)
            && key_param != Some(secret.as_str())
        {
            return Err(Rejection::Unauthorized);
        }

        if Self::looks_malicious(raw_uri) {
            return Err(Rejection::Forbidden);
        }

        if self.limiter.is_limited(&Self::client_ip(headers)) {
            return Err(Rejection::RateLimited);
        }

        Ok(())
    }

    pub fn looks_malicious(input: &str) -> bool {
        MALICIOUS_PATTERNS.iter().any(|p| p.is_match(input))
    }

    fn is_trusted(headers: &HeaderMap, secret: &str) -> bool {
        headers
            .get(TRUSTED_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == secret)
    }

    /// Client identity for rate limiting: first proxy header that is set,
    /// else "unknown". `x-forwarded-for` may carry a hop list; the first
    /// entry is the client.
    pub fn client_ip(headers: &HeaderMap) -> String {
        for name in IP_HEADERS {
            if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
                let ip = value.split(',').next().unwrap_or(value).trim();
                if !ip.is_empty() {
                    return ip.to_string();
                }
            }
        }
        "unknown".to_string()
    }
}
