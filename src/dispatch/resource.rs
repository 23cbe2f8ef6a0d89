use std::fmt;

/// Cache key for one (provider, identifier) pair.
///
/// The flat key substitutes `/` with `_` so it stays a single ASCII token
/// for any key-value store; the original slashed identifier is kept
/// alongside so generators always receive it intact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    site: String,
    sid: String,
}

impl ResourceId {
    pub fn new(site: impl Into<String>, sid: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            sid: sid.into(),
        }
    }

    /// Provider name component
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Canonical identifier, path separators intact
    pub fn sid(&self) -> &str {
        &self.sid
    }

    /// Flat store key: `{site}_{sid}` with path separators replaced
    pub fn key(&self) -> String {
        format!("{}_{}", self.site, self.sid.replace('/', "_"))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
