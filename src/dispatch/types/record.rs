use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Normalized output of one provider generation.
///
/// Provider-specific fields (title, year, ratings, ...) are opaque to the
/// dispatch layer and live in the flattened `data` map. `format` is the
/// rendered bulletin-board text: attached after every successful return,
/// never written into the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Provider that produced this record
    pub site: String,
    /// Canonical identifier used for the generation
    pub sid: String,
    /// Whether the generation succeeded
    pub success: bool,
    /// Failure message, present iff `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Provider-specific payload fields
    #[serde(flatten)]
    pub data: Map<String, Value>,
    /// Rendered display text, recomputed on every successful read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl MediaRecord {
    /// Create a successful record with an empty payload
    pub fn new(site: impl Into<String>, sid: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            sid: sid.into(),
            success: true,
            error: None,
            data: Map::new(),
            format: None,
        }
    }

    /// Create a failure record
    pub fn failure(
        site: impl Into<String>,
        sid: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            site: site.into(),
            sid: sid.into(),
            success: false,
            error: Some(error.into()),
            data: Map::new(),
            format: None,
        }
    }

    /// Insert a payload field
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.data.insert(key.to_string(), value.into());
    }

    /// Insert a payload field only when a value is present
    pub fn set_opt(&mut self, key: &str, value: Option<impl Into<Value>>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    /// Payload field as a string slice
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Raw payload field
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Serialized cache form, with `format` stripped
    pub fn to_cache_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let mut stripped = self.clone();
        stripped.format = None;
        serde_json::to_vec(&stripped)
    }

    /// Rebuild a record from its cached form
    pub fn from_cache_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
