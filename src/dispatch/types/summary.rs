use serde::{Deserialize, Serialize};

/// One row of a search response, uniform across backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSummary {
    /// Release or first-air year
    pub year: Option<i32>,
    /// Result kind as reported by the backend ("movie", "tv", "feature", ...)
    pub subtype: String,
    /// Display title
    pub title: String,
    /// Secondary line (original title, top cast, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Canonical page URL at the source
    pub link: String,
    /// Identifier usable for a direct source+sid lookup
    pub id: String,
}
