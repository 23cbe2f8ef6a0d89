pub mod bangumi;
pub mod douban;
pub mod http;
pub mod imdb;
pub mod melon;
pub mod qqmusic;
pub mod steam;
pub mod tmdb;

pub use bangumi::BangumiProvider;
pub use douban::DoubanProvider;
pub use http::HttpClient;
pub use imdb::ImdbProvider;
pub use melon::MelonProvider;
pub use qqmusic::QqMusicProvider;
pub use steam::SteamProvider;
pub use tmdb::TmdbProvider;

use crate::dispatch::types::MediaRecord;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

/// Environment shared by all generators.
#[derive(Clone, Default)]
pub struct ProviderCtx {
    pub http: HttpClient,
    /// TMDB API key
    pub tmdb_api_key: Option<String>,
    /// Session cookie for cookie-gated Douban pages
    pub douban_cookie: Option<String>,
    /// Base URL of the archival snapshot source; set implies enabled
    pub archive_url: Option<String>,
}

impl ProviderCtx {
    /// Consult the archival snapshot source before live scraping.
    /// Best effort: any miss or error falls through to the live fetch.
    pub async fn archive_lookup(&self, site: &str, sid: &str) -> Option<MediaRecord> {
        let base = self.archive_url.as_deref()?;
        let url = format!(
            "{}/{site}/{}.json",
            base.trim_end_matches('/'),
            sid.replace('/', "_")
        );
        match self.http.get_json::<MediaRecord>(&url).await {
            Ok(record) if record.success => Some(record),
            Ok(_) => None,
            Err(e) => {
                debug!("archive lookup missed for {site}/{sid}: {e}");
                None
            }
        }
    }
}

/// Known block-page phrasings from anti-bot interstitials.
pub fn looks_blocked(html: &str) -> bool {
    const MARKERS: [&str; 3] = ["检测到有异常请求", "sec.douban.com", "异常请求从你的 IP"];
    MARKERS.iter().any(|m| html.contains(m))
}

/// First parseable JSON-LD block embedded in a page, if any.
pub fn extract_json_ld(html: &str) -> Option<Value> {
    static JSON_LD: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(r#"script[type="application/ld+json"]"#).expect("Invalid json-ld selector")
    });

    let doc = Html::parse_document(html);
    for script in doc.select(&JSON_LD) {
        let text = script.text().collect::<String>();
        // Raw control characters inside embedded strings break the parser
        let cleaned: String = text
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect();
        if let Ok(value) = serde_json::from_str(&cleaned) {
            return Some(value);
        }
    }
    None
}

/// Content of a `<meta property=...>` (or `name=`) tag.
pub fn meta_content(html: &str, property: &str) -> Option<String> {
    let selector =
        Selector::parse(&format!(r#"meta[property="{property}"], meta[name="{property}"]"#))
            .ok()?;
    let doc = Html::parse_document(html);
    doc.select(&selector)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Names from a JSON-LD person/organization field, which may be a single
/// object or an array of them.
pub(crate) fn name_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect(),
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .map(|n| vec![n.to_string()])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Append "Label: value" to a format block when a string field is present.
pub(crate) fn push_field(lines: &mut Vec<String>, record: &MediaRecord, key: &str, label: &str) {
    if let Some(value) = record.str_field(key) {
        lines.push(format!("{label}: {value}"));
    }
}

/// Append "Label: a / b / c" when an array field is non-empty.
pub(crate) fn push_list(lines: &mut Vec<String>, record: &MediaRecord, key: &str, label: &str) {
    if let Some(items) = record.field(key).and_then(Value::as_array) {
        let joined = items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" / ");
        if !joined.is_empty() {
            lines.push(format!("{label}: {joined}"));
        }
    }
}

/// Strings from a JSON-LD field that may be a single string or an array.
pub(crate) fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(s) => vec![s.clone()],
        _ => Vec::new(),
    }
}
