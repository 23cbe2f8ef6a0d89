use super::{push_field, push_list, ProviderCtx};
use crate::dispatch::registry::MediaProvider;
use crate::dispatch::types::MediaRecord;
use crate::dispatch::{DispatchError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"steampowered\.com/app/(\d+)").expect("Invalid Steam url regex"));

#[derive(Debug, Deserialize)]
struct AppEntry {
    success: bool,
    data: Option<AppData>,
}

#[derive(Debug, Deserialize)]
struct AppData {
    name: String,
    #[serde(default)]
    developers: Vec<String>,
    #[serde(default)]
    publishers: Vec<String>,
    header_image: Option<String>,
    short_description: Option<String>,
    release_date: Option<ReleaseDate>,
    #[serde(default)]
    genres: Vec<SteamGenre>,
    website: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleaseDate {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SteamGenre {
    description: String,
}

#[derive(Default)]
pub struct SteamProvider;

impl SteamProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaProvider for SteamProvider {
    fn name(&self) -> &'static str {
        "steam"
    }

    fn domains(&self) -> &'static [&'static str] {
        &["steampowered.com"]
    }

    fn extract_id(&self, url: &str) -> Option<String> {
        URL_PATTERN.captures(url).map(|c| c[1].to_string())
    }

    async fn generate(&self, sid: &str, ctx: &ProviderCtx) -> Result<MediaRecord> {
        let url = "https://store.steampowered.com/api/appdetails";
        // The response is keyed by the requested app id
        let mut apps: HashMap<String, AppEntry> = ctx
            .http
            .get_json_with_params(url, &[("appids", sid)])
            .await?;

        let entry = apps
            .remove(sid)
            .filter(|e| e.success)
            .and_then(|e| e.data)
            .ok_or_else(|| DispatchError::NotFound(format!("Steam app {sid} not found")))?;

        let mut record = MediaRecord::new("steam", sid);
        record.set("link", format!("https://store.steampowered.com/app/{sid}/"));
        record.set("title", entry.name);
        if !entry.developers.is_empty() {
            record.set("developers", entry.developers);
        }
        if !entry.publishers.is_empty() {
            record.set("publishers", entry.publishers);
        }
        record.set_opt("poster", entry.header_image);
        record.set_opt(
            "release_date",
            entry.release_date.and_then(|r| r.date).filter(|d| !d.is_empty()),
        );
        let genres: Vec<String> = entry.genres.into_iter().map(|g| g.description).collect();
        if !genres.is_empty() {
            record.set("genres", genres);
        }
        record.set_opt("website", entry.website.filter(|w| !w.is_empty()));
        record.set_opt(
            "intro",
            entry.short_description.filter(|d| !d.is_empty()),
        );

        Ok(record)
    }

    fn format(&self, record: &MediaRecord) -> String {
        let mut lines = Vec::new();
        if let Some(poster) = record.str_field("poster") {
            lines.push(format!("[img]{poster}[/img]"));
            lines.push(String::new());
        }

        push_field(&mut lines, record, "title", "Name");
        push_field(&mut lines, record, "release_date", "Release Date");
        push_list(&mut lines, record, "genres", "Genres");
        push_list(&mut lines, record, "developers", "Developers");
        push_list(&mut lines, record, "publishers", "Publishers");
        push_field(&mut lines, record, "website", "Website");
        push_field(&mut lines, record, "link", "Store Page");
        if let Some(intro) = record.str_field("intro") {
            lines.push(String::new());
            lines.push(format!("About: {intro}"));
        }

        lines.join("\n")
    }
}
