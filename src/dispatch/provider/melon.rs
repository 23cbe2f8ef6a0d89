use super::{meta_content, push_field, ProviderCtx};
use crate::dispatch::registry::MediaProvider;
use crate::dispatch::types::MediaRecord;
use crate::dispatch::{DispatchError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"melon\.com/album/detail\.htm\?albumId=(\d+)").expect("Invalid Melon url regex")
});

/// Melon album pages have no public API; the og: meta tags carry the
/// album facts we need.
#[derive(Default)]
pub struct MelonProvider;

impl MelonProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaProvider for MelonProvider {
    fn name(&self) -> &'static str {
        "melon"
    }

    fn domains(&self) -> &'static [&'static str] {
        &["melon.com"]
    }

    fn extract_id(&self, url: &str) -> Option<String> {
        URL_PATTERN.captures(url).map(|c| c[1].to_string())
    }

    async fn generate(&self, sid: &str, ctx: &ProviderCtx) -> Result<MediaRecord> {
        let url = format!("https://www.melon.com/album/detail.htm?albumId={sid}");
        let html = ctx.http.get_text(&url, None).await?;

        let title = meta_content(&html, "og:title")
            .ok_or_else(|| DispatchError::Parse("No og:title in Melon page".to_string()))?;

        let mut record = MediaRecord::new("melon", sid);
        record.set("link", url);
        record.set("title", title);
        record.set_opt("poster", meta_content(&html, "og:image"));
        record.set_opt("intro", meta_content(&html, "og:description"));
        record.set_opt("artist", meta_content(&html, "og:author"));

        Ok(record)
    }

    fn format(&self, record: &MediaRecord) -> String {
        let mut lines = Vec::new();
        if let Some(poster) = record.str_field("poster") {
            lines.push(format!("[img]{poster}[/img]"));
            lines.push(String::new());
        }

        push_field(&mut lines, record, "title", "Album");
        push_field(&mut lines, record, "artist", "Artist");
        push_field(&mut lines, record, "link", "Link");
        if let Some(intro) = record.str_field("intro") {
            lines.push(String::new());
            lines.push(format!("About: {intro}"));
        }

        lines.join("\n")
    }
}
