use super::{extract_json_ld, name_list, push_field, push_list, string_list, ProviderCtx};
use crate::dispatch::registry::MediaProvider;
use crate::dispatch::types::MediaRecord;
use crate::dispatch::{DispatchError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"imdb\.com/title/(tt\d+)").expect("Invalid IMDb url regex"));

/// IMDb title pages carry a complete JSON-LD block; no API key needed.
#[derive(Default)]
pub struct ImdbProvider;

impl ImdbProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaProvider for ImdbProvider {
    fn name(&self) -> &'static str {
        "imdb"
    }

    fn domains(&self) -> &'static [&'static str] {
        &["imdb.com"]
    }

    fn extract_id(&self, url: &str) -> Option<String> {
        URL_PATTERN.captures(url).map(|c| c[1].to_string())
    }

    async fn generate(&self, sid: &str, ctx: &ProviderCtx) -> Result<MediaRecord> {
        let url = format!("https://www.imdb.com/title/{sid}/");
        let html = ctx.http.get_text(&url, None).await?;

        let ld = extract_json_ld(&html).ok_or_else(|| {
            DispatchError::Parse("No structured data block in IMDb page".to_string())
        })?;

        let mut record = MediaRecord::new("imdb", sid);
        record.set("link", url);

        record.set_opt("title", ld.get("name").and_then(Value::as_str));
        record.set_opt("original_title", ld.get("alternateName").and_then(Value::as_str));
        record.set_opt("poster", ld.get("image").and_then(Value::as_str));
        record.set_opt("release_date", ld.get("datePublished").and_then(Value::as_str));
        record.set_opt(
            "year",
            ld.get("datePublished")
                .and_then(Value::as_str)
                .and_then(|d| d.split('-').next())
                .and_then(|y| y.parse::<i64>().ok()),
        );
        record.set_opt("duration", ld.get("duration").and_then(Value::as_str));
        record.set_opt(
            "intro",
            ld.get("description").and_then(Value::as_str).map(str::trim),
        );

        if let Some(rating) = ld.get("aggregateRating") {
            record.set_opt("rating", rating.get("ratingValue").and_then(Value::as_f64));
            record.set_opt("votes", rating.get("ratingCount").and_then(Value::as_i64));
        }
        if let Some(genre) = ld.get("genre") {
            let genres = string_list(genre);
            if !genres.is_empty() {
                record.set("genres", genres);
            }
        }
        if let Some(director) = ld.get("director") {
            let directors = name_list(director);
            if !directors.is_empty() {
                record.set("directors", directors);
            }
        }
        if let Some(actor) = ld.get("actor") {
            let cast: Vec<String> = name_list(actor).into_iter().take(15).collect();
            if !cast.is_empty() {
                record.set("cast", cast);
            }
        }

        Ok(record)
    }

    fn format(&self, record: &MediaRecord) -> String {
        let mut lines = Vec::new();
        if let Some(poster) = record.str_field("poster") {
            lines.push(format!("[img]{poster}[/img]"));
            lines.push(String::new());
        }

        push_field(&mut lines, record, "title", "Title");
        push_field(&mut lines, record, "original_title", "Original Title");
        if let Some(year) = record.field("year").and_then(Value::as_i64) {
            lines.push(format!("Year: {year}"));
        }
        push_field(&mut lines, record, "release_date", "Release Date");
        push_list(&mut lines, record, "genres", "Genres");
        push_field(&mut lines, record, "duration", "Duration");
        if let Some(rating) = record.field("rating").and_then(Value::as_f64) {
            let votes = record.field("votes").and_then(Value::as_i64).unwrap_or(0);
            lines.push(format!("IMDb Rating: {rating}/10 from {votes} users"));
        }
        push_list(&mut lines, record, "directors", "Directors");
        push_list(&mut lines, record, "cast", "Cast");
        push_field(&mut lines, record, "link", "Link");
        if let Some(intro) = record.str_field("intro") {
            lines.push(String::new());
            lines.push(format!("Intro: {intro}"));
        }

        lines.join("\n")
    }
}
