use super::{extract_json_ld, looks_blocked, name_list, string_list, ProviderCtx};
use crate::dispatch::registry::MediaProvider;
use crate::dispatch::types::MediaRecord;
use crate::dispatch::{DispatchError, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, warn};

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"douban\.com/subject/(\d+)").expect("Invalid Douban url regex"));

static YEAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<span class="year">\((\d{4})\)</span>"#).expect("Invalid year regex")
});

static IMDB_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"IMDb:?</span>\s*(tt\d+)").expect("Invalid imdb-link regex"));

/// Douban movie pages. Cookie-gated for some titles; serves an anti-bot
/// interstitial to suspicious traffic, in which case the mobile domain
/// usually still answers.
#[derive(Default)]
pub struct DoubanProvider;

impl DoubanProvider {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_desktop(&self, sid: &str, ctx: &ProviderCtx) -> Result<String> {
        let url = format!("https://movie.douban.com/subject/{sid}/");
        let html = ctx.http.get_text(&url, ctx.douban_cookie.as_deref()).await?;
        if looks_blocked(&html) {
            return Err(DispatchError::AntiBot);
        }
        Ok(html)
    }

    async fn fetch_mobile(&self, sid: &str, ctx: &ProviderCtx) -> Result<String> {
        let url = format!("https://m.douban.com/movie/subject/{sid}/");
        let html = ctx.http.get_text(&url, ctx.douban_cookie.as_deref()).await?;
        if looks_blocked(&html) {
            return Err(DispatchError::AntiBot);
        }
        Ok(html)
    }

    fn parse_page(sid: &str, html: &str) -> Result<MediaRecord> {
        let ld = extract_json_ld(html).ok_or_else(|| {
            DispatchError::Parse("No structured data block in Douban page".to_string())
        })?;

        let mut record = MediaRecord::new("douban", sid);
        record.set("link", format!("https://movie.douban.com/subject/{sid}/"));

        record.set_opt(
            "title",
            ld.get("name").and_then(Value::as_str).map(str::trim),
        );
        record.set_opt("poster", ld.get("image").and_then(Value::as_str));
        record.set_opt("release_date", ld.get("datePublished").and_then(Value::as_str));

        let year = YEAR_PATTERN
            .captures(html)
            .and_then(|c| c[1].parse::<i64>().ok())
            .or_else(|| {
                ld.get("datePublished")
                    .and_then(Value::as_str)
                    .and_then(|d| d.split('-').next())
                    .and_then(|y| y.parse().ok())
            });
        record.set_opt("year", year);

        if let Some(rating) = ld.get("aggregateRating") {
            record.set_opt(
                "rating",
                rating
                    .get("ratingValue")
                    .and_then(Value::as_str)
                    .and_then(|v| v.parse::<f64>().ok())
                    .or_else(|| rating.get("ratingValue").and_then(Value::as_f64)),
            );
            record.set_opt(
                "votes",
                rating
                    .get("ratingCount")
                    .and_then(Value::as_str)
                    .and_then(|v| v.parse::<i64>().ok())
                    .or_else(|| rating.get("ratingCount").and_then(Value::as_i64)),
            );
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
        record.set_opt(
            "intro",
            ld.get("description")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|d| !d.is_empty()),
        );
        record.set_opt(
            "imdb_id",
            IMDB_PATTERN.captures(html).map(|c| c[1].to_string()),
        );

        Ok(record)
    }

    fn parse_awards(html: &str) -> Vec<String> {
        static AWARD_BLOCK: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse("div.awards").expect("Invalid awards selector"));
        static AWARD_NAME: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse("h2").expect("Invalid award-name selector"));
        static AWARD_ITEM: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse("ul li").expect("Invalid award-item selector"));

        let doc = Html::parse_document(html);
        let mut awards = Vec::new();
        for block in doc.select(&AWARD_BLOCK) {
            let name = block
                .select(&AWARD_NAME)
                .next()
                .map(|h| h.text().collect::<String>())
                .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
                .unwrap_or_default();
            for item in block.select(&AWARD_ITEM) {
                let text = item.text().collect::<String>();
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !text.is_empty() {
                    awards.push(format!("{name} {text}"));
                }
            }
        }
        awards
    }
}

#[async_trait]
impl MediaProvider for DoubanProvider {
    fn name(&self) -> &'static str {
        "douban"
    }

    fn domains(&self) -> &'static [&'static str] {
        &["douban.com"]
    }

    fn extract_id(&self, url: &str) -> Option<String> {
        URL_PATTERN.captures(url).map(|c| c[1].to_string())
    }

    async fn generate(&self, sid: &str, ctx: &ProviderCtx) -> Result<MediaRecord> {
        if let Some(record) = ctx.archive_lookup("douban", sid).await {
            debug!("douban {sid} served from archive");
            return Ok(record);
        }

        let html = match self.fetch_desktop(sid, ctx).await {
            Ok(html) => html,
            Err(e) => {
                warn!("douban desktop fetch failed for {sid}: {e}, trying mobile domain");
                self.fetch_mobile(sid, ctx).await?
            }
        };

        let mut record = Self::parse_page(sid, &html)?;

        // Best effort; a slow or blocked awards page never fails the record
        let awards_url = format!("https://movie.douban.com/subject/{sid}/awards/");
        match ctx
            .http
            .get_text_secondary(&awards_url, ctx.douban_cookie.as_deref())
            .await
        {
            Ok(awards_html) => {
                let awards = Self::parse_awards(&awards_html);
                if !awards.is_empty() {
                    record.set("awards", awards);
                }
            }
            Err(e) => debug!("douban awards fetch skipped for {sid}: {e}"),
        }

        Ok(record)
    }

    fn format(&self, record: &MediaRecord) -> String {
        let mut lines = Vec::new();
        if let Some(poster) = record.str_field("poster") {
            lines.push(format!("[img]{poster}[/img]"));
            lines.push(String::new());
        }

        push_cn(&mut lines, record, "title", "片　　名");
        if let Some(year) = record.field("year").and_then(Value::as_i64) {
            lines.push(format!("◎年　　代　{year}"));
        }
        push_cn(&mut lines, record, "release_date", "上映日期");
        push_cn_list(&mut lines, record, "genres", "类　　别");
        if let Some(rating) = record.field("rating").and_then(Value::as_f64) {
            let votes = record.field("votes").and_then(Value::as_i64).unwrap_or(0);
            lines.push(format!("◎豆瓣评分　{rating}/10 ({votes}人评价)"));
        }
        push_cn(&mut lines, record, "imdb_id", "IMDb链接");
        push_cn(&mut lines, record, "link", "豆瓣链接");
        push_cn_list(&mut lines, record, "directors", "导　　演");
        push_cn_list(&mut lines, record, "cast", "主　　演");

        if let Some(intro) = record.str_field("intro") {
            lines.push(String::new());
            lines.push("◎简　　介".to_string());
            lines.push(String::new());
            lines.push(format!("　　{intro}"));
        }

        if let Some(awards) = record.field("awards").and_then(Value::as_array) {
            lines.push(String::new());
            lines.push("◎获奖情况".to_string());
            lines.push(String::new());
            for award in awards.iter().filter_map(Value::as_str) {
                lines.push(format!("　　{award}"));
            }
        }

        lines.join("\n")
    }
}

fn push_cn(lines: &mut Vec<String>, record: &MediaRecord, key: &str, label: &str) {
    if let Some(value) = record.str_field(key) {
        lines.push(format!("◎{label}　{value}"));
    }
}

fn push_cn_list(lines: &mut Vec<String>, record: &MediaRecord, key: &str, label: &str) {
    if let Some(items) = record.field(key).and_then(Value::as_array) {
        let joined = items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" / ");
        if !joined.is_empty() {
            lines.push(format!("◎{label}　{joined}"));
        }
    }
}
