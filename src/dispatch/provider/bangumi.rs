use super::{push_field, push_list, ProviderCtx};
use crate::dispatch::registry::MediaProvider;
use crate::dispatch::types::MediaRecord;
use crate::dispatch::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

const BANGUMI_API_URL: &str = "https://api.bgm.tv";

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:bgm\.tv|bangumi\.tv|chii\.in)/subject/(\d+)")
        .expect("Invalid Bangumi url regex")
});

#[derive(Debug, Deserialize)]
struct Subject {
    name: String,
    name_cn: Option<String>,
    summary: Option<String>,
    date: Option<String>,
    platform: Option<String>,
    images: Option<Images>,
    rating: Option<Rating>,
    #[serde(default)]
    tags: Vec<Tag>,
    eps: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Images {
    large: Option<String>,
    common: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Rating {
    score: Option<f64>,
    total: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

#[derive(Default)]
pub struct BangumiProvider;

impl BangumiProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaProvider for BangumiProvider {
    fn name(&self) -> &'static str {
        "bangumi"
    }

    fn domains(&self) -> &'static [&'static str] {
        &["bgm.tv", "bangumi.tv", "chii.in"]
    }

    fn extract_id(&self, url: &str) -> Option<String> {
        URL_PATTERN.captures(url).map(|c| c[1].to_string())
    }

    async fn generate(&self, sid: &str, ctx: &ProviderCtx) -> Result<MediaRecord> {
        let url = format!("{BANGUMI_API_URL}/v0/subjects/{sid}");
        let subject: Subject = ctx.http.get_json(&url).await?;

        let mut record = MediaRecord::new("bangumi", sid);
        record.set("link", format!("https://bgm.tv/subject/{sid}"));

        let title = subject
            .name_cn
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| subject.name.clone());
        record.set("title", title);
        record.set("original_title", subject.name);
        record.set_opt(
            "year",
            subject
                .date
                .as_deref()
                .and_then(|d| d.split('-').next())
                .and_then(|y| y.parse::<i64>().ok()),
        );
        record.set_opt("release_date", subject.date);
        record.set_opt("platform", subject.platform.filter(|p| !p.is_empty()));
        record.set_opt("episodes", subject.eps.filter(|&e| e > 0));
        record.set_opt(
            "poster",
            subject.images.and_then(|i| i.large.or(i.common)),
        );
        if let Some(rating) = subject.rating {
            record.set_opt("rating", rating.score);
            record.set_opt("votes", rating.total);
        }
        let tags: Vec<String> = subject.tags.into_iter().take(12).map(|t| t.name).collect();
        if !tags.is_empty() {
            record.set("tags", tags);
        }
        record.set_opt(
            "intro",
            subject.summary.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        );

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
        push_field(&mut lines, record, "release_date", "Air Date");
        push_field(&mut lines, record, "platform", "Platform");
        if let Some(episodes) = record.field("episodes").and_then(Value::as_i64) {
            lines.push(format!("Episodes: {episodes}"));
        }
        if let Some(rating) = record.field("rating").and_then(Value::as_f64) {
            let votes = record.field("votes").and_then(Value::as_i64).unwrap_or(0);
            lines.push(format!("Rating: {rating}/10 from {votes} users"));
        }
        push_list(&mut lines, record, "tags", "Tags");
        push_field(&mut lines, record, "link", "Link");
        if let Some(intro) = record.str_field("intro") {
            lines.push(String::new());
            lines.push(format!("Intro: {intro}"));
        }

        lines.join("\n")
    }
}
