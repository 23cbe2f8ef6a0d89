use super::{push_field, push_list, ProviderCtx};
use crate::dispatch::registry::MediaProvider;
use crate::dispatch::types::MediaRecord;
use crate::dispatch::{DispatchError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

const ALBUM_API_URL: &str = "https://c.y.qq.com/v8/fcg-bin/fcg_v8_album_info_cp.fcg";

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"y\.qq\.com/n/(?:ryqq|yqq)/albumDetail/([0-9A-Za-z]+)")
        .expect("Invalid QQ Music url regex")
});

#[derive(Debug, Deserialize)]
struct AlbumResponse {
    code: i64,
    data: Option<AlbumData>,
}

#[derive(Debug, Deserialize)]
struct AlbumData {
    name: String,
    singername: Option<String>,
    #[serde(rename = "aDate")]
    release_date: Option<String>,
    desc: Option<String>,
    #[serde(default)]
    list: Vec<Song>,
}

#[derive(Debug, Deserialize)]
struct Song {
    songname: String,
}

#[derive(Default)]
pub struct QqMusicProvider;

impl QqMusicProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaProvider for QqMusicProvider {
    fn name(&self) -> &'static str {
        "qqmusic"
    }

    fn domains(&self) -> &'static [&'static str] {
        &["y.qq.com"]
    }

    fn extract_id(&self, url: &str) -> Option<String> {
        URL_PATTERN.captures(url).map(|c| c[1].to_string())
    }

    async fn generate(&self, sid: &str, ctx: &ProviderCtx) -> Result<MediaRecord> {
        let response: AlbumResponse = ctx
            .http
            .get_json_with_params(ALBUM_API_URL, &[("albummid", sid), ("format", "json")])
            .await?;

        let album = response
            .data
            .filter(|_| response.code == 0)
            .ok_or_else(|| DispatchError::NotFound(format!("QQ Music album {sid} not found")))?;

        let mut record = MediaRecord::new("qqmusic", sid);
        record.set("link", format!("https://y.qq.com/n/ryqq/albumDetail/{sid}"));
        record.set("title", album.name);
        record.set_opt("artist", album.singername.filter(|s| !s.is_empty()));
        record.set_opt("release_date", album.release_date.filter(|d| !d.is_empty()));
        record.set(
            "poster",
            format!("https://y.gtimg.cn/music/photo_new/T002R500x500M000{sid}.jpg"),
        );
        let tracks: Vec<String> = album
            .list
            .into_iter()
            .take(30)
            .map(|s| s.songname)
            .collect();
        if !tracks.is_empty() {
            record.set("tracks", tracks);
        }
        record.set_opt(
            "intro",
            album.desc.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        );

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
        push_field(&mut lines, record, "release_date", "Release Date");
        push_field(&mut lines, record, "link", "Link");
        push_list(&mut lines, record, "tracks", "Tracks");
        if let Some(intro) = record.str_field("intro") {
            lines.push(String::new());
            lines.push(format!("About: {intro}"));
        }

        lines.join("\n")
    }
}
