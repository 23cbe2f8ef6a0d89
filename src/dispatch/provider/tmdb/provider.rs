use super::api_types::{Credits, MovieDetails, TvDetails};
use crate::dispatch::provider::{push_field, push_list, ProviderCtx};
use crate::dispatch::registry::MediaProvider;
use crate::dispatch::types::MediaRecord;
use crate::dispatch::{DispatchError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub const TMDB_API_URL: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"themoviedb\.org/(movie|tv)/(\d+)").expect("Invalid TMDB url regex")
});

#[derive(Default)]
pub struct TmdbProvider;

impl TmdbProvider {
    pub fn new() -> Self {
        Self
    }

    fn image_url(path: Option<&str>) -> Option<String> {
        path.map(|p| format!("{TMDB_IMAGE_BASE}/w500{p}"))
    }

    fn year_of(date: Option<&str>) -> Option<i64> {
        date.and_then(|d| d.split('-').next()).and_then(|y| y.parse().ok())
    }

    fn fill_credits(record: &mut MediaRecord, credits: Option<Credits>) {
        let Some(credits) = credits else { return };

        let directors: Vec<String> = credits
            .crew
            .iter()
            .filter(|c| matches!(c.job.as_deref(), Some("Director" | "Creator")))
            .map(|c| c.name.clone())
            .collect();
        if !directors.is_empty() {
            record.set("directors", directors);
        }

        let cast: Vec<String> = credits
            .cast
            .into_iter()
            .take(15)
            .map(|c| match c.character {
                Some(ref character) if !character.is_empty() => {
                    format!("{} ({character})", c.name)
                }
                _ => c.name,
            })
            .collect();
        if !cast.is_empty() {
            record.set("cast", cast);
        }
    }

    fn fill_movie(record: &mut MediaRecord, movie: MovieDetails) {
        record.set("type", "movie");
        record.set("title", movie.title);
        if !movie.original_title.is_empty() {
            record.set("original_title", movie.original_title);
        }
        record.set_opt("year", Self::year_of(movie.release_date.as_deref()));
        record.set_opt("release_date", movie.release_date);
        record.set_opt("tagline", movie.tagline.filter(|t| !t.is_empty()));
        record.set_opt("intro", movie.overview.filter(|o| !o.is_empty()));
        record.set_opt("runtime", movie.runtime);
        record.set_opt("rating", movie.vote_average);
        record.set_opt("votes", movie.vote_count);
        record.set_opt("language", movie.original_language);
        record.set(
            "genres",
            movie.genres.into_iter().map(|g| g.name).collect::<Vec<_>>(),
        );
        record.set(
            "studios",
            movie
                .production_companies
                .into_iter()
                .map(|c| c.name)
                .collect::<Vec<_>>(),
        );
        record.set_opt("poster", Self::image_url(movie.poster_path.as_deref()));
        record.set_opt(
            "imdb_id",
            movie.external_ids.and_then(|e| e.imdb_id).filter(|i| !i.is_empty()),
        );
        Self::fill_credits(record, movie.credits);
    }

    fn fill_tv(record: &mut MediaRecord, tv: TvDetails) {
        record.set("type", "tv");
        record.set("title", tv.name);
        if !tv.original_name.is_empty() {
            record.set("original_title", tv.original_name);
        }
        record.set_opt("year", Self::year_of(tv.first_air_date.as_deref()));
        record.set_opt("release_date", tv.first_air_date);
        record.set_opt("end_date", tv.last_air_date);
        record.set_opt("tagline", tv.tagline.filter(|t| !t.is_empty()));
        record.set_opt("intro", tv.overview.filter(|o| !o.is_empty()));
        record.set_opt("runtime", tv.episode_run_time.first().copied());
        record.set_opt("rating", tv.vote_average);
        record.set_opt("votes", tv.vote_count);
        record.set_opt("language", tv.original_language);
        record.set_opt("seasons", tv.number_of_seasons);
        record.set_opt("episodes", tv.number_of_episodes);
        record.set(
            "genres",
            tv.genres.into_iter().map(|g| g.name).collect::<Vec<_>>(),
        );
        record.set(
            "studios",
            tv.production_companies
                .into_iter()
                .map(|c| c.name)
                .collect::<Vec<_>>(),
        );
        record.set_opt("poster", Self::image_url(tv.poster_path.as_deref()));
        record.set_opt(
            "imdb_id",
            tv.external_ids.and_then(|e| e.imdb_id).filter(|i| !i.is_empty()),
        );
        Self::fill_credits(record, tv.credits);
    }
}

#[async_trait]
impl MediaProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    fn domains(&self) -> &'static [&'static str] {
        &["themoviedb.org", "tmdb.org"]
    }

    fn extract_id(&self, url: &str) -> Option<String> {
        URL_PATTERN
            .captures(url)
            .map(|c| format!("{}/{}", &c[1], &c[2]))
    }

    /// Identifiers arrive as `movie/550` from URLs and as `movie_550` from
    /// flat cache keys or direct lookups; restore the slashed form.
    fn canonical_sid(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.contains('/') {
            raw.to_string()
        } else {
            raw.replace('_', "/")
        }
    }

    async fn generate(&self, sid: &str, ctx: &ProviderCtx) -> Result<MediaRecord> {
        let api_key = ctx
            .tmdb_api_key
            .as_deref()
            .ok_or_else(|| DispatchError::Config("TMDB API key not configured".to_string()))?;
        let (subtype, id) = sid
            .split_once('/')
            .ok_or_else(|| DispatchError::Parse(format!("Malformed TMDB identifier: {sid}")))?;

        let url = format!("{TMDB_API_URL}/{subtype}/{id}");
        let params = [
            ("api_key", api_key),
            ("append_to_response", "credits,external_ids"),
        ];

        let mut record = MediaRecord::new("tmdb", sid);
        record.set("link", format!("https://www.themoviedb.org/{subtype}/{id}"));

        match subtype {
            "movie" => {
                let movie: MovieDetails = ctx.http.get_json_with_params(&url, &params).await?;
                Self::fill_movie(&mut record, movie);
            }
            "tv" => {
                let tv: TvDetails = ctx.http.get_json_with_params(&url, &params).await?;
                Self::fill_tv(&mut record, tv);
            }
            other => {
                return Err(DispatchError::Parse(format!("Unknown TMDB subtype: {other}")));
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
        push_field(&mut lines, record, "language", "Language");
        if let Some(runtime) = record.field("runtime").and_then(Value::as_i64) {
            lines.push(format!("Runtime: {runtime} min"));
        }
        if let Some(rating) = record.field("rating").and_then(Value::as_f64) {
            let votes = record.field("votes").and_then(Value::as_i64).unwrap_or(0);
            lines.push(format!("Rating: {rating:.1}/10 from {votes} users"));
        }
        push_field(&mut lines, record, "imdb_id", "IMDb ID");
        push_list(&mut lines, record, "studios", "Studios");
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
