use super::provider::tmdb::api_types::{MovieResult, SearchResponse, TvResult};
use super::provider::tmdb::TMDB_API_URL;
use super::provider::HttpClient;
use super::types::MediaSummary;
use super::Result;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

/// Shared deadline for the parallel TMDB fan-out
const TMDB_SEARCH_TIMEOUT: Duration = Duration::from_secs(8);
/// Cap on rows returned by any backend
const MAX_RESULTS: usize = 10;

/// Outcome of one search call, always structured: backend failures are
/// folded into `success`/`error`, never surfaced as errors.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub data: Vec<MediaSummary>,
}

impl SearchOutcome {
    fn ok(data: Vec<MediaSummary>) -> Self {
        Self {
            success: true,
            error: None,
            data,
        }
    }

    fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: Vec::new(),
        }
    }
}

/// Classify a query as primarily CJK.
///
/// Queries shorter than two countable characters count as Chinese when
/// they contain any CJK character at all; otherwise CJK characters must
/// strictly outnumber Latin letters.
pub fn is_chinese_text(text: &str) -> bool {
    let cjk = text
        .chars()
        .filter(|c| ('\u{4e00}'..='\u{9fff}').contains(c))
        .count();
    let latin = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
    if cjk + latin < 2 {
        cjk > 0
    } else {
        cjk > latin
    }
}

/// Free-text search over the supported backends.
pub struct SearchDispatcher {
    http: HttpClient,
    tmdb_api_key: Option<String>,
}

impl SearchDispatcher {
    pub fn new(http: HttpClient, tmdb_api_key: Option<String>) -> Self {
        Self { http, tmdb_api_key }
    }

    /// Explicit-source search.
    pub async fn search(&self, source: &str, query: &str) -> SearchOutcome {
        match source {
            "imdb" => self.search_imdb(query).await,
            "tmdb" => self.search_tmdb(query).await,
            other => SearchOutcome::fail(format!("Unsupported search source: {other}")),
        }
    }

    /// Language-based source selection: mostly-CJK queries go to TMDB,
    /// everything else to IMDb.
    pub async fn auto_search(&self, query: &str) -> SearchOutcome {
        if is_chinese_text(query) {
            self.search_tmdb(query).await
        } else {
            self.search_imdb(query).await
        }
    }

    /// IMDb: suggestion endpoint first (fast, undocumented), find-page
    /// scrape as the fallback.
    async fn search_imdb(&self, query: &str) -> SearchOutcome {
        match self.imdb_suggest(query).await {
            Ok(rows) if !rows.is_empty() => return SearchOutcome::ok(rows),
            Ok(_) => debug!("imdb suggestion returned nothing for {query:?}"),
            Err(e) => debug!("imdb suggestion failed: {e}"),
        }

        match self.imdb_find(query).await {
            Ok(rows) if !rows.is_empty() => SearchOutcome::ok(rows),
            Ok(_) => SearchOutcome::fail(format!("No IMDb results for: {query}")),
            Err(e) => SearchOutcome::fail(format!("IMDb search failed: {e}")),
        }
    }

    async fn imdb_suggest(&self, query: &str) -> Result<Vec<MediaSummary>> {
        let trimmed = query.trim().to_lowercase();
        let initial = trimmed
            .chars()
            .next()
            .filter(|c| c.is_ascii_alphanumeric())
            .unwrap_or('a');
        let url = format!(
            "https://v2.sg.media-imdb.com/suggestion/{initial}/{}.json",
            urlencoding::encode(&trimmed)
        );

        let response: SuggestResponse = self.http.get_json(&url).await?;
        Ok(response
            .entries
            .into_iter()
            .filter(|e| e.id.starts_with("tt"))
            .take(MAX_RESULTS)
            .map(|e| MediaSummary {
                year: e.year,
                subtype: e.kind.unwrap_or_else(|| "feature".to_string()),
                title: e.title.unwrap_or_default(),
                subtitle: e.subtitle,
                link: format!("https://www.imdb.com/title/{}/", e.id),
                id: e.id,
            })
            .collect())
    }

    async fn imdb_find(&self, query: &str) -> Result<Vec<MediaSummary>> {
        let url = format!(
            "https://www.imdb.com/find?q={}&s=tt",
            urlencoding::encode(query.trim())
        );
        let html = self.http.get_text(&url, None).await?;
        Ok(parse_imdb_find(&html))
    }

    /// TMDB: movie and tv legs run in parallel under one shared deadline;
    /// results are tagged, merged, sorted by popularity and capped.
    async fn search_tmdb(&self, query: &str) -> SearchOutcome {
        let Some(api_key) = self.tmdb_api_key.as_deref() else {
            return SearchOutcome::fail("TMDB API key not configured");
        };

        let movies = self.tmdb_movie_leg(api_key, query);
        let shows = self.tmdb_tv_leg(api_key, query);
        let Ok((movies, shows)) =
            tokio::time::timeout(TMDB_SEARCH_TIMEOUT, futures::future::join(movies, shows)).await
        else {
            return SearchOutcome::fail("TMDB search timed out");
        };

        let mut rows: Vec<(f64, MediaSummary)> = Vec::new();
        match movies {
            Ok(r) => rows.extend(r),
            Err(e) => debug!("tmdb movie search failed: {e}"),
        }
        match shows {
            Ok(r) => rows.extend(r),
            Err(e) => debug!("tmdb tv search failed: {e}"),
        }
        if rows.is_empty() {
            return SearchOutcome::fail(format!("No TMDB results for: {query}"));
        }

        rows.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        rows.truncate(MAX_RESULTS);
        SearchOutcome::ok(rows.into_iter().map(|(_, s)| s).collect())
    }

    async fn tmdb_movie_leg(
        &self,
        api_key: &str,
        query: &str,
    ) -> Result<Vec<(f64, MediaSummary)>> {
        let url = format!("{TMDB_API_URL}/search/movie");
        let response: SearchResponse<MovieResult> = self
            .http
            .get_json_with_params(&url, &[("api_key", api_key), ("query", query)])
            .await?;

        Ok(response
            .results
            .into_iter()
            .map(|m| {
                let year = m
                    .release_date
                    .as_deref()
                    .and_then(|d| d.split('-').next())
                    .and_then(|y| y.parse().ok());
                (
                    m.popularity.unwrap_or(0.0),
                    MediaSummary {
                        year,
                        subtype: "movie".to_string(),
                        title: m.title,
                        subtitle: Some(m.original_title).filter(|t| !t.is_empty()),
                        link: format!("https://www.themoviedb.org/movie/{}", m.id),
                        id: format!("movie/{}", m.id),
                    },
                )
            })
            .collect())
    }

    async fn tmdb_tv_leg(&self, api_key: &str, query: &str) -> Result<Vec<(f64, MediaSummary)>> {
        let url = format!("{TMDB_API_URL}/search/tv");
        let response: SearchResponse<TvResult> = self
            .http
            .get_json_with_params(&url, &[("api_key", api_key), ("query", query)])
            .await?;

        Ok(response
            .results
            .into_iter()
            .map(|t| {
                let year = t
                    .first_air_date
                    .as_deref()
                    .and_then(|d| d.split('-').next())
                    .and_then(|y| y.parse().ok());
                (
                    t.popularity.unwrap_or(0.0),
                    MediaSummary {
                        year,
                        subtype: "tv".to_string(),
                        title: t.name,
                        subtitle: Some(t.original_name).filter(|n| !n.is_empty()),
                        link: format!("https://www.themoviedb.org/tv/{}", t.id),
                        id: format!("tv/{}", t.id),
                    },
                )
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct SuggestResponse {
    #[serde(default, rename = "d")]
    entries: Vec<SuggestEntry>,
}

#[derive(Debug, Deserialize)]
struct SuggestEntry {
    id: String,
    #[serde(rename = "l")]
    title: Option<String>,
    #[serde(rename = "y")]
    year: Option<i32>,
    #[serde(rename = "q")]
    kind: Option<String>,
    #[serde(rename = "s")]
    subtitle: Option<String>,
}

/// Pull result rows out of the find page. Handles both the current and
/// the legacy result-list markup.
fn parse_imdb_find(html: &str) -> Vec<MediaSummary> {
    static ROW: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("li.ipc-metadata-list-summary-item, li.find-title-result, td.result_text")
            .expect("Invalid find-row selector")
    });
    static LINK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a").expect("Invalid find-link selector"));
    static META: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("ul li, span").expect("Invalid find-meta selector"));
    static TITLE_ID: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"/title/(tt\d+)").expect("Invalid title-id regex"));
    static YEAR: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("Invalid find-year regex"));

    let doc = Html::parse_document(html);
    let mut rows = Vec::new();

    for row in doc.select(&ROW) {
        if rows.len() >= MAX_RESULTS {
            break;
        }
        let Some(link) = row.select(&LINK).next() else {
            continue;
        };
        let href = link.value().attr("href").unwrap_or_default();
        let Some(id) = TITLE_ID.captures(href).map(|c| c[1].to_string()) else {
            continue;
        };
        let title = link.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }

        let meta: Vec<String> = row
            .select(&META)
            .map(|m| m.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        let year = meta
            .iter()
            .find_map(|m| YEAR.captures(m).and_then(|c| c[1].parse().ok()));
        let subtitle = meta.iter().find(|m| !YEAR.is_match(m)).cloned();

        rows.push(MediaSummary {
            year,
            subtype: "feature".to_string(),
            title,
            subtitle,
            link: format!("https://www.imdb.com/title/{id}/"),
            id,
        });
    }

    rows
}
